//! The template formatter.
//!
//! Renders a text template by substituting collected values into
//! positional `{0}`, `{1}`, ... placeholders and stores the result as a
//! named artifact, retrievable later by name and byte-identical. A path
//! that yields multiple records contributes its first match.

use serde_json::Value;

use crate::collect::resolve_first;
use crate::errors::EngineError;
use crate::path::DataPath;
use crate::store::CaseStore;

/// Scalar rendering: strings unquoted, null as empty, everything else in
/// its JSON form.
fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitutes one value per placeholder index, in order.
pub fn render(template: &str, values: &[Value]) -> String {
    let mut out = template.to_string();
    for (i, value) in values.iter().enumerate() {
        out = out.replace(&format!("{{{i}}}"), &render_value(value));
    }
    out
}

/// Resolves `paths`, renders `template` and stores the result under
/// `output_name`.
pub fn format(store: &mut CaseStore,
              template: &str,
              paths: &[DataPath],
              output_name: &str)
              -> Result<(), EngineError> {
    let mut values = Vec::with_capacity(paths.len());
    for path in paths {
        values.push(resolve_first(store, path)?);
    }
    let rendered = render(template, &values);
    store.put_formatted(output_name, rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionRecord, ActionResult};
    use crate::path::Field;
    use serde_json::json;

    #[test]
    fn placeholders_substitute_positionally_and_repeat() {
        let rendered = render("user {0} lost device {1}; again: {1}", &[json!("u1"), json!("U1")]);
        assert_eq!(rendered, "user u1 lost device U1; again: U1");
    }

    #[test]
    fn null_renders_empty_and_numbers_render_plain() {
        assert_eq!(render("[{0}][{1}]", &[Value::Null, json!(42)]), "[][42]");
    }

    #[test]
    fn format_stores_a_named_retrievable_artifact() {
        let mut store = CaseStore::new();
        let result = ActionResult { parameter: json!({"username": "u1"}),
                                    data: vec![],
                                    success: true,
                                    message: None,
                                    context_artifact: Some(3) };
        store.put_action(ActionRecord::new("reset_password", "directory", "reset password", vec![result]))
             .unwrap();

        format(&mut store,
               "password reset for: {0}",
               &[DataPath::direct("reset_password", Field::Parameter("username".into()))],
               "format_non_executive").unwrap();

        assert_eq!(store.formatted("format_non_executive"), Some("password reset for: u1"));
    }
}
