//! The lost/stolen mobile device response workflow.
//!
//! Topology:
//!
//! ```text
//! list_mobile_devices
//!   -> filter_device_match [device_match]
//!   -> lock_device
//!   -> get_user_attributes
//!   -> filter_executive
//!        [non_executive] -> reset_password_direct -> format_non_executive
//!                           -> create_ticket_non_executive ----------.
//!        [executive]     -> prompt_owner_decision -> decide_on_response
//!                             (1) -> reset_password_approved          |
//!                                    -> format_reset_approved         |
//!                                    -> create_ticket_reset ----------+
//!                             (2) -> format_no_action                 |
//!                                    -> create_ticket_no_action ------+
//!                                                                     v
//!                                                            join_tickets
//!                                                              -> close_case
//! ```
//!
//! Exactly one ticket branch runs per matched user; the join counts the
//! untaken branches as terminal once they are pruned, so the case closes
//! on every path, including a prompt that times out.

use std::time::Duration;

use case_core::{ActionSpec, CmpOp, CollectSpec, ConditionSpec, DataPath, DecisionArm, DecisionSpec, Field,
                FilterSpec, FormatSpec, GraphError, JoinSpec, Operand, ParamSpec, Predicate, PromptSpec,
                StepSpec, WorkflowGraph};
use serde_json::json;

pub const TICKET_SHORT_DESCRIPTION: &str = "Lost/Stolen Mobile Device";
pub const EXECUTIVES_LIST: &str = "executives";

const NON_EXECUTIVE_TEMPLATE: &str = "\
The following user has reported a lost or stolen device and their password has been reset:
{0}

The UUID of the device lost or stolen is:
{1}

This user is not part of the executive team.";

const RESET_APPROVED_TEMPLATE: &str = "\
The following user has reported a lost or stolen device and their password has been reset:
{0}

The UUID of the device lost or stolen is:
{1}

This user is a member of the executive team.
{1}";

const NO_ACTION_TEMPLATE: &str = "\
The following user has reported a lost or stolen device and it was decided to not reset their password:
{0}

The UUID of the device lost or stolen is:
{1}

This user is a member of the executive team.  Further action must be taken as the password for the user has not be reset.";

const PROMPT_MESSAGE: &str = "\
The following user has lost his/her device:

{0}

This user is part of the executive team.  Do you wish to:
1. Reset the user password and file ticket
2. Take no immediate action and file ticket

Please response with a 1 or 2.";

fn device_path(field: Field) -> DataPath {
    DataPath::filtered("filter_device_match", "device_match", "list_mobile_devices", field)
}

fn user_path(condition: &str, field: Field) -> DataPath {
    DataPath::filtered("filter_executive", condition, "get_user_attributes", field)
}

fn ticket_step(formatted_name: &str) -> StepSpec {
    StepSpec::Action(ActionSpec { connector: "ticketing".to_string(),
                                  operation: "create ticket".to_string(),
                                  params: ParamSpec::Static(vec![json!({
                                      "short_description": TICKET_SHORT_DESCRIPTION,
                                      "table": "",
                                      "vault_id": "",
                                      "fields": "",
                                  })]),
                                  formatted: vec![("description".to_string(), formatted_name.to_string())],
                                  next: vec!["join_tickets".to_string()] })
}

/// Builds the validated lost-device workflow graph. `respondent` is the
/// user the approval prompt is addressed to; `prompt_timeout` is the
/// response window after which the executive branch is abandoned.
pub fn lost_device_graph(respondent: &str, prompt_timeout: Duration) -> Result<WorkflowGraph, GraphError> {
    let steps = vec![
        ("list_mobile_devices".to_string(),
         StepSpec::Action(ActionSpec { connector: "mdm".to_string(),
                                       operation: "list devices".to_string(),
                                       params: ParamSpec::Static(vec![json!({
                                           "limit": 500000,
                                           "start_index": "1",
                                       })]),
                                       formatted: vec![],
                                       next: vec!["filter_device_match".to_string()] })),
        ("filter_device_match".to_string(),
         StepSpec::Filter(FilterSpec { conditions: vec![ConditionSpec {
             name: "device_match".to_string(),
             predicates: vec![Predicate::new(DataPath::direct("list_mobile_devices",
                                                              Field::Data("uuid".to_string())),
                                             CmpOp::Eq,
                                             Operand::ArtifactField("deviceExternalId".to_string()))],
             next: vec!["lock_device".to_string()],
         }] })),
        ("lock_device".to_string(),
         StepSpec::Action(ActionSpec { connector: "mdm".to_string(),
                                       operation: "lock device".to_string(),
                                       params: ParamSpec::Collected(CollectSpec {
                                           paths: vec![device_path(Field::Data("uuid".to_string())),
                                                       device_path(Field::ContextArtifact)],
                                           bind: vec![("uuid".to_string(), 0)],
                                           consts: vec![("reason".to_string(), json!(""))],
                                       }),
                                       formatted: vec![],
                                       next: vec!["get_user_attributes".to_string()] })),
        ("get_user_attributes".to_string(),
         StepSpec::Action(ActionSpec { connector: "directory".to_string(),
                                       operation: "get user attributes".to_string(),
                                       params: ParamSpec::Collected(CollectSpec {
                                           paths: vec![device_path(Field::Data("userId".to_string())),
                                                       device_path(Field::ContextArtifact)],
                                           bind: vec![("username".to_string(), 0)],
                                           consts: vec![("fields".to_string(), json!("")),
                                                        ("attribute".to_string(), json!(""))],
                                       }),
                                       formatted: vec![],
                                       next: vec!["filter_executive".to_string()] })),
        ("filter_executive".to_string(),
         StepSpec::Filter(FilterSpec { conditions: vec![
             ConditionSpec {
                 name: "non_executive".to_string(),
                 predicates: vec![Predicate::new(DataPath::direct("get_user_attributes",
                                                                  Field::Parameter("username".to_string())),
                                                 CmpOp::NotIn,
                                                 Operand::NamedList(EXECUTIVES_LIST.to_string()))],
                 next: vec!["reset_password_direct".to_string()],
             },
             ConditionSpec {
                 name: "executive".to_string(),
                 predicates: vec![Predicate::new(DataPath::direct("get_user_attributes",
                                                                  Field::Parameter("username".to_string())),
                                                 CmpOp::In,
                                                 Operand::NamedList(EXECUTIVES_LIST.to_string()))],
                 next: vec!["prompt_owner_decision".to_string()],
             },
         ] })),
        // Non-executive branch: reset immediately, report, file the ticket.
        ("reset_password_direct".to_string(),
         StepSpec::Action(ActionSpec { connector: "directory".to_string(),
                                       operation: "reset password".to_string(),
                                       params: ParamSpec::Collected(CollectSpec {
                                           paths: vec![user_path("non_executive",
                                                                 Field::Parameter("username".to_string())),
                                                       user_path("non_executive", Field::ContextArtifact)],
                                           bind: vec![("username".to_string(), 0)],
                                           consts: vec![],
                                       }),
                                       formatted: vec![],
                                       next: vec!["format_non_executive".to_string()] })),
        ("format_non_executive".to_string(),
         StepSpec::Format(FormatSpec { template: NON_EXECUTIVE_TEMPLATE.to_string(),
                                       paths: vec![DataPath::direct("reset_password_direct",
                                                                    Field::Parameter("username".to_string())),
                                                   device_path(Field::Data("uuid".to_string()))],
                                       next: vec!["create_ticket_non_executive".to_string()] })),
        ("create_ticket_non_executive".to_string(), ticket_step("format_non_executive")),
        // Executive branch: ask first, then route on the recorded answer.
        ("prompt_owner_decision".to_string(),
         StepSpec::Prompt(PromptSpec { respondent: respondent.to_string(),
                                       message: PROMPT_MESSAGE.to_string(),
                                       paths: vec![user_path("executive",
                                                             Field::Parameter("username".to_string()))],
                                       min: 1,
                                       max: 100,
                                       timeout: prompt_timeout,
                                       next: vec!["decide_on_response".to_string()] })),
        ("decide_on_response".to_string(),
         StepSpec::Decision(DecisionSpec { prompt: "prompt_owner_decision".to_string(),
                                           arms: vec![DecisionArm { response: 1,
                                                                    next: vec!["reset_password_approved".to_string()] },
                                                      DecisionArm { response: 2,
                                                                    next: vec!["format_no_action".to_string()] }] })),
        ("reset_password_approved".to_string(),
         StepSpec::Action(ActionSpec { connector: "directory".to_string(),
                                       operation: "reset password".to_string(),
                                       params: ParamSpec::Collected(CollectSpec {
                                           paths: vec![user_path("executive",
                                                                 Field::Parameter("username".to_string())),
                                                       user_path("executive", Field::ContextArtifact)],
                                           bind: vec![("username".to_string(), 0)],
                                           consts: vec![],
                                       }),
                                       formatted: vec![],
                                       next: vec!["format_reset_approved".to_string()] })),
        ("format_reset_approved".to_string(),
         StepSpec::Format(FormatSpec { template: RESET_APPROVED_TEMPLATE.to_string(),
                                       paths: vec![DataPath::direct("reset_password_approved",
                                                                    Field::Parameter("username".to_string())),
                                                   device_path(Field::Data("uuid".to_string()))],
                                       next: vec!["create_ticket_reset".to_string()] })),
        ("create_ticket_reset".to_string(), ticket_step("format_reset_approved")),
        ("format_no_action".to_string(),
         StepSpec::Format(FormatSpec { template: NO_ACTION_TEMPLATE.to_string(),
                                       paths: vec![user_path("executive",
                                                             Field::Parameter("username".to_string())),
                                                   device_path(Field::Data("uuid".to_string()))],
                                       next: vec!["create_ticket_no_action".to_string()] })),
        ("create_ticket_no_action".to_string(), ticket_step("format_no_action")),
        ("join_tickets".to_string(),
         StepSpec::Join(JoinSpec { requires: vec!["create_ticket_non_executive".to_string(),
                                                  "create_ticket_reset".to_string(),
                                                  "create_ticket_no_action".to_string()],
                                   next: vec!["close_case".to_string()] })),
        ("close_case".to_string(), StepSpec::Close),
    ];
    WorkflowGraph::validated("list_mobile_devices", steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_graph_validates_and_starts_at_the_inventory_step() {
        let graph = lost_device_graph("admin", Duration::from_secs(1800)).unwrap();
        assert_eq!(graph.entry(), "list_mobile_devices");
        assert_eq!(graph.joins().count(), 1);
        let (name, join) = graph.joins().next().unwrap();
        assert_eq!(name, "join_tickets");
        assert_eq!(join.requires.len(), 3);
    }

    #[test]
    fn every_ticket_step_feeds_the_join() {
        let graph = lost_device_graph("admin", Duration::from_secs(1800)).unwrap();
        for step in ["create_ticket_non_executive", "create_ticket_reset", "create_ticket_no_action"] {
            let spec = graph.step(step).unwrap();
            assert_eq!(spec.successors(), vec!["join_tickets"]);
        }
    }
}
