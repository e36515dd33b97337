//! Static named lists (e.g. the executive roster).

use std::collections::{HashMap, HashSet};

use case_core::NamedListStore;

#[derive(Debug, Default)]
pub struct StaticListStore {
    lists: HashMap<String, HashSet<String>>,
}

impl StaticListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list<I, S>(mut self, name: &str, members: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.lists
            .insert(name.to_string(), members.into_iter().map(Into::into).collect());
        self
    }
}

impl NamedListStore for StaticListStore {
    fn contains(&self, list: &str, value: &str) -> Option<bool> {
        self.lists.get(list).map(|set| set.contains(value))
    }
}
