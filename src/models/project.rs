use serde::{Deserialize, Serialize};

/// A creative project registered with the worker.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct Project {
    pub name: String,
    pub path: String,
}

impl AsRef<str> for Project {
    fn as_ref(&self) -> &str {
        &self.name
    }
}
