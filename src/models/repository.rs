use serde::{Deserialize, Serialize};

/// A package repository the worker resolves packages from.
#[derive(Serialize, Deserialize, Debug, Clone, Default, Eq, PartialEq)]
pub struct Repository {
    pub name: String,
    pub url: String,
}

impl Repository {
    pub fn new(name: String, url: String) -> Self {
        Self { name, url }
    }
}
