use std::fmt;

use serde::{Deserialize, Serialize};

/// The object an action targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resource {
    /// The whole instance, no resource.
    Instance,
    /// A database.
    Database(String),
    /// A table, view or canned query inside a database.
    Child(String, String),
}

impl Resource {
    pub fn database(name: impl Into<String>) -> Self {
        Resource::Database(name.into())
    }

    pub fn child(database: impl Into<String>, child: impl Into<String>) -> Self {
        Resource::Child(database.into(), child.into())
    }

    /// Returns the database the resource lives in, if any.
    pub fn database_name(&self) -> Option<&str> {
        match self {
            Resource::Instance => None,
            Resource::Database(db) | Resource::Child(db, _) => Some(db),
        }
    }

    pub fn child_name(&self) -> Option<&str> {
        match self {
            Resource::Child(_, child) => Some(child),
            _ => None,
        }
    }

    /// A short name for the resource shape, used in usage errors.
    pub fn shape(&self) -> &'static str {
        match self {
            Resource::Instance => "none",
            Resource::Database(_) => "database",
            Resource::Child(_, _) => "database/child",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Instance => write!(f, "<instance>"),
            Resource::Database(db) => write!(f, "{db}"),
            Resource::Child(db, child) => write!(f, "{db}/{child}"),
        }
    }
}
