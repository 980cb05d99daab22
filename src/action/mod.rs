mod defaults;

pub use defaults::{EXECUTE_SQL, PERMISSIONS_DEBUG};

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use log::error;
use serde::{Deserialize, Serialize};

use crate::resource::Resource;
use crate::rules::InstanceRules;

/// The kind of resource an action operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Takes no resource.
    Instance,
    /// Takes a database name.
    Database,
    /// Takes a `(database, table)` pair.
    Table,
    /// Takes a `(database, query)` pair.
    Query,
}

impl Scope {
    /// Whether `resource` has the shape this scope expects.
    pub fn accepts(&self, resource: &Resource) -> bool {
        matches!(
            (self, resource),
            (Scope::Instance, Resource::Instance)
                | (Scope::Database, Resource::Database(_))
                | (Scope::Table, Resource::Child(_, _))
                | (Scope::Query, Resource::Child(_, _))
        )
    }

    pub fn expected_shape(&self) -> &'static str {
        match self {
            Scope::Instance => "none",
            Scope::Database => "database",
            Scope::Table | Scope::Query => "database/child",
        }
    }
}

/// Which allow blocks of the configuration tree gate an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// Allow blocks do not apply.
    None,
    /// The `allow` blocks along the resource path.
    Allow,
    /// The `allow_sql` blocks at instance and database scope.
    AllowSql,
}

/// A registered action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub abbr: Option<String>,
    pub description: Option<String>,
    pub scope: Scope,
    pub gate: Gate,
    /// The answer when no rule source expresses an opinion.
    pub default_allow: bool,
}

impl Action {
    pub fn new(name: impl Into<String>, scope: Scope, default_allow: bool) -> Self {
        Self {
            name: name.into(),
            abbr: None,
            description: None,
            scope,
            gate: Gate::None,
            default_allow,
        }
    }

    pub fn abbr(mut self, abbr: impl Into<String>) -> Self {
        self.abbr = Some(abbr.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Whether `name` refers to this action, by full name or abbreviation.
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.abbr.as_deref() == Some(name)
    }

    /// Whether any entry of `list` refers to this action.
    pub fn in_list(&self, list: &[String]) -> bool {
        list.iter().any(|name| self.is_named(name))
    }
}

/// The read-only set of actions known to the process.
///
/// Populated once at startup; lookups accept either the full name or the
/// abbreviation.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<Action>>,
    abbrs: HashMap<String, String>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard actions.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for action in defaults::actions() {
            let name = action.name.clone();
            if let Err(e) = registry.register(action) {
                error!("Skip built-in action '{name}': {e:#}");
            }
        }
        registry
    }

    pub fn register(&mut self, action: Action) -> Result<()> {
        if action.name.is_empty() {
            bail!("action name cannot be empty");
        }
        if self.actions.contains_key(&action.name) || self.abbrs.contains_key(&action.name) {
            bail!("action '{}' is already registered", action.name);
        }
        if let Some(abbr) = action.abbr.as_ref() {
            if self.actions.contains_key(abbr) || self.abbrs.contains_key(abbr) {
                bail!(
                    "abbreviation '{abbr}' of action '{}' is already in use",
                    action.name
                );
            }
            self.abbrs.insert(abbr.clone(), action.name.clone());
        }
        self.actions.insert(action.name.clone(), Arc::new(action));
        Ok(())
    }

    /// Looks up an action by name or abbreviation.
    pub fn get(&self, name: &str) -> Option<Arc<Action>> {
        if let Some(action) = self.actions.get(name) {
            return Some(action.clone());
        }
        let full = self.abbrs.get(name)?;
        self.actions.get(full).cloned()
    }

    /// Returns the abbreviation of `name` if it has one, otherwise `name`.
    pub fn abbreviate(&self, name: &str) -> String {
        match self.get(name) {
            Some(action) => action.abbr.clone().unwrap_or_else(|| action.name.clone()),
            None => name.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All actions, sorted by name.
    pub fn list(&self) -> Vec<Arc<Action>> {
        let mut actions: Vec<_> = self.actions.values().cloned().collect();
        actions.sort_by(|a, b| a.name.cmp(&b.name));
        actions
    }

    /// Rejects `permissions` blocks naming actions that are not registered, so
    /// that a typo in the configuration fails at startup rather than silently
    /// never applying.
    pub fn validate_rules(&self, rules: &InstanceRules) -> Result<()> {
        for (path, action) in rules.permission_actions() {
            if self.get(action).is_none() {
                bail!("permissions block at '{path}' names unknown action '{action}'");
            }
        }
        Ok(())
    }
}
