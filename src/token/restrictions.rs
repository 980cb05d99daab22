use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionRegistry};
use crate::resource::Resource;

/// The set of (action, resource) pairs a token may be used for.
///
/// The three axes are additive: an action is permitted if it is listed for all
/// resources, for the resource's database, or for the exact resource. Entries
/// may use full action names or abbreviations.
///
/// An empty set means the token is unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Restrictions {
    #[serde(rename = "a", default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<String>,

    #[serde(rename = "d", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub database: BTreeMap<String, Vec<String>>,

    #[serde(rename = "r", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl Restrictions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.database.is_empty() && self.resource.is_empty()
    }

    /// Permits `action` against every resource.
    pub fn allow_all(mut self, action: impl Into<String>) -> Self {
        self.all.push(action.into());
        self
    }

    /// Permits `action` against `database` and everything inside it.
    pub fn allow_database(mut self, database: impl Into<String>, action: impl Into<String>) -> Self {
        self.database
            .entry(database.into())
            .or_default()
            .push(action.into());
        self
    }

    /// Permits `action` against a single table or query.
    pub fn allow_resource(
        mut self,
        database: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        self.resource
            .entry(database.into())
            .or_default()
            .entry(resource.into())
            .or_default()
            .push(action.into());
        self
    }

    /// Whether the token may be used for `action` against `resource`.
    pub fn allows(&self, action: &Action, resource: &Resource) -> bool {
        if action.in_list(&self.all) {
            return true;
        }

        let db = match resource.database_name() {
            Some(db) => db,
            None => return false,
        };
        if let Some(actions) = self.database.get(db) {
            if action.in_list(actions) {
                return true;
            }
        }

        let child = match resource.child_name() {
            Some(child) => child,
            None => return false,
        };
        match self.resource.get(db).and_then(|r| r.get(child)) {
            Some(actions) => action.in_list(actions),
            None => false,
        }
    }

    /// Replaces every action name with its abbreviation, keeping tokens short.
    pub fn abbreviate(&self, registry: &ActionRegistry) -> Self {
        let abbr = |actions: &Vec<String>| -> Vec<String> {
            actions.iter().map(|a| registry.abbreviate(a)).collect()
        };

        Self {
            all: abbr(&self.all),
            database: self
                .database
                .iter()
                .map(|(db, actions)| (db.clone(), abbr(actions)))
                .collect(),
            resource: self
                .resource
                .iter()
                .map(|(db, resources)| {
                    let resources = resources
                        .iter()
                        .map(|(name, actions)| (name.clone(), abbr(actions)))
                        .collect();
                    (db.clone(), resources)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows() {
        let registry = ActionRegistry::builtin();
        let vt = registry.get("view-table").unwrap();
        let es = registry.get("execute-sql").unwrap();
        let vi = registry.get("view-instance").unwrap();

        let table = Resource::child("db", "t");
        let other_table = Resource::child("db", "other");

        // Test case 1: global axis
        let r = Restrictions::new().allow_all("view-table");
        assert!(r.allows(&vt, &table));
        assert!(r.allows(&vt, &Resource::child("other_db", "t")));
        assert!(!r.allows(&es, &Resource::database("db")));
        assert!(!r.allows(&vi, &Resource::Instance));

        // Test case 2: database axis covers children, abbreviations accepted
        let r = Restrictions::new().allow_database("db", "vt").allow_database("db", "es");
        assert!(r.allows(&vt, &table));
        assert!(r.allows(&es, &Resource::database("db")));
        assert!(!r.allows(&es, &Resource::database("other")));
        assert!(!r.allows(&vi, &Resource::Instance));

        // Test case 3: resource axis is exact
        let r = Restrictions::new().allow_resource("db", "t", "view-table");
        assert!(r.allows(&vt, &table));
        assert!(!r.allows(&vt, &other_table));
        assert!(!r.allows(&es, &Resource::database("db")));

        // Test case 4: axes are additive
        let r = Restrictions::new()
            .allow_all("vi")
            .allow_resource("db", "t", "view-table");
        assert!(r.allows(&vi, &Resource::Instance));
        assert!(r.allows(&vt, &table));
        assert!(!r.allows(&vt, &other_table));
    }

    #[test]
    fn test_abbreviate() {
        let registry = ActionRegistry::builtin();
        let r = Restrictions::new()
            .allow_all("view-instance")
            .allow_database("db", "execute-sql")
            .allow_resource("db", "t", "insert-row")
            .allow_resource("db", "t", "custom-action");
        let r = r.abbreviate(&registry);
        assert_eq!(r.all, ["vi"]);
        assert_eq!(r.database["db"], ["es"]);
        assert_eq!(r.resource["db"]["t"], ["ir", "custom-action"]);
    }

    #[test]
    fn test_serde() {
        let r = Restrictions::new().allow_all("vi");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"a":["vi"]}"#);

        let r: Restrictions = serde_json::from_str("{}").unwrap();
        assert!(r.is_empty());
    }
}
