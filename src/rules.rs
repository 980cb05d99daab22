use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::{Action, Gate, Scope};
use crate::allow::AllowBlock;
use crate::resource::Resource;

/// Rules attached to the whole instance.
///
/// This mirrors the layout of the configuration file:
///
/// ```yaml
/// allow: {id: "*"}
/// allow_sql: false
/// permissions:
///   create-table: {id: root}
/// databases:
///   fixtures:
///     allow: {roles: staff}
///     tables:
///       secrets:
///         allow: {id: root}
///     queries:
///       recent:
///         sql: select * from log limit 10
///         allow: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<AllowBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_sql: Option<AllowBlock>,

    /// Per-action allow blocks, keyed by action name or abbreviation.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub permissions: BTreeMap<String, AllowBlock>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub databases: BTreeMap<String, DatabaseRules>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<AllowBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_sql: Option<AllowBlock>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub permissions: BTreeMap<String, AllowBlock>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tables: BTreeMap<String, TableRules>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub queries: BTreeMap<String, QueryRules>,
}

/// Rules for a table or view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<AllowBlock>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub permissions: BTreeMap<String, AllowBlock>,
}

/// A canned query: either bare SQL or SQL with options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryRules {
    Sql(String),
    Full(CannedQuery),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CannedQuery {
    #[serde(default)]
    pub sql: String,

    #[serde(default)]
    pub write: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<AllowBlock>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub permissions: BTreeMap<String, AllowBlock>,
}

impl QueryRules {
    fn allow(&self) -> Option<&AllowBlock> {
        match self {
            QueryRules::Sql(_) => None,
            QueryRules::Full(q) => q.allow.as_ref(),
        }
    }

    fn permissions(&self) -> Option<&BTreeMap<String, AllowBlock>> {
        match self {
            QueryRules::Sql(_) => None,
            QueryRules::Full(q) => Some(&q.permissions),
        }
    }
}

impl InstanceRules {
    pub fn database(&self, name: &str) -> Option<&DatabaseRules> {
        self.databases.get(name)
    }

    /// Returns the allow blocks gating `action` on `resource`, broadest first.
    ///
    /// Each entry is `(scope label, block)`. Only scopes that actually carry a
    /// block are returned.
    pub fn gate_chain(&self, action: &Action, resource: &Resource) -> Vec<(String, &AllowBlock)> {
        let mut chain = vec![];
        let db = resource.database_name();
        let db_rules = db.and_then(|name| self.database(name));

        match action.gate {
            Gate::None => {}
            Gate::AllowSql => {
                if let Some(block) = self.allow_sql.as_ref() {
                    chain.push((String::from("allow_sql"), block));
                }
                if let (Some(db), Some(rules)) = (db, db_rules) {
                    if let Some(block) = rules.allow_sql.as_ref() {
                        chain.push((format!("allow_sql on {db}"), block));
                    }
                }
            }
            Gate::Allow => {
                if let Some(block) = self.allow.as_ref() {
                    chain.push((String::from("allow"), block));
                }
                if let (Some(db), Some(rules)) = (db, db_rules) {
                    if let Some(block) = rules.allow.as_ref() {
                        chain.push((format!("allow on {db}"), block));
                    }
                    if let Some(child) = resource.child_name() {
                        let block = match action.scope {
                            Scope::Query => rules.queries.get(child).and_then(QueryRules::allow),
                            _ => rules.tables.get(child).and_then(|t| t.allow.as_ref()),
                        };
                        if let Some(block) = block {
                            chain.push((format!("allow on {db}/{child}"), block));
                        }
                    }
                }
            }
        }

        chain
    }

    /// Returns the most specific `permissions` block configured for `action`
    /// on `resource`, with its scope label.
    pub fn permission_block(
        &self,
        action: &Action,
        resource: &Resource,
    ) -> Option<(String, &AllowBlock)> {
        let mut found =
            find_permission(&self.permissions, action).map(|b| (String::from("instance"), b));

        let db = match resource.database_name() {
            Some(db) => db,
            None => return found,
        };
        let db_rules = match self.database(db) {
            Some(rules) => rules,
            None => return found,
        };
        if let Some(block) = find_permission(&db_rules.permissions, action) {
            found = Some((db.to_string(), block));
        }

        if let Some(child) = resource.child_name() {
            let perms = match action.scope {
                Scope::Query => db_rules.queries.get(child).and_then(QueryRules::permissions),
                _ => db_rules.tables.get(child).map(|t| &t.permissions),
            };
            if let Some(block) = perms.and_then(|p| find_permission(p, action)) {
                found = Some((format!("{db}/{child}"), block));
            }
        }

        found
    }

    /// Lists every `(scope label, action name)` pair used as a key of a
    /// `permissions` block.
    pub fn permission_actions(&self) -> Vec<(String, &str)> {
        let mut actions: Vec<(String, &str)> = self
            .permissions
            .keys()
            .map(|name| (String::from("instance"), name.as_str()))
            .collect();

        for (db, rules) in self.databases.iter() {
            for name in rules.permissions.keys() {
                actions.push((db.clone(), name.as_str()));
            }
            for (table, table_rules) in rules.tables.iter() {
                for name in table_rules.permissions.keys() {
                    actions.push((format!("{db}/{table}"), name.as_str()));
                }
            }
            for (query, query_rules) in rules.queries.iter() {
                if let Some(perms) = query_rules.permissions() {
                    for name in perms.keys() {
                        actions.push((format!("{db}/{query}"), name.as_str()));
                    }
                }
            }
        }

        actions
    }
}

fn find_permission<'a>(
    perms: &'a BTreeMap<String, AllowBlock>,
    action: &Action,
) -> Option<&'a AllowBlock> {
    perms
        .iter()
        .find(|(name, _)| action.is_named(name))
        .map(|(_, block)| block)
}
