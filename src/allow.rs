use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::actor::{Actor, Scalar};

/// The reserved key that restricts an allow block to anonymous requests.
pub const UNAUTHENTICATED_KEY: &str = "unauthenticated";

/// The wildcard value: matches any actor that has a non-empty value for the key.
pub const WILDCARD: &str = "*";

/// A declarative rule describing which actors are permitted.
///
/// ```yaml
/// allow: true                     # everyone
/// allow: false                    # nobody
/// allow: {id: [root, simon]}      # either id
/// allow: {roles: developer}       # anyone holding the role
/// allow: {id: "*"}                # any authenticated actor with an id
/// allow: {unauthenticated: true}  # only anonymous requests
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowBlock {
    Always(bool),
    Rules(BTreeMap<String, AllowValue>),
}

/// The value side of an allow block key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowValue {
    One(Scalar),
    Many(Vec<Scalar>),
    Other(serde_json::Value),
}

impl AllowValue {
    fn candidates(&self) -> HashSet<String> {
        match self {
            AllowValue::One(s) => s.as_key().into_iter().collect(),
            AllowValue::Many(list) => list.iter().filter_map(Scalar::as_key).collect(),
            AllowValue::Other(_) => HashSet::new(),
        }
    }

    fn is_wildcard(&self) -> bool {
        matches!(self, AllowValue::One(Scalar::Str(s)) if s == WILDCARD)
    }
}

impl AllowBlock {
    /// Tests whether `actor` satisfies this block. `None` is the anonymous actor.
    pub fn matches(&self, actor: Option<&Actor>) -> bool {
        matches(actor, self)
    }
}

/// Tests whether `actor` satisfies `allow`.
///
/// Matching is an OR across keys and an OR across each key's values: the actor
/// matches as soon as any key has a value in common with it. Fields of an
/// unexpected type simply fail to match.
pub fn matches(actor: Option<&Actor>, allow: &AllowBlock) -> bool {
    let rules = match allow {
        AllowBlock::Always(value) => return *value,
        AllowBlock::Rules(rules) => rules,
    };

    if let Some(AllowValue::One(Scalar::Bool(true))) = rules.get(UNAUTHENTICATED_KEY) {
        return actor.is_none();
    }

    let actor = match actor {
        Some(actor) => actor,
        None => return false,
    };

    for (key, value) in rules.iter() {
        if key == UNAUTHENTICATED_KEY {
            continue;
        }

        let actor_value = match actor.get(key) {
            Some(v) => v,
            None => continue,
        };

        if value.is_wildcard() {
            if actor_value.is_non_empty() {
                return true;
            }
            continue;
        }

        let candidates = value.candidates();
        if !actor_value.keys().is_disjoint(&candidates) {
            return true;
        }
    }

    false
}
