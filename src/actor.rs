use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::token::Restrictions;

/// The marker value stored under [`Actor::TOKEN_KEY`] for token-authenticated actors.
pub const TOKEN_MARKER: &str = "dstok";

/// A single scalar value inside an actor or an allow block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Scalar {
    /// Returns the string form used for matching. Booleans never take part in
    /// key/value matching.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Scalar::Str(s) => Some(s.clone()),
            Scalar::Int(n) => Some(n.to_string()),
            Scalar::Bool(_) => None,
        }
    }
}

/// A value stored in an actor attribute.
///
/// Anything that is neither a scalar nor a flat list of scalars is kept as
/// [`ActorValue::Other`] so that decoding an actor never fails because of one
/// odd field. Such values never match an allow block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActorValue {
    One(Scalar),
    Many(Vec<Scalar>),
    Other(serde_json::Value),
}

impl ActorValue {
    /// Normalizes the value into the set of strings it can match against.
    pub fn keys(&self) -> HashSet<String> {
        match self {
            ActorValue::One(s) => s.as_key().into_iter().collect(),
            ActorValue::Many(list) => list.iter().filter_map(Scalar::as_key).collect(),
            ActorValue::Other(_) => HashSet::new(),
        }
    }

    /// Whether the value counts as "present" for a `"*"` wildcard.
    pub fn is_non_empty(&self) -> bool {
        match self {
            ActorValue::One(Scalar::Str(s)) => !s.is_empty(),
            ActorValue::One(_) => true,
            ActorValue::Many(list) => !list.is_empty(),
            ActorValue::Other(value) => !value.is_null(),
        }
    }
}

impl From<&str> for ActorValue {
    fn from(s: &str) -> Self {
        ActorValue::One(Scalar::Str(s.to_string()))
    }
}

impl From<String> for ActorValue {
    fn from(s: String) -> Self {
        ActorValue::One(Scalar::Str(s))
    }
}

impl From<i64> for ActorValue {
    fn from(n: i64) -> Self {
        ActorValue::One(Scalar::Int(n))
    }
}

impl From<Vec<&str>> for ActorValue {
    fn from(list: Vec<&str>) -> Self {
        ActorValue::Many(
            list.into_iter()
                .map(|s| Scalar::Str(s.to_string()))
                .collect(),
        )
    }
}

/// An authenticated principal.
///
/// Actors are open attribute maps handed over by authentication collaborators.
/// The only field this crate reads on its own is the token restriction set
/// (`_r`), which is kept out of the attribute map so that it can be typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(flatten)]
    attrs: BTreeMap<String, ActorValue>,

    #[serde(rename = "_r", default, skip_serializing_if = "Option::is_none")]
    restrictions: Option<Restrictions>,
}

impl Actor {
    pub const ID_KEY: &'static str = "id";
    pub const TOKEN_KEY: &'static str = "token";
    pub const TOKEN_EXPIRES_KEY: &'static str = "token_expires";

    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for an actor that only carries an `id`.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self::new().attr(Self::ID_KEY, id.into())
    }

    /// Builder-style attribute setter.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<ActorValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ActorValue>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ActorValue> {
        self.attrs.get(key)
    }

    pub fn id(&self) -> Option<String> {
        match self.attrs.get(Self::ID_KEY)? {
            ActorValue::One(s) => s.as_key(),
            _ => None,
        }
    }

    /// Whether this actor was produced from a signed API token.
    pub fn is_token_actor(&self) -> bool {
        matches!(
            self.attrs.get(Self::TOKEN_KEY),
            Some(ActorValue::One(Scalar::Str(s))) if s == TOKEN_MARKER
        )
    }

    /// Returns the token restrictions, treating an empty set as unrestricted.
    pub fn restrictions(&self) -> Option<&Restrictions> {
        self.restrictions.as_ref().filter(|r| !r.is_empty())
    }

    pub fn set_restrictions(&mut self, restrictions: Restrictions) {
        if restrictions.is_empty() {
            self.restrictions = None;
            return;
        }
        self.restrictions = Some(restrictions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_decode() {
        let actor: Actor = serde_json::from_str(
            r#"{"id": "simon", "roles": ["staff", "developer"], "age": 42,
                "nested": {"a": 1}, "_r": {"a": ["vt"]}}"#,
        )
        .unwrap();

        assert_eq!(actor.id().as_deref(), Some("simon"));
        assert_eq!(
            actor.get("roles").unwrap().keys(),
            ["staff", "developer"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        );
        assert_eq!(
            actor.get("age").unwrap().keys(),
            vec![String::from("42")].into_iter().collect()
        );
        assert!(actor.get("nested").unwrap().keys().is_empty());
        assert!(actor.restrictions().is_some());
        assert!(!actor.is_token_actor());
    }

    #[test]
    fn test_empty_restrictions() {
        let actor: Actor = serde_json::from_str(r#"{"id": "x", "_r": {}}"#).unwrap();
        assert!(actor.restrictions().is_none());

        let mut actor = Actor::with_id("x");
        actor.set_restrictions(Restrictions::default());
        assert!(actor.restrictions().is_none());
    }

    #[test]
    fn test_non_empty() {
        assert!(!ActorValue::from("").is_non_empty());
        assert!(ActorValue::from("x").is_non_empty());
        assert!(!ActorValue::Many(vec![]).is_non_empty());
        assert!(ActorValue::from(0).is_non_empty());
    }

    #[test]
    fn test_token_marker() {
        let actor = Actor::with_id("x").attr(Actor::TOKEN_KEY, TOKEN_MARKER);
        assert!(actor.is_token_actor());

        let actor = Actor::with_id("x").attr(Actor::TOKEN_KEY, "other");
        assert!(!actor.is_token_actor());
    }
}
