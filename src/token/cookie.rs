use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::actor::Actor;

use super::expiry_after;
use super::signer::Signer;

/// Name of the cookie carrying a signed actor.
pub const ACTOR_COOKIE: &str = "ds_actor";

/// Signing namespace reserved for actor cookies.
pub const ACTOR_NAMESPACE: &str = "actor";

#[derive(Debug, Serialize, Deserialize)]
struct CookiePayload {
    #[serde(rename = "a")]
    actor: Actor,

    /// Absolute expiry, Unix seconds.
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

/// Encodes actors into signed cookie values and back.
///
/// Authentication plugins use this to persist a login between requests; this
/// crate only defines the payload and checks its signature and expiry.
pub struct ActorCookie {
    signer: Arc<Signer>,
}

impl ActorCookie {
    pub fn new(signer: Arc<Signer>) -> Self {
        Self { signer }
    }

    pub fn encode(&self, actor: &Actor, expires_after: Option<u64>) -> Result<String> {
        self.encode_at(actor, expires_after, Utc::now().timestamp())
    }

    pub fn encode_at(&self, actor: &Actor, expires_after: Option<u64>, now: i64) -> Result<String> {
        let expires_at = match expires_after {
            Some(d) => match expiry_after(now, d) {
                Some(expires_at) => Some(expires_at),
                None => bail!("cookie lifetime of {d}s is out of range"),
            },
            None => None,
        };
        let payload = CookiePayload {
            actor: actor.clone(),
            expires_at,
        };
        self.signer.sign(&payload, ACTOR_NAMESPACE)
    }

    /// Decodes a cookie value. Any failure yields `None`: the request is then
    /// simply unauthenticated.
    pub fn decode(&self, value: &str) -> Option<Actor> {
        self.decode_at(value, Utc::now().timestamp())
    }

    pub fn decode_at(&self, value: &str, now: i64) -> Option<Actor> {
        let payload: CookiePayload = match self.signer.unsign(value, ACTOR_NAMESPACE) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("Ignore {ACTOR_COOKIE} cookie: {e}");
                return None;
            }
        };
        if let Some(expires_at) = payload.expires_at {
            if now > expires_at {
                debug!("Ignore {ACTOR_COOKIE} cookie: expired");
                return None;
            }
        }
        Some(payload.actor)
    }
}
