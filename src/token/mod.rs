mod restrictions;

pub mod config;
pub mod cookie;
pub mod signer;

pub use restrictions::Restrictions;

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::ActionRegistry;
use crate::actor::{Actor, TOKEN_MARKER};

use self::config::TokenConfig;
use self::signer::Signer;

/// Prefix of every API token string.
pub const TOKEN_PREFIX: &str = "dstok_";

/// Signing namespace reserved for API tokens.
pub const TOKEN_NAMESPACE: &str = "token";

const BEARER_PREFIX: &str = "Bearer ";

/// Why a token could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token-authenticated actors cannot create tokens")]
    TokenActor,
}

/// The signed content of an API token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// The id of the actor the token acts as.
    #[serde(rename = "a")]
    pub actor_id: String,

    /// Always [`TOKEN_MARKER`].
    pub token: String,

    /// Issue time, Unix seconds.
    #[serde(rename = "t")]
    pub issued_at: i64,

    /// Lifetime in seconds; no expiry when absent.
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    #[serde(rename = "_r", default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Restrictions>,
}

/// Adds a lifetime in seconds to a Unix time. `None` when the result does not
/// fit in an `i64`.
pub fn expiry_after(start: i64, duration: u64) -> Option<i64> {
    i64::try_from(duration)
        .ok()
        .and_then(|d| start.checked_add(d))
}

impl TokenPayload {
    /// Absolute expiry, Unix seconds. `Ok(None)` for tokens that never expire.
    pub fn expires_at(&self) -> Result<Option<i64>, TokenError> {
        match self.duration {
            Some(d) => match expiry_after(self.issued_at, d) {
                Some(expires_at) => Ok(Some(expires_at)),
                None => Err(TokenError::Malformed(format!("duration {d}s out of range"))),
            },
            None => Ok(None),
        }
    }

    /// Builds the actor a verified token stands for.
    pub fn into_actor(self) -> Actor {
        let mut actor = Actor::with_id(self.actor_id.as_str()).attr(Actor::TOKEN_KEY, TOKEN_MARKER);
        if let Ok(Some(expires_at)) = self.expires_at() {
            actor.set(Actor::TOKEN_EXPIRES_KEY, expires_at);
        }
        if let Some(restrictions) = self.restrictions {
            actor.set_restrictions(restrictions);
        }
        actor
    }
}

/// Creates and verifies `dstok_` API tokens.
pub struct TokenCodec {
    signer: Arc<Signer>,
    registry: Arc<ActionRegistry>,
    cfg: TokenConfig,
}

impl TokenCodec {
    pub fn new(signer: Arc<Signer>, registry: Arc<ActionRegistry>, cfg: TokenConfig) -> Self {
        Self {
            signer,
            registry,
            cfg,
        }
    }

    /// Signs a token for `actor_id`, issued now.
    ///
    /// # Arguments
    /// * `actor_id` - The id of the actor the token acts as
    /// * `restrictions` - What the token may be used for; empty means everything
    ///   the actor can do
    /// * `expires_after` - Lifetime in seconds, `None` for no expiry
    pub fn sign(
        &self,
        actor_id: &str,
        restrictions: &Restrictions,
        expires_after: Option<u64>,
    ) -> Result<String> {
        self.sign_at(actor_id, restrictions, expires_after, Utc::now().timestamp())
    }

    pub fn sign_at(
        &self,
        actor_id: &str,
        restrictions: &Restrictions,
        expires_after: Option<u64>,
        now: i64,
    ) -> Result<String> {
        if actor_id.is_empty() {
            bail!("cannot create token for an empty actor id");
        }
        if let Some(d) = expires_after {
            if expiry_after(now, d).is_none() {
                bail!("token lifetime of {d}s is out of range");
            }
        }

        let restrictions = if restrictions.is_empty() {
            None
        } else {
            Some(restrictions.abbreviate(&self.registry))
        };
        let payload = TokenPayload {
            actor_id: actor_id.to_string(),
            token: TOKEN_MARKER.to_string(),
            issued_at: now,
            duration: expires_after.filter(|d| *d > 0),
            restrictions,
        };

        let signed = self.signer.sign(&payload, TOKEN_NAMESPACE)?;
        Ok(format!("{TOKEN_PREFIX}{signed}"))
    }

    /// Signs a token on behalf of an authenticated actor.
    ///
    /// Actors that were themselves authenticated by a token are refused, so a
    /// leaked restricted token cannot be used to mint broader ones.
    pub fn create_for_actor(
        &self,
        actor: &Actor,
        restrictions: &Restrictions,
        expires_after: Option<u64>,
    ) -> Result<String> {
        if actor.is_token_actor() {
            return Err(TokenError::TokenActor.into());
        }
        let id = match actor.id() {
            Some(id) => id,
            None => bail!("cannot create token for an actor without id"),
        };
        self.sign(&id, restrictions, expires_after)
    }

    /// Verifies a token against the current wall clock.
    pub fn verify(&self, token: &str) -> Result<TokenPayload, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<TokenPayload, TokenError> {
        let signed = match token.strip_prefix(TOKEN_PREFIX) {
            Some(signed) => signed,
            None => return Err(TokenError::Malformed(String::from("missing token prefix"))),
        };

        let mut payload: TokenPayload = self.signer.unsign(signed, TOKEN_NAMESPACE)?;
        if payload.token != TOKEN_MARKER {
            return Err(TokenError::Malformed(format!(
                "unexpected token type '{}'",
                payload.token
            )));
        }
        if payload.actor_id.is_empty() {
            return Err(TokenError::Malformed(String::from("empty actor id")));
        }

        payload.duration = self.cfg.effective_duration(payload.duration);
        if let Some(expires_at) = payload.expires_at()? {
            if now > expires_at {
                return Err(TokenError::Expired);
            }
        }

        Ok(payload)
    }

    /// Turns an `Authorization` header value into an actor.
    ///
    /// Returns `None` when tokens are disabled, the header is not a `dstok_`
    /// bearer token, or the token fails verification: a broken token means the
    /// request is unauthenticated, never an error.
    pub fn actor_from_authorization(&self, header: &str) -> Option<Actor> {
        self.actor_from_authorization_at(header, Utc::now().timestamp())
    }

    pub fn actor_from_authorization_at(&self, header: &str, now: i64) -> Option<Actor> {
        if !self.cfg.enabled {
            return None;
        }
        let token = header.strip_prefix(BEARER_PREFIX)?;
        if !token.starts_with(TOKEN_PREFIX) {
            return None;
        }

        match self.verify_at(token, now) {
            Ok(payload) => Some(payload.into_actor()),
            Err(e) => {
                debug!("Ignore bearer token: {e}");
                None
            }
        }
    }
}
