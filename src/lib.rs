//! Authorization core for actor/action permission checks.
//!
//! An [`Actor`] asks to perform an [`Action`](action::Action) on a
//! [`Resource`]. The [`PermissionResolver`] answers by combining the token
//! restrictions the actor carries, the allow blocks of the configuration tree,
//! an ordered list of [`DecisionProvider`]s and the action's default.
//!
//! Actors come from authentication collaborators; [`TokenCodec`] turns signed
//! `dstok_` API tokens into actors, and [`ActorCookie`] does the same for the
//! `ds_actor` cookie.

pub mod action;
pub mod actor;
pub mod allow;
pub mod audit;
pub mod authz;
pub mod config;
pub mod logs;
pub mod resource;
pub mod rules;
pub mod token;

pub use action::ActionRegistry;
pub use actor::Actor;
pub use allow::AllowBlock;
pub use audit::{AuditEntry, AuditLog};
pub use authz::factory::AuthzFactory;
pub use authz::resolver::{Forbidden, PermissionResolver, ResolveError, Visibility};
pub use authz::{AuthzRequest, DecisionProvider, Verdict};
pub use config::Config;
pub use resource::Resource;
pub use token::cookie::ActorCookie;
pub use token::{Restrictions, TokenCodec, TokenError, TokenPayload};
