//! `warden-auth` — authentication and authorization core.
//!
//! Token lifecycle (issue, verify, reissue on role change) and the policy
//! engine that gates every private request. No HTTP here; storage is only
//! reached through [`store::RoleAssignmentStore`].

pub mod claims;
pub mod codec;
pub mod error;
pub mod issuer;
pub mod mutation;
pub mod password;
pub mod policy;
pub mod roles;
pub mod store;

pub use claims::{Claims, Subject};
pub use codec::TokenCodec;
pub use error::{AuthError, SigningError};
pub use issuer::{IssuedToken, TokenIssuer};
pub use mutation::{RoleChange, RoleChangeError, RoleChangeOutcome, change_role, is_self_change};
pub use policy::{Action, Decision, Grant, PolicyEngine, PolicyError, PolicyRule, PolicySnapshot, ResourcePattern};
pub use roles::Role;
pub use store::{RoleAssignmentStore, StoreError};
