//! Infrastructure adapters: user storage and policy sources.

pub mod policy_source;
pub mod users;

pub use policy_source::{
    InMemoryPolicyStore, PolicyDocument, PolicySourceError, PolicyStore, default_policy,
    load_policy_file,
};
pub use users::{InMemoryUserStore, NewUser, Page, ProfileUpdate, UserRecord, UserStore};
