use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use warden_auth::password::{self, PasswordError};
use warden_auth::{PolicyEngine, PolicyError, Role, SigningError, StoreError, TokenCodec, TokenIssuer};
use warden_infra::{
    InMemoryPolicyStore, InMemoryUserStore, NewUser, PolicySourceError, PolicyStore, UserStore,
    default_policy, load_policy_file,
};

use crate::config::Config;

/// Username of the account created from `WARDEN_ADMIN_PASSWORD`.
pub const BOOTSTRAP_ADMIN: &str = "admin";

/// Shared process state, handed to handlers via `Extension`.
pub struct AppServices {
    pub users: Arc<dyn UserStore>,
    pub policy_store: Arc<dyn PolicyStore>,
    pub policy: Arc<PolicyEngine>,
    /// Held across persist-then-swap so the store and the engine agree.
    pub policy_edits: Mutex<()>,
    pub issuer: TokenIssuer,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("token signing unavailable: {0}")]
    Signing(#[from] SigningError),

    #[error(transparent)]
    PolicySource(#[from] PolicySourceError),

    #[error("policy rejected: {0}")]
    Policy(#[from] PolicyError),

    #[error("user storage: {0}")]
    Store(#[from] StoreError),

    #[error("bootstrap admin password: {0}")]
    Password(#[from] PasswordError),
}

pub async fn build_services(config: &Config) -> Result<AppServices, StartupError> {
    let codec = Arc::new(TokenCodec::hs256(config.jwt_secret.as_bytes(), &config.jwt_issuer)?);
    let issuer = TokenIssuer::new(codec, config.jwt_ttl);

    let seed = match &config.policy_file {
        Some(path) => load_policy_file(path).await?,
        None => {
            tracing::info!("no policy file configured; using built-in default policy");
            default_policy()
        }
    };
    let policy_store: Arc<dyn PolicyStore> = Arc::new(InMemoryPolicyStore::seeded(seed));
    let policy = Arc::new(PolicyEngine::with_rules(policy_store.load_rules().await?)?);

    let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    if let Some(admin_password) = &config.admin_password {
        let password_hash = password::hash_password(admin_password)?;
        let admin = users
            .create(NewUser {
                username: BOOTSTRAP_ADMIN.to_string(),
                password_hash,
                nickname: "Administrator".to_string(),
                header_img: String::new(),
                roles: vec![Role::new("admin")],
                active_role: None,
            })
            .await?;
        tracing::info!(user_id = %admin.id, "created bootstrap admin user");
    }

    let snapshot = policy.snapshot();
    tracing::info!(
        roles = snapshot.roles().count(),
        version = snapshot.version(),
        ttl_secs = issuer.ttl_secs(),
        "services ready"
    );

    Ok(AppServices {
        users,
        policy_store,
        policy,
        policy_edits: Mutex::new(()),
        issuer,
    })
}
