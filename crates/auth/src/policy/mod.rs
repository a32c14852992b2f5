//! Role → resource → action policy with snapshot-swap updates.
//!
//! Readers grab the current `Arc<PolicySnapshot>` and evaluate against it
//! without holding any lock. Writers are serialized, build the next snapshot
//! off to the side and publish it with a single pointer swap. A failed update
//! publishes nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Role;

mod decision;
mod pattern;

pub use decision::Decision;
pub use pattern::{Action, ResourcePattern};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid resource pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid action '{0}'")]
    InvalidAction(String),

    #[error("unknown role '{0}'")]
    UnknownRole(Role),

    #[error("role '{0}' already exists")]
    RoleExists(Role),

    #[error("role '{role}' has no rule {path} {method}")]
    UnknownRule {
        role: Role,
        path: String,
        method: String,
    },
}

/// Wire/storage shape of a single rule: `role` may perform `method` on
/// resources matching `path`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    pub role: Role,
    pub path: String,
    pub method: String,
}

impl PolicyRule {
    pub fn new(role: Role, path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            role,
            path: path.into(),
            method: method.into(),
        }
    }

    /// Compile without installing; used to validate input before it is
    /// persisted anywhere.
    pub fn compile(&self) -> Result<Grant, PolicyError> {
        Grant::parse(&self.path, &self.method)
    }
}

/// One compiled (pattern, action) pair held by a role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Grant {
    pattern: ResourcePattern,
    action: Action,
}

impl Grant {
    pub fn parse(path: &str, method: &str) -> Result<Self, PolicyError> {
        Ok(Self {
            pattern: ResourcePattern::parse(path)?,
            action: Action::parse(method)?,
        })
    }

    pub fn pattern(&self) -> &ResourcePattern {
        &self.pattern
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn permits(&self, path: &str, method: &str) -> bool {
        self.action.permits(method) && self.pattern.matches(path)
    }

    fn to_rule(&self, role: &Role) -> PolicyRule {
        PolicyRule::new(role.clone(), self.pattern.as_str(), self.action.as_str())
    }
}

type RuleMap = BTreeMap<Role, BTreeSet<Grant>>;

/// An immutable, complete rule set.
///
/// Grants are kept sorted, so the first matching grant reported by
/// [`PolicySnapshot::explain`] is the same on every evaluation.
#[derive(Debug, Clone, Default)]
pub struct PolicySnapshot {
    version: u64,
    roles: RuleMap,
}

impl PolicySnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.keys()
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains_key(role)
    }

    /// Rules held by `role`, or `None` if the role is unknown.
    pub fn rules_for(&self, role: &Role) -> Option<Vec<PolicyRule>> {
        self.roles
            .get(role)
            .map(|grants| grants.iter().map(|g| g.to_rule(role)).collect())
    }

    pub fn rules(&self) -> Vec<PolicyRule> {
        self.roles
            .iter()
            .flat_map(|(role, grants)| grants.iter().map(move |g| g.to_rule(role)))
            .collect()
    }

    /// Any matching grant allows; no match denies.
    pub fn is_allowed(&self, role: &Role, path: &str, method: &str) -> bool {
        self.first_match(role, path, method).is_some()
    }

    pub fn explain(&self, role: &Role, path: &str, method: &str) -> Decision {
        let matched = self
            .first_match(role, path, method)
            .map(|g| g.to_rule(role));
        Decision::new(
            role.clone(),
            path,
            method,
            self.roles.contains_key(role),
            matched,
            self.version,
        )
    }

    fn first_match(&self, role: &Role, path: &str, method: &str) -> Option<&Grant> {
        self.roles
            .get(role)?
            .iter()
            .find(|g| g.permits(path, method))
    }
}

/// Process-wide policy handle.
#[derive(Debug, Default)]
pub struct PolicyEngine {
    current: RwLock<Arc<PolicySnapshot>>,
    writer: Mutex<()>,
}

impl PolicyEngine {
    /// An engine with no roles: every request is denied.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: impl IntoIterator<Item = PolicyRule>) -> Result<Self, PolicyError> {
        let engine = Self::new();
        engine.replace_all(rules)?;
        Ok(engine)
    }

    /// The snapshot visible right now. Holding it pins that version.
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        // The guarded value is a single pointer; a poisoned lock cannot hold a
        // half-written one.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn is_allowed(&self, role: &Role, path: &str, method: &str) -> bool {
        self.snapshot().is_allowed(role, path, method)
    }

    pub fn explain(&self, role: &Role, path: &str, method: &str) -> Decision {
        self.snapshot().explain(role, path, method)
    }

    pub fn add_role(&self, role: Role) -> Result<Arc<PolicySnapshot>, PolicyError> {
        self.update(|roles| {
            if roles.contains_key(&role) {
                return Err(PolicyError::RoleExists(role));
            }
            roles.insert(role, BTreeSet::new());
            Ok(())
        })
    }

    pub fn remove_role(&self, role: &Role) -> Result<Arc<PolicySnapshot>, PolicyError> {
        self.update(|roles| {
            roles
                .remove(role)
                .map(|_| ())
                .ok_or_else(|| PolicyError::UnknownRole(role.clone()))
        })
    }

    /// Grant `method` on `path` to an existing role. Granting twice is a no-op.
    pub fn grant(
        &self,
        role: &Role,
        path: &str,
        method: &str,
    ) -> Result<Arc<PolicySnapshot>, PolicyError> {
        let grant = Grant::parse(path, method)?;
        self.update(|roles| {
            let grants = roles
                .get_mut(role)
                .ok_or_else(|| PolicyError::UnknownRole(role.clone()))?;
            grants.insert(grant);
            Ok(())
        })
    }

    pub fn revoke(
        &self,
        role: &Role,
        path: &str,
        method: &str,
    ) -> Result<Arc<PolicySnapshot>, PolicyError> {
        let grant = Grant::parse(path, method)?;
        self.update(|roles| {
            let grants = roles
                .get_mut(role)
                .ok_or_else(|| PolicyError::UnknownRole(role.clone()))?;
            if grants.remove(&grant) {
                Ok(())
            } else {
                Err(PolicyError::UnknownRule {
                    role: role.clone(),
                    path: path.to_string(),
                    method: method.to_string(),
                })
            }
        })
    }

    /// Replace everything `role` may do, creating the role if needed.
    ///
    /// `rules` carry their own role field, which is ignored here.
    pub fn replace_role_rules(
        &self,
        role: &Role,
        rules: &[PolicyRule],
    ) -> Result<Arc<PolicySnapshot>, PolicyError> {
        let grants = rules
            .iter()
            .map(PolicyRule::compile)
            .collect::<Result<BTreeSet<_>, _>>()?;
        self.update(|roles| {
            roles.insert(role.clone(), grants);
            Ok(())
        })
    }

    /// Install a complete rule set, discarding the current one.
    pub fn replace_all(
        &self,
        rules: impl IntoIterator<Item = PolicyRule>,
    ) -> Result<Arc<PolicySnapshot>, PolicyError> {
        let mut next = RuleMap::new();
        for rule in rules {
            let grant = rule.compile()?;
            next.entry(rule.role).or_default().insert(grant);
        }
        self.update(|roles| {
            *roles = next;
            Ok(())
        })
    }

    fn update<F>(&self, apply: F) -> Result<Arc<PolicySnapshot>, PolicyError>
    where
        F: FnOnce(&mut RuleMap) -> Result<(), PolicyError>,
    {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.snapshot();
        let mut roles = current.roles.clone();
        apply(&mut roles)?;

        let next = Arc::new(PolicySnapshot {
            version: current.version + 1,
            roles,
        });
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);

        tracing::info!(
            version = next.version,
            roles = next.roles.len(),
            "policy snapshot published"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn role(s: &'static str) -> Role {
        Role::new(s)
    }

    fn engine() -> PolicyEngine {
        PolicyEngine::with_rules([
            PolicyRule::new(role("admin"), "/*", "*"),
            PolicyRule::new(role("viewer"), "/user/info", "GET"),
            PolicyRule::new(role("viewer"), "/user/list", "POST"),
            PolicyRule::new(role("editor"), "/user/:id", "PUT"),
        ])
        .unwrap()
    }

    #[test]
    fn evaluates_roles_paths_and_methods() {
        let e = engine();
        assert!(e.is_allowed(&role("admin"), "/policy/admin", "DELETE"));
        assert!(e.is_allowed(&role("viewer"), "/user/info", "GET"));
        assert!(!e.is_allowed(&role("viewer"), "/user/info", "POST"));
        assert!(!e.is_allowed(&role("viewer"), "/policy/admin", "GET"));
        assert!(e.is_allowed(&role("editor"), "/user/12", "put"));
        assert!(!e.is_allowed(&role("editor"), "/user/12/x", "PUT"));
    }

    #[test]
    fn empty_engine_and_unknown_roles_deny() {
        assert!(!PolicyEngine::new().is_allowed(&role("admin"), "/", "GET"));
        assert!(!engine().is_allowed(&role("ghost"), "/user/info", "GET"));
    }

    #[test]
    fn grant_and_revoke_take_effect_on_next_read() {
        let e = engine();
        let viewer = role("viewer");
        assert!(!e.is_allowed(&viewer, "/policy/viewer", "GET"));

        e.grant(&viewer, "/policy/:role", "GET").unwrap();
        assert!(e.is_allowed(&viewer, "/policy/viewer", "GET"));

        e.revoke(&viewer, "/policy/:role", "get").unwrap();
        assert!(!e.is_allowed(&viewer, "/policy/viewer", "GET"));
    }

    #[test]
    fn failed_updates_leave_the_snapshot_untouched() {
        let e = engine();
        let before = e.snapshot();

        assert_eq!(
            e.grant(&role("ghost"), "/x", "GET").unwrap_err(),
            PolicyError::UnknownRole(role("ghost"))
        );
        assert!(matches!(
            e.grant(&role("viewer"), "no-slash", "GET"),
            Err(PolicyError::InvalidPattern { .. })
        ));
        assert!(matches!(
            e.revoke(&role("viewer"), "/never/granted", "GET"),
            Err(PolicyError::UnknownRule { .. })
        ));
        assert_eq!(
            e.add_role(role("admin")).unwrap_err(),
            PolicyError::RoleExists(role("admin"))
        );
        assert!(
            e.replace_all([
                PolicyRule::new(role("a"), "/ok", "GET"),
                PolicyRule::new(role("b"), "/bad/*/x", "GET"),
            ])
            .is_err()
        );

        let after = e.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(after.is_allowed(&role("viewer"), "/user/info", "GET"));
    }

    #[test]
    fn role_lifecycle_bumps_version() {
        let e = engine();
        let v0 = e.snapshot().version();

        e.add_role(role("auditor")).unwrap();
        assert!(e.snapshot().has_role(&role("auditor")));
        assert!(!e.is_allowed(&role("auditor"), "/user/info", "GET"));

        e.replace_role_rules(
            &role("auditor"),
            &[PolicyRule::new(role("ignored"), "/user/*", "GET")],
        )
        .unwrap();
        assert!(e.is_allowed(&role("auditor"), "/user/info", "GET"));
        assert_eq!(
            e.snapshot().rules_for(&role("auditor")).unwrap(),
            vec![PolicyRule::new(role("auditor"), "/user/*", "GET")]
        );

        e.remove_role(&role("auditor")).unwrap();
        assert!(!e.is_allowed(&role("auditor"), "/user/info", "GET"));
        assert_eq!(e.snapshot().version(), v0 + 3);
    }

    #[test]
    fn explain_names_the_matching_rule() {
        let e = engine();
        let d = e.explain(&role("viewer"), "/user/info", "GET");
        assert!(d.allowed);
        assert_eq!(
            d.matched_rule,
            Some(PolicyRule::new(role("viewer"), "/user/info", "GET"))
        );

        let d = e.explain(&role("viewer"), "/policy/admin", "GET");
        assert!(!d.allowed);
        assert!(d.matched_rule.is_none());
        assert!(d.role_known);
    }

    #[test]
    fn concurrent_readers_never_see_a_mixed_rule_set() {
        // Two complete rule sets that disagree on every path. Any snapshot a
        // reader obtains must agree with itself on both paths.
        let set_a = vec![
            PolicyRule::new(role("r"), "/a", "GET"),
            PolicyRule::new(role("r"), "/b", "GET"),
        ];
        let set_b: Vec<PolicyRule> = vec![PolicyRule::new(role("r"), "/c", "GET")];

        let e = Arc::new(PolicyEngine::with_rules(set_a.clone()).unwrap());
        let stop = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let e = Arc::clone(&e);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    let r = role("r");
                    while !stop.load(Ordering::Relaxed) {
                        let snap = e.snapshot();
                        let a = snap.is_allowed(&r, "/a", "GET");
                        let b = snap.is_allowed(&r, "/b", "GET");
                        let c = snap.is_allowed(&r, "/c", "GET");
                        assert_eq!(a, b, "torn snapshot v{}", snap.version());
                        assert_ne!(a, c, "torn snapshot v{}", snap.version());
                    }
                })
            })
            .collect();

        for i in 0..500 {
            let next = if i % 2 == 0 { set_b.clone() } else { set_a.clone() };
            e.replace_all(next).unwrap();
        }
        stop.store(true, Ordering::Relaxed);

        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(e.snapshot().version(), 501);
    }

    proptest! {
        /// Property: a role with no matching rule is denied, whatever it asks for.
        #[test]
        fn default_deny(
            path in "(/[a-z0-9]{1,8}){0,4}",
            method in "(GET|POST|PUT|DELETE|PATCH)",
        ) {
            let e = PolicyEngine::with_rules([
                PolicyRule::new(role("viewer"), "/only/this", "GET"),
            ])
            .unwrap();
            prop_assume!(!(path == "/only/this" && method == "GET"));
            prop_assert!(!e.is_allowed(&role("viewer"), &path, &method));
            prop_assert!(!e.is_allowed(&role("nobody"), &path, &method));
        }

        /// Property: evaluation is deterministic for a fixed snapshot.
        #[test]
        fn evaluation_is_deterministic(path in "(/[a-z:]{1,6}){0,4}") {
            let snap = engine().snapshot();
            let first = snap.explain(&role("editor"), &path, "PUT");
            let second = snap.explain(&role("editor"), &path, "PUT");
            prop_assert_eq!(first, second);
        }
    }
}
