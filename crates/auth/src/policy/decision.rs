use serde::Serialize;

use crate::Role;
use crate::policy::PolicyRule;

/// Auditable record of one policy evaluation.
///
/// Answers "why was this request allowed/denied?" for the exact snapshot the
/// decision was made against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub role: Role,
    pub path: String,
    pub method: String,
    /// Whether the role exists at all in the evaluated snapshot.
    pub role_known: bool,
    /// The first matching rule in snapshot order, if any.
    pub matched_rule: Option<PolicyRule>,
    pub snapshot_version: u64,
    pub reason: String,
}

impl Decision {
    pub(crate) fn new(
        role: Role,
        path: &str,
        method: &str,
        role_known: bool,
        matched_rule: Option<PolicyRule>,
        snapshot_version: u64,
    ) -> Self {
        let reason = match (&matched_rule, role_known) {
            (Some(rule), _) => format!(
                "role '{}' may {} {} (rule {} {})",
                role, method, path, rule.method, rule.path
            ),
            (None, true) => format!("no rule of role '{role}' permits {method} {path}"),
            (None, false) => format!("role '{role}' has no rules"),
        };

        Self {
            allowed: matched_rule.is_some(),
            role,
            path: path.to_string(),
            method: method.to_string(),
            role_known,
            matched_rule,
            snapshot_version,
            reason,
        }
    }
}
