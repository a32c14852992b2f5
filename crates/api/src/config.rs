//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use warden_observability::LogFormat;

pub const ENV_JWT_SECRET: &str = "WARDEN_JWT_SECRET";
pub const ENV_JWT_TTL_SECS: &str = "WARDEN_JWT_TTL_SECS";
pub const ENV_JWT_ISSUER: &str = "WARDEN_JWT_ISSUER";
pub const ENV_POLICY_FILE: &str = "WARDEN_POLICY_FILE";
pub const ENV_BIND: &str = "WARDEN_BIND";
pub const ENV_LOG_FORMAT: &str = "WARDEN_LOG_FORMAT";
pub const ENV_ADMIN_PASSWORD: &str = "WARDEN_ADMIN_PASSWORD";
pub const ENV_DEV_MODE: &str = "WARDEN_DEV_MODE";

const DEV_SECRET: &str = "dev-secret";
const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be set (or set WARDEN_DEV_MODE=true for a local dev default)")]
    Missing { key: &'static str },

    #[error("{key} is not a valid {expected}: '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    /// The secret is the public dev default; `main` warns once logging is up.
    pub used_dev_secret: bool,
    pub jwt_ttl: Duration,
    pub jwt_issuer: String,
    /// Static policy source. `None` uses the built-in default policy.
    pub policy_file: Option<PathBuf>,
    pub bind: SocketAddr,
    pub log_format: LogFormat,
    /// When set, an `admin` user with this password is created at startup.
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dev_mode = match get(ENV_DEV_MODE) {
            Some(raw) => {
                let flag = raw.trim().to_ascii_lowercase();
                match flag.as_str() {
                    "1" | "true" | "yes" => true,
                    "0" | "false" | "no" => false,
                    _ => {
                        return Err(ConfigError::Invalid {
                            key: ENV_DEV_MODE,
                            expected: "boolean",
                            value: raw,
                        });
                    }
                }
            }
            None => false,
        };

        let (jwt_secret, used_dev_secret) = match get(ENV_JWT_SECRET) {
            Some(secret) => (secret, false),
            None if dev_mode => (DEV_SECRET.to_string(), true),
            None => return Err(ConfigError::Missing { key: ENV_JWT_SECRET }),
        };

        let jwt_ttl = match get(ENV_JWT_TTL_SECS) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: ENV_JWT_TTL_SECS,
                        expected: "positive number of seconds",
                        value: raw,
                    });
                }
            },
            None => DEFAULT_TTL,
        };

        let bind = match get(ENV_BIND) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: ENV_BIND,
                expected: "socket address",
                value: raw.clone(),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let log_format = match get(ENV_LOG_FORMAT) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: ENV_LOG_FORMAT,
                expected: "log format (json|pretty)",
                value: raw.clone(),
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            jwt_secret,
            used_dev_secret,
            jwt_ttl,
            jwt_issuer: get(ENV_JWT_ISSUER).unwrap_or_else(|| "warden".to_string()),
            policy_file: get(ENV_POLICY_FILE).map(PathBuf::from),
            bind,
            log_format,
            admin_password: get(ENV_ADMIN_PASSWORD),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn missing_secret_is_an_error_outside_dev_mode() {
        assert_eq!(
            config(&[]).unwrap_err(),
            ConfigError::Missing { key: ENV_JWT_SECRET }
        );
        assert_eq!(
            config(&[(ENV_DEV_MODE, "false")]).unwrap_err(),
            ConfigError::Missing { key: ENV_JWT_SECRET }
        );
    }

    #[test]
    fn defaults_apply_when_unset() {
        let c = config(&[(ENV_DEV_MODE, "true")]).unwrap();
        assert_eq!(c.jwt_secret, DEV_SECRET);
        assert!(c.used_dev_secret);
        assert_eq!(c.jwt_ttl, DEFAULT_TTL);
        assert_eq!(c.jwt_issuer, "warden");
        assert!(c.policy_file.is_none());
        assert_eq!(c.bind.port(), 8080);
        assert_eq!(c.log_format, LogFormat::Json);
        assert!(c.admin_password.is_none());
    }

    #[test]
    fn explicit_values_are_used() {
        let c = config(&[
            (ENV_JWT_SECRET, "s3cret"),
            (ENV_JWT_TTL_SECS, "3600"),
            (ENV_JWT_ISSUER, "acme"),
            (ENV_POLICY_FILE, "/etc/warden/policy.json"),
            (ENV_BIND, "127.0.0.1:9000"),
            (ENV_LOG_FORMAT, "pretty"),
            (ENV_ADMIN_PASSWORD, "hunter2"),
        ])
        .unwrap();
        assert_eq!(c.jwt_secret, "s3cret");
        assert!(!c.used_dev_secret);
        assert_eq!(c.jwt_ttl, Duration::from_secs(3600));
        assert_eq!(c.jwt_issuer, "acme");
        assert_eq!(c.policy_file, Some(PathBuf::from("/etc/warden/policy.json")));
        assert_eq!(c.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(c.log_format, LogFormat::Pretty);
        assert_eq!(c.admin_password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn invalid_values_are_reported() {
        for (key, value) in [
            (ENV_JWT_TTL_SECS, "0"),
            (ENV_JWT_TTL_SECS, "soon"),
            (ENV_BIND, "localhost"),
            (ENV_LOG_FORMAT, "xml"),
            (ENV_DEV_MODE, "sometimes"),
        ] {
            let err = config(&[(ENV_JWT_SECRET, "s"), (key, value)]).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: k, .. } if k == key));
        }
    }

    #[test]
    fn blank_values_count_as_unset() {
        let c = config(&[
            (ENV_JWT_SECRET, "  "),
            (ENV_ADMIN_PASSWORD, ""),
            (ENV_DEV_MODE, "1"),
        ])
        .unwrap();
        assert!(c.used_dev_secret);
        assert!(c.admin_password.is_none());
    }
}
