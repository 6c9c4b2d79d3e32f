//! Backend location and tuning, resolved once at startup.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const BACKEND_URL_HOST: &str = "BACKEND_URL_HOST";
pub const BACKEND_URL_PORT: &str = "BACKEND_URL_PORT";
pub const BACKEND_ANALYZE_PATH: &str = "BACKEND_ANALYZE_PATH";
pub const BACKEND_TIMEOUT_SECS: &str = "BACKEND_TIMEOUT_SECS";

pub const DEFAULT_ANALYZE_PATH: &str = "/analyze";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Optional backend tuning read from the configuration file.
/// Environment variables take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default)]
    pub analyze_path: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Immutable backend configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    host: String,
    port: u16,
    base_url: Url,
    analyze_path: String,
    analyze_url: Url,
    timeout: Duration,
}

impl BackendConfig {
    /// Build a configuration with the default analysis path and timeout.
    pub fn new(host: &str, port: u16) -> Result<Self, ConfigError> {
        let host_url = parse_host(host)?;

        let mut base_url = host_url.clone();
        base_url
            .set_port(Some(port))
            .map_err(|_| ConfigError::InvalidUrl {
                var: BACKEND_URL_HOST,
                value: host.to_string(),
                reason: "cannot carry a port".to_string(),
            })?;

        let analyze_url = join_path(&base_url, DEFAULT_ANALYZE_PATH)?;

        Ok(Self {
            host: host_url.as_str().trim_end_matches('/').to_string(),
            port,
            base_url,
            analyze_path: DEFAULT_ANALYZE_PATH.to_string(),
            analyze_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_analyze_path(mut self, path: &str) -> Result<Self, ConfigError> {
        let path = normalize_path(path)?;
        self.analyze_url = join_path(&self.base_url, &path)?;
        self.analyze_path = path;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve from the process environment.
    pub fn from_env(settings: &BackendSettings) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), settings)
    }

    /// Resolve from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F, settings: &BackendSettings) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(BACKEND_URL_HOST).ok_or(ConfigError::Missing {
            var: BACKEND_URL_HOST,
        })?;
        let port = lookup(BACKEND_URL_PORT).ok_or(ConfigError::Missing {
            var: BACKEND_URL_PORT,
        })?;
        let port = parse_port(&port)?;

        let analyze_path = lookup(BACKEND_ANALYZE_PATH)
            .filter(|p| !p.trim().is_empty())
            .or_else(|| settings.analyze_path.clone())
            .unwrap_or_else(|| DEFAULT_ANALYZE_PATH.to_string());

        let timeout_secs = match lookup(BACKEND_TIMEOUT_SECS).filter(|t| !t.trim().is_empty()) {
            Some(raw) => parse_timeout(&raw)?,
            None => match settings.timeout_secs {
                Some(0) => {
                    return Err(ConfigError::OutOfRange {
                        var: BACKEND_TIMEOUT_SECS,
                        value: "0".to_string(),
                        min: 1,
                        max: u64::MAX,
                    })
                }
                Some(secs) => secs,
                None => DEFAULT_TIMEOUT_SECS,
            },
        };

        let config = Self::new(&host, port)?
            .with_analyze_path(&analyze_path)?
            .with_timeout(Duration::from_secs(timeout_secs));

        tracing::debug!(
            analyze_url = %config.analyze_url,
            timeout_secs,
            "Resolved backend configuration"
        );

        Ok(config)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn analyze_path(&self) -> &str {
        &self.analyze_path
    }

    /// Full URL the analysis request is sent to
    pub fn analyze_url(&self) -> &Url {
        &self.analyze_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn parse_host(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty {
            var: BACKEND_URL_HOST,
        });
    }

    let lower = trimmed.to_ascii_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(ConfigError::InvalidScheme {
            var: BACKEND_URL_HOST,
            value: raw.to_string(),
        });
    }

    let invalid = |reason: &str| ConfigError::InvalidUrl {
        var: BACKEND_URL_HOST,
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host name"));
    }
    if url.port().is_some() {
        return Err(invalid("must not include a port, set BACKEND_URL_PORT instead"));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not include a path, query or fragment"));
    }

    Ok(url)
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    let trimmed = raw.trim();
    let out_of_range = || ConfigError::OutOfRange {
        var: BACKEND_URL_PORT,
        value: trimmed.to_string(),
        min: 0,
        max: u16::MAX as u64,
    };

    match trimmed.parse::<i64>() {
        Ok(value) => u16::try_from(value).map_err(|_| out_of_range()),
        Err(e) => match e.kind() {
            std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow => {
                Err(out_of_range())
            }
            _ => Err(ConfigError::NotAnInteger {
                var: BACKEND_URL_PORT,
                value: raw.to_string(),
            }),
        },
    }
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    let trimmed = raw.trim();
    let secs = trimmed
        .parse::<u64>()
        .map_err(|_| ConfigError::NotAnInteger {
            var: BACKEND_TIMEOUT_SECS,
            value: raw.to_string(),
        })?;
    if secs == 0 {
        return Err(ConfigError::OutOfRange {
            var: BACKEND_TIMEOUT_SECS,
            value: trimmed.to_string(),
            min: 1,
            max: u64::MAX,
        });
    }
    Ok(secs)
}

fn normalize_path(path: &str) -> Result<String, ConfigError> {
    let trimmed = path.trim();
    let normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };

    if normalized.starts_with("//") || normalized.contains("://") {
        return Err(ConfigError::InvalidUrl {
            var: BACKEND_ANALYZE_PATH,
            value: path.to_string(),
            reason: "must be a path, not a URL".to_string(),
        });
    }

    Ok(normalized)
}

fn join_path(base: &Url, path: &str) -> Result<Url, ConfigError> {
    base.join(path).map_err(|e| ConfigError::InvalidUrl {
        var: BACKEND_ANALYZE_PATH,
        value: path.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn resolve(pairs: &[(&str, &str)]) -> Result<BackendConfig, ConfigError> {
        BackendConfig::from_lookup(lookup(pairs), &BackendSettings::default())
    }

    #[test]
    fn test_resolves_defaults() {
        let config = resolve(&[
            (BACKEND_URL_HOST, "http://localhost"),
            (BACKEND_URL_PORT, "5000"),
        ])
        .unwrap();

        assert_eq!(config.host(), "http://localhost");
        assert_eq!(config.port(), 5000);
        assert_eq!(config.base_url().as_str(), "http://localhost:5000/");
        assert_eq!(config.analyze_url().as_str(), "http://localhost:5000/analyze");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_variables() {
        assert_eq!(
            resolve(&[(BACKEND_URL_PORT, "5000")]),
            Err(ConfigError::Missing {
                var: BACKEND_URL_HOST
            })
        );
        assert_eq!(
            resolve(&[(BACKEND_URL_HOST, "http://localhost")]),
            Err(ConfigError::Missing {
                var: BACKEND_URL_PORT
            })
        );
    }

    #[test]
    fn test_host_validation() {
        let err = resolve(&[(BACKEND_URL_HOST, "   "), (BACKEND_URL_PORT, "5000")]);
        assert!(matches!(err, Err(ConfigError::Empty { .. })));

        let err = resolve(&[(BACKEND_URL_HOST, "localhost"), (BACKEND_URL_PORT, "5000")]);
        assert!(matches!(err, Err(ConfigError::InvalidScheme { .. })));

        let err = resolve(&[(BACKEND_URL_HOST, "ftp://localhost"), (BACKEND_URL_PORT, "5000")]);
        assert!(matches!(err, Err(ConfigError::InvalidScheme { .. })));

        let err = resolve(&[
            (BACKEND_URL_HOST, "http://localhost:9000"),
            (BACKEND_URL_PORT, "5000"),
        ]);
        assert!(matches!(err, Err(ConfigError::InvalidUrl { .. })));

        let err = resolve(&[
            (BACKEND_URL_HOST, "http://localhost/api"),
            (BACKEND_URL_PORT, "5000"),
        ]);
        assert!(matches!(err, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_https_host_with_trailing_slash() {
        let config = resolve(&[
            (BACKEND_URL_HOST, "https://licenses.example.com/"),
            (BACKEND_URL_PORT, "8443"),
        ])
        .unwrap();

        assert_eq!(config.host(), "https://licenses.example.com");
        assert_eq!(
            config.analyze_url().as_str(),
            "https://licenses.example.com:8443/analyze"
        );
    }

    #[test]
    fn test_port_range() {
        let host = (BACKEND_URL_HOST, "http://localhost");

        assert_eq!(resolve(&[host, (BACKEND_URL_PORT, "0")]).unwrap().port(), 0);
        assert_eq!(
            resolve(&[host, (BACKEND_URL_PORT, "65535")]).unwrap().port(),
            65535
        );

        for bad in ["65536", "-1", "99999999999999999999999"] {
            let err = resolve(&[host, (BACKEND_URL_PORT, bad)]);
            assert!(
                matches!(err, Err(ConfigError::OutOfRange { .. })),
                "{} should be out of range, got {:?}",
                bad,
                err
            );
        }

        for bad in ["abc", "", "50.5"] {
            let err = resolve(&[host, (BACKEND_URL_PORT, bad)]);
            assert!(
                matches!(err, Err(ConfigError::NotAnInteger { .. })),
                "{:?} should not parse, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_path_and_timeout_overrides() {
        let config = resolve(&[
            (BACKEND_URL_HOST, "http://backend"),
            (BACKEND_URL_PORT, "8080"),
            (BACKEND_ANALYZE_PATH, "v2/analyze"),
            (BACKEND_TIMEOUT_SECS, "5"),
        ])
        .unwrap();

        assert_eq!(config.analyze_path(), "/v2/analyze");
        assert_eq!(config.analyze_url().as_str(), "http://backend:8080/v2/analyze");
        assert_eq!(config.timeout(), Duration::from_secs(5));

        let err = resolve(&[
            (BACKEND_URL_HOST, "http://backend"),
            (BACKEND_URL_PORT, "8080"),
            (BACKEND_TIMEOUT_SECS, "0"),
        ]);
        assert!(matches!(err, Err(ConfigError::OutOfRange { .. })));

        let err = resolve(&[
            (BACKEND_URL_HOST, "http://backend"),
            (BACKEND_URL_PORT, "8080"),
            (BACKEND_ANALYZE_PATH, "http://elsewhere/analyze"),
        ]);
        assert!(matches!(err, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_file_settings_are_overridden_by_env() {
        let settings = BackendSettings {
            analyze_path: Some("/from-file".to_string()),
            timeout_secs: Some(12),
        };

        let config = BackendConfig::from_lookup(
            lookup(&[(BACKEND_URL_HOST, "http://backend"), (BACKEND_URL_PORT, "80")]),
            &settings,
        )
        .unwrap();
        assert_eq!(config.analyze_path(), "/from-file");
        assert_eq!(config.timeout(), Duration::from_secs(12));

        let config = BackendConfig::from_lookup(
            lookup(&[
                (BACKEND_URL_HOST, "http://backend"),
                (BACKEND_URL_PORT, "80"),
                (BACKEND_ANALYZE_PATH, "/from-env"),
            ]),
            &settings,
        )
        .unwrap();
        assert_eq!(config.analyze_path(), "/from-env");
        assert_eq!(config.timeout(), Duration::from_secs(12));
    }
}
