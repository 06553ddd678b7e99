//! REST runtime configuration.
//!
//! Everything here is resolved once at process startup and handed to [`crate::router`]. Request
//! handlers never read environment variables.
//!
//! Each variable has a pure `*_from_env_value` parser taking the raw `Option<String>`, so the
//! parsing rules can be tested without mutating the process environment.

use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Storage directory used when `FILEDROP_STORAGE_DIR` is unset.
pub const DEFAULT_STORAGE_DIR: &str = "./uploads";

/// Listen address used when `FILEDROP_REST_ADDR` is unset.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:8080";

/// Allowed CORS origin when `FILEDROP_CORS_ORIGINS` is unset.
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Request body limit when `FILEDROP_BODY_LIMIT_BYTES` is unset (50 MiB).
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Which origins may call the file endpoints from a browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorsOrigins {
    /// `*`: any origin, without credentials
    Any,
    /// Explicit origins, with credentials allowed
    List(Vec<HeaderValue>),
}

/// REST configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct RestConfig {
    storage_dir: PathBuf,
    addr: SocketAddr,
    cors_origins: CorsOrigins,
    body_limit: usize,
}

impl RestConfig {
    /// Create a new `RestConfig`.
    pub fn new(
        storage_dir: PathBuf,
        addr: SocketAddr,
        cors_origins: CorsOrigins,
        body_limit: usize,
    ) -> ConfigResult<Self> {
        if storage_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                name: "FILEDROP_STORAGE_DIR",
                reason: "cannot be empty".into(),
            });
        }

        if body_limit == 0 {
            return Err(ConfigError::Invalid {
                name: "FILEDROP_BODY_LIMIT_BYTES",
                reason: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            storage_dir,
            addr,
            cors_origins,
            body_limit,
        })
    }

    /// Read the configuration from `FILEDROP_*` environment variables.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if any variable is set to an unparseable value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::new(
            storage_dir_from_env_value(std::env::var("FILEDROP_STORAGE_DIR").ok()),
            rest_addr_from_env_value(std::env::var("FILEDROP_REST_ADDR").ok())?,
            cors_origins_from_env_value(std::env::var("FILEDROP_CORS_ORIGINS").ok())?,
            body_limit_from_env_value(std::env::var("FILEDROP_BODY_LIMIT_BYTES").ok())?,
        )
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn cors_origins(&self) -> &CorsOrigins {
        &self.cors_origins
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the storage directory; unset or blank means [`DEFAULT_STORAGE_DIR`].
pub fn storage_dir_from_env_value(value: Option<String>) -> PathBuf {
    PathBuf::from(non_blank(value).unwrap_or_else(|| DEFAULT_STORAGE_DIR.into()))
}

/// Parse the listen address; unset or blank means [`DEFAULT_REST_ADDR`].
pub fn rest_addr_from_env_value(value: Option<String>) -> ConfigResult<SocketAddr> {
    let raw = non_blank(value).unwrap_or_else(|| DEFAULT_REST_ADDR.into());
    raw.parse().map_err(|e| ConfigError::Invalid {
        name: "FILEDROP_REST_ADDR",
        reason: format!("'{}': {}", raw, e),
    })
}

/// Parse a comma-separated origin list. `*` anywhere in the list means any origin.
pub fn cors_origins_from_env_value(value: Option<String>) -> ConfigResult<CorsOrigins> {
    let raw = non_blank(value).unwrap_or_else(|| DEFAULT_CORS_ORIGIN.into());

    let entries: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();

    if entries.contains(&"*") {
        return Ok(CorsOrigins::Any);
    }

    let origins = entries
        .into_iter()
        .map(|entry| {
            HeaderValue::from_str(entry).map_err(|e| ConfigError::Invalid {
                name: "FILEDROP_CORS_ORIGINS",
                reason: format!("'{}': {}", entry, e),
            })
        })
        .collect::<ConfigResult<Vec<_>>>()?;

    Ok(CorsOrigins::List(origins))
}

/// Parse the request body limit in bytes; unset or blank means [`DEFAULT_BODY_LIMIT_BYTES`].
pub fn body_limit_from_env_value(value: Option<String>) -> ConfigResult<usize> {
    match non_blank(value) {
        None => Ok(DEFAULT_BODY_LIMIT_BYTES),
        Some(raw) => raw.parse::<usize>().map_err(|e| ConfigError::Invalid {
            name: "FILEDROP_BODY_LIMIT_BYTES",
            reason: format!("'{}': {}", raw, e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset_or_blank() {
        assert_eq!(
            storage_dir_from_env_value(None),
            PathBuf::from(DEFAULT_STORAGE_DIR)
        );
        assert_eq!(
            storage_dir_from_env_value(Some("  ".into())),
            PathBuf::from(DEFAULT_STORAGE_DIR)
        );
        assert_eq!(
            rest_addr_from_env_value(None).unwrap(),
            "0.0.0.0:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            body_limit_from_env_value(Some(String::new())).unwrap(),
            DEFAULT_BODY_LIMIT_BYTES
        );
        assert_eq!(
            cors_origins_from_env_value(None).unwrap(),
            CorsOrigins::List(vec![HeaderValue::from_static("http://localhost:3000")])
        );
    }

    #[test]
    fn test_storage_dir_is_trimmed() {
        assert_eq!(
            storage_dir_from_env_value(Some(" /srv/drop ".into())),
            PathBuf::from("/srv/drop")
        );
    }

    #[test]
    fn test_rest_addr_rejects_garbage() {
        let err = rest_addr_from_env_value(Some("localhost".into())).unwrap_err();
        assert!(err.to_string().contains("FILEDROP_REST_ADDR"));
    }

    #[test]
    fn test_cors_origin_list() {
        let origins =
            cors_origins_from_env_value(Some("http://a.test, https://b.test,".into())).unwrap();
        assert_eq!(
            origins,
            CorsOrigins::List(vec![
                HeaderValue::from_static("http://a.test"),
                HeaderValue::from_static("https://b.test"),
            ])
        );
    }

    #[test]
    fn test_cors_wildcard() {
        assert_eq!(
            cors_origins_from_env_value(Some("http://a.test,*".into())).unwrap(),
            CorsOrigins::Any
        );
    }

    #[test]
    fn test_cors_trims_then_validates_header_values() {
        assert!(cors_origins_from_env_value(Some("http://a.test\n".into())).is_ok());
        assert!(cors_origins_from_env_value(Some("http://bad\u{7f}origin".into())).is_err());
    }

    #[test]
    fn test_body_limit_parsing() {
        assert_eq!(body_limit_from_env_value(Some("1024".into())).unwrap(), 1024);
        assert!(body_limit_from_env_value(Some("-1".into())).is_err());
        assert!(body_limit_from_env_value(Some("lots".into())).is_err());
    }

    #[test]
    fn test_new_validates() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        assert!(RestConfig::new(PathBuf::new(), addr, CorsOrigins::Any, 10).is_err());
        assert!(RestConfig::new(PathBuf::from("up"), addr, CorsOrigins::Any, 0).is_err());

        let cfg = RestConfig::new(PathBuf::from("up"), addr, CorsOrigins::Any, 10).unwrap();
        assert_eq!(cfg.storage_dir(), Path::new("up"));
        assert_eq!(cfg.addr(), addr);
        assert_eq!(cfg.cors_origins(), &CorsOrigins::Any);
        assert_eq!(cfg.body_limit(), 10);
    }
}
