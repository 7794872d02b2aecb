use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use lazy_static::lazy_static;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::PieceCid;

lazy_static! {
    pub static ref SETTINGS: Settings = Settings::new().expect("invalid configuration");
}

const SETTINGS_PATH: &str = "./piece-accessor.config.toml";
const PREFIX: &str = "PIECE_ACCESSOR";
/// Older deployments only export the bare object-store endpoint.
const LEGACY_ENDPOINT_VAR: &str = "MINIO_ENDPOINT";

const ENDPOINT_VARS: &str = "PIECE_ACCESSOR_REMOTE_ENDPOINT or MINIO_ENDPOINT";

pub const DEFAULT_ARCHIVE_EXTENSION: &str = "car";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub remote_endpoint: Option<String>,
    pub archive_extension: String,
    pub fetch_concurrency: usize,
    pub unseal_concurrency: usize,
    pub request_timeout_secs: u64,
    pub recovery_path: String,
    pub recovery_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            remote_endpoint: None,
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            // Zero disables throttling.
            fetch_concurrency: 0,
            unseal_concurrency: 0,
            request_timeout_secs: 0,
            recovery_path: "/seal/recovery".to_string(),
            recovery_url: "http://minio.com:9000/car".to_string(),
        }
    }
}

impl Settings {
    fn new() -> std::result::Result<Settings, ConfigError> {
        Config::builder()
            .add_source(File::with_name(SETTINGS_PATH).required(false))
            .add_source(Environment::with_prefix(PREFIX))
            .build()?
            .try_deserialize()
    }

    /// The configured endpoint, falling back to the legacy `MINIO_ENDPOINT` variable.
    pub fn remote_endpoint(&self) -> Option<String> {
        self.remote_endpoint
            .clone()
            .or_else(|| env::var(LEGACY_ENDPOINT_VAR).ok())
            .filter(|endpoint| !endpoint.is_empty())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Where piece archives live. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStoreConfig {
    endpoint: String,
    archive_extension: String,
    request_timeout: Option<Duration>,
}

impl RemoteStoreConfig {
    pub fn new<S: Into<String>>(endpoint: S) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(Error::MissingEndpoint(ENDPOINT_VARS));
        }
        Url::parse(&endpoint)
            .map_err(|e| Error::InvalidEndpoint(endpoint.clone(), e.to_string()))?;

        Ok(RemoteStoreConfig {
            endpoint,
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            request_timeout: None,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let endpoint = settings
            .remote_endpoint()
            .ok_or(Error::MissingEndpoint(ENDPOINT_VARS))?;

        Ok(Self::new(endpoint)?
            .with_archive_extension(settings.archive_extension.clone())
            .with_request_timeout(settings.request_timeout()))
    }

    pub fn with_archive_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.archive_extension = extension.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// `{endpoint}/{piece cid}.{extension}`; the endpoint is used verbatim.
    pub fn archive_url(&self, piece_cid: &PieceCid) -> String {
        format!("{}/{}.{}", self.endpoint, piece_cid, self.archive_extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    const PIECE_CID: &str = "baga6ea4seaqpbejbvomw3krehmpfre3he62xiz3exk45on46s5ixiunxqn2ocbq";

    #[test]
    fn archive_url_shape() {
        let config = RemoteStoreConfig::new("http://store.local:9000/car").expect("valid endpoint");
        let cid: PieceCid = PIECE_CID.parse().expect("valid cid");

        assert_eq!(
            config.archive_url(&cid),
            format!("http://store.local:9000/car/{}.car", PIECE_CID)
        );

        let config = config.with_archive_extension("tar");
        assert_eq!(
            config.archive_url(&cid),
            format!("http://store.local:9000/car/{}.tar", PIECE_CID)
        );
    }

    #[test]
    fn missing_endpoint_is_a_configuration_error() {
        let settings = Settings {
            remote_endpoint: Some(String::new()),
            ..Settings::default()
        };
        let err = RemoteStoreConfig::from_settings(&settings).expect_err("endpoint is empty");
        assert!(err.is_configuration());
        assert!(matches!(err, Error::MissingEndpoint(_)));
    }

    #[test]
    fn invalid_endpoint_is_a_configuration_error() {
        let err = RemoteStoreConfig::new("not a url").expect_err("endpoint is not a url");
        assert!(err.is_configuration());
        assert!(matches!(err, Error::InvalidEndpoint(..)));
    }

    #[test]
    fn settings_carry_extension_and_timeout() {
        let settings = Settings {
            remote_endpoint: Some("http://store.local".to_string()),
            archive_extension: "tar".to_string(),
            request_timeout_secs: 30,
            ..Settings::default()
        };

        let config = RemoteStoreConfig::from_settings(&settings).expect("valid settings");
        assert_eq!(config.endpoint(), "http://store.local");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }
}
