pub mod vrf;
pub use vrf::{VrfBinding, VrfConfig, VrfDiff, vrf_diff};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("vrf {vrf:?}: invalid rd {rd:?}")]
    InvalidRd { vrf: String, rd: String },
    #[error("vrf {vrf:?}: vni must be non-zero")]
    ZeroVni { vrf: String },
    #[error("vrf {vrf:?}: no route-targets after both-rts fallback")]
    NoRouteTargets { vrf: String },
    #[error("vrf {vrf:?}: invalid route-target {rt:?}")]
    InvalidRouteTarget { vrf: String, rt: String },
    #[error("duplicate rd {rd:?} (vrfs {first:?} and {second:?})")]
    DuplicateRd {
        rd: String,
        first: String,
        second: String,
    },
}

fn default_socket() -> PathBuf {
    PathBuf::from("/var/run/dcigw-bgp.sock")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_socket")]
    pub socket: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            socket: default_socket(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub vrfs: Vec<VrfConfig>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate every VRF stanza and check RD uniqueness across bindings.
    pub fn bindings(&self) -> Result<Vec<VrfBinding>, ConfigError> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        let mut bindings = Vec::with_capacity(self.vrfs.len());
        for cfg in &self.vrfs {
            if let Some(first) = seen.insert(cfg.rd.as_str(), cfg.name.as_str()) {
                return Err(ConfigError::DuplicateRd {
                    rd: cfg.rd.clone(),
                    first: first.to_string(),
                    second: cfg.name.clone(),
                });
            }
            bindings.push(VrfBinding::from_config(cfg)?);
        }
        Ok(bindings)
    }
}
