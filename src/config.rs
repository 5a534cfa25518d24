//! TOML configuration for the greeter binaries.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_MAX_GROUP_FILE_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_BUNDLE_FILE_SIZE: u64 = 1024 * 1024;
const DEFAULT_EPOCH: &str = "epoch-1";

/// Configuration for proving and verifying greetings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub group: GroupConfig,
    #[serde(default)]
    pub circuit: CircuitConfig,
    #[serde(default)]
    pub submit: SubmitConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
}

/// Where the published commitment list lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default = "default_group_file")]
    pub file: PathBuf,
    #[serde(default = "default_max_group_file_size")]
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitConfig {
    #[serde(default = "default_circuit_k")]
    pub k: u32,
    #[serde(default = "default_tree_depth")]
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitConfig {
    /// Scope value that partitions one-signal-per-identity. Per-epoch in
    /// this deployment; bump it to open a new signaling window.
    #[serde(default = "default_epoch")]
    pub epoch: String,
    #[serde(default = "default_bundle_output")]
    pub output_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    #[serde(default = "default_nullifier_store")]
    pub nullifier_store: PathBuf,
    #[serde(default = "default_max_bundle_file_size")]
    pub max_bundle_file_size: u64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            file: default_group_file(),
            max_file_size: DEFAULT_MAX_GROUP_FILE_SIZE,
        }
    }
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            k: default_circuit_k(),
            depth: default_tree_depth(),
        }
    }
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            epoch: DEFAULT_EPOCH.to_string(),
            output_file: default_bundle_output(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            nullifier_store: default_nullifier_store(),
            max_bundle_file_size: DEFAULT_MAX_BUNDLE_FILE_SIZE,
        }
    }
}

fn default_group_file() -> PathBuf {
    PathBuf::from("group_commitments.txt")
}

fn default_max_group_file_size() -> u64 {
    DEFAULT_MAX_GROUP_FILE_SIZE
}

fn default_circuit_k() -> u32 {
    crate::CIRCUIT_K
}

fn default_tree_depth() -> usize {
    crate::TREE_DEPTH
}

fn default_epoch() -> String {
    DEFAULT_EPOCH.to_string()
}

fn default_bundle_output() -> PathBuf {
    PathBuf::from("greeting.proof.json")
}

fn default_nullifier_store() -> PathBuf {
    PathBuf::from("spent_nullifiers.txt")
}

fn default_max_bundle_file_size() -> u64 {
    DEFAULT_MAX_BUNDLE_FILE_SIZE
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn load_from_file_or_default(path: Option<&PathBuf>) -> Self {
        match path {
            Some(path) => Self::load_from_file(path).unwrap_or_default(),
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.circuit.k, crate::CIRCUIT_K);
        assert_eq!(config.circuit.depth, crate::TREE_DEPTH);
        assert_eq!(config.submit.epoch, "epoch-1");
        assert_eq!(config.group.max_file_size, DEFAULT_MAX_GROUP_FILE_SIZE);
    }

    #[test]
    fn test_serialize_deserialize_config() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.submit.epoch, deserialized.submit.epoch);
        assert_eq!(config.circuit.depth, deserialized.circuit.depth);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config_toml = r#"
            [submit]
            epoch = "epoch-7"

            [circuit]
            depth = 8
        "#;

        let config: Config = toml::from_str(config_toml).unwrap();
        assert_eq!(config.submit.epoch, "epoch-7");
        assert_eq!(config.circuit.depth, 8);
        assert_eq!(config.circuit.k, crate::CIRCUIT_K);
        assert_eq!(
            config.verifier.nullifier_store,
            PathBuf::from("spent_nullifiers.txt")
        );
    }
}
