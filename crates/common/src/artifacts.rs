//! Compiled contract artifacts.
//!
//! Build directories contain one JSON file per compiled contract. Apart from
//! the contract name and the per-network deployment addresses the contents are
//! opaque: every other field is kept as-is so that it can be forwarded to the
//! remote API without loss.

use std::{
    collections::BTreeMap,
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
};

use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use walkdir::WalkDir;

/// Errors that may occur while reading the build directory.
#[derive(Debug, Display, From, Error)]
pub enum ArtifactError {
    /// IO-related error.
    Io(io::Error),

    /// Unable to list the build directory.
    #[display(fmt = "unable to read build directory: {}", _0)]
    WalkDir(walkdir::Error),

    /// Artifact file is not a valid contract JSON.
    #[from(ignore)]
    #[display(fmt = "unable to parse artifact {}: {}", "path.display()", source)]
    Json {
        /// Path of the malformed artifact.
        path: PathBuf,

        /// Underlying parsing error.
        source: serde_json::Error,
    },
}

/// A single compiled contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Contract name.
    #[serde(rename = "contractName")]
    pub name: String,

    /// Known deployments, keyed by network identifier.
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkDeployment>,

    /// Remaining artifact fields (ABI, bytecode, sources, compiler info).
    #[serde(flatten)]
    pub artifact: Map<String, Value>,
}

impl ContractRecord {
    /// Contract was deployed to at least one network.
    ///
    /// Contracts that aren't bound to any network are library contracts.
    pub fn is_network_bound(&self) -> bool {
        !self.networks.is_empty()
    }
}

/// Contract deployment on a single network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDeployment {
    /// Deployed contract address, in the casing found in the artifact.
    #[serde(default)]
    pub address: String,

    /// Remaining deployment fields (transaction hash, events, links).
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Read all contract artifacts located directly inside `build_dir`.
///
/// Only files with a `.json` extension are parsed; files are visited in name order.
/// If `network_ids` is not empty, deployments on networks outside of it are dropped
/// from every returned record.
pub fn read_contracts(
    build_dir: &Path,
    network_ids: &[String],
) -> Result<Vec<ContractRecord>, ArtifactError> {
    let mut contracts = Vec::new();

    let entries = WalkDir::new(build_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in entries {
        let entry = entry?;

        if !entry.file_type().is_file()
            || entry.path().extension().and_then(OsStr::to_str) != Some("json")
        {
            continue;
        }

        let data = fs::read(entry.path())?;

        let mut contract: ContractRecord =
            serde_json::from_slice(&data).map_err(|source| ArtifactError::Json {
                path: entry.path().to_path_buf(),
                source,
            })?;

        if !network_ids.is_empty() {
            contract
                .networks
                .retain(|network_id, _| network_ids.contains(network_id));
        }

        contracts.push(contract);
    }

    Ok(contracts)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::{read_contracts, ArtifactError};

    fn build_dir() -> TempDir {
        let dir = tempfile::tempdir().expect("unable to create build directory");

        fs::write(
            dir.path().join("Token.json"),
            json!({
                "contractName": "Token",
                "abi": [],
                "bytecode": "0x6080",
                "networks": {
                    "1": { "address": "0xAbC", "transactionHash": "0x01" },
                    "4": { "address": "0xdef" },
                    "5777": { "address": "0x123" }
                }
            })
            .to_string(),
        )
        .unwrap();

        fs::write(
            dir.path().join("SafeMath.json"),
            json!({
                "contractName": "SafeMath",
                "abi": [],
                "networks": {}
            })
            .to_string(),
        )
        .unwrap();

        fs::write(dir.path().join("README.md"), "not an artifact").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        dir
    }

    #[test]
    fn reads_all_networks_without_filter() {
        let dir = build_dir();

        let contracts = read_contracts(dir.path(), &[]).unwrap();

        assert_eq!(contracts.len(), 2);
        assert_eq!(contracts[0].name, "SafeMath");
        assert!(!contracts[0].is_network_bound());
        assert_eq!(contracts[1].name, "Token");
        assert_eq!(contracts[1].networks.len(), 3);
        assert_eq!(contracts[1].networks["1"].address, "0xAbC");
    }

    #[test]
    fn drops_networks_outside_of_filter() {
        let dir = build_dir();

        let contracts =
            read_contracts(dir.path(), &[String::from("4"), String::from("1")]).unwrap();

        let token = &contracts[1];
        assert_eq!(
            token.networks.keys().collect::<Vec<_>>(),
            vec!["1", "4"]
        );
    }

    #[test]
    fn unknown_networks_unbind_contract() {
        let dir = build_dir();

        let contracts = read_contracts(dir.path(), &[String::from("42")]).unwrap();

        assert_eq!(contracts.len(), 2);
        assert!(contracts.iter().all(|contract| !contract.is_network_bound()));
    }

    #[test]
    fn keeps_opaque_fields() {
        let dir = build_dir();

        let contracts = read_contracts(dir.path(), &[]).unwrap();
        let token = serde_json::to_value(&contracts[1]).unwrap();

        assert_eq!(token["contractName"], "Token");
        assert_eq!(token["bytecode"], "0x6080");
        assert_eq!(token["networks"]["1"]["transactionHash"], "0x01");
    }

    #[test]
    fn malformed_artifact() {
        let dir = build_dir();
        fs::write(dir.path().join("Broken.json"), "{").unwrap();

        let error = read_contracts(dir.path(), &[]).unwrap_err();

        assert!(
            matches!(error, ArtifactError::Json { ref path, .. } if path.ends_with("Broken.json"))
        );
    }

    #[test]
    fn missing_build_directory() {
        let dir = tempfile::tempdir().unwrap();

        let error = read_contracts(&dir.path().join("build"), &[]).unwrap_err();

        assert!(matches!(error, ArtifactError::WalkDir(_)));
    }
}
