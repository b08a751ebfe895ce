use std::path::{Path, PathBuf};

use alloy::primitives::Bytes;
use ignore::WalkBuilder;
use scrooge_core::DeployError;
use serde::Deserialize;
use tracing::debug;

/// Compiled contract ABI and creation bytecode.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub contract_name: String,
    pub abi: serde_json::Value,
    pub bytecode: Bytes,
    /// File the artifact was read from.
    pub path: PathBuf,
}

/// On-disk layout of a Hardhat (`bytecode: "0x.."`) or Foundry
/// (`bytecode: { object: "0x.." }`) artifact.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactFile {
    #[serde(default)]
    contract_name: Option<String>,
    abi: serde_json::Value,
    bytecode: BytecodeField,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(Bytes),
    Object { object: Bytes },
}

impl BytecodeField {
    fn into_bytes(self) -> Bytes {
        match self {
            BytecodeField::Hex(b) => b,
            BytecodeField::Object { object } => object,
        }
    }
}

impl ContractArtifact {
    /// Parse an artifact file's contents. `path` is used for error messages
    /// and as the fallback contract name (its file stem).
    pub fn from_json(path: &Path, json: &str) -> Result<Self, DeployError> {
        let file: ArtifactFile = serde_json::from_str(json).map_err(|e| {
            DeployError::Artifact(format!(
                "{} is not a valid artifact (unlinked libraries leave non-hex bytecode): {e}",
                path.display()
            ))
        })?;

        let contract_name = match file.contract_name {
            Some(name) => name,
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        Ok(Self {
            contract_name,
            abi: file.abi,
            bytecode: file.bytecode.into_bytes(),
            path: path.to_path_buf(),
        })
    }

    /// Solidity types of the constructor's inputs, in order. Empty when the
    /// ABI declares no constructor.
    pub fn constructor_inputs(&self) -> Vec<String> {
        self.abi
            .as_array()
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|e| e.get("type").and_then(|t| t.as_str()) == Some("constructor"))
            })
            .and_then(|ctor| ctor.get("inputs"))
            .and_then(|inputs| inputs.as_array())
            .map(|inputs| {
                inputs
                    .iter()
                    .filter_map(|i| i.get("type").and_then(|t| t.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Interfaces and abstract contracts compile to empty bytecode.
    pub fn is_deployable(&self) -> bool {
        !self.bytecode.is_empty()
    }
}

/// Looks up compiled artifacts by contract name under a build directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the artifact for `name`, i.e. the single `<name>.json` anywhere
    /// under the root. Build output is normally git-ignored, so ignore rules
    /// are switched off for the walk.
    pub fn find(&self, name: &str) -> Result<ContractArtifact, DeployError> {
        if !self.root.is_dir() {
            return Err(DeployError::Artifact(format!(
                "artifact directory {} does not exist",
                self.root.display()
            )));
        }

        let file_name = format!("{name}.json");
        let walker = WalkBuilder::new(&self.root).standard_filters(false).build();

        let mut matches: Vec<PathBuf> = walker
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .filter(|entry| entry.file_name().to_string_lossy() == file_name)
            .map(|entry| entry.into_path())
            .collect();
        matches.sort();

        let path = match matches.as_slice() {
            [] => {
                return Err(DeployError::Artifact(format!(
                    "no artifact named {name} under {}",
                    self.root.display()
                )));
            }
            [single] => single.clone(),
            many => {
                let listed: Vec<String> = many.iter().map(|p| p.display().to_string()).collect();
                return Err(DeployError::Artifact(format!(
                    "multiple artifacts named {name}: {}",
                    listed.join(", ")
                )));
            }
        };

        debug!(contract = name, path = %path.display(), "artifact found");
        let json = std::fs::read_to_string(&path).map_err(|e| {
            DeployError::Artifact(format!("failed to read {}: {e}", path.display()))
        })?;
        ContractArtifact::from_json(&path, &json)
    }
}
