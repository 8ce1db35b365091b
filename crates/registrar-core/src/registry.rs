//! On-disk layout of the registry: one directory per chain identifier.
//!
//! ```text
//! <root>/<chain-id>/peers.json
//! <root>/<chain-id>/genesis.json.gz
//! <root>/<chain-id>/genesis.json.sum
//! <root>/<chain-id>/light-roots/heights.json
//! ```
//!
//! The registry is usually a git checkout, so every writer here produces
//! byte-stable output: pretty JSON, two-space indent, trailing newline.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct RegistryLayout {
    root: PathBuf,
}

impl RegistryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the paths of one chain. Chain identifiers become directory
    /// names, so anything that could escape the registry root is rejected.
    pub fn chain(&self, chain_id: &str) -> Result<ChainPaths, CoreError> {
        validate_chain_id(chain_id)?;
        let dir = self.root.join(chain_id);
        let light_roots = dir.join("light-roots");
        Ok(ChainPaths {
            peers: dir.join("peers.json"),
            heights: light_roots.join("heights.json"),
            genesis: dir.join("genesis.json.gz"),
            genesis_sum: dir.join("genesis.json.sum"),
            light_roots,
            dir,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPaths {
    pub dir: PathBuf,
    pub peers: PathBuf,
    pub light_roots: PathBuf,
    pub heights: PathBuf,
    pub genesis: PathBuf,
    pub genesis_sum: PathBuf,
}

fn validate_chain_id(chain_id: &str) -> Result<(), CoreError> {
    let well_formed = !chain_id.is_empty()
        && chain_id != "."
        && chain_id != ".."
        && chain_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if well_formed {
        Ok(())
    } else {
        Err(CoreError::InvalidConfig(format!(
            "invalid chain identifier `{chain_id}`"
        )))
    }
}

// ==============================================================================
// File Helpers
// ==============================================================================

/// Read and decode a JSON file; a missing file is `Ok(None)`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CoreError> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CoreError::persist("read", path)(e)),
    };
    serde_json::from_slice(&content)
        .map(Some)
        .map_err(|source| CoreError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Encode `value` the way every registry JSON file is laid out.
pub(crate) fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CoreError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| {
        CoreError::Io(std::io::Error::new(ErrorKind::InvalidData, e))
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CoreError> {
    write_atomic(path, &to_json_bytes(value)?)
}

/// Write `content` to a sibling temp file and rename it into place, so a
/// crash mid-write never leaves a truncated registry file behind.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(CoreError::persist("create", parent))?;
    }
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CoreError::InvalidConfig(format!("not a file path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    debug!(path = %path.display(), bytes = content.len(), "writing registry file");
    std::fs::write(&tmp, content).map_err(CoreError::persist("write", &tmp))?;
    std::fs::rename(&tmp, path).map_err(CoreError::persist("rename", path))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_dir {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    /// A unique scratch directory under the system temp dir, removed on drop.
    pub(crate) struct TestDir(pub(crate) PathBuf);

    impl TestDir {
        pub(crate) fn new(label: &str) -> Self {
            let unique = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("time must be after unix epoch")
                .as_nanos();
            let path = std::env::temp_dir().join(format!(
                "registrar-{label}-{}-{unique}",
                std::process::id()
            ));
            std::fs::create_dir_all(&path).expect("test dir must be creatable");
            Self(path)
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
}
