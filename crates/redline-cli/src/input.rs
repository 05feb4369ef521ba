use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::{fs, path::Path, path::PathBuf};

pub const STDIN_LABEL: &str = "-";

/// One fragment of input text plus the identity of its exact bytes.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// File path, or `-` for stdin.
    pub label: String,

    /// Decoded text. Invalid UTF-8 is replaced, never rejected.
    pub text: String,

    pub size_bytes: u64,

    /// Hex-encoded SHA-256 of the raw bytes.
    pub hash_hex: String,
}

impl Fragment {
    pub fn from_bytes(label: impl Into<String>, bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);

        Self {
            label: label.into(),
            text: String::from_utf8_lossy(bytes).into_owned(),
            size_bytes: bytes.len() as u64,
            hash_hex: hex::encode(hasher.finalize()),
        }
    }
}

/// Read a single fragment; `-` reads stdin.
pub fn read_fragment(path: &Path) -> Result<Fragment> {
    if path.as_os_str() == STDIN_LABEL {
        return read_stdin();
    }
    let bytes =
        fs::read(path).with_context(|| format!("failed to read input: {}", path.display()))?;
    Ok(Fragment::from_bytes(path.display().to_string(), &bytes))
}

pub fn read_stdin() -> Result<Fragment> {
    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .context("failed to read stdin")?;
    Ok(Fragment::from_bytes(STDIN_LABEL, &bytes))
}

/// All fragments in argument order. No paths means stdin.
pub fn read_inputs(paths: &[PathBuf]) -> Result<Vec<Fragment>> {
    if paths.is_empty() {
        return Ok(vec![read_stdin()?]);
    }
    paths.iter().map(|p| read_fragment(p)).collect()
}
