//! Index identity: the base name and the two aliases derived from it

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

const MAX_INDEX_NAME_BYTES: usize = 255;
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ' ', ':'];

/// Logical index plus its read and write aliases
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexIdentity {
    pub base_name: String,
    pub read_alias: String,
    pub write_alias: String,
}

/// Derives an [`IndexIdentity`] from a base name.
///
/// Implementations must be deterministic, and the aliases must differ from
/// the base name and from each other.
pub trait IdentityDeriver: Send + Sync {
    fn derive(&self, base_name: &str) -> Result<IndexIdentity>;
}

/// Appends fixed suffixes to the base name
#[derive(Debug, Clone)]
pub struct SuffixIdentityDeriver {
    read_suffix: String,
    write_suffix: String,
}

impl SuffixIdentityDeriver {
    pub fn new(read_suffix: impl Into<String>, write_suffix: impl Into<String>) -> Result<Self> {
        let read_suffix = read_suffix.into();
        let write_suffix = write_suffix.into();

        if read_suffix.is_empty() || write_suffix.is_empty() {
            return Err(Error::Config("alias suffixes must not be empty".to_string()));
        }
        if read_suffix == write_suffix {
            return Err(Error::Config(format!(
                "read and write alias suffixes are both '{read_suffix}'"
            )));
        }

        Ok(Self {
            read_suffix,
            write_suffix,
        })
    }
}

impl Default for SuffixIdentityDeriver {
    fn default() -> Self {
        Self {
            read_suffix: "-read".to_string(),
            write_suffix: "-write".to_string(),
        }
    }
}

impl IdentityDeriver for SuffixIdentityDeriver {
    fn derive(&self, base_name: &str) -> Result<IndexIdentity> {
        validate_index_name(base_name)?;

        let identity = IndexIdentity {
            base_name: base_name.to_string(),
            read_alias: format!("{base_name}{}", self.read_suffix),
            write_alias: format!("{base_name}{}", self.write_suffix),
        };
        validate_index_name(&identity.read_alias)?;
        validate_index_name(&identity.write_alias)?;

        Ok(identity)
    }
}

/// Check a name against the engine's index naming rules
pub fn validate_index_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::Validation(format!(
            "invalid index name '{name}': {reason}"
        )))
    };

    if name.is_empty() {
        return invalid("must not be empty");
    }
    if name == "." || name == ".." {
        return invalid("must not be '.' or '..'");
    }
    if name.len() > MAX_INDEX_NAME_BYTES {
        return invalid("longer than 255 bytes");
    }
    if name.starts_with(['-', '_', '+']) {
        return invalid("must not start with '-', '_' or '+'");
    }
    if name.chars().any(char::is_uppercase) {
        return invalid("must be lowercase");
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return invalid(&format!("contains forbidden character '{c}'"));
    }
    Ok(())
}
