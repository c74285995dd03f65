//! Branch-scoped feature identifier derivation.
//!
//! A feature's identity is its lowercased (branch, group, title) tuple. The
//! derived key is the lowercased branch in cleartext, a `/` separator, and a
//! 128-bit digest of the full tuple rendered as a UUID. Downstream consumers
//! key off the cleartext branch prefix, so the prefix is not folded away even
//! though the branch is also part of the hash input. A consequence worth
//! knowing: renaming a branch changes every identifier in it.

use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Separator between the identity components in the hash input, and between
/// the cleartext branch prefix and the digest in the rendered identifier.
pub const IDENTIFIER_SEPARATOR: char = '/';

/// Derive the stable store key for a feature at (branch, group, title).
///
/// Deterministic and case-insensitive: re-deriving with any casing of the
/// same components yields the identical identifier, which is what turns a
/// re-upload into an overwrite instead of a duplicate.
///
/// Empty or all-whitespace components are a caller contract violation and
/// are rejected before any hashing.
pub fn derive_identifier(branch: &str, group: &str, title: &str) -> Result<String> {
    validate_component("branch", branch)?;
    validate_component("group", group)?;
    validate_component("title", title)?;

    let branch = branch.to_lowercase();
    let canonical = format!(
        "{}{sep}{}{sep}{}",
        branch,
        group.to_lowercase(),
        title.to_lowercase(),
        sep = IDENTIFIER_SEPARATOR
    );

    let digest = Sha256::digest(canonical.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    let rendered = Uuid::from_bytes(bytes);

    Ok(format!("{}{}{}", branch, IDENTIFIER_SEPARATOR, rendered))
}

/// Split an identifier into its cleartext branch prefix and digest portion.
pub fn split_identifier(identifier: &str) -> Result<(&str, &str)> {
    identifier
        .split_once(IDENTIFIER_SEPARATOR)
        .filter(|(branch, digest)| !branch.is_empty() && !digest.is_empty())
        .ok_or_else(|| {
            AppError::Validation(format!("malformed feature identifier: {}", identifier))
        })
}

/// The key prefix shared by every feature in a branch.
pub fn branch_prefix(branch: &str) -> String {
    format!("{}{}", branch.to_lowercase(), IDENTIFIER_SEPARATOR)
}

fn validate_component(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "feature {} must not be empty",
            name
        )));
    }
    Ok(())
}
