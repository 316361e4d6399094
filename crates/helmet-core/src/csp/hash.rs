//! Hash sources for inline scripts and styles.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use strum::{AsRefStr, Display, IntoStaticStr};

/// Digest algorithm of a CSP hash source (`'sha256-…'`).
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Returns the base64-encoded digest of `content`.
    #[must_use]
    pub fn digest_base64(self, content: &[u8]) -> String {
        match self {
            Self::Sha256 => STANDARD.encode(sha2::Sha256::digest(content)),
            Self::Sha384 => STANDARD.encode(sha2::Sha384::digest(content)),
            Self::Sha512 => STANDARD.encode(sha2::Sha512::digest(content)),
        }
    }
}

/// Returns true if `value` matches the CSP `base64-value` grammar.
///
/// Both the standard and the URL-safe alphabets are accepted, with up to two
/// trailing `=` padding characters.
pub(crate) fn is_base64_value(value: &str) -> bool {
    let body = value.trim_end_matches('=');
    let padding = value.len() - body.len();

    !body.is_empty()
        && padding <= 2
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'-' | b'_'))
}
