//! Source lists of a single directive.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::hash::{HashAlgorithm, is_base64_value};
use crate::{Error, Result, TRACING_TARGET_POLICY};

/// The `'self'` source keyword.
pub const SELF: &str = "'self'";
/// The `'none'` source keyword.
pub const NONE: &str = "'none'";
/// The `'unsafe-inline'` source keyword.
pub const UNSAFE_INLINE: &str = "'unsafe-inline'";
/// The `'unsafe-eval'` source keyword.
pub const UNSAFE_EVAL: &str = "'unsafe-eval'";
/// The `'strict-dynamic'` source keyword.
pub const STRICT_DYNAMIC: &str = "'strict-dynamic'";

/// Quoted keywords that are normalized to lower case on insertion.
const KEYWORDS: &[&str] = &[
    SELF,
    NONE,
    UNSAFE_INLINE,
    UNSAFE_EVAL,
    STRICT_DYNAMIC,
    "'unsafe-hashes'",
    "'report-sample'",
    "'wasm-unsafe-eval'",
    "'inline-speculation-rules'",
];

/// Ordered set of distinct source tokens for one directive.
///
/// Tokens keep their insertion order. `'none'` never shares the list with
/// another token: adding `'none'` drops everything else and adding any other
/// token drops `'none'`. An empty value is meaningful, it serializes as the
/// bare directive name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct DirectiveValue {
    tokens: Vec<String>,
}

impl DirectiveValue {
    /// Creates an empty directive value.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directive value from a list of tokens.
    ///
    /// # Errors
    ///
    /// Fails on the first token rejected by [`DirectiveValue::add_token`].
    pub fn from_tokens<I>(tokens: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut value = Self::new();
        for token in tokens {
            value.add_token(token.as_ref())?;
        }
        Ok(value)
    }

    /// Adds a source token.
    ///
    /// Surrounding whitespace is trimmed and well-known quoted keywords are
    /// lower-cased. Duplicates are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] for empty tokens and for tokens
    /// containing whitespace, `;`, `,`, control characters or non-ASCII
    /// characters. Those would split the token, end the directive, start a
    /// new policy or allow header injection.
    ///
    /// [`ErrorKind::InvalidArgument`]: crate::ErrorKind::InvalidArgument
    pub fn add_token(&mut self, token: &str) -> Result<&mut Self> {
        let token = normalize_token(token)?;
        self.push_trusted(token);
        Ok(self)
    }

    /// Adds `'unsafe-inline'`.
    pub fn add_unsafe_inline(&mut self) -> &mut Self {
        self.push_trusted(UNSAFE_INLINE);
        self
    }

    /// Adds `'unsafe-eval'`.
    pub fn add_unsafe_eval(&mut self) -> &mut Self {
        self.push_trusted(UNSAFE_EVAL);
        self
    }

    /// Adds `'self'`.
    pub fn allow_self(&mut self) -> &mut Self {
        self.push_trusted(SELF);
        self
    }

    /// Replaces every token with `'none'`.
    pub fn allow_none(&mut self) -> &mut Self {
        self.push_trusted(NONE);
        self
    }

    /// Adds a `'nonce-<value>'` source.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] if `nonce` is not base64.
    ///
    /// [`ErrorKind::InvalidArgument`]: crate::ErrorKind::InvalidArgument
    pub fn add_nonce(&mut self, nonce: &str) -> Result<&mut Self> {
        if !is_base64_value(nonce) {
            return Err(Error::invalid_argument()
                .with_message(format!("nonce '{}' is not base64", nonce.escape_debug())));
        }
        self.push_trusted(format!("'nonce-{nonce}'"));
        Ok(self)
    }

    /// Adds a `'<algorithm>-<digest>'` hash source from a base64 digest.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] if `digest` is not base64.
    ///
    /// [`ErrorKind::InvalidArgument`]: crate::ErrorKind::InvalidArgument
    pub fn add_hash(&mut self, algorithm: HashAlgorithm, digest: &str) -> Result<&mut Self> {
        if !is_base64_value(digest) {
            return Err(Error::invalid_argument()
                .with_message(format!("digest '{}' is not base64", digest.escape_debug())));
        }
        self.push_trusted(format!("'{algorithm}-{digest}'"));
        Ok(self)
    }

    /// Hashes inline `content` and adds the resulting hash source.
    pub fn add_hash_of(&mut self, algorithm: HashAlgorithm, content: &[u8]) -> &mut Self {
        let digest = algorithm.digest_base64(content);
        self.push_trusted(format!("'{algorithm}-{digest}'"));
        self
    }

    /// Removes a token, returning whether it was present.
    ///
    /// The token is canonicalized like [`DirectiveValue::add_token`], so
    /// `'SELF'` removes `'self'`. A token that could never be added is
    /// never present.
    pub fn remove_token(&mut self, token: &str) -> bool {
        let Ok(token) = normalize_token(token) else {
            return false;
        };

        let len = self.tokens.len();
        self.tokens.retain(|t| *t != token);
        self.tokens.len() != len
    }

    /// Removes every token, leaving a declared-but-empty value.
    pub fn clear(&mut self) -> &mut Self {
        self.tokens.clear();
        self
    }

    /// Returns true if the exact token is present.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Returns the tokens in serialization order.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Returns an iterator over the tokens.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Returns the number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if no token is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the tokens joined by single spaces.
    #[must_use]
    pub fn serialize(&self) -> String {
        self.tokens.join(" ")
    }

    /// Inserts an already validated token, applying the `'none'` rule.
    pub(crate) fn push_trusted(&mut self, token: impl Into<String>) {
        let token = token.into();

        if token == NONE {
            if !self.tokens.is_empty() && self.tokens != [NONE] {
                tracing::trace!(
                    target: TRACING_TARGET_POLICY,
                    dropped = self.tokens.len(),
                    "'none' replaced existing sources"
                );
            }
            self.tokens.clear();
            self.tokens.push(token);
            return;
        }

        self.tokens.retain(|t| t != NONE);
        if !self.tokens.contains(&token) {
            self.tokens.push(token);
        }
    }
}

impl fmt::Display for DirectiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens = self.tokens.iter();
        if let Some(first) = tokens.next() {
            f.write_str(first)?;
            for token in tokens {
                write!(f, " {token}")?;
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<String>> for DirectiveValue {
    type Error = Error;

    fn try_from(tokens: Vec<String>) -> Result<Self> {
        Self::from_tokens(tokens)
    }
}

impl From<DirectiveValue> for Vec<String> {
    fn from(value: DirectiveValue) -> Self {
        value.tokens
    }
}

/// Validates a raw token and returns its canonical form.
pub(crate) fn normalize_token(raw: &str) -> Result<String> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(Error::invalid_argument().with_message("source token is empty"));
    }

    if let Some(c) = token.chars().find(|&c| !is_token_char(c)) {
        return Err(Error::invalid_argument().with_message(format!(
            "source token '{}' contains forbidden character {c:?}",
            token.escape_debug()
        )));
    }

    let keyword = KEYWORDS
        .iter()
        .find(|keyword| keyword.eq_ignore_ascii_case(token));

    Ok(keyword.map_or_else(|| token.to_owned(), |keyword| (*keyword).to_owned()))
}

/// Visible ASCII except the policy (`;`) and policy-list (`,`) separators.
fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && c != ';' && c != ','
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order_and_deduplicates() {
        let mut value = DirectiveValue::new();
        value
            .allow_self()
            .add_token("https://cdn.example.com")
            .unwrap()
            .allow_self();
        value.add_token("https://cdn.example.com").unwrap();

        assert_eq!(value.serialize(), "'self' https://cdn.example.com");
        assert_eq!(value.len(), 2);
    }

    #[test]
    fn host_patterns_are_case_sensitive() {
        let value =
            DirectiveValue::from_tokens(["https://CDN.example.com", "https://cdn.example.com"])
                .unwrap();
        assert_eq!(value.len(), 2);
    }

    #[test]
    fn keywords_are_normalized() {
        let value = DirectiveValue::from_tokens(["'SELF'", "  'Unsafe-Inline' ", "'self'"]).unwrap();
        assert_eq!(value.tokens(), [SELF, UNSAFE_INLINE]);
    }

    #[test]
    fn none_replaces_existing_tokens() {
        let mut value = DirectiveValue::from_tokens([SELF, "https:"]).unwrap();
        value.allow_none();
        assert_eq!(value.serialize(), "'none'");
    }

    #[test]
    fn token_after_none_removes_none() {
        let mut value = DirectiveValue::new();
        value.allow_none().allow_self();
        assert_eq!(value.serialize(), "'self'");

        let mut value = DirectiveValue::new();
        value.add_token("'NONE'").unwrap();
        value.add_token("data:").unwrap();
        assert_eq!(value.serialize(), "data:");
    }

    #[test]
    fn rejects_header_breaking_tokens() {
        let mut value = DirectiveValue::new();
        for bad in [
            "",
            "   ",
            "a;b",
            "a,b",
            "two tokens",
            "evil\r\nX-Injected: 1",
            "tab\there",
            "caf\u{e9}",
        ] {
            let error = value.add_token(bad).unwrap_err();
            assert!(error.is_invalid_argument(), "accepted {bad:?}");
        }
        assert!(value.is_empty());
    }

    #[test]
    fn serialized_tokens_split_back_to_the_same_list() {
        let tokens = [
            "'self'",
            "https://*.example.com:443",
            "data:",
            "'sha256-abc='",
            "blob:",
        ];
        let value = DirectiveValue::from_tokens(tokens).unwrap();
        let serialized = value.serialize();
        let split: Vec<_> = serialized.split(' ').collect();
        assert_eq!(split, tokens);
    }

    #[test]
    fn nonce_and_hash_sources() {
        let mut value = DirectiveValue::new();
        value
            .add_nonce("r4nd0m+/=")
            .unwrap()
            .add_hash(HashAlgorithm::Sha384, "AbC_-1")
            .unwrap()
            .add_hash_of(HashAlgorithm::Sha256, b"");

        assert_eq!(
            value.serialize(),
            "'nonce-r4nd0m+/=' 'sha384-AbC_-1' \
             'sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU='"
        );

        assert!(value.add_nonce("not base64!").is_err());
        assert!(value.add_hash(HashAlgorithm::Sha256, "").is_err());
    }

    #[test]
    fn remove_canonicalizes_keywords() {
        let mut value = DirectiveValue::new();
        value.add_token("'SELF'").unwrap();
        value.add_token(" https://cdn.example.com ").unwrap();

        assert!(value.remove_token("'Self'"));
        assert!(value.remove_token("https://cdn.example.com "));
        assert!(value.is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let mut value = DirectiveValue::from_tokens([SELF, "https:"]).unwrap();
        assert!(value.remove_token("https:"));
        assert!(!value.remove_token("https:"));
        assert!(value.contains(SELF));

        value.clear();
        assert!(value.is_empty());
        assert!(!value.remove_token("a;b"));
        assert_eq!(value.serialize(), "");
        assert_eq!(value.to_string(), "");
    }

    #[test]
    fn display_matches_serialize() {
        let value = DirectiveValue::from_tokens([SELF, UNSAFE_EVAL]).unwrap();
        assert_eq!(value.to_string(), value.serialize());
    }

    #[test]
    fn deserialization_validates_tokens() {
        let value: DirectiveValue = serde_json::from_str(r#"["'self'", "'self'"]"#).unwrap();
        assert_eq!(value.tokens(), [SELF]);

        assert!(serde_json::from_str::<DirectiveValue>(r#"["a;b"]"#).is_err());
    }
}
