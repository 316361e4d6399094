//! Per-request CSP nonce.

use std::convert::Infallible;
use std::fmt;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::StatusCode;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;

use crate::TRACING_TARGET_POLICY;

/// A fresh nonce generated for one request.
///
/// The middleware inserts it as a request extension before the handler runs
/// and adds `'nonce-<value>'` to the configured directives of the response
/// policy. Handlers extract it to tag their inline `<script>` and `<style>`
/// elements.
///
/// ```rust,no_run
/// use axum::response::Html;
/// use helmet_server::CspNonce;
///
/// async fn index(nonce: CspNonce) -> Html<String> {
///     Html(format!("<script nonce=\"{nonce}\">init()</script>"))
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CspNonce(String);

impl CspNonce {
    /// Generates 128 random bits encoded as standard base64.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    /// Returns the encoded nonce.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CspNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CspNonce {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CspNonce
where
    S: Sync + Send,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or_else(|| {
            tracing::error!(
                target: TRACING_TARGET_POLICY,
                "nonce requested but no nonce directives are configured"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "content security policy nonce is not available",
            )
        })
    }
}

impl<S> OptionalFromRequestParts<S> for CspNonce
where
    S: Sync + Send,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use helmet_core::csp::DirectiveValue;

    use super::*;

    #[test]
    fn nonces_are_unique_base64() {
        let a = CspNonce::generate();
        let b = CspNonce::generate();

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 24);
        assert_eq!(STANDARD.decode(a.as_str()).unwrap().len(), 16);
    }

    #[test]
    fn nonce_is_accepted_as_source() {
        let nonce = CspNonce::generate();
        let mut value = DirectiveValue::new();
        value.add_nonce(nonce.as_str()).unwrap();

        assert_eq!(value.serialize(), format!("'nonce-{nonce}'"));
    }
}
