//! Per-response header decision.
//!
//! This is the only branching policy in the crate: whether a response gets
//! security policy headers at all, and which [`CspPolicy`] instance is used.

use std::borrow::Cow;

use axum::http::{Response, StatusCode, header};
use helmet_core::csp::{CspPolicy, Directive};

/// Media type that receives policy headers.
pub const TEXT_HTML: &str = "text/html";

/// Directives that get `'unsafe-inline'` on development error pages.
pub const RELAXED_DIRECTIVES: [Directive; 2] = [Directive::StyleSrc, Directive::ScriptSrc];

/// Response metadata consulted at response start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseMeta<'a> {
    /// Raw `Content-Type` header value, if any.
    pub content_type: Option<&'a str>,
    /// Response status code.
    pub status: StatusCode,
    /// Whether the application runs in development mode.
    pub development: bool,
}

impl<'a> ResponseMeta<'a> {
    /// Creates metadata from raw parts.
    pub const fn new(content_type: Option<&'a str>, status: StatusCode, development: bool) -> Self {
        Self {
            content_type,
            status,
            development,
        }
    }

    /// Reads the status and content type of `response`.
    ///
    /// A content type that is not valid visible ASCII is treated as absent.
    pub fn from_response<B>(response: &'a Response<B>, development: bool) -> Self {
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());

        Self::new(content_type, response.status(), development)
    }

    /// Returns the media type with parameters stripped, e.g. `text/html`
    /// for `text/html; charset=utf-8`.
    #[must_use]
    pub fn media_type(&self) -> Option<&'a str> {
        self.content_type.map(|content_type| {
            content_type
                .split_once(';')
                .map_or(content_type, |(media_type, _)| media_type)
                .trim()
        })
    }

    /// Returns true if the media type is `text/html`, ignoring case.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.media_type()
            .is_some_and(|media_type| media_type.eq_ignore_ascii_case(TEXT_HTML))
    }

    /// Returns true if the response is a development-mode `500` page.
    ///
    /// Other 5xx statuses, such as a proxy's `502`, keep the base policy.
    #[must_use]
    pub fn is_development_error(&self) -> bool {
        self.development && self.status == StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Outcome of the per-response decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseDecision<'a> {
    /// Leave the response untouched.
    Skip,
    /// Emit headers for the policy: borrowed for the shared base policy,
    /// owned for a per-response variant.
    Emit(Cow<'a, CspPolicy>),
}

impl<'a> ResponseDecision<'a> {
    /// Decides whether and with which policy headers are emitted.
    ///
    /// Non-HTML responses are skipped. Development-mode `500` pages get a
    /// clone of `base` with `'unsafe-inline'` added to `style-src` and
    /// `script-src`, so inline diagnostics on error pages render. Every other
    /// HTML response borrows `base` unchanged.
    pub fn decide(meta: &ResponseMeta<'_>, base: &'a CspPolicy) -> Self {
        if !meta.is_html() {
            return Self::Skip;
        }

        if meta.is_development_error() {
            return Self::Emit(Cow::Owned(base.with_unsafe_inline(&RELAXED_DIRECTIVES)));
        }

        Self::Emit(Cow::Borrowed(base))
    }

    /// Returns the selected policy, if headers are emitted.
    #[must_use]
    pub fn policy(&self) -> Option<&CspPolicy> {
        match self {
            Self::Skip => None,
            Self::Emit(policy) => Some(&**policy),
        }
    }

    /// Returns true if a per-response variant was derived.
    #[must_use]
    pub fn is_relaxed(&self) -> bool {
        matches!(self, Self::Emit(Cow::Owned(_)))
    }

    /// Consumes the decision and returns the selected policy.
    #[must_use]
    pub fn into_policy(self) -> Option<Cow<'a, CspPolicy>> {
        match self {
            Self::Skip => None,
            Self::Emit(policy) => Some(policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use helmet_core::csp::SELF;

    use super::*;

    fn base_policy() -> CspPolicy {
        CspPolicy::new()
            .with_directive(Directive::DefaultSrc, [SELF])
            .unwrap()
            .with_directive(Directive::ScriptSrc, [SELF])
            .unwrap()
    }

    #[test]
    fn media_type_strips_parameters() {
        let meta = ResponseMeta::new(Some(" text/HTML ; charset=utf-8"), StatusCode::OK, false);
        assert_eq!(meta.media_type(), Some("text/HTML"));
        assert!(meta.is_html());
    }

    #[test]
    fn missing_content_type_is_not_html() {
        let meta = ResponseMeta::new(None, StatusCode::OK, false);
        assert!(!meta.is_html());
    }

    #[test]
    fn html_prefix_is_not_html() {
        let meta = ResponseMeta::new(Some("text/html-sandboxed"), StatusCode::OK, false);
        assert!(!meta.is_html());
    }

    #[test]
    fn non_html_is_skipped() {
        let base = base_policy();
        let meta = ResponseMeta::new(Some("application/json"), StatusCode::OK, false);
        let decision = ResponseDecision::decide(&meta, &base);

        assert_eq!(decision, ResponseDecision::Skip);
        assert!(decision.policy().is_none());
    }

    #[test]
    fn html_uses_base_policy() {
        let base = base_policy();
        let meta = ResponseMeta::new(Some("text/html"), StatusCode::OK, false);
        let decision = ResponseDecision::decide(&meta, &base);

        assert!(!decision.is_relaxed());
        assert_eq!(
            decision.policy().map(CspPolicy::serialize).as_deref(),
            Some("default-src 'self'; script-src 'self'")
        );
    }

    #[test]
    fn production_server_error_uses_base_policy() {
        let base = base_policy();
        let meta = ResponseMeta::new(Some("text/html"), StatusCode::INTERNAL_SERVER_ERROR, false);
        assert!(!ResponseDecision::decide(&meta, &base).is_relaxed());
    }

    #[test]
    fn development_success_uses_base_policy() {
        let base = base_policy();
        let meta = ResponseMeta::new(Some("text/html"), StatusCode::NOT_FOUND, true);
        assert!(!ResponseDecision::decide(&meta, &base).is_relaxed());
    }

    #[test]
    fn development_server_error_relaxes_clone() {
        let base = base_policy();
        let meta = ResponseMeta::new(Some("text/html"), StatusCode::INTERNAL_SERVER_ERROR, true);
        let decision = ResponseDecision::decide(&meta, &base);

        assert!(decision.is_relaxed());
        assert_eq!(
            decision.policy().map(CspPolicy::serialize).as_deref(),
            Some(
                "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'unsafe-inline'"
            )
        );
        assert_eq!(base.get(Directive::ScriptSrc).unwrap().tokens(), [SELF]);
        assert!(base.get(Directive::StyleSrc).is_none());
    }

    #[test]
    fn development_other_server_error_uses_base_policy() {
        let base = base_policy();
        for status in [StatusCode::BAD_GATEWAY, StatusCode::SERVICE_UNAVAILABLE] {
            let meta = ResponseMeta::new(Some("text/html"), status, true);
            assert!(!meta.is_development_error());
            assert!(!ResponseDecision::decide(&meta, &base).is_relaxed());
        }
    }

    #[test]
    fn reads_metadata_from_response() {
        let response = Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(())
            .unwrap();

        let meta = ResponseMeta::from_response(&response, true);
        assert!(meta.is_html());
        assert!(meta.is_development_error());

        let response = Response::builder()
            .status(StatusCode::BAD_GATEWAY)
            .header(header::CONTENT_TYPE, "text/html")
            .body(())
            .unwrap();
        assert!(!ResponseMeta::from_response(&response, true).is_development_error());
    }
}
