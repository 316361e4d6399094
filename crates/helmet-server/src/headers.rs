//! Rendering policies into response headers.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use helmet_core::csp::CspPolicy;
use helmet_core::{FrameOptionsPolicy, X_FRAME_OPTIONS};

use crate::TRACING_TARGET_HEADERS;

/// Header name/value pairs computed for one response.
///
/// The CSP value is serialized once and repeated under the standard header
/// name and both legacy names. An empty policy produces no CSP headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl PolicyHeaders {
    /// Renders `policy` and `frame_options` into header pairs.
    pub fn render(policy: &CspPolicy, frame_options: &FrameOptionsPolicy) -> Self {
        let mut headers = Vec::with_capacity(4);

        if !policy.is_empty() {
            let csp = policy.serialize();
            if let Some(value) = to_header_value(&csp) {
                for name in policy.header_names() {
                    if let Some(name) = to_header_name(name) {
                        headers.push((name, value.clone()));
                    }
                }
            }
        }

        if let (Some(name), Some(value)) = (
            to_header_name(X_FRAME_OPTIONS),
            to_header_value(&frame_options.serialize()),
        ) {
            headers.push((name, value));
        }

        Self { headers }
    }

    /// Sets every header on `target`, replacing existing values.
    pub fn apply(self, target: &mut HeaderMap) {
        for (name, value) in self.headers {
            target.insert(name, value);
        }
    }

    /// Returns the value rendered for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(header, _)| header.as_str().eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Returns the rendered pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(name, value)| (name, value))
    }

    /// Returns the number of rendered headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if nothing was rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

fn to_header_name(name: &'static str) -> Option<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .inspect_err(|error| {
            tracing::error!(
                target: TRACING_TARGET_HEADERS,
                header = name,
                error = %error,
                "invalid header name"
            );
        })
        .ok()
}

fn to_header_value(value: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(value)
        .inspect_err(|error| {
            tracing::error!(
                target: TRACING_TARGET_HEADERS,
                value = value,
                error = %error,
                "invalid header value"
            );
        })
        .ok()
}
