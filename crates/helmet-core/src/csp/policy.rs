//! Content-Security-Policy aggregate and serializer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use super::directive::Directive;
use super::value::{DirectiveValue, normalize_token};
use crate::{Error, FrameOptionsPolicy, Result};

/// Enforcing policy header.
pub const CONTENT_SECURITY_POLICY: &str = "Content-Security-Policy";
/// Report-only policy header.
pub const CONTENT_SECURITY_POLICY_REPORT_ONLY: &str = "Content-Security-Policy-Report-Only";
/// Legacy Gecko/IE policy header.
pub const X_CONTENT_SECURITY_POLICY: &str = "X-Content-Security-Policy";
/// Legacy Gecko/IE report-only policy header.
pub const X_CONTENT_SECURITY_POLICY_REPORT_ONLY: &str = "X-Content-Security-Policy-Report-Only";
/// Legacy WebKit policy header.
pub const X_WEBKIT_CSP: &str = "X-WebKit-CSP";
/// Legacy WebKit report-only policy header.
pub const X_WEBKIT_CSP_REPORT_ONLY: &str = "X-WebKit-CSP-Report-Only";

/// A complete Content-Security-Policy.
///
/// Directives are stored by [`Directive`] in canonical order, so
/// [`CspPolicy::serialize`] is deterministic regardless of the order in which
/// directives were configured. A directive that was never touched is absent
/// from the output; one that was touched but holds no tokens is emitted as its
/// bare name.
///
/// A policy shared between requests must not be mutated. Derive a variant
/// with [`Clone::clone`] (a deep copy, no state is shared) and mutate that.
///
/// # Example
///
/// ```rust
/// use helmet_core::csp::{CspPolicy, Directive};
///
/// let mut policy = CspPolicy::new();
/// policy.directive(Directive::ScriptSrc).allow_self();
/// policy.directive(Directive::DefaultSrc).allow_self();
///
/// assert_eq!(policy.serialize(), "default-src 'self'; script-src 'self'");
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[must_use = "policies do nothing unless applied to a response"]
pub struct CspPolicy {
    directives: BTreeMap<Directive, DirectiveValue>,
    report_only: bool,
    #[serde(
        deserialize_with = "deserialize_report_uri",
        skip_serializing_if = "Option::is_none"
    )]
    report_uri: Option<Url>,
    #[serde(
        deserialize_with = "deserialize_report_to",
        skip_serializing_if = "Option::is_none"
    )]
    report_to: Option<String>,
    upgrade_insecure_requests: bool,
    block_all_mixed_content: bool,
}

impl CspPolicy {
    /// Creates an empty policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a locked-down starting policy.
    ///
    /// Everything is restricted to the page's own origin, plugins are
    /// disabled and the page cannot be framed.
    pub fn strict() -> Self {
        let mut policy = Self::new();
        policy.directive(Directive::DefaultSrc).allow_self();
        policy.directive(Directive::BaseUri).allow_self();
        policy.directive(Directive::FormAction).allow_self();
        policy.directive(Directive::FrameAncestors).allow_none();
        policy.directive(Directive::ObjectSrc).allow_none();
        policy
    }

    /// Adds `tokens` to `directive`, consuming and returning the policy.
    ///
    /// # Errors
    ///
    /// Fails on the first token rejected by [`DirectiveValue::add_token`].
    pub fn with_directive<I>(mut self, directive: Directive, tokens: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let value = self.directive(directive);
        for token in tokens {
            value.add_token(token.as_ref())?;
        }
        Ok(self)
    }

    /// Returns the value of `directive`, declaring it empty on first access.
    pub fn directive(&mut self, directive: Directive) -> &mut DirectiveValue {
        self.directives.entry(directive).or_default()
    }

    /// Returns the value of `directive` if it has been declared.
    #[must_use]
    pub fn get(&self, directive: Directive) -> Option<&DirectiveValue> {
        self.directives.get(&directive)
    }

    /// Returns the value that governs `directive`, following the
    /// [`Directive::fallback`] chain when it is not declared.
    #[must_use]
    pub fn effective(&self, directive: Directive) -> Option<&DirectiveValue> {
        let mut current = Some(directive);
        while let Some(directive) = current {
            if let Some(value) = self.get(directive) {
                return Some(value);
            }
            current = directive.fallback();
        }
        None
    }

    /// Adds a `'nonce-<value>'` source to `directive` and returns whether it
    /// was added.
    ///
    /// An undeclared directive is first seeded with the sources it inherits,
    /// so the nonce never narrows what the policy already allows. When
    /// nothing governs `directive` every inline element is already allowed,
    /// and the policy is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] if `nonce` is not base64.
    ///
    /// [`ErrorKind::InvalidArgument`]: crate::ErrorKind::InvalidArgument
    pub fn add_nonce(&mut self, directive: Directive, nonce: &str) -> Result<bool> {
        if !self.contains(directive) {
            let Some(inherited) = self.effective(directive).cloned() else {
                return Ok(false);
            };
            self.set_directive(directive, inherited);
        }

        self.directive(directive).add_nonce(nonce)?;
        Ok(true)
    }

    /// Returns true if `directive` has been declared.
    #[must_use]
    pub fn contains(&self, directive: Directive) -> bool {
        self.directives.contains_key(&directive)
    }

    /// Replaces the value of `directive`.
    pub fn set_directive(&mut self, directive: Directive, value: DirectiveValue) -> &mut Self {
        self.directives.insert(directive, value);
        self
    }

    /// Declares `directive` with no tokens, blocking everything it governs.
    pub fn declare_empty(&mut self, directive: Directive) -> &mut Self {
        self.directive(directive).clear();
        self
    }

    /// Removes `directive` so it is omitted from the output.
    pub fn remove_directive(&mut self, directive: Directive) -> Option<DirectiveValue> {
        self.directives.remove(&directive)
    }

    /// Returns the declared directives in canonical order.
    pub fn directives(&self) -> impl Iterator<Item = (Directive, &DirectiveValue)> {
        self.directives.iter().map(|(directive, value)| (*directive, value))
    }

    /// Returns true if the policy is report-only.
    #[must_use]
    pub const fn is_report_only(&self) -> bool {
        self.report_only
    }

    /// Switches between enforcing and report-only delivery.
    pub fn set_report_only(&mut self, report_only: bool) -> &mut Self {
        self.report_only = report_only;
        self
    }

    /// Returns the violation report endpoint.
    #[must_use]
    pub const fn report_uri(&self) -> Option<&Url> {
        self.report_uri.as_ref()
    }

    /// Sets the violation report endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] when `uri` is not an absolute
    /// `http` or `https` URL with a host, or contains `;` or `,`.
    ///
    /// [`ErrorKind::InvalidArgument`]: crate::ErrorKind::InvalidArgument
    pub fn set_report_uri(&mut self, uri: &str) -> Result<&mut Self> {
        self.report_uri = Some(parse_report_uri(uri)?);
        Ok(self)
    }

    /// Removes the violation report endpoint.
    pub fn clear_report_uri(&mut self) -> &mut Self {
        self.report_uri = None;
        self
    }

    /// Returns the Reporting API group name.
    #[must_use]
    pub fn report_to(&self) -> Option<&str> {
        self.report_to.as_deref()
    }

    /// Sets the Reporting API group name used by `report-to`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] under the same rules as
    /// [`DirectiveValue::add_token`].
    ///
    /// [`ErrorKind::InvalidArgument`]: crate::ErrorKind::InvalidArgument
    pub fn set_report_to(&mut self, group: &str) -> Result<&mut Self> {
        self.report_to = Some(normalize_token(group)?);
        Ok(self)
    }

    /// Returns true if `upgrade-insecure-requests` is emitted.
    #[must_use]
    pub const fn upgrade_insecure_requests(&self) -> bool {
        self.upgrade_insecure_requests
    }

    /// Toggles the `upgrade-insecure-requests` flag.
    pub fn set_upgrade_insecure_requests(&mut self, enabled: bool) -> &mut Self {
        self.upgrade_insecure_requests = enabled;
        self
    }

    /// Returns true if `block-all-mixed-content` is emitted.
    #[must_use]
    pub const fn block_all_mixed_content(&self) -> bool {
        self.block_all_mixed_content
    }

    /// Toggles the `block-all-mixed-content` flag.
    pub fn set_block_all_mixed_content(&mut self, enabled: bool) -> &mut Self {
        self.block_all_mixed_content = enabled;
        self
    }

    /// Returns a copy of this policy with `'unsafe-inline'` added to each of
    /// `directives`. The receiver is left untouched.
    pub fn with_unsafe_inline(&self, directives: &[Directive]) -> Self {
        let mut relaxed = self.clone();
        for &directive in directives {
            relaxed.directive(directive).add_unsafe_inline();
        }
        relaxed
    }

    /// Overwrites `frame-ancestors` so it expresses the same rule as
    /// `frame_options`.
    pub fn sync_frame_ancestors(&mut self, frame_options: &FrameOptionsPolicy) -> &mut Self {
        self.set_directive(Directive::FrameAncestors, frame_options.frame_ancestors())
    }

    /// Returns true if serializing would produce an empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
            && self.report_uri.is_none()
            && self.report_to.is_none()
            && !self.upgrade_insecure_requests
            && !self.block_all_mixed_content
    }

    /// Returns the standard header name for the current delivery mode.
    #[must_use]
    pub const fn header_name(&self) -> &'static str {
        if self.report_only {
            CONTENT_SECURITY_POLICY_REPORT_ONLY
        } else {
            CONTENT_SECURITY_POLICY
        }
    }

    /// Returns every header name that carries the policy: the standard one
    /// followed by the legacy `X-Content-Security-Policy` and `X-WebKit-CSP`
    /// variants, which older browsers read instead.
    #[must_use]
    pub const fn header_names(&self) -> [&'static str; 3] {
        if self.report_only {
            [
                CONTENT_SECURITY_POLICY_REPORT_ONLY,
                X_CONTENT_SECURITY_POLICY_REPORT_ONLY,
                X_WEBKIT_CSP_REPORT_ONLY,
            ]
        } else {
            [
                CONTENT_SECURITY_POLICY,
                X_CONTENT_SECURITY_POLICY,
                X_WEBKIT_CSP,
            ]
        }
    }

    /// Renders the policy in header grammar.
    ///
    /// Directives are joined by `; ` in canonical order, followed by
    /// `report-to`, `report-uri`, `upgrade-insecure-requests` and
    /// `block-all-mixed-content` when set. There is no trailing separator.
    #[must_use]
    pub fn serialize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CspPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut separator = "";

        for (directive, value) in &self.directives {
            if value.is_empty() {
                write!(f, "{separator}{directive}")?;
            } else {
                write!(f, "{separator}{directive} {value}")?;
            }
            separator = "; ";
        }

        if let Some(group) = &self.report_to {
            write!(f, "{separator}report-to {group}")?;
            separator = "; ";
        }

        if let Some(uri) = &self.report_uri {
            write!(f, "{separator}report-uri {uri}")?;
            separator = "; ";
        }

        if self.upgrade_insecure_requests {
            write!(f, "{separator}upgrade-insecure-requests")?;
            separator = "; ";
        }

        if self.block_all_mixed_content {
            write!(f, "{separator}block-all-mixed-content")?;
        }

        Ok(())
    }
}

fn parse_report_uri(uri: &str) -> Result<Url> {
    let url = Url::parse(uri.trim())?;
    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return Err(Error::invalid_argument()
            .with_message(format!("report URI '{url}' is not an http(s) URL with a host")));
    }
    if url.as_str().contains([';', ',']) {
        return Err(Error::invalid_argument()
            .with_message(format!("report URI '{url}' contains a policy separator")));
    }
    Ok(url)
}

fn deserialize_report_uri<'de, D>(deserializer: D) -> Result<Option<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|uri| parse_report_uri(&uri))
        .transpose()
        .map_err(serde::de::Error::custom)
}

fn deserialize_report_to<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|group| normalize_token(&group))
        .transpose()
        .map_err(serde::de::Error::custom)
}
