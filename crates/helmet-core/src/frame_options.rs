//! X-Frame-Options policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use url::Url;

use crate::csp::DirectiveValue;
use crate::{Error, Result};

/// Header name for the frame options policy.
pub const X_FRAME_OPTIONS: &str = "X-Frame-Options";

/// Framing mode of an [`FrameOptionsPolicy`].
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FrameOptionsMode {
    /// The page cannot be displayed in a frame, regardless of the site.
    #[default]
    Deny,
    /// The page can only be displayed in a frame on the same origin.
    SameOrigin,
    /// The page can only be displayed in a frame on the given origin.
    AllowFrom,
}

/// X-Frame-Options policy: a framing mode plus the origin for `ALLOW-FROM`.
///
/// The origin is present if and only if the mode is
/// [`FrameOptionsMode::AllowFrom`]. Every mutator replaces both fields in a
/// single assignment, so no intermediate state is ever observable.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FrameOptionsRepr", into = "FrameOptionsRepr")]
#[must_use = "policies do nothing unless applied to a response"]
pub struct FrameOptionsPolicy {
    mode: FrameOptionsMode,
    allow_from: Option<Url>,
}

impl FrameOptionsPolicy {
    /// Creates a new policy in [`FrameOptionsMode::Deny`] mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that only allows framing from `uri`.
    ///
    /// # Errors
    ///
    /// See [`FrameOptionsPolicy::allow_from`].
    pub fn from_allow_from(uri: &str) -> Result<Self> {
        let mut policy = Self::new();
        policy.allow_from(uri)?;
        Ok(policy)
    }

    /// Forbids framing entirely and clears any stored origin.
    pub fn deny(&mut self) -> &mut Self {
        *self = Self {
            mode: FrameOptionsMode::Deny,
            allow_from: None,
        };
        self
    }

    /// Allows same-origin framing and clears any stored origin.
    pub fn same_origin(&mut self) -> &mut Self {
        *self = Self {
            mode: FrameOptionsMode::SameOrigin,
            allow_from: None,
        };
        self
    }

    /// Allows framing only from `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] when `uri` is blank, relative,
    /// malformed, not `http`/`https` or has no host. The policy is left
    /// untouched on failure.
    ///
    /// [`ErrorKind::InvalidArgument`]: crate::ErrorKind::InvalidArgument
    pub fn allow_from(&mut self, uri: &str) -> Result<&mut Self> {
        let url = parse_origin_uri(uri)?;
        *self = Self {
            mode: FrameOptionsMode::AllowFrom,
            allow_from: Some(url),
        };
        Ok(self)
    }

    /// Returns the framing mode.
    #[must_use]
    pub const fn mode(&self) -> FrameOptionsMode {
        self.mode
    }

    /// Returns the allowed origin, present only in `AllowFrom` mode.
    #[must_use]
    pub const fn allow_from_uri(&self) -> Option<&Url> {
        self.allow_from.as_ref()
    }

    /// Returns the header value: `DENY`, `SAMEORIGIN` or `ALLOW-FROM <uri>`.
    #[must_use]
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Returns the `frame-ancestors` directive value equivalent to this policy.
    ///
    /// Browsers that support CSP ignore X-Frame-Options when
    /// `frame-ancestors` is present, so both must express the same rule.
    pub fn frame_ancestors(&self) -> DirectiveValue {
        let mut value = DirectiveValue::new();
        match (self.mode, &self.allow_from) {
            (FrameOptionsMode::AllowFrom, Some(url)) => {
                value.push_trusted(url.origin().ascii_serialization());
            }
            (FrameOptionsMode::SameOrigin, _) => {
                value.allow_self();
            }
            _ => {
                value.allow_none();
            }
        }
        value
    }
}

impl fmt::Display for FrameOptionsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.mode, &self.allow_from) {
            (FrameOptionsMode::AllowFrom, Some(url)) => write!(f, "ALLOW-FROM {url}"),
            (FrameOptionsMode::SameOrigin, _) => f.write_str("SAMEORIGIN"),
            _ => f.write_str("DENY"),
        }
    }
}

/// Accepts the header forms `DENY`, `SAMEORIGIN` and `ALLOW-FROM <uri>`,
/// case-insensitively, for use in configuration.
impl FromStr for FrameOptionsPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (keyword, rest) = s.split_once(char::is_whitespace).unwrap_or((s, ""));

        match keyword.to_ascii_uppercase().as_str() {
            "DENY" if rest.is_empty() => Ok(Self::new()),
            "SAMEORIGIN" | "SAME-ORIGIN" if rest.is_empty() => {
                let mut policy = Self::new();
                policy.same_origin();
                Ok(policy)
            }
            "ALLOW-FROM" => Self::from_allow_from(rest),
            _ => Err(Error::invalid_argument()
                .with_message(format!("unknown frame options value '{s}'"))),
        }
    }
}

fn parse_origin_uri(uri: &str) -> Result<Url> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(Error::invalid_argument().with_message("allow-from URI is required"));
    }

    let url = Url::parse(uri)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_argument()
            .with_message(format!("allow-from URI '{uri}' is not an http(s) origin")));
    }
    if !url.has_host() {
        return Err(Error::invalid_argument()
            .with_message(format!("allow-from URI '{uri}' has no host")));
    }

    Ok(url)
}

#[derive(Serialize, Deserialize)]
struct FrameOptionsRepr {
    mode: FrameOptionsMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_from: Option<String>,
}

impl TryFrom<FrameOptionsRepr> for FrameOptionsPolicy {
    type Error = Error;

    fn try_from(repr: FrameOptionsRepr) -> Result<Self> {
        let mut policy = Self::new();
        match (repr.mode, repr.allow_from) {
            (FrameOptionsMode::Deny, None) => {}
            (FrameOptionsMode::SameOrigin, None) => {
                policy.same_origin();
            }
            (FrameOptionsMode::AllowFrom, Some(uri)) => {
                policy.allow_from(&uri)?;
            }
            (FrameOptionsMode::AllowFrom, None) => {
                return Err(Error::invalid_argument().with_message("allow-from URI is required"));
            }
            (mode, Some(_)) => {
                return Err(Error::invalid_argument()
                    .with_message(format!("mode '{mode}' does not take an origin")));
            }
        }
        Ok(policy)
    }
}

impl From<FrameOptionsPolicy> for FrameOptionsRepr {
    fn from(policy: FrameOptionsPolicy) -> Self {
        Self {
            mode: policy.mode,
            allow_from: policy.allow_from.map(String::from),
        }
    }
}
