//! Security policy configuration.
//!
//! [`SecurityPolicyConfig`] is the resolved, immutable configuration the
//! middleware shares between requests. It can be built in code, loaded from a
//! JSON document, or assembled from command-line arguments with
//! [`PolicyArgs`] when the `config` feature is enabled.

use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "config")]
use clap::Args;
use helmet_core::csp::{CspPolicy, Directive};
use helmet_core::{Error, FrameOptionsPolicy, Result};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Resolved security policy shared by every request.
///
/// Fields omitted from a JSON document fall back to [`Default`], which uses
/// [`CspPolicy::strict`] and denies framing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[must_use = "config does nothing unless you use it"]
pub struct SecurityPolicyConfig {
    /// Base Content-Security-Policy applied to HTML responses.
    pub csp: CspPolicy,

    /// X-Frame-Options policy applied alongside the CSP.
    pub frame_options: FrameOptionsPolicy,

    /// Relaxes inline script and style restrictions on `500` error pages.
    pub development: bool,

    /// Directives that receive a fresh `'nonce-...'` source per response.
    pub nonce_directives: Vec<Directive>,

    /// Rewrites `frame-ancestors` to match [`Self::frame_options`].
    pub sync_frame_ancestors: bool,
}

impl Default for SecurityPolicyConfig {
    fn default() -> Self {
        Self {
            csp: CspPolicy::strict(),
            frame_options: FrameOptionsPolicy::default(),
            development: false,
            nonce_directives: Vec::new(),
            sync_frame_ancestors: false,
        }
    }
}

impl SecurityPolicyConfig {
    /// Creates a configuration from explicit policies.
    pub fn new(csp: CspPolicy, frame_options: FrameOptionsPolicy) -> Self {
        Self {
            csp,
            frame_options,
            ..Self::default()
        }
    }

    /// Sets development mode.
    pub fn with_development(mut self, development: bool) -> Self {
        self.development = development;
        self
    }

    /// Adds a directive that receives the per-response nonce.
    pub fn with_nonce_directive(mut self, directive: Directive) -> Self {
        if !self.nonce_directives.contains(&directive) {
            self.nonce_directives.push(directive);
        }
        self
    }

    /// Enables `frame-ancestors` synchronization.
    pub fn with_synced_frame_ancestors(mut self) -> Self {
        self.sync_frame_ancestors = true;
        self
    }

    /// Returns true if a nonce is generated for every request.
    #[must_use]
    pub fn uses_nonce(&self) -> bool {
        !self.nonce_directives.is_empty()
    }

    /// Parses a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Configuration`] if the document is malformed or
    /// holds an invalid token, URI or directive name.
    ///
    /// [`ErrorKind::Configuration`]: helmet_core::ErrorKind::Configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|err| {
            Error::configuration()
                .with_message(format!("invalid policy document: {err}"))
                .with_source(err)
        })?;
        Ok(config.finalize())
    }

    /// Reads and parses a JSON policy file.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Configuration`] if the file cannot be read or
    /// parsed.
    ///
    /// [`ErrorKind::Configuration`]: helmet_core::ErrorKind::Configuration
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|err| {
            Error::configuration()
                .with_message(format!("failed to read '{}'", path.display()))
                .with_source(err)
        })?;

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            path = %path.display(),
            "loaded policy file"
        );

        Self::from_json(&json)
    }

    /// Applies derived settings, consuming and returning the configuration.
    ///
    /// When [`Self::sync_frame_ancestors`] is set, `frame-ancestors` is
    /// overwritten from [`Self::frame_options`].
    pub fn finalize(mut self) -> Self {
        if self.sync_frame_ancestors {
            self.csp.sync_frame_ancestors(&self.frame_options);
        }
        self
    }
}

/// Command-line and environment overrides for [`SecurityPolicyConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct PolicyArgs {
    /// Path to a JSON policy document.
    ///
    /// When absent, the strict default policy is used.
    #[cfg_attr(feature = "config", arg(long, env = "POLICY_FILE"))]
    pub policy_file: Option<PathBuf>,

    /// Enables development mode, relaxing the policy on `500` error pages.
    #[cfg_attr(feature = "config", arg(long, env = "DEVELOPMENT"))]
    pub development: bool,

    /// Delivers the CSP in report-only mode.
    #[cfg_attr(feature = "config", arg(long, env = "CSP_REPORT_ONLY"))]
    pub csp_report_only: bool,

    /// Absolute URI that receives violation reports.
    #[cfg_attr(feature = "config", arg(long, env = "CSP_REPORT_URI"))]
    pub csp_report_uri: Option<String>,

    /// X-Frame-Options value: `DENY`, `SAMEORIGIN` or `ALLOW-FROM <uri>`.
    #[cfg_attr(feature = "config", arg(long, env = "FRAME_OPTIONS"))]
    pub frame_options: Option<FrameOptionsPolicy>,

    /// Directives that receive a per-response nonce, e.g. `script-src`.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "CSP_NONCE", value_delimiter = ',')
    )]
    pub csp_nonce: Vec<Directive>,

    /// Rewrites `frame-ancestors` to match the X-Frame-Options policy.
    #[cfg_attr(feature = "config", arg(long, env = "SYNC_FRAME_ANCESTORS"))]
    pub sync_frame_ancestors: bool,
}

impl PolicyArgs {
    /// Resolves the arguments into a configuration.
    ///
    /// The policy file is loaded first and every flag that is set overrides
    /// the corresponding file setting.
    ///
    /// # Errors
    ///
    /// Fails if the policy file cannot be loaded or the report URI is
    /// invalid.
    pub fn load(&self) -> Result<SecurityPolicyConfig> {
        let mut config = match &self.policy_file {
            Some(path) => SecurityPolicyConfig::from_file(path)?,
            None => SecurityPolicyConfig::default(),
        };

        if self.development {
            config.development = true;
        }
        if self.csp_report_only {
            config.csp.set_report_only(true);
        }
        if let Some(uri) = &self.csp_report_uri {
            config.csp.set_report_uri(uri)?;
        }
        if let Some(frame_options) = &self.frame_options {
            config.frame_options = frame_options.clone();
        }
        for &directive in &self.csp_nonce {
            config = config.with_nonce_directive(directive);
        }
        if self.sync_frame_ancestors {
            config.sync_frame_ancestors = true;
        }

        Ok(config.finalize())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use helmet_core::ErrorKind;

    use super::*;

    const DOCUMENT: &str = r#"{
        "csp": {
            "directives": {
                "default-src": ["'self'"],
                "script-src": ["'self'", "https://cdn.example.com"]
            }
        },
        "frame_options": { "mode": "same-origin" },
        "development": true
    }"#;

    #[test]
    fn default_is_strict_and_denies_framing() {
        let config = SecurityPolicyConfig::default();
        assert_eq!(config.csp, CspPolicy::strict());
        assert_eq!(config.frame_options.serialize(), "DENY");
        assert!(!config.development);
        assert!(!config.uses_nonce());
    }

    #[test]
    fn parses_json_document() {
        let config = SecurityPolicyConfig::from_json(DOCUMENT).unwrap();
        assert!(config.development);
        assert_eq!(config.frame_options.serialize(), "SAMEORIGIN");
        assert_eq!(
            config.csp.serialize(),
            "default-src 'self'; script-src 'self' https://cdn.example.com"
        );
    }

    #[test]
    fn rejects_invalid_document() {
        let error = SecurityPolicyConfig::from_json(r#"{"csp":{"directives":{"img-src":["a b"]}}}"#)
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn sync_frame_ancestors_on_finalize() {
        let config = SecurityPolicyConfig::new(CspPolicy::new(), FrameOptionsPolicy::new())
            .with_synced_frame_ancestors()
            .finalize();
        assert_eq!(config.csp.serialize(), "frame-ancestors 'none'");
    }

    #[test]
    fn nonce_directives_are_distinct() {
        let config = SecurityPolicyConfig::default()
            .with_nonce_directive(Directive::ScriptSrc)
            .with_nonce_directive(Directive::ScriptSrc);
        assert_eq!(config.nonce_directives, [Directive::ScriptSrc]);
    }

    #[test]
    fn loads_file_and_applies_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();

        let args = PolicyArgs {
            policy_file: Some(file.path().to_path_buf()),
            csp_report_only: true,
            csp_report_uri: Some("https://example.com/csp-report".to_owned()),
            frame_options: Some("DENY".parse().unwrap()),
            ..PolicyArgs::default()
        };

        let config = args.load().unwrap();
        assert!(config.development);
        assert!(config.csp.is_report_only());
        assert_eq!(config.frame_options.serialize(), "DENY");
        assert!(config.csp.serialize().ends_with("; report-uri https://example.com/csp-report"));
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = PolicyArgs {
            policy_file: Some(dir.path().join("missing.json")),
            ..PolicyArgs::default()
        };
        assert_eq!(args.load().unwrap_err().kind(), ErrorKind::Configuration);
    }

    #[test]
    fn invalid_report_uri_is_rejected() {
        let args = PolicyArgs {
            csp_report_uri: Some("/relative".to_owned()),
            ..PolicyArgs::default()
        };
        assert!(args.load().unwrap_err().is_invalid_argument());
    }
}
