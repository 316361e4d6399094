//! Extension trait for `axum::Router` to apply the security policy layer.

use axum::Router;

use super::SecurityPolicyLayer;
use crate::config::SecurityPolicyConfig;

/// Extension trait for `axum::`[`Router`] to apply the security policy.
pub trait RouterSecurityPolicyExt<S> {
    /// Layers [`SecurityPolicyLayer`] built from `config`.
    ///
    /// Routes added after this call are not covered, as with any
    /// [`Router::layer`].
    fn with_security_policy(self, config: SecurityPolicyConfig) -> Self;

    /// Layers [`SecurityPolicyLayer`] with the strict default policy.
    fn with_default_security_policy(self) -> Self;
}

impl<S> RouterSecurityPolicyExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_security_policy(self, config: SecurityPolicyConfig) -> Self {
        self.layer(SecurityPolicyLayer::new(config))
    }

    fn with_default_security_policy(self) -> Self {
        self.with_security_policy(SecurityPolicyConfig::default())
    }
}
