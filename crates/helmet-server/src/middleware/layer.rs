//! Tower layer that emits policy headers at response start.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{Request, Response};
use futures::future::BoxFuture;
use tower::{Layer, Service};

use crate::TRACING_TARGET_POLICY;
use crate::config::SecurityPolicyConfig;
use crate::decision::{ResponseDecision, ResponseMeta};
use crate::headers::PolicyHeaders;
use crate::nonce::CspNonce;

/// Layer that applies a [`SecurityPolicyConfig`] to every response.
///
/// The configuration is frozen when the layer is built and shared between
/// all requests. Responses never mutate it: per-response variants (relaxed
/// development error pages, nonces) are derived from a clone.
#[derive(Debug, Clone)]
pub struct SecurityPolicyLayer {
    config: Arc<SecurityPolicyConfig>,
}

impl SecurityPolicyLayer {
    /// Creates a new layer from a resolved configuration.
    pub fn new(config: SecurityPolicyConfig) -> Self {
        tracing::debug!(
            target: TRACING_TARGET_POLICY,
            csp = %config.csp,
            frame_options = %config.frame_options,
            report_only = config.csp.is_report_only(),
            development = config.development,
            nonce_directives = ?config.nonce_directives,
            "security policy configured"
        );

        Self {
            config: Arc::new(config),
        }
    }

    /// Returns the shared configuration.
    #[must_use]
    pub fn config(&self) -> &SecurityPolicyConfig {
        &self.config
    }
}

impl Default for SecurityPolicyLayer {
    fn default() -> Self {
        Self::new(SecurityPolicyConfig::default())
    }
}

impl<S> Layer<S> for SecurityPolicyLayer {
    type Service = SecurityPolicyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityPolicyService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Service produced by [`SecurityPolicyLayer`].
#[derive(Debug, Clone)]
pub struct SecurityPolicyService<S> {
    inner: S,
    config: Arc<SecurityPolicyConfig>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SecurityPolicyService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Send + 'static,
    S::Future: Send + 'static,
    ResBody: Send + 'static,
{
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let nonce = config.uses_nonce().then(CspNonce::generate);
        if let Some(nonce) = &nonce {
            request.extensions_mut().insert(nonce.clone());
        }

        let future = self.inner.call(request);
        Box::pin(async move {
            let mut response = future.await?;
            apply_policy(&config, nonce.as_ref(), &mut response);
            Ok(response)
        })
    }
}

/// Runs the per-response decision and sets the resulting headers.
fn apply_policy<B>(
    config: &SecurityPolicyConfig,
    nonce: Option<&CspNonce>,
    response: &mut Response<B>,
) {
    let status = response.status();
    let meta = ResponseMeta::from_response(response, config.development);
    let decision = ResponseDecision::decide(&meta, &config.csp);
    let relaxed = decision.is_relaxed();

    let Some(mut policy) = decision.into_policy() else {
        tracing::trace!(
            target: TRACING_TARGET_POLICY,
            status = status.as_u16(),
            "non-html response, policy headers skipped"
        );
        return;
    };

    // Browsers ignore 'unsafe-inline' next to a nonce source.
    if let Some(nonce) = nonce.filter(|_| !relaxed) {
        let policy = policy.to_mut();
        for &directive in &config.nonce_directives {
            match policy.add_nonce(directive, nonce.as_str()) {
                Ok(true) => {}
                Ok(false) => tracing::trace!(
                    target: TRACING_TARGET_POLICY,
                    directive = %directive,
                    "directive is unrestricted, nonce source skipped"
                ),
                Err(error) => tracing::error!(
                    target: TRACING_TARGET_POLICY,
                    directive = %directive,
                    error = %error,
                    "failed to add nonce source"
                ),
            }
        }
    }

    let headers = PolicyHeaders::render(&policy, &config.frame_options);
    tracing::debug!(
        target: TRACING_TARGET_POLICY,
        status = status.as_u16(),
        relaxed = relaxed,
        report_only = policy.is_report_only(),
        headers = headers.len(),
        "policy headers emitted"
    );

    headers.apply(response.headers_mut());
}
