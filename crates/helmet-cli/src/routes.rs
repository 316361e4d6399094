//! Demo routes covering every header decision branch.

use axum::Router;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::get;
use helmet_server::{CspNonce, RouterSecurityPolicyExt, SecurityPolicyConfig};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

/// HTML page with an inline script tagged by the request nonce, if any.
async fn index(nonce: Option<CspNonce>) -> Html<String> {
    let nonce = nonce
        .map(|nonce| format!(" nonce=\"{nonce}\""))
        .unwrap_or_default();

    Html(format!(
        "<!doctype html>\
         <html><head><title>helmet</title></head>\
         <body><h1>helmet</h1>\
         <script{nonce}>document.body.dataset.ready = 'true';</script>\
         </body></html>"
    ))
}

/// HTML server error page with inline diagnostics.
async fn error_page() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(
            "<!doctype html>\
             <html><head><style>pre { color: #b00; }</style></head>\
             <body><h1>Internal Server Error</h1><pre>demo failure</pre></body></html>",
        ),
    )
}

/// JSON status endpoint.
async fn status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Creates the demo router with the security policy and request tracing.
pub fn create_router(policy: SecurityPolicyConfig) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/error", get(error_page))
        .route("/api/status", get(status))
        .with_security_policy(policy)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use helmet_core::csp::Directive;

    use super::*;

    fn csp(response: &axum_test::TestResponse) -> Option<String> {
        response
            .headers()
            .get("content-security-policy")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }

    #[tokio::test]
    async fn index_gets_strict_policy() -> anyhow::Result<()> {
        let server = TestServer::new(create_router(SecurityPolicyConfig::default()))?;
        let response = server.get("/").await;

        response.assert_status_ok();
        assert_eq!(
            csp(&response),
            Some(helmet_core::csp::CspPolicy::strict().serialize())
        );
        assert!(response.headers().contains_key("x-webkit-csp"));
        Ok(())
    }

    #[tokio::test]
    async fn error_page_is_relaxed_in_development() -> anyhow::Result<()> {
        let config = SecurityPolicyConfig::default().with_development(true);
        let server = TestServer::new(create_router(config))?;
        let response = server.get("/error").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let csp = csp(&response).unwrap_or_default();
        assert!(csp.contains("script-src 'unsafe-inline'"));
        assert!(csp.contains("style-src 'unsafe-inline'"));
        Ok(())
    }

    #[tokio::test]
    async fn status_has_no_policy_headers() -> anyhow::Result<()> {
        let server = TestServer::new(create_router(SecurityPolicyConfig::default()))?;
        let response = server.get("/api/status").await;

        response.assert_status_ok();
        assert!(csp(&response).is_none());
        assert!(!response.headers().contains_key("x-frame-options"));
        Ok(())
    }

    #[tokio::test]
    async fn index_script_carries_nonce() -> anyhow::Result<()> {
        let config = SecurityPolicyConfig::default().with_nonce_directive(Directive::ScriptSrc);
        let server = TestServer::new(create_router(config))?;
        let response = server.get("/").await;

        let csp = csp(&response).unwrap_or_default();
        let nonce = csp
            .split("'nonce-")
            .nth(1)
            .and_then(|rest| rest.split('\'').next())
            .unwrap_or_default();
        assert!(!nonce.is_empty());
        assert!(response.text().contains(&format!("nonce=\"{nonce}\"")));
        Ok(())
    }
}
