//! Middleware that applies the security policy to responses.
//!
//! The layer reads the response status and `Content-Type` once the handler
//! has produced a response, runs [`ResponseDecision::decide`] and sets the
//! resulting headers before the response leaves the service.
//!
//! [`ResponseDecision::decide`]: crate::decision::ResponseDecision::decide

mod extensions;
mod layer;

pub use extensions::RouterSecurityPolicyExt;
pub use layer::{SecurityPolicyLayer, SecurityPolicyService};
