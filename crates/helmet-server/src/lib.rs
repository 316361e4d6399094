#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants
pub const TRACING_TARGET_POLICY: &str = "helmet_server::policy";
pub const TRACING_TARGET_HEADERS: &str = "helmet_server::headers";
pub const TRACING_TARGET_CONFIG: &str = "helmet_server::config";

mod config;
pub mod decision;
mod headers;
pub mod middleware;
mod nonce;

pub use config::{PolicyArgs, SecurityPolicyConfig};
pub use decision::{ResponseDecision, ResponseMeta};
pub use headers::PolicyHeaders;
pub use middleware::{RouterSecurityPolicyExt, SecurityPolicyLayer, SecurityPolicyService};
pub use nonce::CspNonce;
