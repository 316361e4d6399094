//! Content-Security-Policy model.
//!
//! - [`Directive`]: closed set of directive names in canonical order
//! - [`DirectiveValue`]: deduplicated source list of one directive
//! - [`CspPolicy`]: all directives plus policy-wide flags and the serializer

mod directive;
mod hash;
mod policy;
mod value;

pub use directive::Directive;
pub use hash::HashAlgorithm;
pub use policy::{
    CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_REPORT_ONLY, CspPolicy,
    X_CONTENT_SECURITY_POLICY, X_CONTENT_SECURITY_POLICY_REPORT_ONLY, X_WEBKIT_CSP,
    X_WEBKIT_CSP_REPORT_ONLY,
};
pub use value::{DirectiveValue, NONE, SELF, STRICT_DYNAMIC, UNSAFE_EVAL, UNSAFE_INLINE};
