#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for policy construction.
pub const TRACING_TARGET_POLICY: &str = "helmet_core::policy";

mod error;
mod frame_options;

pub mod csp;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use frame_options::{FrameOptionsMode, FrameOptionsPolicy, X_FRAME_OPTIONS};
