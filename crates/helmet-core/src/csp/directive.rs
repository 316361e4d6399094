//! Directive names.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// A Content-Security-Policy directive name.
///
/// The declaration order is the canonical serialization order: `default-src`
/// first, then every other directive alphabetically. Policies are keyed by
/// this enum in an ordered map, so two policies with the same contents always
/// serialize to the same string no matter how they were built.
///
/// Flag directives (`upgrade-insecure-requests`, `block-all-mixed-content`)
/// and reporting directives are policy-wide settings on [`CspPolicy`] rather
/// than members of this enum.
///
/// [`CspPolicy`]: crate::csp::CspPolicy
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Directive {
    DefaultSrc,
    BaseUri,
    ChildSrc,
    ConnectSrc,
    FontSrc,
    FormAction,
    FrameAncestors,
    FrameSrc,
    ImgSrc,
    ManifestSrc,
    MediaSrc,
    ObjectSrc,
    Sandbox,
    ScriptSrc,
    ScriptSrcAttr,
    ScriptSrcElem,
    StyleSrc,
    StyleSrcAttr,
    StyleSrcElem,
    WorkerSrc,
}

impl Directive {
    /// Returns the directive name as it appears on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Returns true for fetch directives, which fall back to `default-src`.
    ///
    /// A declared-but-empty fetch directive blocks every load of its kind.
    #[must_use]
    pub const fn is_fetch(self) -> bool {
        !matches!(
            self,
            Self::BaseUri | Self::FormAction | Self::FrameAncestors | Self::Sandbox
        )
    }

    /// Returns the directive consulted when `self` is not declared.
    ///
    /// `worker-src` is mapped to `child-src` only; browsers also consult
    /// `script-src` in between.
    #[must_use]
    pub const fn fallback(self) -> Option<Self> {
        match self {
            Self::ScriptSrcAttr | Self::ScriptSrcElem => Some(Self::ScriptSrc),
            Self::StyleSrcAttr | Self::StyleSrcElem => Some(Self::StyleSrc),
            Self::FrameSrc | Self::WorkerSrc => Some(Self::ChildSrc),
            Self::DefaultSrc => None,
            other if other.is_fetch() => Some(Self::DefaultSrc),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn wire_names() {
        assert_eq!(Directive::DefaultSrc.as_str(), "default-src");
        assert_eq!(Directive::ScriptSrcElem.as_str(), "script-src-elem");
        assert_eq!(Directive::FrameAncestors.to_string(), "frame-ancestors");
        assert_eq!(Directive::Sandbox.as_str(), "sandbox");
    }

    #[test]
    fn canonical_order_is_default_src_then_alphabetical() {
        let names: Vec<_> = Directive::iter().map(Directive::as_str).collect();
        assert_eq!(names[0], "default-src");

        let mut rest = names[1..].to_vec();
        rest.sort_unstable();
        assert_eq!(rest, &names[1..]);

        let mut by_ord: Vec<_> = Directive::iter().collect();
        by_ord.sort();
        assert!(by_ord.into_iter().eq(Directive::iter()));
    }

    #[test]
    fn fetch_classification() {
        assert!(Directive::ScriptSrc.is_fetch());
        assert!(Directive::DefaultSrc.is_fetch());
        assert!(!Directive::FrameAncestors.is_fetch());
        assert!(!Directive::Sandbox.is_fetch());
    }

    #[test]
    fn fallback_chain_ends_at_default_src() {
        assert_eq!(Directive::ScriptSrcElem.fallback(), Some(Directive::ScriptSrc));
        assert_eq!(Directive::ScriptSrc.fallback(), Some(Directive::DefaultSrc));
        assert_eq!(Directive::FrameSrc.fallback(), Some(Directive::ChildSrc));
        assert_eq!(Directive::DefaultSrc.fallback(), None);
        assert_eq!(Directive::FrameAncestors.fallback(), None);

        for directive in Directive::iter() {
            let mut current = directive;
            while let Some(next) = current.fallback() {
                current = next;
            }
            assert!(current == Directive::DefaultSrc || !directive.is_fetch());
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Directive::StyleSrcAttr).unwrap();
        assert_eq!(json, r#""style-src-attr""#);
        let back: Directive = serde_json::from_str(r#""worker-src""#).unwrap();
        assert_eq!(back, Directive::WorkerSrc);
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("script-src".parse::<Directive>().unwrap(), Directive::ScriptSrc);
        assert!("script_src".parse::<Directive>().is_err());
    }
}
