//! Resource identifiers.
//!
//! A **direct** identifier names a concrete image path plus the resolution
//! variant to load. An **indirect** identifier is a bare symbolic name that
//! must be mapped to a direct identifier through the
//! [`IndirectTextureTable`](crate::IndirectTextureTable) before use.

use std::fmt;
use std::sync::Arc;

/// One precomputed resolution level of an image.
///
/// Levels count up from the smallest stored variant (`0`) to
/// [`VariantTag::BASE`], the full-resolution image. The base variant is the
/// one that is always present, and the one whose loading data describes the
/// whole ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantTag(u8);

impl VariantTag {
    /// Full-resolution variant.
    pub const BASE: VariantTag = VariantTag(4);
    /// Number of variant levels, `0..=BASE`.
    pub const COUNT: u8 = 5;

    /// Level `n`, clamped to [`VariantTag::BASE`].
    #[inline]
    pub const fn level(n: u8) -> Self {
        if n > Self::BASE.0 {
            Self::BASE
        } else {
            Self(n)
        }
    }

    #[inline(always)]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Downscale factor relative to the base variant, as a shift.
    #[inline(always)]
    pub const fn shift_from_base(self) -> u8 {
        Self::BASE.0 - self.0
    }

    #[inline(always)]
    pub const fn is_base(self) -> bool {
        self.0 == Self::BASE.0
    }
}

/// Logical texture resource identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Direct { path: Arc<str>, variant: VariantTag },
    Indirect(Arc<str>),
}

impl ResourceId {
    /// Direct identifier for the base variant of `path`.
    pub fn direct(path: impl Into<Arc<str>>) -> Self {
        ResourceId::Direct {
            path: path.into(),
            variant: VariantTag::BASE,
        }
    }

    /// Indirect (symbolic) identifier.
    pub fn indirect(name: impl Into<Arc<str>>) -> Self {
        ResourceId::Indirect(name.into())
    }

    #[inline]
    pub fn is_indirect(&self) -> bool {
        matches!(self, ResourceId::Indirect(_))
    }

    /// Variant of a direct identifier; `None` for indirect names.
    #[inline]
    pub fn variant(&self) -> Option<VariantTag> {
        match self {
            ResourceId::Direct { variant, .. } => Some(*variant),
            ResourceId::Indirect(_) => None,
        }
    }

    /// Path of a direct identifier, or the symbolic name of an indirect one.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            ResourceId::Direct { path, .. } => path,
            ResourceId::Indirect(name) => name,
        }
    }

    /// Same path, different variant. Indirect identifiers are returned as is.
    pub fn with_variant(&self, variant: VariantTag) -> Self {
        match self {
            ResourceId::Direct { path, .. } => ResourceId::Direct {
                path: Arc::clone(path),
                variant,
            },
            ResourceId::Indirect(_) => self.clone(),
        }
    }

    /// The base-variant identifier loading data is keyed by.
    #[inline]
    pub fn base(&self) -> Self {
        self.with_variant(VariantTag::BASE)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Direct { path, variant } => write!(f, "{path}@{}", variant.index()),
            ResourceId::Indirect(name) => write!(f, "indirect:{name}"),
        }
    }
}
