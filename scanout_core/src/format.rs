// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel format codes and format modifiers.
//!
//! Decoders hand out raw fourcc codes, including vendor formats that
//! [`DrmFourcc`] does not know about (Rockchip's 10-bit NV12 for example), so
//! descriptors carry a plain [`Fourcc`] and only convert to [`DrmFourcc`] at
//! the point a backend needs the typed value.

use core::fmt;

use drm_fourcc::{DrmFourcc, DrmModifier};

/// A raw little-endian fourcc pixel format code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fourcc(pub u32);

impl Fourcc {
    /// 8-bit 4:2:0 Y plane + interleaved CbCr plane.
    pub const NV12: Self = Self::from_chars(*b"NV12");
    /// 10-bit 4:2:0 in 16-bit containers, two planes.
    pub const P010: Self = Self::from_chars(*b"P010");
    /// 10-bit 4:2:0 packed three-per-32-bit-word, two planes.
    pub const P030: Self = Self::from_chars(*b"P030");
    /// Rockchip's packed 10-bit NV12 variant.
    pub const NV12_10: Self = Self::from_chars(*b"NA12");

    /// Builds a fourcc from its four ASCII characters.
    #[must_use]
    pub const fn from_chars(chars: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(chars))
    }

    /// Returns the four characters of the code.
    #[must_use]
    pub const fn to_chars(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Converts to a [`DrmFourcc`], if the code is a known format.
    pub fn to_drm(self) -> Option<DrmFourcc> {
        DrmFourcc::try_from(self.0).ok()
    }
}

impl fmt::Debug for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chars = self.to_chars();
        if chars.iter().all(u8::is_ascii_graphic) {
            write!(
                f,
                "Fourcc({}{}{}{})",
                char::from(chars[0]),
                char::from(chars[1]),
                char::from(chars[2]),
                char::from(chars[3])
            )
        } else {
            write!(f, "Fourcc({:#010x})", self.0)
        }
    }
}

impl From<DrmFourcc> for Fourcc {
    fn from(value: DrmFourcc) -> Self {
        Self(value as u32)
    }
}

/// `DRM_FORMAT_MOD_INVALID`: no explicit layout modifier.
pub const MODIFIER_INVALID: u64 = 0x00ff_ffff_ffff_ffff;

/// `DRM_FORMAT_MOD_LINEAR`.
pub const MODIFIER_LINEAR: u64 = 0;

/// Whether `modifier` describes an explicit layout that must be passed along.
#[must_use]
pub fn is_explicit_modifier(modifier: u64) -> bool {
    DrmModifier::from(modifier) != DrmModifier::Invalid
}

/// Splits a modifier into its low and high 32-bit words.
#[must_use]
pub const fn modifier_words(modifier: u64) -> (u32, u32) {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "masking to the low word is the point"
    )]
    let lo = (modifier & 0xffff_ffff) as u32;
    #[expect(
        clippy::cast_possible_truncation,
        reason = "a u64 shifted right by 32 always fits"
    )]
    let hi = (modifier >> 32) as u32;
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_matches_drm_codes() {
        assert_eq!(Fourcc::NV12, Fourcc::from(DrmFourcc::Nv12));
        assert_eq!(Fourcc::NV12.to_drm(), Some(DrmFourcc::Nv12));
        assert_eq!(Fourcc::P010.to_drm(), Some(DrmFourcc::P010));
    }

    #[test]
    fn debug_prints_characters() {
        assert_eq!(format!("{:?}", Fourcc::NV12_10), "Fourcc(NA12)");
        assert_eq!(format!("{:?}", Fourcc(0x0102_0304)), "Fourcc(0x01020304)");
    }

    #[test]
    fn invalid_modifier_is_not_explicit() {
        assert!(!is_explicit_modifier(MODIFIER_INVALID));
        assert!(is_explicit_modifier(MODIFIER_LINEAR));
        assert!(is_explicit_modifier(0x0100_0000_0000_0004));
    }

    #[test]
    fn modifier_words_split_hi_and_lo() {
        assert_eq!(modifier_words(0x0100_0000_0000_0004), (4, 0x0100_0000));
        assert_eq!(modifier_words(MODIFIER_INVALID), (0xffff_ffff, 0x00ff_ffff));
    }
}
