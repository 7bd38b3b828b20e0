// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Colorimetry and HDR metadata types.
//!
//! [`ColorState`] is what a stream signals per frame (matrix coefficients and
//! quantization range). [`HdrMetadata`] is the SMPTE ST 2086 mastering
//! metadata plus content light levels, supplied by the streaming session.
//! [`HdrOutputMetadata`] is the binary layout the kernel expects in the
//! connector's `HDR_OUTPUT_METADATA` blob.

use bytemuck::{Pod, Zeroable};

/// YCbCr matrix coefficients of a stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Colorspace {
    /// ITU-R BT.601.
    Rec601,
    /// ITU-R BT.709.
    Rec709,
    /// ITU-R BT.2020 non-constant luminance.
    Rec2020,
    /// Not signalled or not representable.
    #[default]
    Unknown,
}

impl Colorspace {
    /// Value of the plane's `COLOR_ENCODING` enum for this colorspace.
    ///
    /// Returns `None` for [`Colorspace::Unknown`]; nothing is written then.
    #[must_use]
    pub const fn color_encoding_name(self) -> Option<&'static str> {
        match self {
            Self::Rec601 => Some("ITU-R BT.601 YCbCr"),
            Self::Rec709 => Some("ITU-R BT.709 YCbCr"),
            Self::Rec2020 => Some("ITU-R BT.2020 YCbCr"),
            Self::Unknown => None,
        }
    }
}

/// Per-frame color signalling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorState {
    /// `true` for full-range (0–255) YCbCr, `false` for limited (16–235).
    pub full_range: bool,
    /// Matrix coefficients.
    pub colorspace: Colorspace,
}

impl ColorState {
    /// Creates a color state.
    #[must_use]
    pub const fn new(colorspace: Colorspace, full_range: bool) -> Self {
        Self {
            full_range,
            colorspace,
        }
    }

    /// Value of the plane's `COLOR_RANGE` enum for this state.
    #[must_use]
    pub const fn color_range_name(self) -> &'static str {
        if self.full_range {
            "YCbCr full range"
        } else {
            "YCbCr limited range"
        }
    }
}

/// A CIE 1931 chromaticity coordinate in units of 0.00002.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Chromaticity {
    /// x coordinate.
    pub x: u16,
    /// y coordinate.
    pub y: u16,
}

/// Static HDR mastering metadata for a stream.
///
/// All-zero is a valid value and means "unknown"; sinks fall back to their
/// own defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HdrMetadata {
    /// Red, green and blue primaries of the mastering display.
    pub display_primaries: [Chromaticity; 3],
    /// White point of the mastering display.
    pub white_point: Chromaticity,
    /// Maximum mastering luminance in cd/m².
    pub max_display_luminance: u16,
    /// Minimum mastering luminance in units of 0.0001 cd/m².
    pub min_display_luminance: u16,
    /// Maximum content light level in cd/m².
    pub max_content_light_level: u16,
    /// Maximum frame-average light level in cd/m².
    pub max_frame_average_light_level: u16,
}

/// `HDMI_STATIC_METADATA_TYPE1`.
pub const HDMI_STATIC_METADATA_TYPE1: u8 = 0;

/// EOTF code for SMPTE ST 2084 (PQ).
pub const EOTF_SMPTE_ST2084: u8 = 2;

/// Kernel `struct hdr_metadata_infoframe`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct HdrMetadataInfoframe {
    /// Electro-optical transfer function.
    pub eotf: u8,
    /// Static metadata descriptor id.
    pub metadata_type: u8,
    /// Mastering display primaries.
    pub display_primaries: [Chromaticity; 3],
    /// Mastering display white point.
    pub white_point: Chromaticity,
    /// Maximum mastering luminance.
    pub max_display_mastering_luminance: u16,
    /// Minimum mastering luminance.
    pub min_display_mastering_luminance: u16,
    /// Maximum content light level.
    pub max_cll: u16,
    /// Maximum frame-average light level.
    pub max_fall: u16,
}

/// Kernel `struct hdr_output_metadata`, the payload of the
/// `HDR_OUTPUT_METADATA` connector property blob.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct HdrOutputMetadata {
    /// Which member of the kernel's union is in use.
    pub metadata_type: u32,
    /// Static metadata type 1 payload.
    pub hdmi_metadata_type1: HdrMetadataInfoframe,
    _padding: [u8; 2],
}

impl HdrOutputMetadata {
    /// Builds a PQ static-metadata-type-1 payload from mastering metadata.
    #[must_use]
    pub fn pq(metadata: &HdrMetadata) -> Self {
        Self {
            metadata_type: u32::from(HDMI_STATIC_METADATA_TYPE1),
            hdmi_metadata_type1: HdrMetadataInfoframe {
                eotf: EOTF_SMPTE_ST2084,
                metadata_type: HDMI_STATIC_METADATA_TYPE1,
                display_primaries: metadata.display_primaries,
                white_point: metadata.white_point,
                max_display_mastering_luminance: metadata.max_display_luminance,
                min_display_mastering_luminance: metadata.min_display_luminance,
                max_cll: metadata.max_content_light_level,
                max_fall: metadata.max_frame_average_light_level,
            },
            _padding: [0; 2],
        }
    }

    /// Returns the blob bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_names_match_kernel_enum_values() {
        assert_eq!(
            Colorspace::Rec601.color_encoding_name(),
            Some("ITU-R BT.601 YCbCr")
        );
        assert_eq!(
            Colorspace::Rec709.color_encoding_name(),
            Some("ITU-R BT.709 YCbCr")
        );
        assert_eq!(
            Colorspace::Rec2020.color_encoding_name(),
            Some("ITU-R BT.2020 YCbCr")
        );
        assert_eq!(Colorspace::Unknown.color_encoding_name(), None);
    }

    #[test]
    fn range_names_match_kernel_enum_values() {
        assert_eq!(
            ColorState::new(Colorspace::Rec709, true).color_range_name(),
            "YCbCr full range"
        );
        assert_eq!(
            ColorState::new(Colorspace::Rec709, false).color_range_name(),
            "YCbCr limited range"
        );
    }

    #[test]
    fn output_metadata_has_kernel_layout() {
        assert_eq!(size_of::<HdrMetadataInfoframe>(), 26);
        assert_eq!(size_of::<HdrOutputMetadata>(), 32);
    }

    #[test]
    fn zeroed_mastering_metadata_still_signals_pq() {
        let blob = HdrOutputMetadata::pq(&HdrMetadata::default());
        assert_eq!(blob.hdmi_metadata_type1.eotf, EOTF_SMPTE_ST2084);
        assert_eq!(blob.hdmi_metadata_type1.max_cll, 0);
        assert_eq!(blob.as_bytes().len(), 32);
        // metadata_type, then eotf = 2 at byte 4.
        assert_eq!(blob.as_bytes()[4], 2);
    }

    #[test]
    fn mastering_values_are_copied_into_the_infoframe() {
        let metadata = HdrMetadata {
            display_primaries: [
                Chromaticity { x: 35400, y: 14600 },
                Chromaticity { x: 8500, y: 39850 },
                Chromaticity { x: 6550, y: 2300 },
            ],
            white_point: Chromaticity { x: 15635, y: 16450 },
            max_display_luminance: 1000,
            min_display_luminance: 50,
            max_content_light_level: 800,
            max_frame_average_light_level: 400,
        };
        let frame = HdrOutputMetadata::pq(&metadata).hdmi_metadata_type1;
        assert_eq!(frame.display_primaries, metadata.display_primaries);
        assert_eq!(frame.white_point.x, 15635);
        assert_eq!(frame.max_display_mastering_luminance, 1000);
        assert_eq!(frame.min_display_mastering_luminance, 50);
        assert_eq!(frame.max_cll, 800);
        assert_eq!(frame.max_fall, 400);
    }
}
