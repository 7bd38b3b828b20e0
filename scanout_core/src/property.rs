// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! KMS property handles discovered by name.

use crate::ids::PropertyId;

/// Plane property selecting the YCbCr to RGB matrix.
pub const COLOR_ENCODING: &str = "COLOR_ENCODING";
/// Plane property selecting the YCbCr quantization range.
pub const COLOR_RANGE: &str = "COLOR_RANGE";
/// Connector property carrying the HDR static metadata blob.
pub const HDR_OUTPUT_METADATA: &str = "HDR_OUTPUT_METADATA";

/// A property found on a KMS object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyHandle {
    /// Property id.
    pub id: PropertyId,
    /// Property name as looked up.
    pub name: &'static str,
}

/// An enum-typed property with its name to value table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumProperty {
    /// The property.
    pub handle: PropertyHandle,
    /// Enum entries in the order the kernel reported them.
    pub enums: Vec<(String, u64)>,
}

impl EnumProperty {
    /// Creates an enum property from its entries.
    #[must_use]
    pub fn new(handle: PropertyHandle, enums: Vec<(String, u64)>) -> Self {
        Self { handle, enums }
    }

    /// Returns the value whose name matches `name` exactly.
    #[must_use]
    pub fn value_for(&self, name: &str) -> Option<u64> {
        self.enums
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|&(_, value)| value)
    }
}

/// The colorimetry properties of one plane and connector.
///
/// Every field is optional: drivers that lack a property simply do not get
/// the corresponding writes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorProperties {
    /// `COLOR_ENCODING` on the overlay plane.
    pub color_encoding: Option<EnumProperty>,
    /// `COLOR_RANGE` on the overlay plane.
    pub color_range: Option<EnumProperty>,
    /// `HDR_OUTPUT_METADATA` on the connector.
    pub hdr_output_metadata: Option<PropertyHandle>,
}

impl ColorProperties {
    /// No colorimetry properties at all.
    pub const NONE: Self = Self {
        color_encoding: None,
        color_range: None,
        hdr_output_metadata: None,
    };
}
