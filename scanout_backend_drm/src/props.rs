// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Colorimetry property discovery.
//!
//! Properties are looked up by name once per output. Names are matched
//! exactly; anything missing or of the wrong type is left out and the
//! colorimetry controller skips it.

use std::io;

use drm::control::{self, ResourceHandle, property};
use scanout_core::ids::{ConnectorId, PlaneId, PropertyId};
use scanout_core::property::{
    COLOR_ENCODING, COLOR_RANGE, ColorProperties, EnumProperty, HDR_OUTPUT_METADATA,
    PropertyHandle,
};

use crate::device::object;

/// A property as reported by the kernel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PropertyInfo {
    pub(crate) id: PropertyId,
    pub(crate) name: String,
    /// Enum entries, for enum-typed properties.
    pub(crate) enums: Option<Vec<(String, u64)>>,
}

fn read_properties<T: ResourceHandle>(
    device: &impl control::Device,
    handle: T,
) -> io::Result<Vec<PropertyInfo>> {
    let set = device.get_properties(handle)?;
    let mut infos = Vec::new();
    for (prop, _) in set {
        let info = match device.get_property(prop) {
            Ok(info) => info,
            Err(err) => {
                log::debug!("skipping unreadable property {prop:?}: {err}");
                continue;
            }
        };
        let enums = match info.value_type() {
            property::ValueType::Enum(values) => Some(
                values
                    .values()
                    .1
                    .iter()
                    .map(|entry| (entry.name().to_string_lossy().into_owned(), entry.value()))
                    .collect(),
            ),
            _ => None,
        };
        infos.push(PropertyInfo {
            id: PropertyId(u32::from(prop)),
            name: info.name().to_string_lossy().into_owned(),
            enums,
        });
    }
    Ok(infos)
}

fn enum_property(infos: &[PropertyInfo], name: &'static str) -> Option<EnumProperty> {
    let info = infos.iter().find(|info| info.name == name)?;
    match &info.enums {
        Some(enums) => Some(EnumProperty::new(
            PropertyHandle { id: info.id, name },
            enums.clone(),
        )),
        None => {
            log::warn!("{name} is not an enum property, ignoring it");
            None
        }
    }
}

/// Picks the colorimetry properties out of the plane and connector lists.
pub(crate) fn collect_color_properties(
    plane: &[PropertyInfo],
    connector: &[PropertyInfo],
) -> ColorProperties {
    let props = ColorProperties {
        color_encoding: enum_property(plane, COLOR_ENCODING),
        color_range: enum_property(plane, COLOR_RANGE),
        hdr_output_metadata: connector
            .iter()
            .find(|info| info.name == HDR_OUTPUT_METADATA)
            .map(|info| PropertyHandle {
                id: info.id,
                name: HDR_OUTPUT_METADATA,
            }),
    };
    for (name, found) in [
        (COLOR_ENCODING, props.color_encoding.is_some()),
        (COLOR_RANGE, props.color_range.is_some()),
        (HDR_OUTPUT_METADATA, props.hdr_output_metadata.is_some()),
    ] {
        if !found {
            log::info!("{name} is not available on this output");
        }
    }
    props
}

/// Looks up `COLOR_ENCODING` and `COLOR_RANGE` on `plane` and
/// `HDR_OUTPUT_METADATA` on `connector`.
pub fn discover_color_properties(
    device: &impl control::Device,
    plane: PlaneId,
    connector: ConnectorId,
) -> io::Result<ColorProperties> {
    let plane_props = read_properties(
        device,
        object::<control::plane::Handle>(plane.0, "plane")?,
    )?;
    let connector_props = read_properties(
        device,
        object::<control::connector::Handle>(connector.0, "connector")?,
    )?;
    Ok(collect_color_properties(&plane_props, &connector_props))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: u32, name: &str, enums: Option<&[(&str, u64)]>) -> PropertyInfo {
        PropertyInfo {
            id: PropertyId(id),
            name: name.to_owned(),
            enums: enums.map(|e| e.iter().map(|&(n, v)| (n.to_owned(), v)).collect()),
        }
    }

    #[test]
    fn finds_all_three_properties() {
        let plane = [
            info(1, "type", Some(&[("Overlay", 0), ("Primary", 1)])),
            info(
                2,
                COLOR_ENCODING,
                Some(&[("ITU-R BT.601 YCbCr", 0), ("ITU-R BT.709 YCbCr", 1)]),
            ),
            info(
                3,
                COLOR_RANGE,
                Some(&[("YCbCr limited range", 0), ("YCbCr full range", 1)]),
            ),
        ];
        let connector = [info(9, HDR_OUTPUT_METADATA, None)];

        let props = collect_color_properties(&plane, &connector);
        let encoding = props.color_encoding.unwrap();
        assert_eq!(encoding.handle.id, PropertyId(2));
        assert_eq!(encoding.value_for("ITU-R BT.709 YCbCr"), Some(1));
        assert_eq!(
            props.color_range.unwrap().value_for("YCbCr full range"),
            Some(1)
        );
        assert_eq!(props.hdr_output_metadata.unwrap().id, PropertyId(9));
    }

    #[test]
    fn names_match_exactly() {
        let plane = [info(2, "color_encoding", Some(&[("ITU-R BT.709 YCbCr", 1)]))];
        let props = collect_color_properties(&plane, &[]);
        assert_eq!(props, ColorProperties::NONE);
    }

    #[test]
    fn non_enum_color_properties_are_ignored() {
        let plane = [info(3, COLOR_RANGE, None)];
        let props = collect_color_properties(&plane, &[]);
        assert!(props.color_range.is_none());
    }

    #[test]
    fn properties_are_looked_up_on_the_right_object() {
        // HDR metadata lives on the connector, not the plane.
        let plane = [info(9, HDR_OUTPUT_METADATA, None)];
        let props = collect_color_properties(&plane, &[]);
        assert!(props.hdr_output_metadata.is_none());
    }
}
