// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Colorimetry controller: color range, color encoding and HDR output
//! metadata.
//!
//! [`Colorimetry`] remembers what it last applied and only touches the
//! device when the stream's signalling changes. Range and encoding are not
//! symmetric:
//!
//! - `COLOR_RANGE` is rewritten when the range **or** the colorspace
//!   changes. The first frame always counts as a colorspace change, so the
//!   range is applied at startup even if it matches the initial
//!   (limited-range) assumption.
//! - `COLOR_ENCODING` is rewritten only when the colorspace changes.
//!
//! After an attempt the new state is recorded as applied whether or not the
//! write succeeded; a rejected write is not retried until the signalling
//! changes again.
//!
//! Missing properties are not errors. They are logged and reported as
//! [`WriteOutcome::Unsupported`].

use crate::backend::DisplayDevice;
use crate::color::{ColorState, Colorspace, HdrMetadata, HdrOutputMetadata};
use crate::error::PropertyWriteFailure;
use crate::ids::{BlobId, ConnectorId, PlaneId, PropertyTarget};
use crate::property::{COLOR_ENCODING, COLOR_RANGE, ColorProperties, EnumProperty};
use crate::trace::{HdrModeEvent, PropertyWriteEvent, Tracer};

/// Result of one property write attempt.
#[derive(Debug)]
pub enum WriteOutcome {
    /// Nothing changed, so nothing was written.
    Unchanged,
    /// The value was written.
    Written(u64),
    /// The stream's value has no kernel counterpart (unknown colorspace).
    NotSignalled,
    /// The property has no enum entry with the wanted name.
    NoMatchingValue,
    /// The device rejected the write.
    WriteRejected(PropertyWriteFailure),
    /// The property does not exist on this device.
    Unsupported,
}

impl WriteOutcome {
    /// Whether the device was asked to write something.
    #[must_use]
    pub fn attempted(&self) -> bool {
        matches!(self, Self::Written(_) | Self::WriteRejected(_))
    }
}

/// Per-property report from [`Colorimetry::apply_if_changed`].
#[derive(Debug)]
pub struct ColorUpdate {
    /// `COLOR_RANGE`.
    pub range: WriteOutcome,
    /// `COLOR_ENCODING`.
    pub encoding: WriteOutcome,
}

/// Report from [`Colorimetry::set_hdr_mode`].
#[derive(Debug)]
pub struct HdrUpdate {
    /// Blob bound to the connector. [`BlobId::NONE`] when disabling or when
    /// the blob could not be created.
    pub blob: BlobId,
    /// Why the blob could not be created, if it could not.
    pub blob_failure: Option<PropertyWriteFailure>,
    /// Outcome of the `HDR_OUTPUT_METADATA` write.
    pub write: WriteOutcome,
}

/// Tracks and applies colorimetry for one plane and connector.
#[derive(Debug)]
pub struct Colorimetry {
    plane: PlaneId,
    connector: ConnectorId,
    props: ColorProperties,
    last_full_range: bool,
    last_colorspace: Option<Colorspace>,
    hdr_blob: Option<BlobId>,
    hdr_enabled: bool,
}

impl Colorimetry {
    /// Creates a controller with nothing applied yet.
    #[must_use]
    pub fn new(plane: PlaneId, connector: ConnectorId, props: ColorProperties) -> Self {
        Self {
            plane,
            connector,
            props,
            last_full_range: false,
            last_colorspace: None,
            hdr_blob: None,
            hdr_enabled: false,
        }
    }

    /// The discovered properties.
    #[must_use]
    pub fn properties(&self) -> &ColorProperties {
        &self.props
    }

    /// Whether the connector can carry HDR metadata.
    #[must_use]
    pub fn supports_hdr(&self) -> bool {
        self.props.hdr_output_metadata.is_some()
    }

    /// Whether HDR mode was last requested on.
    #[must_use]
    pub fn hdr_enabled(&self) -> bool {
        self.hdr_enabled
    }

    /// The live metadata blob, if any.
    #[must_use]
    pub fn hdr_blob(&self) -> Option<BlobId> {
        self.hdr_blob
    }

    /// The last applied color state, or `None` before the first frame.
    #[must_use]
    pub fn applied(&self) -> Option<ColorState> {
        self.last_colorspace
            .map(|colorspace| ColorState::new(colorspace, self.last_full_range))
    }

    /// Applies `color` if it differs from what was last applied.
    pub fn apply_if_changed<D: DisplayDevice>(
        &mut self,
        device: &D,
        color: ColorState,
    ) -> ColorUpdate {
        self.apply_if_changed_traced(device, color, &mut Tracer::none())
    }

    /// [`apply_if_changed`](Self::apply_if_changed) with trace events.
    pub fn apply_if_changed_traced<D: DisplayDevice>(
        &mut self,
        device: &D,
        color: ColorState,
        tracer: &mut Tracer<'_>,
    ) -> ColorUpdate {
        let colorspace_changed = self.last_colorspace != Some(color.colorspace);
        let target = PropertyTarget::Plane(self.plane);

        let mut range = WriteOutcome::Unchanged;
        if color.full_range != self.last_full_range || colorspace_changed {
            range = write_enum(
                device,
                target,
                self.props.color_range.as_ref(),
                COLOR_RANGE,
                color.color_range_name(),
                tracer,
            );
            self.last_full_range = color.full_range;
        }

        let mut encoding = WriteOutcome::Unchanged;
        if colorspace_changed {
            encoding = match color.colorspace.color_encoding_name() {
                Some(name) => write_enum(
                    device,
                    target,
                    self.props.color_encoding.as_ref(),
                    COLOR_ENCODING,
                    name,
                    tracer,
                ),
                None => WriteOutcome::NotSignalled,
            };
            self.last_colorspace = Some(color.colorspace);
        }

        ColorUpdate { range, encoding }
    }

    /// Enters or leaves HDR mode.
    ///
    /// Any existing metadata blob is destroyed first. When enabling, a new
    /// PQ blob is built from `metadata` (all zero if `None`) and bound to the
    /// connector; if the blob cannot be created the connector gets the null
    /// blob instead. When disabling, the null blob is written.
    pub fn set_hdr_mode<D: DisplayDevice>(
        &mut self,
        device: &D,
        enabled: bool,
        metadata: Option<&HdrMetadata>,
    ) -> HdrUpdate {
        self.set_hdr_mode_traced(device, enabled, metadata, &mut Tracer::none())
    }

    /// [`set_hdr_mode`](Self::set_hdr_mode) with trace events.
    pub fn set_hdr_mode_traced<D: DisplayDevice>(
        &mut self,
        device: &D,
        enabled: bool,
        metadata: Option<&HdrMetadata>,
        tracer: &mut Tracer<'_>,
    ) -> HdrUpdate {
        let Some(prop) = self.props.hdr_output_metadata else {
            if enabled {
                log::warn!(
                    "HDR_OUTPUT_METADATA is unavailable on this display, unable to enter HDR mode"
                );
            }
            return HdrUpdate {
                blob: BlobId::NONE,
                blob_failure: None,
                write: WriteOutcome::Unsupported,
            };
        };

        self.destroy_blob(device);
        self.hdr_enabled = enabled;

        let mut blob = BlobId::NONE;
        let mut blob_failure = None;
        if enabled {
            let payload = HdrOutputMetadata::pq(&metadata.copied().unwrap_or_default());
            match device.create_property_blob(&payload) {
                Ok(id) => {
                    self.hdr_blob = Some(id);
                    blob = id;
                }
                Err(err) => {
                    log::error!("failed to create HDR metadata blob: {err}");
                    blob_failure = Some(PropertyWriteFailure::CreateBlob(err));
                }
            }
        }

        let write = match device.set_property(
            PropertyTarget::Connector(self.connector),
            prop.id,
            u64::from(blob.0),
        ) {
            Ok(()) => {
                log::info!(
                    "set display HDR mode: {}",
                    if enabled { "enabled" } else { "disabled" }
                );
                WriteOutcome::Written(u64::from(blob.0))
            }
            Err(source) => {
                log::error!("failed to set {}: {source}", prop.name);
                WriteOutcome::WriteRejected(PropertyWriteFailure::Set {
                    name: prop.name,
                    property: prop.id,
                    source,
                })
            }
        };
        tracer.hdr_mode(&HdrModeEvent { enabled, blob });

        HdrUpdate {
            blob,
            blob_failure,
            write,
        }
    }

    /// Leaves HDR mode, destroys the metadata blob and forgets the
    /// properties. Calling it again does nothing.
    pub fn release<D: DisplayDevice>(&mut self, device: &D) {
        if self.supports_hdr() {
            self.set_hdr_mode(device, false, None);
        }
        self.destroy_blob(device);
        self.props = ColorProperties::NONE;
    }

    fn destroy_blob<D: DisplayDevice>(&mut self, device: &D) {
        if let Some(blob) = self.hdr_blob.take()
            && let Err(err) = device.destroy_property_blob(blob)
        {
            log::error!("failed to destroy HDR metadata blob {blob:?}: {err}");
        }
    }
}

fn write_enum<D: DisplayDevice>(
    device: &D,
    target: PropertyTarget,
    prop: Option<&EnumProperty>,
    prop_name: &'static str,
    value_name: &'static str,
    tracer: &mut Tracer<'_>,
) -> WriteOutcome {
    let Some(prop) = prop else {
        log::warn!("{prop_name} property does not exist on output plane, colors may be inaccurate");
        return WriteOutcome::Unsupported;
    };
    let Some(value) = prop.value_for(value_name) else {
        log::warn!(
            "unable to find matching {prop_name} value for '{value_name}', colors may be inaccurate"
        );
        return WriteOutcome::NoMatchingValue;
    };

    let result = device.set_property(target, prop.handle.id, value);
    tracer.property_write(&PropertyWriteEvent {
        name: prop_name,
        value_name,
        value,
        accepted: result.is_ok(),
    });
    match result {
        Ok(()) => {
            log::info!("{prop_name}: {value_name}");
            WriteOutcome::Written(value)
        }
        Err(source) => {
            log::error!("failed to set {prop_name}: {source}");
            WriteOutcome::WriteRejected(PropertyWriteFailure::Set {
                name: prop_name,
                property: prop.handle.id,
                source,
            })
        }
    }
}
