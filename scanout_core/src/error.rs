// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy.
//!
//! Per-frame failures never abort the session: an [`ImportFailure`] or a
//! [`CommitFailure`] drops the frame and leaves the previous one on screen.
//! [`PropertyWriteFailure`] is only ever reported, never returned as an
//! `Err`. [`CapabilityAbsent`] is fatal only while a path is being set up.

use std::io;

use crate::ids::{FramebufferId, PlaneId, PropertyId};

/// A decoded frame could not be turned into buffer handles or an image.
#[derive(Debug, thiserror::Error)]
pub enum ImportFailure {
    /// The descriptor does not carry exactly one composed layer.
    #[error("frame has {0} layers, expected exactly one composed layer")]
    LayerCount(usize),
    /// The descriptor is internally inconsistent.
    #[error("malformed frame descriptor: {0}")]
    Descriptor(&'static str),
    /// Importing a DMA-BUF object into the display device failed.
    #[error("failed to import DMA-BUF object {object}")]
    Handle {
        /// Index of the object in the descriptor.
        object: usize,
        /// Error reported by the device.
        #[source]
        source: io::Error,
    },
    /// The GPU context rejected the external image.
    #[error("failed to create external image")]
    ExternalImage(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The backend could not map the frame to a DRM PRIME descriptor.
    #[error("decode backend could not map the frame")]
    Unmappable,
}

/// The display engine rejected a framebuffer or a plane update.
#[derive(Debug, thiserror::Error)]
pub enum CommitFailure {
    /// `AddFB2` failed. The previous framebuffer is still on screen.
    #[error("failed to create framebuffer")]
    Framebuffer(#[source] io::Error),
    /// `SetPlane` failed. The new framebuffer has been destroyed and the
    /// previous one is still on screen.
    #[error("failed to attach {framebuffer:?} to {plane:?}")]
    Plane {
        /// The overlay plane.
        plane: PlaneId,
        /// The framebuffer that was rejected.
        framebuffer: FramebufferId,
        /// Error reported by the device.
        #[source]
        source: io::Error,
    },
}

/// A property write or blob operation was rejected.
#[derive(Debug, thiserror::Error)]
pub enum PropertyWriteFailure {
    /// Setting the property value failed.
    #[error("failed to set property {name} ({property:?})")]
    Set {
        /// Property name.
        name: &'static str,
        /// Property id.
        property: PropertyId,
        /// Error reported by the device.
        #[source]
        source: io::Error,
    },
    /// Creating the HDR metadata blob failed.
    #[error("failed to create HDR metadata blob")]
    CreateBlob(#[source] io::Error),
}

/// A required device capability is missing.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityAbsent {
    /// A required extension is not exposed.
    #[error("required extension {0} is not supported")]
    Extension(&'static str),
    /// The image creation entry points are not available.
    #[error("no EGL image creation entry points are available")]
    ImageEntryPoints,
    /// A required KMS object or property does not exist.
    #[error("{0} is not available on this device")]
    Property(&'static str),
    /// The device could not be opened or queried.
    #[error("display device is unavailable")]
    Device(#[source] io::Error),
}

/// Umbrella error for one presented frame.
#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    /// The frame could not be imported.
    #[error(transparent)]
    Import(#[from] ImportFailure),
    /// The frame could not be committed.
    #[error(transparent)]
    Commit(#[from] CommitFailure),
    /// The GPU renderer failed to draw an exported image.
    #[error("renderer failed to draw the frame")]
    Render(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The presenter has been shut down.
    #[error("presenter has been shut down")]
    ShutDown,
}
