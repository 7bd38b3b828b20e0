// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Buffer descriptor normalization.
//!
//! [`normalize`] turns a [`PrimeFrame`] into an ordered list of
//! [`NormalizedPlane`]s: one `{handle, pitch, offset, modifier}` entry per
//! plane of the composed layer. The handle type is chosen by the
//! [`HandleImporter`]: [`ImportedHandles`] yields device buffer handles for
//! framebuffer creation, [`RawFdImporter`] passes the DMA-BUF descriptors
//! through for EGL import.
//!
//! Each memory object is imported at most once per frame, no matter how
//! many planes point into it.

use core::fmt::Debug;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};

use crate::backend::DisplayDevice;
use crate::descriptor::{MAX_OBJECTS, MAX_PLANES, PrimeFrame};
use crate::error::ImportFailure;
use crate::format::{Fourcc, is_explicit_modifier};

/// Resolves DMA-BUF descriptors to some handle type.
pub trait HandleImporter {
    /// The resolved handle.
    type Handle: Copy + Debug + Eq;

    /// Resolves one memory object.
    fn import(&mut self, fd: BorrowedFd<'_>) -> io::Result<Self::Handle>;
}

/// Passes DMA-BUF descriptors through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawFdImporter;

impl HandleImporter for RawFdImporter {
    type Handle = RawFd;

    fn import(&mut self, fd: BorrowedFd<'_>) -> io::Result<RawFd> {
        Ok(fd.as_raw_fd())
    }
}

/// Imports DMA-BUFs into a display device and closes the resulting handles
/// when dropped.
///
/// The decoder's descriptors are never closed. Each distinct handle is
/// closed once, and none are closed when the device reports that it does not
/// own them (see [`DisplayDevice::owns_imported_handles`]).
pub struct ImportedHandles<'d, D: DisplayDevice> {
    device: &'d D,
    handles: Vec<D::BufferHandle>,
    close_on_drop: bool,
}

impl<D: DisplayDevice> Debug for ImportedHandles<'_, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImportedHandles")
            .field("handles", &self.handles)
            .field("close_on_drop", &self.close_on_drop)
            .finish_non_exhaustive()
    }
}

impl<'d, D: DisplayDevice> ImportedHandles<'d, D> {
    /// Creates an empty handle set for `device`.
    #[must_use]
    pub fn new(device: &'d D) -> Self {
        Self {
            device,
            handles: Vec::with_capacity(MAX_OBJECTS),
            close_on_drop: device.owns_imported_handles(),
        }
    }

    /// Distinct handles imported so far.
    #[must_use]
    pub fn handles(&self) -> &[D::BufferHandle] {
        &self.handles
    }
}

impl<D: DisplayDevice> HandleImporter for ImportedHandles<'_, D> {
    type Handle = D::BufferHandle;

    fn import(&mut self, fd: BorrowedFd<'_>) -> io::Result<D::BufferHandle> {
        let handle = self.device.import_prime_fd(fd)?;
        // Two descriptors of one buffer import to the same handle.
        if !self.handles.contains(&handle) {
            self.handles.push(handle);
        }
        Ok(handle)
    }
}

impl<D: DisplayDevice> Drop for ImportedHandles<'_, D> {
    fn drop(&mut self) {
        if !self.close_on_drop {
            self.handles.clear();
            return;
        }
        for handle in self.handles.drain(..) {
            if let Err(err) = self.device.close_buffer(handle) {
                log::error!("failed to close buffer handle {handle:?}: {err}");
            }
        }
    }
}

/// One plane, resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NormalizedPlane<H> {
    /// Handle of the memory object holding the plane.
    pub handle: H,
    /// Bytes per row.
    pub pitch: u32,
    /// Byte offset within the object.
    pub offset: u32,
    /// Layout modifier of the object.
    pub modifier: u64,
}

/// A composed layer, resolved.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NormalizedPlanes<H> {
    /// Pixel format.
    pub format: Fourcc,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Planes in format order, at most [`MAX_PLANES`].
    pub planes: Vec<NormalizedPlane<H>>,
}

impl<H> NormalizedPlanes<H> {
    /// Whether any plane carries a modifier other than `INVALID`.
    #[must_use]
    pub fn has_explicit_modifiers(&self) -> bool {
        self.planes
            .iter()
            .any(|plane| is_explicit_modifier(plane.modifier))
    }
}

/// Resolves the composed layer of `frame` through `importer`.
///
/// A frame must carry exactly one composed layer; anything else is a decoder
/// contract violation. Debug builds assert, release builds drop the frame.
pub fn normalize<I: HandleImporter>(
    frame: &PrimeFrame<'_>,
    importer: &mut I,
) -> Result<NormalizedPlanes<I::Handle>, ImportFailure> {
    debug_assert_eq!(
        frame.layers.len(),
        1,
        "frame must carry exactly one composed layer"
    );
    let Some(layer) = frame.composed_layer() else {
        return Err(ImportFailure::LayerCount(frame.layers.len()));
    };
    if frame.objects.len() > MAX_OBJECTS {
        return Err(ImportFailure::Descriptor("more than four memory objects"));
    }
    if layer.planes.is_empty() {
        return Err(ImportFailure::Descriptor("layer has no planes"));
    }
    if layer.planes.len() > MAX_PLANES {
        return Err(ImportFailure::Descriptor("more than four planes"));
    }

    let mut resolved: [Option<I::Handle>; MAX_OBJECTS] = [None; MAX_OBJECTS];
    let mut planes = Vec::with_capacity(layer.planes.len());
    for plane in &layer.planes {
        let Some(object) = frame.objects.get(plane.object_index) else {
            return Err(ImportFailure::Descriptor("plane refers to a missing object"));
        };
        let handle = match resolved[plane.object_index] {
            Some(handle) => handle,
            None => {
                let handle =
                    importer
                        .import(object.fd)
                        .map_err(|source| ImportFailure::Handle {
                            object: plane.object_index,
                            source,
                        })?;
                resolved[plane.object_index] = Some(handle);
                handle
            }
        };
        planes.push(NormalizedPlane {
            handle,
            pitch: plane.pitch,
            offset: plane.offset,
            modifier: object.format_modifier,
        });
    }

    Ok(NormalizedPlanes {
        format: layer.format,
        width: frame.width,
        height: frame.height,
        planes,
    })
}
