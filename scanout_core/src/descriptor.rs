// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DRM PRIME frame descriptors as produced by hardware decoders.
//!
//! A [`PrimeFrame`] describes a decoded picture as a set of DMA-BUF memory
//! *objects* and a set of *layers*, each of which is made of *planes* that
//! point into those objects. Several planes may live in the same object
//! (NV12 from most VA-API drivers is a single object with two planes).
//!
//! The file descriptors are borrowed: the decoder owns the memory and keeps
//! it alive at least until the descriptor is dropped or unmapped.

use std::os::fd::BorrowedFd;

use crate::color::ColorState;
use crate::format::{Fourcc, MODIFIER_INVALID};

/// Maximum number of memory objects in one descriptor.
pub const MAX_OBJECTS: usize = 4;

/// Maximum number of planes in one layer.
pub const MAX_PLANES: usize = 4;

/// One DMA-BUF memory object.
#[derive(Clone, Copy, Debug)]
pub struct PrimeObject<'a> {
    /// DMA-BUF file descriptor, owned by the decoder.
    pub fd: BorrowedFd<'a>,
    /// Total size of the object in bytes.
    pub size: usize,
    /// Layout modifier, or [`MODIFIER_INVALID`] when the layout is implicit.
    pub format_modifier: u64,
}

impl<'a> PrimeObject<'a> {
    /// Creates an object with no explicit layout modifier.
    #[must_use]
    pub fn new(fd: BorrowedFd<'a>, size: usize) -> Self {
        Self {
            fd,
            size,
            format_modifier: MODIFIER_INVALID,
        }
    }

    /// Sets the layout modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: u64) -> Self {
        self.format_modifier = modifier;
        self
    }
}

/// One plane of a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PrimePlane {
    /// Index into [`PrimeFrame::objects`].
    pub object_index: usize,
    /// Byte offset of the plane within its object.
    pub offset: u32,
    /// Bytes per row.
    pub pitch: u32,
}

/// A layer: a set of planes forming one image in a single pixel format.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PrimeLayer {
    /// Pixel format of the composed layer.
    pub format: Fourcc,
    /// Planes in format order (luma first for YUV formats).
    pub planes: Vec<PrimePlane>,
}

/// A decoded frame in DRM PRIME form.
#[derive(Clone, Debug)]
pub struct PrimeFrame<'a> {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Memory objects backing the frame.
    pub objects: Vec<PrimeObject<'a>>,
    /// Layers. Scanout and EGL import both require exactly one composed layer.
    pub layers: Vec<PrimeLayer>,
    /// Colorimetry signalled by the stream for this frame.
    pub color: ColorState,
}

impl<'a> PrimeFrame<'a> {
    /// Creates a single-layer frame.
    #[must_use]
    pub fn composed(
        width: u32,
        height: u32,
        objects: Vec<PrimeObject<'a>>,
        layer: PrimeLayer,
        color: ColorState,
    ) -> Self {
        Self {
            width,
            height,
            objects,
            layers: vec![layer],
            color,
        }
    }

    /// Returns the composed layer, if the frame has exactly one.
    #[must_use]
    pub fn composed_layer(&self) -> Option<&PrimeLayer> {
        match self.layers.as_slice() {
            [layer] => Some(layer),
            _ => None,
        }
    }

    /// Returns the native size of the frame as a [`kurbo::Size`].
    #[must_use]
    pub fn size(&self) -> kurbo::Size {
        kurbo::Size::new(f64::from(self.width), f64::from(self.height))
    }
}
