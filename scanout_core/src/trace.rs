// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the presentation path.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! presenter, the colorimetry controller and the session call as kernel
//! objects come and go. All method bodies default to no-ops, so implementing
//! only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! These events are independent of the `log` output: logs are for humans
//! reading a session, trace events are for tools checking it (see the
//! lifecycle checker in `scanout_debug`).
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use crate::format::Fourcc;
use crate::geometry::PlaneRect;
use crate::ids::{BlobId, FramebufferId, PlaneId};
use crate::negotiate::{PathReason, PresentationPath};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Why a framebuffer was destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RetireReason {
    /// A newer framebuffer is on screen.
    Superseded,
    /// The plane update was rejected; this framebuffer never reached the
    /// screen.
    Rejected,
    /// The presenter is shutting down.
    Shutdown,
}

/// Where in the per-frame pipeline a frame was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropStage {
    /// The backend could not map the frame.
    Map,
    /// Buffer import failed.
    Import,
    /// Framebuffer creation failed.
    Framebuffer,
    /// The plane update failed.
    Commit,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a framebuffer is created for a frame.
#[derive(Clone, Copy, Debug)]
pub struct FramebufferEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// The new framebuffer.
    pub framebuffer: FramebufferId,
    /// Pixel format.
    pub format: Fourcc,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Whether format modifiers were passed.
    pub explicit_modifiers: bool,
}

/// Emitted when a framebuffer is destroyed.
#[derive(Clone, Copy, Debug)]
pub struct FramebufferRetireEvent {
    /// Frame counter at the time of destruction.
    pub frame_index: u64,
    /// The destroyed framebuffer.
    pub framebuffer: FramebufferId,
    /// Why it was destroyed.
    pub reason: RetireReason,
}

/// Emitted when a framebuffer is attached to the overlay plane.
#[derive(Clone, Copy, Debug)]
pub struct PlaneCommitEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The overlay plane.
    pub plane: PlaneId,
    /// The framebuffer now on screen.
    pub framebuffer: FramebufferId,
    /// Destination rectangle.
    pub dst: PlaneRect,
}

/// Emitted for every colorimetry property write attempt.
#[derive(Clone, Copy, Debug)]
pub struct PropertyWriteEvent {
    /// Property name.
    pub name: &'static str,
    /// Semantic value, e.g. `"YCbCr full range"`.
    pub value_name: &'static str,
    /// Raw value written.
    pub value: u64,
    /// Whether the device accepted the write.
    pub accepted: bool,
}

/// Emitted when the output enters or leaves HDR mode.
#[derive(Clone, Copy, Debug)]
pub struct HdrModeEvent {
    /// Requested mode.
    pub enabled: bool,
    /// Blob bound to the connector ([`BlobId::NONE`] when disabled or when
    /// blob creation failed).
    pub blob: BlobId,
}

/// Emitted when a frame is dropped.
#[derive(Clone, Copy, Debug)]
pub struct FrameDroppedEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Failing stage.
    pub stage: DropStage,
}

/// Emitted once when a session picks its presentation path.
#[derive(Clone, Copy, Debug)]
pub struct PathSelectedEvent {
    /// The chosen path.
    pub path: PresentationPath,
    /// Which rule decided.
    pub reason: PathReason,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the presentation path.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after a framebuffer is created.
    fn on_framebuffer_created(&mut self, e: &FramebufferEvent) {
        _ = e;
    }

    /// Called after a framebuffer is destroyed.
    fn on_framebuffer_retired(&mut self, e: &FramebufferRetireEvent) {
        _ = e;
    }

    /// Called after a successful plane update.
    fn on_plane_commit(&mut self, e: &PlaneCommitEvent) {
        _ = e;
    }

    /// Called for each colorimetry property write.
    fn on_property_write(&mut self, e: &PropertyWriteEvent) {
        _ = e;
    }

    /// Called after an HDR mode change.
    fn on_hdr_mode(&mut self, e: &HdrModeEvent) {
        _ = e;
    }

    /// Called when a frame is dropped.
    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        _ = e;
    }

    /// Called when a session picks its path.
    fn on_path_selected(&mut self, e: &PathSelectedEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! dispatch {
    ($(#[$meta:meta])* $name:ident => $method:ident($event:ty)) => {
        $(#[$meta])*
        #[inline]
        pub fn $name(&mut self, e: &$event) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$method(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    dispatch! {
        /// Emits a [`FramebufferEvent`].
        framebuffer_created => on_framebuffer_created(FramebufferEvent)
    }

    dispatch! {
        /// Emits a [`FramebufferRetireEvent`].
        framebuffer_retired => on_framebuffer_retired(FramebufferRetireEvent)
    }

    dispatch! {
        /// Emits a [`PlaneCommitEvent`].
        plane_commit => on_plane_commit(PlaneCommitEvent)
    }

    dispatch! {
        /// Emits a [`PropertyWriteEvent`].
        property_write => on_property_write(PropertyWriteEvent)
    }

    dispatch! {
        /// Emits an [`HdrModeEvent`].
        hdr_mode => on_hdr_mode(HdrModeEvent)
    }

    dispatch! {
        /// Emits a [`FrameDroppedEvent`].
        frame_dropped => on_frame_dropped(FrameDroppedEvent)
    }

    dispatch! {
        /// Emits a [`PathSelectedEvent`].
        path_selected => on_path_selected(PathSelectedEvent)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
