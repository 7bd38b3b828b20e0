// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Direct-to-display presentation of hardware-decoded video.
//!
//! `scanout_core` takes decoded frames that live in DMA-BUFs, described by
//! DRM PRIME descriptors, and puts them on screen with as little work as
//! possible: either straight onto a KMS overlay plane, or as a single
//! external image handed to a GPU renderer. It is generic over the display
//! device and the GPU context, so everything here runs against fakes in
//! tests; the platform glue lives in `scanout_backend_drm` and
//! `scanout_backend_egl`.
//!
//! # Architecture
//!
//! ```text
//!   decoded frame
//!       │
//!       ▼
//!   PresentationSession ──► PrimeFrameSource::map_prime_frame()
//!       │
//!       ▼
//!   VideoPresenter::present(PrimeFrame)
//!       │
//!       ├── direct ───► adapter::normalize() ──► AddFB2
//!       │                      │
//!       │                      ▼
//!       │               Colorimetry::apply_if_changed() ──► SetPlane
//!       │                                                      │
//!       │                                     retire previous ◄┘
//!       │
//!       └── external ─► ExternalImageExporter ──► GPU renderer ──► free
//! ```
//!
//! **[`descriptor`]** and **[`adapter`]**: the PRIME frame data model and
//! its normalization into at most four `{handle, pitch, offset, modifier}`
//! planes, importing each memory object once.
//!
//! **[`presenter`]**: [`PlanePresenter`](presenter::PlanePresenter) owns the
//! framebuffer lifecycle. A framebuffer is destroyed only after its
//! successor is on the plane.
//!
//! **[`colorimetry`]**: writes `COLOR_RANGE`, `COLOR_ENCODING` and
//! `HDR_OUTPUT_METADATA` when the stream's color state changes and degrades
//! quietly when the hardware lacks them.
//!
//! **[`export`]** and **[`negotiate`]**: the external-image path and the rule
//! picking between the two paths.
//!
//! **[`session`]**: per-stream orchestration over either path.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! framebuffer lifecycle instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod adapter;
pub mod backend;
pub mod color;
pub mod colorimetry;
pub mod descriptor;
pub mod error;
pub mod export;
pub mod format;
pub mod geometry;
pub mod ids;
pub mod negotiate;
pub mod presenter;
pub mod property;
pub mod session;
pub mod trace;

#[cfg(test)]
mod fake;
