// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, recording and lifecycle checking for scanout
//! diagnostics.
//!
//! This crate provides [`TraceSink`](scanout_core::trace::TraceSink)
//! implementations for development and tests:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: keeps every event in memory.
//! - [`lifecycle::check`]: replays a recording and verifies that framebuffers
//!   are created, shown and destroyed in a valid order.

pub mod lifecycle;
pub mod pretty;
pub mod recorder;

#[cfg(test)]
mod presenter_replay;
