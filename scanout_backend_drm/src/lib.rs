// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! KMS backend for scanout.
//!
//! This crate implements [`DisplayDevice`](scanout_core::backend::DisplayDevice)
//! over the kernel mode-setting interface:
//!
//! - PRIME fd import and GEM handle release
//! - `AddFB2` with per-plane format modifiers, `RmFB`
//! - legacy `SetPlane` on a single overlay plane
//! - `COLOR_ENCODING` / `COLOR_RANGE` / `HDR_OUTPUT_METADATA` discovery and
//!   writes, including the HDR metadata blob
//!
//! [`DrmOutput`] ties a device to one plane, CRTC and connector and hands out
//! a [`PlanePresenter`](scanout_core::presenter::PlanePresenter).

mod device;
mod output;
mod props;

pub use device::{DeviceFd, DrmDevice};
pub use output::DrmOutput;
pub use props::discover_color_properties;
