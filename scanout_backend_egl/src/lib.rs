// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! EGL backend for scanout.
//!
//! Implements [`ExternalImageApi`](scanout_core::export::ExternalImageApi) on
//! a display owned by the GPU renderer. Pair it with
//! [`ExternalImageExporter`](scanout_core::export::ExternalImageExporter):
//!
//! ```text
//!   EglImageApi::new(egl, display)
//!       │
//!       ▼
//!   ExternalImageExporter::initialize(api)   (checks EGL_EXT_image_dma_buf_import)
//!       │
//!       ▼
//!   export_external_image(frame) ──► sample ──► free_external_image(image)
//! ```
//!
//! The EGL library is loaded at runtime through `khronos-egl`'s `dynamic`
//! feature, so linking against `libEGL` is not required.

mod image;

pub use image::{EglImageApi, EglImageError};
pub use khronos_egl;
