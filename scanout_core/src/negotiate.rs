// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Choosing between direct scanout and external-image export.
//!
//! Direct scanout puts decoded frames on an overlay plane with no GPU work
//! and is the only path that can carry HDR metadata to the sink. The
//! external-image path hands frames to a GPU renderer instead, which works
//! on more hardware and composes with a regular windowed UI. The rule is:
//!
//! 1. `DRM_FORCE_DIRECT=1` in the environment: direct.
//! 2. `DRM_FORCE_EGL=1` in the environment: external.
//! 3. Direct scanout is available and the stream is 10-bit/HDR: direct.
//! 4. Otherwise: external.
//!
//! The decision is recomputed on every call; nothing is cached.

use std::env;

/// Environment variable forcing direct scanout.
pub const FORCE_DIRECT_VAR: &str = "DRM_FORCE_DIRECT";
/// Environment variable forcing external-image export.
pub const FORCE_EXTERNAL_VAR: &str = "DRM_FORCE_EGL";

/// The two presentation paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PresentationPath {
    /// Frames go straight to a KMS overlay plane.
    Direct,
    /// Frames are exported as external images for a GPU renderer.
    External,
}

/// Which rule selected a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathReason {
    /// The direct override was set.
    ForcedDirect,
    /// The external override was set.
    ForcedExternal,
    /// HDR output needs the direct path.
    Hdr,
    /// No rule applied; external export is the default.
    Default,
    /// External export was chosen but could not be initialized.
    ExternalUnavailable,
}

/// User overrides for path selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderOverrides {
    /// Always use direct scanout.
    pub force_direct: bool,
    /// Always use external-image export (ignored if `force_direct` is set).
    pub force_external: bool,
}

impl RenderOverrides {
    /// No overrides.
    pub const NONE: Self = Self {
        force_direct: false,
        force_external: false,
    };

    /// Reads the overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the overrides through `lookup`. A variable counts as set only
    /// when its value is exactly `"1"`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_set = |name: &str| lookup(name).as_deref() == Some("1");
        Self {
            force_direct: is_set(FORCE_DIRECT_VAR),
            force_external: is_set(FORCE_EXTERNAL_VAR),
        }
    }
}

/// Picks a path and reports which rule decided.
#[must_use]
pub fn select_path(
    overrides: &RenderOverrides,
    supports_direct: bool,
    hdr_active: bool,
) -> (PresentationPath, PathReason) {
    if overrides.force_direct {
        (PresentationPath::Direct, PathReason::ForcedDirect)
    } else if overrides.force_external {
        (PresentationPath::External, PathReason::ForcedExternal)
    } else if supports_direct && hdr_active {
        (PresentationPath::Direct, PathReason::Hdr)
    } else {
        (PresentationPath::External, PathReason::Default)
    }
}

/// Whether frames should be exported as external images.
pub fn can_export_external(
    overrides: &RenderOverrides,
    supports_direct: bool,
    hdr_active: bool,
) -> bool {
    let (path, reason) = select_path(overrides, supports_direct, hdr_active);
    match reason {
        PathReason::ForcedDirect => {
            log::info!("using direct rendering due to {FORCE_DIRECT_VAR}");
        }
        PathReason::ForcedExternal => {
            log::info!("using external-image rendering due to {FORCE_EXTERNAL_VAR}");
        }
        PathReason::Hdr => log::info!("using direct rendering for HDR support"),
        PathReason::Default | PathReason::ExternalUnavailable => {
            log::info!("display backend supports exporting external images");
        }
    }
    path == PresentationPath::External
}
