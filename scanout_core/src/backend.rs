// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contracts for the collaborators around the presentation core.
//!
//! Scanout splits platform work into *backend* crates and leaves decoding,
//! windowing and the streaming protocol to the embedding application. The
//! core talks to all of them through the traits in this module:
//!
//! - **Display device**: implements [`DisplayDevice`] over the kernel's
//!   mode-setting interface (`scanout_backend_drm`). It imports DMA-BUFs,
//!   creates framebuffers, moves the overlay plane and writes properties.
//!
//! - **Decode backend**: implements [`PrimeFrameSource`] when decoded
//!   frames are not already in DRM PRIME form (for example VA-API surfaces
//!   that have to be exported first). Frames that already carry a
//!   descriptor implement [`DecodedFrame`] instead.
//!
//! - **HDR metadata**: the streaming session implements
//!   [`HdrMetadataSource`]. Hosts that never send mastering metadata return
//!   `None`.
//!
//! - **Presenter**: the two presentation paths implement [`VideoPresenter`],
//!   which is what [`PresentationSession`](crate::session::PresentationSession)
//!   drives per frame.
//!
//! # Crate boundaries
//!
//! `scanout_core` owns the data model, the per-frame logic and these
//! contracts. Backend crates depend on `scanout_core` and provide the
//! platform glue. Application code depends on both and wires them together.

use core::fmt::Debug;
use std::io;
use std::os::fd::BorrowedFd;

use bitflags::bitflags;

use crate::adapter::NormalizedPlanes;
use crate::color::{HdrMetadata, HdrOutputMetadata};
use crate::descriptor::PrimeFrame;
use crate::error::PresentError;
use crate::geometry::{PlaneRect, SourceRect};
use crate::ids::{BlobId, CrtcId, FramebufferId, PlaneId, PropertyId, PropertyTarget};
use crate::negotiate::PresentationPath;

bitflags! {
    /// Flags for framebuffer creation.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FramebufferFlags: u32 {
        /// Per-plane format modifiers are supplied (`DRM_MODE_FB_MODIFIERS`).
        const MODIFIERS = 1 << 1;
    }
}

/// A request to wrap imported planes in a framebuffer.
#[derive(Clone, Copy, Debug)]
pub struct FramebufferRequest<'a, H> {
    /// The planes, in format order.
    pub planes: &'a NormalizedPlanes<H>,
    /// Creation flags.
    pub flags: FramebufferFlags,
}

impl<'a, H> FramebufferRequest<'a, H> {
    /// Builds a request, setting [`FramebufferFlags::MODIFIERS`] if and only
    /// if some plane carries an explicit modifier.
    #[must_use]
    pub fn new(planes: &'a NormalizedPlanes<H>) -> Self {
        let flags = if planes.has_explicit_modifiers() {
            FramebufferFlags::MODIFIERS
        } else {
            FramebufferFlags::empty()
        };
        Self { planes, flags }
    }

    /// Per-plane modifiers, present only when the flag is set.
    pub fn modifiers(&self) -> Option<impl Iterator<Item = u64> + '_> {
        self.flags
            .contains(FramebufferFlags::MODIFIERS)
            .then(|| self.planes.planes.iter().map(|plane| plane.modifier))
    }
}

/// One overlay plane update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneCommit {
    /// The overlay plane.
    pub plane: PlaneId,
    /// The CRTC driving the output.
    pub crtc: CrtcId,
    /// Framebuffer to scan out.
    pub framebuffer: FramebufferId,
    /// Destination in CRTC coordinates.
    pub dst: PlaneRect,
    /// Source region of the framebuffer.
    pub src: SourceRect,
}

/// The kernel display subsystem, as seen by the presenter.
///
/// Methods take `&self` because the underlying ioctls do; implementations
/// that need to record state use interior mutability.
pub trait DisplayDevice {
    /// Device-local buffer handle (a GEM handle for KMS).
    type BufferHandle: Copy + Debug + Eq;

    /// Imports a DMA-BUF into the device.
    fn import_prime_fd(&self, fd: BorrowedFd<'_>) -> io::Result<Self::BufferHandle>;

    /// Releases a handle returned by [`import_prime_fd`](Self::import_prime_fd).
    fn close_buffer(&self, handle: Self::BufferHandle) -> io::Result<()>;

    /// Whether handles returned by [`import_prime_fd`](Self::import_prime_fd)
    /// may be closed once the framebuffer exists.
    ///
    /// PRIME import hands back the existing handle when the buffer is already
    /// known to the device file. On a file shared with the decoder that handle
    /// can be the decoder's own, so it must be left open.
    fn owns_imported_handles(&self) -> bool {
        true
    }

    /// Creates a framebuffer (`AddFB2`).
    fn add_framebuffer(
        &self,
        request: &FramebufferRequest<'_, Self::BufferHandle>,
    ) -> io::Result<FramebufferId>;

    /// Destroys a framebuffer (`RmFB`).
    fn remove_framebuffer(&self, framebuffer: FramebufferId) -> io::Result<()>;

    /// Attaches a framebuffer to a plane (`SetPlane`).
    fn set_plane(&self, commit: &PlaneCommit) -> io::Result<()>;

    /// Writes an object property.
    fn set_property(
        &self,
        target: PropertyTarget,
        property: PropertyId,
        value: u64,
    ) -> io::Result<()>;

    /// Uploads an HDR metadata blob.
    fn create_property_blob(&self, metadata: &HdrOutputMetadata) -> io::Result<BlobId>;

    /// Destroys a blob created by [`create_property_blob`](Self::create_property_blob).
    fn destroy_property_blob(&self, blob: BlobId) -> io::Result<()>;
}

impl<D: DisplayDevice + ?Sized> DisplayDevice for &D {
    type BufferHandle = D::BufferHandle;

    fn import_prime_fd(&self, fd: BorrowedFd<'_>) -> io::Result<Self::BufferHandle> {
        (**self).import_prime_fd(fd)
    }

    fn close_buffer(&self, handle: Self::BufferHandle) -> io::Result<()> {
        (**self).close_buffer(handle)
    }

    fn owns_imported_handles(&self) -> bool {
        (**self).owns_imported_handles()
    }

    fn add_framebuffer(
        &self,
        request: &FramebufferRequest<'_, Self::BufferHandle>,
    ) -> io::Result<FramebufferId> {
        (**self).add_framebuffer(request)
    }

    fn remove_framebuffer(&self, framebuffer: FramebufferId) -> io::Result<()> {
        (**self).remove_framebuffer(framebuffer)
    }

    fn set_plane(&self, commit: &PlaneCommit) -> io::Result<()> {
        (**self).set_plane(commit)
    }

    fn set_property(
        &self,
        target: PropertyTarget,
        property: PropertyId,
        value: u64,
    ) -> io::Result<()> {
        (**self).set_property(target, property, value)
    }

    fn create_property_blob(&self, metadata: &HdrOutputMetadata) -> io::Result<BlobId> {
        (**self).create_property_blob(metadata)
    }

    fn destroy_property_blob(&self, blob: BlobId) -> io::Result<()> {
        (**self).destroy_property_blob(blob)
    }
}

/// A decoder's pixel format as negotiated with the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Opaque DRM PRIME descriptors.
    DrmPrime,
    /// Software or mapped NV12.
    Nv12,
    /// Software or mapped P010.
    P010,
    /// A backend-specific hardware surface format.
    Hardware(u32),
}

/// The codec and profile of the stream, as signalled by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VideoFormat(pub u32);

impl VideoFormat {
    /// Mask of formats with 10-bit (Main10) profiles.
    pub const MASK_10BIT: u32 = 0x2200;

    /// Whether this is a 10-bit format.
    #[must_use]
    pub const fn is_10bit(self) -> bool {
        self.0 & Self::MASK_10BIT != 0
    }
}

/// A decode backend that can turn its frames into DRM PRIME descriptors.
pub trait PrimeFrameSource<F: ?Sized> {
    /// Whether the backend can export PRIME descriptors at all.
    fn can_export_prime(&self) -> bool;

    /// Maps a decoded frame to a descriptor.
    ///
    /// Every `Some` must be handed back to
    /// [`unmap_prime_frame`](Self::unmap_prime_frame) exactly once.
    fn map_prime_frame<'f>(&mut self, frame: &'f F) -> Option<PrimeFrame<'f>>;

    /// Releases a descriptor returned by [`map_prime_frame`](Self::map_prime_frame).
    fn unmap_prime_frame(&mut self, prime: PrimeFrame<'_>);

    /// The pixel format the decoder should produce for `format`.
    fn preferred_pixel_format(&self, format: VideoFormat) -> PixelFormat;

    /// Whether the backend can handle `pixel` for `format`.
    fn is_pixel_format_supported(&self, format: VideoFormat, pixel: PixelFormat) -> bool {
        pixel == self.preferred_pixel_format(format)
    }
}

/// A decoded frame that already carries a PRIME descriptor.
pub trait DecodedFrame {
    /// The descriptor, if the frame is in DRM PRIME form.
    fn prime(&self) -> Option<&PrimeFrame<'_>>;
}

impl DecodedFrame for PrimeFrame<'_> {
    fn prime(&self) -> Option<&PrimeFrame<'_>> {
        Some(self)
    }
}

/// Supplies the host's HDR mastering metadata.
pub trait HdrMetadataSource {
    /// Current metadata, or `None` if the host did not send any.
    fn hdr_metadata(&self) -> Option<HdrMetadata>;
}

impl HdrMetadataSource for Option<HdrMetadata> {
    fn hdr_metadata(&self) -> Option<HdrMetadata> {
        *self
    }
}

/// One of the two presentation paths.
pub trait VideoPresenter {
    /// Which path this presenter implements.
    fn path(&self) -> PresentationPath;

    /// Presents one frame.
    fn present(&mut self, frame: &PrimeFrame<'_>) -> Result<(), PresentError>;

    /// Switches the output in or out of HDR mode.
    fn set_hdr_mode(&mut self, enabled: bool, metadata: Option<&HdrMetadata>);
}

bitflags! {
    /// Capabilities a renderer advertises to the video pipeline.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RendererAttributes: u32 {
        /// Can only present when the window is full-screen.
        const FULLSCREEN_ONLY = 0x01;
        /// Supports HDR10 output.
        const HDR_SUPPORT = 0x04;
        /// Holds no queued frames between submission and display.
        const NO_BUFFERING = 0x08;
    }
}
