// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The KMS device and its [`DisplayDevice`] implementation.
//!
//! # Fd ownership
//!
//! A [`DrmDevice`] either owns its file descriptor outright or shares it with
//! the decoder, which often opened the same render node first. A shared fd is
//! closed when the last holder drops it; the device never closes it on its
//! own.
//!
//! ```text
//!   DrmDevice::open(path) ──► DeviceFd::Owned  ── closed on drop
//!   DrmDevice::shared(arc) ─► DeviceFd::Shared ── closed with the last Arc
//! ```

use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::path::Path;
use std::sync::Arc;

use drm::buffer;
use drm::control::{self, RawResourceHandle, property};
use rustix::fs::{Mode, OFlags};
use scanout_core::backend::{DisplayDevice, FramebufferRequest, PlaneCommit};
use scanout_core::color::HdrOutputMetadata;
use scanout_core::descriptor::MAX_PLANES;
use scanout_core::error::CapabilityAbsent;
use scanout_core::ids::{BlobId, FramebufferId, PropertyId, PropertyTarget};

/// How the device fd is held.
#[derive(Debug)]
pub enum DeviceFd {
    /// The device closes the fd when dropped.
    Owned(OwnedFd),
    /// The fd is shared with another component, typically the decoder's
    /// hardware context.
    Shared(Arc<OwnedFd>),
}

impl AsFd for DeviceFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            Self::Owned(fd) => fd.as_fd(),
            Self::Shared(fd) => fd.as_fd(),
        }
    }
}

/// An open KMS device.
#[derive(Debug)]
pub struct DrmDevice {
    fd: DeviceFd,
}

impl DrmDevice {
    /// Opens the device node at `path` read-write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CapabilityAbsent> {
        let path = path.as_ref();
        let fd = rustix::fs::open(path, OFlags::RDWR | OFlags::CLOEXEC, Mode::empty())
            .map_err(|errno| {
                log::error!("failed to open {}: {errno}", path.display());
                CapabilityAbsent::Device(io::Error::from(errno))
            })?;
        Ok(Self::from_fd(fd))
    }

    /// Takes ownership of an already open device fd.
    #[must_use]
    pub fn from_fd(fd: OwnedFd) -> Self {
        Self {
            fd: DeviceFd::Owned(fd),
        }
    }

    /// Uses an fd that stays alive as long as any other holder keeps it.
    #[must_use]
    pub fn shared(fd: Arc<OwnedFd>) -> Self {
        Self {
            fd: DeviceFd::Shared(fd),
        }
    }

    /// Whether the fd is shared with another component.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        matches!(self.fd, DeviceFd::Shared(_))
    }

    /// Gives the fd back.
    #[must_use]
    pub fn into_fd(self) -> DeviceFd {
        self.fd
    }
}

impl AsFd for DrmDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl drm::Device for DrmDevice {}
impl control::Device for DrmDevice {}

/// Converts a raw object id into a typed `drm` handle.
pub(crate) fn object<T: From<RawResourceHandle>>(raw: u32, kind: &str) -> io::Result<T> {
    control::from_u32(raw).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{kind} id 0 does not name an object"),
        )
    })
}

/// The fixed-size arrays `AddFB2` takes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Fb2Arrays {
    handles: [u32; MAX_PLANES],
    pitches: [u32; MAX_PLANES],
    offsets: [u32; MAX_PLANES],
    modifiers: [u64; MAX_PLANES],
}

impl Fb2Arrays {
    fn from_request<H: Copy + Into<u32>>(request: &FramebufferRequest<'_, H>) -> Self {
        let mut arrays = Self::default();
        for (i, plane) in request.planes.planes.iter().take(MAX_PLANES).enumerate() {
            arrays.handles[i] = plane.handle.into();
            arrays.pitches[i] = plane.pitch;
            arrays.offsets[i] = plane.offset;
        }
        if let Some(modifiers) = request.modifiers() {
            for (slot, modifier) in arrays.modifiers.iter_mut().zip(modifiers) {
                *slot = modifier;
            }
        }
        arrays
    }
}

impl DisplayDevice for DrmDevice {
    type BufferHandle = buffer::Handle;

    fn import_prime_fd(&self, fd: BorrowedFd<'_>) -> io::Result<buffer::Handle> {
        control::Device::prime_fd_to_buffer(self, fd)
    }

    fn close_buffer(&self, handle: buffer::Handle) -> io::Result<()> {
        control::Device::close_buffer(self, handle)
    }

    fn owns_imported_handles(&self) -> bool {
        !self.is_shared()
    }

    fn add_framebuffer(
        &self,
        request: &FramebufferRequest<'_, buffer::Handle>,
    ) -> io::Result<FramebufferId> {
        let arrays = Fb2Arrays::from_request(request);
        let planes = request.planes;
        let info = drm_ffi::mode::add_fb2(
            self.as_fd(),
            planes.width,
            planes.height,
            planes.format.0,
            &arrays.handles,
            &arrays.pitches,
            &arrays.offsets,
            &arrays.modifiers,
            request.flags.bits(),
        )?;
        Ok(FramebufferId(info.fb_id))
    }

    fn remove_framebuffer(&self, framebuffer: FramebufferId) -> io::Result<()> {
        control::Device::destroy_framebuffer(self, object(framebuffer.0, "framebuffer")?)
    }

    fn set_plane(&self, commit: &PlaneCommit) -> io::Result<()> {
        let dst = commit.dst;
        let src = commit.src;
        control::Device::set_plane(
            self,
            object(commit.plane.0, "plane")?,
            object(commit.crtc.0, "CRTC")?,
            Some(object(commit.framebuffer.0, "framebuffer")?),
            0,
            (dst.x, dst.y, dst.width, dst.height),
            (src.x, src.y, src.width, src.height),
        )
    }

    fn set_property(
        &self,
        target: PropertyTarget,
        property: PropertyId,
        value: u64,
    ) -> io::Result<()> {
        let prop: property::Handle = object(property.0, "property")?;
        match target {
            PropertyTarget::Plane(plane) => control::Device::set_property(
                self,
                object::<control::plane::Handle>(plane.0, "plane")?,
                prop,
                value,
            ),
            PropertyTarget::Connector(connector) => control::Device::set_property(
                self,
                object::<control::connector::Handle>(connector.0, "connector")?,
                prop,
                value,
            ),
        }
    }

    fn create_property_blob(&self, metadata: &HdrOutputMetadata) -> io::Result<BlobId> {
        match control::Device::create_property_blob(self, metadata)? {
            property::Value::Blob(id) => u32::try_from(id).map(BlobId).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "blob id out of range")
            }),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected blob value {other:?}"),
            )),
        }
    }

    fn destroy_property_blob(&self, blob: BlobId) -> io::Result<()> {
        control::Device::destroy_property_blob(self, u64::from(blob.0))
    }
}
