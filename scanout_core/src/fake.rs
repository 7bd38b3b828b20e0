// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory display device for tests.
//!
//! Records every call in order and tracks which kernel objects are live so
//! tests can assert both the sequence of operations and the absence of
//! leaks.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use crate::backend::{DisplayDevice, FramebufferRequest, PlaneCommit};
use crate::color::{ColorState, HdrOutputMetadata};
use crate::descriptor::{PrimeFrame, PrimeLayer, PrimeObject, PrimePlane};
use crate::format::Fourcc;
use crate::ids::{BlobId, FramebufferId, PropertyId, PropertyTarget};
use crate::property::{
    COLOR_ENCODING, COLOR_RANGE, ColorProperties, EnumProperty, HDR_OUTPUT_METADATA,
    PropertyHandle,
};

pub(crate) const ENCODING_ID: PropertyId = PropertyId(11);
pub(crate) const RANGE_ID: PropertyId = PropertyId(12);
pub(crate) const HDR_ID: PropertyId = PropertyId(13);

/// The colorimetry properties of a typical HDR-capable driver.
pub(crate) fn full_properties() -> ColorProperties {
    ColorProperties {
        color_encoding: Some(EnumProperty::new(
            PropertyHandle {
                id: ENCODING_ID,
                name: COLOR_ENCODING,
            },
            vec![
                ("ITU-R BT.601 YCbCr".to_owned(), 0),
                ("ITU-R BT.709 YCbCr".to_owned(), 1),
                ("ITU-R BT.2020 YCbCr".to_owned(), 2),
            ],
        )),
        color_range: Some(EnumProperty::new(
            PropertyHandle {
                id: RANGE_ID,
                name: COLOR_RANGE,
            },
            vec![
                ("YCbCr limited range".to_owned(), 0),
                ("YCbCr full range".to_owned(), 1),
            ],
        )),
        hdr_output_metadata: Some(PropertyHandle {
            id: HDR_ID,
            name: HDR_OUTPUT_METADATA,
        }),
    }
}

/// A single-object NV12 frame backed by `file`.
pub(crate) fn nv12_frame(file: &File, width: u32, height: u32, color: ColorState) -> PrimeFrame<'_> {
    let luma = width * height;
    PrimeFrame::composed(
        width,
        height,
        vec![PrimeObject::new(file.as_fd(), (luma * 3 / 2) as usize)],
        PrimeLayer {
            format: Fourcc::NV12,
            planes: vec![
                PrimePlane {
                    object_index: 0,
                    offset: 0,
                    pitch: width,
                },
                PrimePlane {
                    object_index: 0,
                    offset: luma,
                    pitch: width,
                },
            ],
        },
        color,
    )
}

/// Opens `n` descriptors to hand out as fake DMA-BUFs.
pub(crate) fn null_files(n: usize) -> Vec<File> {
    (0..n)
        .map(|_| File::open("/dev/null").unwrap())
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AddFramebuffer {
    pub(crate) id: FramebufferId,
    pub(crate) format: Fourcc,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) handles: Vec<u32>,
    pub(crate) pitches: Vec<u32>,
    pub(crate) offsets: Vec<u32>,
    pub(crate) modifiers: Option<Vec<u64>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Import(RawFd, u32),
    CloseBuffer(u32),
    AddFramebuffer(AddFramebuffer),
    RemoveFramebuffer(FramebufferId),
    SetPlane(PlaneCommit),
    SetProperty(PropertyTarget, PropertyId, u64),
    CreateBlob(BlobId, HdrOutputMetadata),
    DestroyBlob(BlobId),
}

#[derive(Debug, Default)]
pub(crate) struct FakeDevice {
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u32>,
    imports_before_failure: Cell<Option<usize>>,
    imports: Cell<usize>,
    import_as: Cell<Option<u32>>,
    shares_handles: Cell<bool>,
    fail_add_framebuffer: Cell<bool>,
    fail_set_plane: Cell<bool>,
    fail_set_property: Cell<bool>,
    fail_create_blob: Cell<bool>,
    live_buffers: RefCell<BTreeSet<u32>>,
    live_framebuffers: RefCell<BTreeSet<FramebufferId>>,
    live_blobs: RefCell<BTreeSet<BlobId>>,
    scanned_out: Cell<Option<FramebufferId>>,
    plane_disabled: Cell<bool>,
}

impl FakeDevice {
    pub(crate) fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            ..Self::default()
        }
    }

    fn next(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub(crate) fn fail_import_after(&self, successes: usize) {
        self.imports_before_failure.set(Some(successes));
    }

    /// Every import resolves to `handle`, as when all descriptors refer to
    /// one buffer.
    pub(crate) fn import_everything_as(&self, handle: u32) {
        self.import_as.set(Some(handle));
    }

    /// Reports imported handles as shared with another user of the device.
    pub(crate) fn share_handles(&self, shared: bool) {
        self.shares_handles.set(shared);
    }

    pub(crate) fn buffer_closes(&self) -> Vec<u32> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match *call {
                Call::CloseBuffer(handle) => Some(handle),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn fail_add_framebuffer(&self, fail: bool) {
        self.fail_add_framebuffer.set(fail);
    }

    pub(crate) fn fail_set_plane(&self, fail: bool) {
        self.fail_set_plane.set(fail);
    }

    pub(crate) fn fail_set_property(&self, fail: bool) {
        self.fail_set_property.set(fail);
    }

    pub(crate) fn fail_create_blob(&self, fail: bool) {
        self.fail_create_blob.set(fail);
    }

    pub(crate) fn live_buffers(&self) -> usize {
        self.live_buffers.borrow().len()
    }

    pub(crate) fn live_framebuffers(&self) -> Vec<FramebufferId> {
        self.live_framebuffers.borrow().iter().copied().collect()
    }

    pub(crate) fn live_blobs(&self) -> Vec<BlobId> {
        self.live_blobs.borrow().iter().copied().collect()
    }

    /// The framebuffer the plane is currently scanning out.
    pub(crate) fn scanned_out(&self) -> Option<FramebufferId> {
        self.scanned_out.get()
    }

    /// Whether the on-screen framebuffer was ever removed while bound.
    pub(crate) fn plane_was_disabled(&self) -> bool {
        self.plane_disabled.get()
    }

    pub(crate) fn property_writes(&self) -> Vec<(PropertyTarget, PropertyId, u64)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match *call {
                Call::SetProperty(target, prop, value) => Some((target, prop, value)),
                _ => None,
            })
            .collect()
    }
}

fn injected() -> io::Error {
    io::Error::from_raw_os_error(22)
}

impl DisplayDevice for FakeDevice {
    type BufferHandle = u32;

    fn import_prime_fd(&self, fd: BorrowedFd<'_>) -> io::Result<u32> {
        let done = self.imports.get();
        if self.imports_before_failure.get() == Some(done) {
            return Err(injected());
        }
        self.imports.set(done + 1);
        let handle = self.import_as.get().unwrap_or_else(|| self.next());
        self.live_buffers.borrow_mut().insert(handle);
        self.record(Call::Import(fd.as_raw_fd(), handle));
        Ok(handle)
    }

    fn close_buffer(&self, handle: u32) -> io::Result<()> {
        self.record(Call::CloseBuffer(handle));
        if self.live_buffers.borrow_mut().remove(&handle) {
            Ok(())
        } else {
            Err(injected())
        }
    }

    fn owns_imported_handles(&self) -> bool {
        !self.shares_handles.get()
    }

    fn add_framebuffer(&self, request: &FramebufferRequest<'_, u32>) -> io::Result<FramebufferId> {
        if self.fail_add_framebuffer.get() {
            return Err(injected());
        }
        let planes = &request.planes.planes;
        for plane in planes {
            assert!(
                self.live_buffers.borrow().contains(&plane.handle),
                "framebuffer references a closed buffer handle"
            );
        }
        let id = FramebufferId(self.next());
        self.live_framebuffers.borrow_mut().insert(id);
        self.record(Call::AddFramebuffer(AddFramebuffer {
            id,
            format: request.planes.format,
            width: request.planes.width,
            height: request.planes.height,
            handles: planes.iter().map(|p| p.handle).collect(),
            pitches: planes.iter().map(|p| p.pitch).collect(),
            offsets: planes.iter().map(|p| p.offset).collect(),
            modifiers: request.modifiers().map(Iterator::collect),
        }));
        Ok(id)
    }

    fn remove_framebuffer(&self, framebuffer: FramebufferId) -> io::Result<()> {
        self.record(Call::RemoveFramebuffer(framebuffer));
        // The kernel disables the plane when its framebuffer goes away.
        if self.scanned_out.get() == Some(framebuffer) {
            self.scanned_out.set(None);
            self.plane_disabled.set(true);
        }
        if self.live_framebuffers.borrow_mut().remove(&framebuffer) {
            Ok(())
        } else {
            Err(injected())
        }
    }

    fn set_plane(&self, commit: &PlaneCommit) -> io::Result<()> {
        self.record(Call::SetPlane(*commit));
        if self.fail_set_plane.get() {
            return Err(injected());
        }
        assert!(
            self.live_framebuffers.borrow().contains(&commit.framebuffer),
            "plane bound to a dead framebuffer"
        );
        self.scanned_out.set(Some(commit.framebuffer));
        Ok(())
    }

    fn set_property(
        &self,
        target: PropertyTarget,
        property: PropertyId,
        value: u64,
    ) -> io::Result<()> {
        self.record(Call::SetProperty(target, property, value));
        if self.fail_set_property.get() {
            return Err(injected());
        }
        Ok(())
    }

    fn create_property_blob(&self, metadata: &HdrOutputMetadata) -> io::Result<BlobId> {
        if self.fail_create_blob.get() {
            return Err(injected());
        }
        let id = BlobId(self.next());
        self.live_blobs.borrow_mut().insert(id);
        self.record(Call::CreateBlob(id, *metadata));
        Ok(id)
    }

    fn destroy_property_blob(&self, blob: BlobId) -> io::Result<()> {
        self.record(Call::DestroyBlob(blob));
        if self.live_blobs.borrow_mut().remove(&blob) {
            Ok(())
        } else {
            Err(injected())
        }
    }
}
