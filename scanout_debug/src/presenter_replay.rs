// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recordings of a real [`PlanePresenter`] run through the lifecycle checker.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::os::fd::{AsFd, BorrowedFd};

use scanout_core::backend::{DisplayDevice, FramebufferRequest, PlaneCommit};
use scanout_core::color::{ColorState, Colorspace, HdrMetadata, HdrOutputMetadata};
use scanout_core::descriptor::{PrimeFrame, PrimeLayer, PrimeObject, PrimePlane};
use scanout_core::error::{CommitFailure, PresentError};
use scanout_core::format::Fourcc;
use scanout_core::ids::{
    BlobId, ConnectorId, CrtcId, FramebufferId, PlaneId, PropertyId, PropertyTarget,
};
use scanout_core::presenter::{PlaneConfig, PlanePresenter};
use scanout_core::property::{
    COLOR_ENCODING, ColorProperties, EnumProperty, HDR_OUTPUT_METADATA, PropertyHandle,
};
use scanout_core::trace::Tracer;

use crate::lifecycle::check;
use crate::recorder::{RecordedEvent, RecorderSink};

/// A display device that only tracks which objects are alive.
#[derive(Debug, Default)]
struct ReplayDevice {
    next_id: Cell<u32>,
    fail_import: Cell<bool>,
    fail_add_framebuffer: Cell<bool>,
    fail_set_plane: Cell<bool>,
    buffers: RefCell<BTreeSet<u32>>,
    framebuffers: RefCell<BTreeSet<FramebufferId>>,
    blobs: RefCell<BTreeSet<BlobId>>,
    scanned_out: Cell<Option<FramebufferId>>,
}

impl ReplayDevice {
    fn next(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn inject(&self, fault: Fault) {
        self.fail_import.set(fault == Fault::Import);
        self.fail_add_framebuffer.set(fault == Fault::Framebuffer);
        self.fail_set_plane.set(fault == Fault::Plane);
    }
}

fn injected() -> io::Error {
    io::Error::from_raw_os_error(5)
}

impl DisplayDevice for ReplayDevice {
    type BufferHandle = u32;

    fn import_prime_fd(&self, _fd: BorrowedFd<'_>) -> io::Result<u32> {
        if self.fail_import.get() {
            return Err(injected());
        }
        let handle = self.next();
        self.buffers.borrow_mut().insert(handle);
        Ok(handle)
    }

    fn close_buffer(&self, handle: u32) -> io::Result<()> {
        if self.buffers.borrow_mut().remove(&handle) {
            Ok(())
        } else {
            Err(injected())
        }
    }

    fn add_framebuffer(&self, _request: &FramebufferRequest<'_, u32>) -> io::Result<FramebufferId> {
        if self.fail_add_framebuffer.get() {
            return Err(injected());
        }
        let id = FramebufferId(self.next());
        self.framebuffers.borrow_mut().insert(id);
        Ok(id)
    }

    fn remove_framebuffer(&self, framebuffer: FramebufferId) -> io::Result<()> {
        if self.scanned_out.get() == Some(framebuffer) {
            self.scanned_out.set(None);
        }
        if self.framebuffers.borrow_mut().remove(&framebuffer) {
            Ok(())
        } else {
            Err(injected())
        }
    }

    fn set_plane(&self, commit: &PlaneCommit) -> io::Result<()> {
        if self.fail_set_plane.get() {
            return Err(injected());
        }
        assert!(self.framebuffers.borrow().contains(&commit.framebuffer));
        self.scanned_out.set(Some(commit.framebuffer));
        Ok(())
    }

    fn set_property(&self, _: PropertyTarget, _: PropertyId, _: u64) -> io::Result<()> {
        Ok(())
    }

    fn create_property_blob(&self, _metadata: &HdrOutputMetadata) -> io::Result<BlobId> {
        let id = BlobId(self.next());
        self.blobs.borrow_mut().insert(id);
        Ok(id)
    }

    fn destroy_property_blob(&self, blob: BlobId) -> io::Result<()> {
        if self.blobs.borrow_mut().remove(&blob) {
            Ok(())
        } else {
            Err(injected())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fault {
    None,
    Import,
    Framebuffer,
    Plane,
}

/// A fixed mix of faults so every failure path shows up several times,
/// including back to back.
fn fault_for(frame: u32) -> Fault {
    if frame % 13 == 8 {
        Fault::Import
    } else if frame % 7 == 3 || frame == 4 {
        Fault::Framebuffer
    } else if frame % 11 == 5 || frame == 6 {
        Fault::Plane
    } else {
        Fault::None
    }
}

fn color_properties() -> ColorProperties {
    ColorProperties {
        color_encoding: Some(EnumProperty::new(
            PropertyHandle {
                id: PropertyId(21),
                name: COLOR_ENCODING,
            },
            vec![
                ("ITU-R BT.709 YCbCr".to_owned(), 1),
                ("ITU-R BT.2020 YCbCr".to_owned(), 2),
            ],
        )),
        color_range: None,
        hdr_output_metadata: Some(PropertyHandle {
            id: PropertyId(22),
            name: HDR_OUTPUT_METADATA,
        }),
    }
}

fn nv12(file: &File, frame: u32) -> PrimeFrame<'_> {
    let (width, height) = (1280, 720);
    let colorspace = if frame / 10 % 2 == 0 {
        Colorspace::Rec709
    } else {
        Colorspace::Rec2020
    };
    PrimeFrame::composed(
        width,
        height,
        vec![PrimeObject::new(file.as_fd(), 1280 * 720 * 3 / 2)],
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
                    offset: width * height,
                    pitch: width,
                },
            ],
        },
        ColorState::new(colorspace, false),
    )
}

fn presenter(device: &ReplayDevice) -> PlanePresenter<&ReplayDevice> {
    PlanePresenter::new(
        device,
        PlaneConfig::fullscreen(PlaneId(40), CrtcId(60), ConnectorId(90), 1920, 1080),
        color_properties(),
    )
}

#[test]
fn long_run_with_mixed_failures_keeps_a_valid_lifecycle() {
    let device = ReplayDevice::default();
    let file = File::open("/dev/null").unwrap();
    let mut recorder = RecorderSink::new();
    let mut presenter = presenter(&device);

    let (mut shown, mut rejected) = (0, 0);
    let mut on_screen = None;
    for frame in 1..=80 {
        if frame == 25 {
            presenter.set_hdr_mode_traced(
                true,
                Some(&HdrMetadata::default()),
                &mut Tracer::new(&mut recorder),
            );
        } else if frame == 55 {
            presenter.set_hdr_mode_traced(false, None, &mut Tracer::new(&mut recorder));
        }

        let fault = fault_for(frame);
        device.inject(fault);
        let result =
            presenter.present_frame_traced(&nv12(&file, frame), &mut Tracer::new(&mut recorder));
        match (fault, result) {
            (Fault::None, Ok(fb)) => {
                shown += 1;
                on_screen = Some(fb);
            }
            (Fault::Import, Err(PresentError::Import(_)))
            | (Fault::Framebuffer, Err(PresentError::Commit(CommitFailure::Framebuffer(_)))) => {}
            (Fault::Plane, Err(PresentError::Commit(CommitFailure::Plane { .. }))) => {
                rejected += 1;
            }
            (fault, result) => panic!("frame {frame} with {fault:?} gave {result:?}"),
        }
        assert_eq!(device.scanned_out.get(), on_screen, "frame {frame}");
        assert_eq!(presenter.current_framebuffer(), on_screen, "frame {frame}");
        assert!(device.buffers.borrow().is_empty(), "frame {frame} leaked handles");
    }

    device.inject(Fault::None);
    presenter.shutdown_traced(&mut Tracer::new(&mut recorder));

    let summary = check(recorder.events()).unwrap();
    assert_eq!(summary.commits, shown);
    assert_eq!(summary.created, shown + rejected);
    assert!(summary.live.is_empty());
    assert_eq!(summary.scanned_out, None);
    assert!(
        recorder
            .events()
            .iter()
            .any(|e| matches!(e, RecordedEvent::HdrMode(_)))
    );
    assert!(device.framebuffers.borrow().is_empty());
    assert!(device.blobs.borrow().is_empty(), "HDR blob outlived shutdown");
}

#[test]
fn run_that_never_shows_a_frame_is_valid() {
    let device = ReplayDevice::default();
    let file = File::open("/dev/null").unwrap();
    let mut recorder = RecorderSink::new();
    let mut presenter = presenter(&device);

    for (frame, fault) in [(1, Fault::Plane), (2, Fault::Framebuffer), (3, Fault::Import)] {
        device.inject(fault);
        presenter
            .present_frame_traced(&nv12(&file, frame), &mut Tracer::new(&mut recorder))
            .unwrap_err();
    }
    presenter.shutdown_traced(&mut Tracer::new(&mut recorder));

    let summary = check(recorder.events()).unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.commits, 0);
    assert!(summary.live.is_empty());
    assert!(device.framebuffers.borrow().is_empty());
}
