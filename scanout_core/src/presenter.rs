// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Direct scanout of decoded frames on a KMS overlay plane.
//!
//! Every frame gets its own framebuffer. The framebuffer that is on screen
//! is only destroyed after its successor has been attached to the plane, so
//! a failure anywhere in the pipeline leaves the previous picture visible:
//!
//! ```text
//!   PrimeFrame
//!       │
//!       ▼
//!   normalize() ──► AddFB2 ──► Colorimetry ──► SetPlane ──► RmFB(previous)
//!       │             │                           │
//!       ▼             ▼                           ▼
//!   ImportFailure  CommitFailure::Framebuffer  CommitFailure::Plane
//!                  (previous kept)             (new FB destroyed,
//!                                               previous kept)
//! ```
//!
//! Buffer handles imported for a frame are closed as soon as the
//! framebuffer exists; the framebuffer keeps its own references.

use kurbo::Rect;

use crate::adapter::{ImportedHandles, normalize};
use crate::backend::{DisplayDevice, FramebufferRequest, PlaneCommit, VideoPresenter};
use crate::color::HdrMetadata;
use crate::colorimetry::{Colorimetry, HdrUpdate};
use crate::descriptor::PrimeFrame;
use crate::error::{CommitFailure, PresentError};
use crate::geometry::{PlaneRect, SourceRect, scale_source_to_destination};
use crate::ids::{ConnectorId, CrtcId, FramebufferId, PlaneId};
use crate::negotiate::PresentationPath;
use crate::property::ColorProperties;
use crate::trace::{
    DropStage, FrameDroppedEvent, FramebufferEvent, FramebufferRetireEvent, PlaneCommitEvent,
    RetireReason, Tracer,
};

/// Which plane to drive and where on the output to put the video.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneConfig {
    /// The overlay plane.
    pub plane: PlaneId,
    /// The CRTC driving the output.
    pub crtc: CrtcId,
    /// The connector, for HDR metadata.
    pub connector: ConnectorId,
    /// Area of the output the video is fitted into, in CRTC pixels.
    pub output_rect: Rect,
}

impl PlaneConfig {
    /// Creates a configuration covering a `width` × `height` output.
    #[must_use]
    pub fn fullscreen(
        plane: PlaneId,
        crtc: CrtcId,
        connector: ConnectorId,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            plane,
            crtc,
            connector,
            output_rect: Rect::new(0.0, 0.0, f64::from(width), f64::from(height)),
        }
    }
}

/// Destroys a framebuffer that never made it onto the screen.
struct PendingFramebuffer<'d, D: DisplayDevice> {
    device: &'d D,
    id: FramebufferId,
    armed: bool,
}

impl<'d, D: DisplayDevice> PendingFramebuffer<'d, D> {
    fn new(device: &'d D, id: FramebufferId) -> Self {
        Self {
            device,
            id,
            armed: true,
        }
    }

    /// The framebuffer is live; stop guarding it.
    fn commit(mut self) -> FramebufferId {
        self.armed = false;
        self.id
    }
}

impl<D: DisplayDevice> Drop for PendingFramebuffer<'_, D> {
    fn drop(&mut self) {
        if self.armed
            && let Err(err) = self.device.remove_framebuffer(self.id)
        {
            log::error!("failed to remove rejected framebuffer {:?}: {err}", self.id);
        }
    }
}

/// Presents PRIME frames on an overlay plane.
#[derive(Debug)]
pub struct PlanePresenter<D: DisplayDevice> {
    device: D,
    config: PlaneConfig,
    colorimetry: Colorimetry,
    current: Option<FramebufferId>,
    frame_index: u64,
    shut_down: bool,
}

impl<D: DisplayDevice> PlanePresenter<D> {
    /// Creates a presenter. Nothing is written to the device until the first
    /// frame.
    #[must_use]
    pub fn new(device: D, config: PlaneConfig, props: ColorProperties) -> Self {
        Self {
            colorimetry: Colorimetry::new(config.plane, config.connector, props),
            device,
            config,
            current: None,
            frame_index: 0,
            shut_down: false,
        }
    }

    /// The display device.
    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The plane configuration.
    #[must_use]
    pub fn config(&self) -> &PlaneConfig {
        &self.config
    }

    /// The colorimetry controller.
    #[must_use]
    pub fn colorimetry(&self) -> &Colorimetry {
        &self.colorimetry
    }

    /// The framebuffer currently on screen.
    #[must_use]
    pub fn current_framebuffer(&self) -> Option<FramebufferId> {
        self.current
    }

    /// Number of frames submitted so far, including dropped ones.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Presents one frame and returns the framebuffer now on screen.
    pub fn present_frame(&mut self, frame: &PrimeFrame<'_>) -> Result<FramebufferId, PresentError> {
        self.present_frame_traced(frame, &mut Tracer::none())
    }

    /// [`present_frame`](Self::present_frame) with trace events.
    pub fn present_frame_traced(
        &mut self,
        frame: &PrimeFrame<'_>,
        tracer: &mut Tracer<'_>,
    ) -> Result<FramebufferId, PresentError> {
        if self.shut_down {
            return Err(PresentError::ShutDown);
        }
        self.frame_index += 1;
        let frame_index = self.frame_index;

        let dst = PlaneRect::from_rect(scale_source_to_destination(
            frame.size(),
            self.config.output_rect,
        ));

        let pending = {
            let mut handles = ImportedHandles::new(&self.device);
            let planes = match normalize(frame, &mut handles) {
                Ok(planes) => planes,
                Err(err) => {
                    log::error!("failed to import frame: {err}");
                    tracer.frame_dropped(&FrameDroppedEvent {
                        frame_index,
                        stage: DropStage::Import,
                    });
                    return Err(err.into());
                }
            };
            let request = FramebufferRequest::new(&planes);
            match self.device.add_framebuffer(&request) {
                Ok(id) => {
                    tracer.framebuffer_created(&FramebufferEvent {
                        frame_index,
                        framebuffer: id,
                        format: planes.format,
                        width: planes.width,
                        height: planes.height,
                        explicit_modifiers: !request.flags.is_empty(),
                    });
                    PendingFramebuffer::new(&self.device, id)
                }
                Err(err) => {
                    log::error!("failed to create framebuffer: {err}");
                    tracer.frame_dropped(&FrameDroppedEvent {
                        frame_index,
                        stage: DropStage::Framebuffer,
                    });
                    return Err(CommitFailure::Framebuffer(err).into());
                }
            }
        };

        self.colorimetry
            .apply_if_changed_traced(&self.device, frame.color, tracer);

        let commit = PlaneCommit {
            plane: self.config.plane,
            crtc: self.config.crtc,
            framebuffer: pending.id,
            dst,
            src: SourceRect::full(frame.width, frame.height),
        };
        if let Err(source) = self.device.set_plane(&commit) {
            log::error!("failed to update overlay plane: {source}");
            tracer.framebuffer_retired(&FramebufferRetireEvent {
                frame_index,
                framebuffer: commit.framebuffer,
                reason: RetireReason::Rejected,
            });
            tracer.frame_dropped(&FrameDroppedEvent {
                frame_index,
                stage: DropStage::Commit,
            });
            drop(pending);
            return Err(CommitFailure::Plane {
                plane: commit.plane,
                framebuffer: commit.framebuffer,
                source,
            }
            .into());
        }
        let framebuffer = pending.commit();
        tracer.plane_commit(&PlaneCommitEvent {
            frame_index,
            plane: commit.plane,
            framebuffer,
            dst,
        });

        if let Some(previous) = self.current.replace(framebuffer) {
            self.retire(previous, RetireReason::Superseded, tracer);
        }
        Ok(framebuffer)
    }

    /// Enters or leaves HDR mode on the connector.
    pub fn set_hdr_mode(&mut self, enabled: bool, metadata: Option<&HdrMetadata>) -> HdrUpdate {
        self.colorimetry
            .set_hdr_mode(&self.device, enabled, metadata)
    }

    /// [`set_hdr_mode`](Self::set_hdr_mode) with trace events.
    pub fn set_hdr_mode_traced(
        &mut self,
        enabled: bool,
        metadata: Option<&HdrMetadata>,
        tracer: &mut Tracer<'_>,
    ) -> HdrUpdate {
        self.colorimetry
            .set_hdr_mode_traced(&self.device, enabled, metadata, tracer)
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Leaves HDR mode, releases the colorimetry state and then removes the
    /// current framebuffer. Runs at most once; also called on drop.
    pub fn shutdown(&mut self) {
        self.shutdown_traced(&mut Tracer::none());
    }

    /// [`shutdown`](Self::shutdown) with trace events.
    pub fn shutdown_traced(&mut self, tracer: &mut Tracer<'_>) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.colorimetry.release(&self.device);
        if let Some(current) = self.current.take() {
            self.retire(current, RetireReason::Shutdown, tracer);
        }
    }

    fn retire(&self, framebuffer: FramebufferId, reason: RetireReason, tracer: &mut Tracer<'_>) {
        if let Err(err) = self.device.remove_framebuffer(framebuffer) {
            log::error!("failed to remove framebuffer {framebuffer:?}: {err}");
        }
        tracer.framebuffer_retired(&FramebufferRetireEvent {
            frame_index: self.frame_index,
            framebuffer,
            reason,
        });
    }
}

impl<D: DisplayDevice> Drop for PlanePresenter<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<D: DisplayDevice> VideoPresenter for PlanePresenter<D> {
    fn path(&self) -> PresentationPath {
        PresentationPath::Direct
    }

    fn present(&mut self, frame: &PrimeFrame<'_>) -> Result<(), PresentError> {
        self.present_frame(frame).map(|_| ())
    }

    fn set_hdr_mode(&mut self, enabled: bool, metadata: Option<&HdrMetadata>) {
        self.colorimetry
            .set_hdr_mode(&self.device, enabled, metadata);
    }
}
