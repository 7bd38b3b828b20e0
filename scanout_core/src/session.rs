// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-stream presentation session.
//!
//! A [`PresentationSession`] owns one [`VideoPresenter`] chosen when the
//! stream starts, plus the collaborators around it: an optional decode
//! backend that maps frames to PRIME descriptors and an optional source of
//! HDR mastering metadata. It is what the streaming client calls per decoded
//! frame.

use core::fmt;

use crate::backend::{
    DecodedFrame, HdrMetadataSource, PixelFormat, PrimeFrameSource, RendererAttributes,
    VideoFormat, VideoPresenter,
};
use crate::error::{CapabilityAbsent, ImportFailure, PresentError};
use crate::negotiate::{
    PathReason, PresentationPath, RenderOverrides, can_export_external, select_path,
};
use crate::trace::{DropStage, FrameDroppedEvent, PathSelectedEvent, Tracer};

/// A boxed presenter strategy.
pub type BoxedPresenter<'a> = Box<dyn VideoPresenter + 'a>;

/// Drives one presenter for the lifetime of a stream.
pub struct PresentationSession<'a, F: ?Sized> {
    presenter: BoxedPresenter<'a>,
    reason: Option<PathReason>,
    backend: Option<Box<dyn PrimeFrameSource<F> + 'a>>,
    hdr_source: Option<Box<dyn HdrMetadataSource + 'a>>,
    overrides: RenderOverrides,
    supports_direct: bool,
    main10: bool,
    hdr_active: bool,
    frame_index: u64,
}

impl<F: ?Sized> fmt::Debug for PresentationSession<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationSession")
            .field("path", &self.presenter.path())
            .field("reason", &self.reason)
            .field("has_backend", &self.backend.is_some())
            .field("has_hdr_source", &self.hdr_source.is_some())
            .field("overrides", &self.overrides)
            .field("supports_direct", &self.supports_direct)
            .field("main10", &self.main10)
            .field("hdr_active", &self.hdr_active)
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

impl<'a, F: DecodedFrame + ?Sized> PresentationSession<'a, F> {
    /// Wraps an already chosen presenter.
    #[must_use]
    pub fn new(presenter: BoxedPresenter<'a>, supports_direct: bool) -> Self {
        Self {
            presenter,
            reason: None,
            backend: None,
            hdr_source: None,
            overrides: RenderOverrides::NONE,
            supports_direct,
            main10: false,
            hdr_active: false,
            frame_index: 0,
        }
    }

    /// Picks a presenter with the negotiation rule.
    ///
    /// A 10-bit `format` counts as HDR content from the start, before the
    /// host turns HDR output on. `external` is only called when the rule
    /// selects external export. If it reports a missing capability the
    /// session falls back to `direct`. The error is returned only when the
    /// fallback fails too.
    pub fn negotiate(
        overrides: RenderOverrides,
        supports_direct: bool,
        format: VideoFormat,
        direct: impl FnOnce() -> Result<BoxedPresenter<'a>, CapabilityAbsent>,
        external: impl FnOnce() -> Result<BoxedPresenter<'a>, CapabilityAbsent>,
        tracer: &mut Tracer<'_>,
    ) -> Result<Self, CapabilityAbsent> {
        let main10 = format.is_10bit();
        let (_, mut reason) = select_path(&overrides, supports_direct, main10);
        let presenter = if can_export_external(&overrides, supports_direct, main10) {
            match external() {
                Ok(presenter) => presenter,
                Err(err) => {
                    log::warn!("external-image export unavailable ({err}), using direct rendering");
                    reason = PathReason::ExternalUnavailable;
                    direct()?
                }
            }
        } else {
            direct()?
        };

        tracer.path_selected(&PathSelectedEvent {
            path: presenter.path(),
            reason,
        });

        Ok(Self {
            presenter,
            reason: Some(reason),
            backend: None,
            hdr_source: None,
            overrides,
            supports_direct,
            main10,
            hdr_active: false,
            frame_index: 0,
        })
    }

    /// Records the stream's video format. A 10-bit format counts as HDR
    /// content for [`can_export_external`](Self::can_export_external).
    #[must_use]
    pub fn with_video_format(mut self, format: VideoFormat) -> Self {
        self.main10 = format.is_10bit();
        self
    }

    /// Attaches a decode backend. Every frame is then mapped through it.
    #[must_use]
    pub fn with_backend(mut self, backend: Box<dyn PrimeFrameSource<F> + 'a>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attaches the source of HDR mastering metadata.
    #[must_use]
    pub fn with_hdr_source(mut self, source: Box<dyn HdrMetadataSource + 'a>) -> Self {
        self.hdr_source = Some(source);
        self
    }

    /// The active path.
    #[must_use]
    pub fn path(&self) -> PresentationPath {
        self.presenter.path()
    }

    /// The rule that picked the path, for negotiated sessions.
    #[must_use]
    pub fn path_reason(&self) -> Option<PathReason> {
        self.reason
    }

    /// Whether a decode backend is attached.
    #[must_use]
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Whether HDR output is currently on.
    #[must_use]
    pub fn hdr_active(&self) -> bool {
        self.hdr_active
    }

    /// Whether the stream is a 10-bit (Main10) format.
    #[must_use]
    pub fn is_main10(&self) -> bool {
        self.main10
    }

    /// Whether the device can scan out directly.
    #[must_use]
    pub fn is_direct_rendering_supported(&self) -> bool {
        self.supports_direct
    }

    /// What the negotiation rule says for the current stream state. 10-bit
    /// streams and active HDR output both count as HDR content.
    ///
    /// This does not switch the active presenter.
    pub fn can_export_external(&self) -> bool {
        can_export_external(
            &self.overrides,
            self.supports_direct,
            self.main10 || self.hdr_active,
        )
    }

    /// Capabilities reported to the streaming client.
    #[must_use]
    pub fn renderer_attributes(&self) -> RendererAttributes {
        RendererAttributes::FULLSCREEN_ONLY
            | RendererAttributes::HDR_SUPPORT
            | RendererAttributes::NO_BUFFERING
    }

    /// The session always wants a test frame before streaming starts.
    #[must_use]
    pub fn needs_test_frame(&self) -> bool {
        true
    }

    /// The decode output format to request.
    #[must_use]
    pub fn preferred_pixel_format(&self, format: VideoFormat) -> PixelFormat {
        self.backend
            .as_ref()
            .map_or(PixelFormat::DrmPrime, |b| b.preferred_pixel_format(format))
    }

    /// Whether `pixel` is acceptable for streams of `format`.
    #[must_use]
    pub fn is_pixel_format_supported(&self, format: VideoFormat, pixel: PixelFormat) -> bool {
        match &self.backend {
            Some(backend) => backend.is_pixel_format_supported(format, pixel),
            None => pixel == PixelFormat::DrmPrime,
        }
    }

    /// Checks that the backend can map `frame`. Sessions without a backend
    /// check that the frame carries a descriptor.
    pub fn test_render_frame(&mut self, frame: &F) -> bool {
        match self.backend.as_mut() {
            Some(backend) => {
                if !backend.can_export_prime() {
                    log::warn!("decode backend cannot export PRIME frames");
                    return false;
                }
                match backend.map_prime_frame(frame) {
                    Some(prime) => {
                        backend.unmap_prime_frame(prime);
                        true
                    }
                    None => {
                        log::error!("decode backend failed to map a test frame");
                        false
                    }
                }
            }
            None => frame.prime().is_some(),
        }
    }

    /// Presents one decoded frame.
    pub fn render_frame(&mut self, frame: &F) -> Result<(), PresentError> {
        self.render_frame_traced(frame, &mut Tracer::none())
    }

    /// [`render_frame`](Self::render_frame) with tracing.
    pub fn render_frame_traced(
        &mut self,
        frame: &F,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), PresentError> {
        self.frame_index += 1;
        let frame_index = self.frame_index;
        let unmappable = |tracer: &mut Tracer<'_>| {
            tracer.frame_dropped(&FrameDroppedEvent {
                frame_index,
                stage: DropStage::Map,
            });
            PresentError::Import(ImportFailure::Unmappable)
        };

        match self.backend.as_mut() {
            Some(backend) => {
                let Some(prime) = backend.map_prime_frame(frame) else {
                    return Err(unmappable(tracer));
                };
                let presented = self.presenter.present(&prime);
                backend.unmap_prime_frame(prime);
                presented
            }
            None => match frame.prime() {
                Some(prime) => self.presenter.present(prime),
                None => Err(unmappable(tracer)),
            },
        }
    }

    /// Turns HDR output on or off. Metadata is taken from the attached
    /// source when enabling.
    pub fn set_hdr_mode(&mut self, enabled: bool) {
        let metadata = if enabled {
            self.hdr_source.as_ref().and_then(|s| s.hdr_metadata())
        } else {
            None
        };
        self.presenter.set_hdr_mode(enabled, metadata.as_ref());
        self.hdr_active = enabled;
    }
}
