// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use scanout_core::negotiate::{PathReason, PresentationPath};
use scanout_core::trace::{
    DropStage, FrameDroppedEvent, FramebufferEvent, FramebufferRetireEvent, HdrModeEvent,
    PathSelectedEvent, PlaneCommitEvent, PropertyWriteEvent, RetireReason, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn retire_name(reason: RetireReason) -> &'static str {
    match reason {
        RetireReason::Superseded => "superseded",
        RetireReason::Rejected => "rejected",
        RetireReason::Shutdown => "shutdown",
    }
}

fn stage_name(stage: DropStage) -> &'static str {
    match stage {
        DropStage::Map => "map",
        DropStage::Import => "import",
        DropStage::Framebuffer => "framebuffer",
        DropStage::Commit => "commit",
    }
}

fn path_name(path: PresentationPath) -> &'static str {
    match path {
        PresentationPath::Direct => "direct",
        PresentationPath::External => "external",
    }
}

fn reason_name(reason: PathReason) -> &'static str {
    match reason {
        PathReason::ForcedDirect => "forced-direct",
        PathReason::ForcedExternal => "forced-external",
        PathReason::Hdr => "hdr",
        PathReason::Default => "default",
        PathReason::ExternalUnavailable => "external-unavailable",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_framebuffer_created(&mut self, e: &FramebufferEvent) {
        let _ = writeln!(
            self.writer,
            "[fb+] frame={} fb={} format={:?} size={}x{} modifiers={}",
            e.frame_index,
            e.framebuffer.0,
            e.format,
            e.width,
            e.height,
            e.explicit_modifiers,
        );
    }

    fn on_framebuffer_retired(&mut self, e: &FramebufferRetireEvent) {
        let _ = writeln!(
            self.writer,
            "[fb-] frame={} fb={} reason={}",
            e.frame_index,
            e.framebuffer.0,
            retire_name(e.reason),
        );
    }

    fn on_plane_commit(&mut self, e: &PlaneCommitEvent) {
        let _ = writeln!(
            self.writer,
            "[plane] frame={} plane={} fb={} dst={},{} {}x{}",
            e.frame_index,
            e.plane.0,
            e.framebuffer.0,
            e.dst.x,
            e.dst.y,
            e.dst.width,
            e.dst.height,
        );
    }

    fn on_property_write(&mut self, e: &PropertyWriteEvent) {
        let _ = writeln!(
            self.writer,
            "[prop] {}=\"{}\" value={} accepted={}",
            e.name, e.value_name, e.value, e.accepted,
        );
    }

    fn on_hdr_mode(&mut self, e: &HdrModeEvent) {
        let _ = writeln!(
            self.writer,
            "[hdr] enabled={} blob={}",
            e.enabled, e.blob.0,
        );
    }

    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        let _ = writeln!(
            self.writer,
            "[drop] frame={} stage={}",
            e.frame_index,
            stage_name(e.stage),
        );
    }

    fn on_path_selected(&mut self, e: &PathSelectedEvent) {
        let _ = writeln!(
            self.writer,
            "[path] {} reason={}",
            path_name(e.path),
            reason_name(e.reason),
        );
    }
}
