// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording.
//!
//! [`RecorderSink`] implements [`TraceSink`] and keeps every event, in order,
//! as a [`RecordedEvent`]. Feed the result to
//! [`lifecycle::check`](crate::lifecycle::check) or inspect it directly.

use scanout_core::trace::{
    FrameDroppedEvent, FramebufferEvent, FramebufferRetireEvent, HdrModeEvent, PathSelectedEvent,
    PlaneCommitEvent, PropertyWriteEvent, TraceSink,
};

/// One recorded event.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A [`FramebufferEvent`].
    FramebufferCreated(FramebufferEvent),
    /// A [`FramebufferRetireEvent`].
    FramebufferRetired(FramebufferRetireEvent),
    /// A [`PlaneCommitEvent`].
    PlaneCommit(PlaneCommitEvent),
    /// A [`PropertyWriteEvent`].
    PropertyWrite(PropertyWriteEvent),
    /// An [`HdrModeEvent`].
    HdrMode(HdrModeEvent),
    /// A [`FrameDroppedEvent`].
    FrameDropped(FrameDroppedEvent),
    /// A [`PathSelectedEvent`].
    PathSelected(PathSelectedEvent),
}

/// A [`TraceSink`] that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecorderSink {
    events: Vec<RecordedEvent>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Consumes the recorder and returns the events.
    #[must_use]
    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// Forgets everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Property writes, in order.
    pub fn property_writes(&self) -> impl Iterator<Item = &PropertyWriteEvent> + '_ {
        self.events.iter().filter_map(|e| match e {
            RecordedEvent::PropertyWrite(w) => Some(w),
            _ => None,
        })
    }
}

impl TraceSink for RecorderSink {
    fn on_framebuffer_created(&mut self, e: &FramebufferEvent) {
        self.events.push(RecordedEvent::FramebufferCreated(*e));
    }

    fn on_framebuffer_retired(&mut self, e: &FramebufferRetireEvent) {
        self.events.push(RecordedEvent::FramebufferRetired(*e));
    }

    fn on_plane_commit(&mut self, e: &PlaneCommitEvent) {
        self.events.push(RecordedEvent::PlaneCommit(*e));
    }

    fn on_property_write(&mut self, e: &PropertyWriteEvent) {
        self.events.push(RecordedEvent::PropertyWrite(*e));
    }

    fn on_hdr_mode(&mut self, e: &HdrModeEvent) {
        self.events.push(RecordedEvent::HdrMode(*e));
    }

    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        self.events.push(RecordedEvent::FrameDropped(*e));
    }

    fn on_path_selected(&mut self, e: &PathSelectedEvent) {
        self.events.push(RecordedEvent::PathSelected(*e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanout_core::ids::BlobId;
    use scanout_core::trace::{DropStage, Tracer};

    #[test]
    fn events_are_kept_in_order() {
        let mut rec = RecorderSink::new();
        {
            let mut tracer = Tracer::new(&mut rec);
            tracer.frame_dropped(&FrameDroppedEvent {
                frame_index: 1,
                stage: DropStage::Map,
            });
            tracer.hdr_mode(&HdrModeEvent {
                enabled: true,
                blob: BlobId(4),
            });
            tracer.property_write(&PropertyWriteEvent {
                name: "COLOR_RANGE",
                value_name: "YCbCr limited range",
                value: 0,
                accepted: false,
            });
        }

        let events = rec.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], RecordedEvent::FrameDropped(_)));
        assert!(matches!(events[1], RecordedEvent::HdrMode(e) if e.blob == BlobId(4)));
        let writes: Vec<_> = rec.property_writes().collect();
        assert_eq!(writes.len(), 1);
        assert!(!writes[0].accepted);

        rec.clear();
        assert!(rec.into_events().is_empty());
    }
}
