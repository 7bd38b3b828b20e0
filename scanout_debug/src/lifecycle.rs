// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Framebuffer lifecycle checking.
//!
//! Replays a recording and verifies the rules the presenter promises:
//!
//! - a framebuffer is destroyed at most once, and only after it was created;
//! - the framebuffer on screen is never destroyed unless the presenter is
//!   shutting down;
//! - a framebuffer rejected by the plane was never on screen;
//! - at most one framebuffer is live between frames.

use std::collections::BTreeSet;

use scanout_core::ids::FramebufferId;
use scanout_core::trace::RetireReason;

use crate::recorder::RecordedEvent;

/// A broken lifecycle rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleViolation {
    /// A framebuffer id was created twice without being destroyed.
    #[error("{0:?} created while already live")]
    DuplicateCreate(FramebufferId),
    /// A framebuffer was destroyed that was never created or already gone.
    #[error("{0:?} destroyed but not live")]
    UnknownRetire(FramebufferId),
    /// The framebuffer on screen was destroyed outside shutdown.
    #[error("{0:?} destroyed while still on screen")]
    RetiredWhileScannedOut(FramebufferId),
    /// A framebuffer reported as rejected had been shown.
    #[error("{0:?} reported rejected after it was shown")]
    RejectedAfterCommit(FramebufferId),
    /// A framebuffer was committed that is not live.
    #[error("{0:?} committed but not live")]
    CommitOfDeadFramebuffer(FramebufferId),
    /// More than one framebuffer was live between frames.
    #[error("{live} framebuffers live at frame {frame_index}")]
    TooManyLive {
        /// The frame at which the check failed.
        frame_index: u64,
        /// How many were live.
        live: usize,
    },
}

/// What a valid recording looked like.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LifecycleSummary {
    /// Framebuffers created.
    pub created: usize,
    /// Plane commits.
    pub commits: usize,
    /// Framebuffers still live at the end of the recording.
    pub live: Vec<FramebufferId>,
    /// The framebuffer on screen at the end, if any.
    pub scanned_out: Option<FramebufferId>,
}

/// Checks `events` against the lifecycle rules.
pub fn check(events: &[RecordedEvent]) -> Result<LifecycleSummary, LifecycleViolation> {
    let mut live = BTreeSet::new();
    let mut shown = BTreeSet::new();
    let mut scanned_out = None;
    let mut summary = LifecycleSummary::default();
    let mut last_frame = 0;

    for event in events {
        match *event {
            RecordedEvent::FramebufferCreated(e) => {
                // Only the framebuffer on screen may outlive its frame.
                if live.len() > 1 {
                    return Err(LifecycleViolation::TooManyLive {
                        frame_index: e.frame_index,
                        live: live.len(),
                    });
                }
                if !live.insert(e.framebuffer) {
                    return Err(LifecycleViolation::DuplicateCreate(e.framebuffer));
                }
                summary.created += 1;
                last_frame = e.frame_index;
            }
            RecordedEvent::PlaneCommit(e) => {
                if !live.contains(&e.framebuffer) {
                    return Err(LifecycleViolation::CommitOfDeadFramebuffer(e.framebuffer));
                }
                scanned_out = Some(e.framebuffer);
                shown.insert(e.framebuffer);
                summary.commits += 1;
            }
            RecordedEvent::FramebufferRetired(e) => {
                if !live.remove(&e.framebuffer) {
                    return Err(LifecycleViolation::UnknownRetire(e.framebuffer));
                }
                match e.reason {
                    RetireReason::Shutdown => {
                        if scanned_out == Some(e.framebuffer) {
                            scanned_out = None;
                        }
                    }
                    RetireReason::Rejected if shown.contains(&e.framebuffer) => {
                        return Err(LifecycleViolation::RejectedAfterCommit(e.framebuffer));
                    }
                    RetireReason::Rejected | RetireReason::Superseded => {
                        if scanned_out == Some(e.framebuffer) {
                            return Err(LifecycleViolation::RetiredWhileScannedOut(
                                e.framebuffer,
                            ));
                        }
                    }
                }
            }
            RecordedEvent::PropertyWrite(_)
            | RecordedEvent::HdrMode(_)
            | RecordedEvent::FrameDropped(_)
            | RecordedEvent::PathSelected(_) => {}
        }
    }

    if live.len() > 1 {
        return Err(LifecycleViolation::TooManyLive {
            frame_index: last_frame,
            live: live.len(),
        });
    }

    summary.live = live.into_iter().collect();
    summary.scanned_out = scanned_out;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanout_core::format::Fourcc;
    use scanout_core::geometry::PlaneRect;
    use scanout_core::ids::PlaneId;
    use scanout_core::trace::{FramebufferEvent, FramebufferRetireEvent, PlaneCommitEvent};

    fn created(frame_index: u64, fb: u32) -> RecordedEvent {
        RecordedEvent::FramebufferCreated(FramebufferEvent {
            frame_index,
            framebuffer: FramebufferId(fb),
            format: Fourcc::NV12,
            width: 1920,
            height: 1080,
            explicit_modifiers: false,
        })
    }

    fn committed(frame_index: u64, fb: u32) -> RecordedEvent {
        RecordedEvent::PlaneCommit(PlaneCommitEvent {
            frame_index,
            plane: PlaneId(31),
            framebuffer: FramebufferId(fb),
            dst: PlaneRect::new(0, 0, 1920, 1080),
        })
    }

    fn retired(frame_index: u64, fb: u32, reason: RetireReason) -> RecordedEvent {
        RecordedEvent::FramebufferRetired(FramebufferRetireEvent {
            frame_index,
            framebuffer: FramebufferId(fb),
            reason,
        })
    }

    #[test]
    fn steady_stream_is_valid() {
        let mut events = vec![created(1, 1), committed(1, 1)];
        for frame in 2..=10_u32 {
            events.push(created(u64::from(frame), frame));
            events.push(committed(u64::from(frame), frame));
            events.push(retired(u64::from(frame), frame - 1, RetireReason::Superseded));
        }
        events.push(retired(10, 10, RetireReason::Shutdown));

        let summary = check(&events).unwrap();
        assert_eq!(summary.created, 10);
        assert_eq!(summary.commits, 10);
        assert!(summary.live.is_empty());
        assert_eq!(summary.scanned_out, None);
    }

    #[test]
    fn destroying_the_visible_framebuffer_is_caught() {
        let events = [
            created(1, 1),
            committed(1, 1),
            retired(1, 1, RetireReason::Superseded),
        ];
        assert_eq!(
            check(&events),
            Err(LifecycleViolation::RetiredWhileScannedOut(FramebufferId(1)))
        );
    }

    #[test]
    fn rejected_frame_keeps_previous_on_screen() {
        let events = [
            created(1, 1),
            committed(1, 1),
            created(2, 2),
            retired(2, 2, RetireReason::Rejected),
        ];
        let summary = check(&events).unwrap();
        assert_eq!(summary.live, [FramebufferId(1)]);
        assert_eq!(summary.scanned_out, Some(FramebufferId(1)));
    }

    #[test]
    fn rejecting_a_shown_framebuffer_is_caught() {
        let events = [
            created(1, 1),
            committed(1, 1),
            created(2, 2),
            committed(2, 2),
            retired(2, 1, RetireReason::Superseded),
            retired(3, 2, RetireReason::Rejected),
        ];
        assert_eq!(
            check(&events),
            Err(LifecycleViolation::RejectedAfterCommit(FramebufferId(2)))
        );
    }

    #[test]
    fn double_destroy_is_caught() {
        let events = [
            created(1, 1),
            committed(1, 1),
            created(2, 2),
            committed(2, 2),
            retired(2, 1, RetireReason::Superseded),
            retired(2, 1, RetireReason::Superseded),
        ];
        assert_eq!(
            check(&events),
            Err(LifecycleViolation::UnknownRetire(FramebufferId(1)))
        );
    }

    #[test]
    fn leaked_predecessor_is_caught() {
        let events = [
            created(1, 1),
            committed(1, 1),
            created(2, 2),
            committed(2, 2),
            created(3, 3),
        ];
        assert_eq!(
            check(&events),
            Err(LifecycleViolation::TooManyLive {
                frame_index: 3,
                live: 2
            })
        );
    }

    #[test]
    fn commit_of_unknown_framebuffer_is_caught() {
        assert_eq!(
            check(&[committed(1, 5)]),
            Err(LifecycleViolation::CommitOfDeadFramebuffer(FramebufferId(5)))
        );
    }
}
