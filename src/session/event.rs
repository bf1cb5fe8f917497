use std::ops::Range;

use crate::dom::NodeId;
use crate::position::ReadingPosition;
use crate::settings::ScrollAlignment;

/// Playback state of a reading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    /// A continuous move gesture is held.
    ManualScrub,
}

/// Why playback or scrubbing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    UserToggle,
    /// The locator ran out of words.
    EndOfDocument,
    ManualStep,
    SearchJump,
    DocumentSwitch,
    Teardown,
    ScrubEnded,
}

/// Ask the view to bring a word into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub ordinal: usize,
    pub alignment: ScrollAlignment,
}

/// Notifications for the view layer, drained with
/// [`ReadingSession::drain_events`](super::ReadingSession::drain_events).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PositionChanged {
        position: ReadingPosition,
        scroll: ScrollRequest,
    },
    PlaybackStarted,
    PlaybackStopped {
        reason: StopReason,
    },
    /// Playback was requested on a document without words.
    NoContent,
    /// Select `range` (bytes of the block's text content) inside `block`.
    SelectionRequested {
        block: NodeId,
        range: Range<usize>,
    },
}
