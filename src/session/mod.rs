//! The reading session: position, playback and manual navigation for the
//! open document.
//!
//! A session owns its [`Scheduler`] and [`PositionStore`]. It is driven from
//! outside: input handlers call the navigation operations, the render layer
//! hands over finished [`RenderTree`]s, and the event loop feeds fired timers
//! back through [`ReadingSession::pump`]. Everything the view needs to react
//! to comes out of [`ReadingSession::drain_events`].
//!
//! While playing there is exactly one pending advance timer; in any other
//! state there is none. Every transition cancels before it reschedules.

mod event;

pub use event::{PlaybackState, ScrollRequest, SessionEvent, StopReason};

use tracing::{debug, info};

use crate::dom::NodeId;
use crate::error::{Error, Result};
use crate::locator::{Direction, Locator};
use crate::position::{PositionStore, ReadingPosition};
use crate::render::RenderTree;
use crate::scheduler::{Fired, ManualScheduler, Scheduler, TimerKind, TimerToken};
use crate::search::SearchResult;
use crate::settings::Settings;
use crate::stream::{WordStream, linearize};

/// Interval of the continuous-move loop.
pub const CONTINUOUS_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, Copy)]
struct PendingAdvance {
    token: TimerToken,
    target: usize,
}

#[derive(Debug, Clone, Copy)]
struct Continuous {
    token: TimerToken,
    direction: Direction,
}

/// Sequential reading state for one open document.
pub struct ReadingSession<S: Scheduler, P: PositionStore> {
    scheduler: S,
    positions: P,
    settings: Settings,
    document_id: Option<String>,
    tree: Option<RenderTree>,
    stream: Option<WordStream>,
    current: usize,
    state: PlaybackState,
    advance: Option<PendingAdvance>,
    continuous: Option<Continuous>,
    events: Vec<SessionEvent>,
}

impl<S: Scheduler, P: PositionStore> ReadingSession<S, P> {
    pub fn new(scheduler: S, positions: P, settings: Settings) -> Self {
        Self {
            scheduler,
            positions,
            settings: settings.normalized(),
            document_id: None,
            tree: None,
            stream: None,
            current: 0,
            state: PlaybackState::Stopped,
            advance: None,
            continuous: None,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn current_ordinal(&self) -> usize {
        self.current
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn stream(&self) -> Option<&WordStream> {
        self.stream.as_ref()
    }

    pub fn tree(&self) -> Option<&RenderTree> {
        self.tree.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings. Takes effect from the next scheduled advance.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings.normalized();
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn positions(&self) -> &P {
        &self.positions
    }

    pub fn group_size(&self) -> usize {
        self.settings.word_group_size.max(1)
    }

    /// Text of the highlighted word group.
    pub fn current_word_group(&self) -> Option<String> {
        self.stream.as_ref()?.group_text(self.current, self.group_size())
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Switch to `document_id`, resetting all state.
    ///
    /// The last saved position is restored (0 for an unseen document); no
    /// playback starts. Words become navigable once
    /// [`on_content_ready`](Self::on_content_ready) is called.
    pub fn open_document(&mut self, document_id: impl Into<String>) {
        self.teardown(StopReason::DocumentSwitch);
        let document_id = document_id.into();
        self.current = self.positions.get_last_position(&document_id).unwrap_or(0);
        info!(document = %document_id, position = self.current, "opened document");
        self.document_id = Some(document_id);
    }

    /// Tear down the session: cancel every loop and save the position.
    pub fn close(&mut self) {
        self.teardown(StopReason::Teardown);
    }

    /// Adopt a finished render pass.
    ///
    /// Trees for another document or from an older generation are ignored.
    /// When a previous generation was already linearized, the position is
    /// carried over through its content anchor rather than the raw ordinal.
    pub fn on_content_ready(&mut self, tree: RenderTree) -> Result<()> {
        if self.document_id.as_deref() != Some(tree.document_id()) {
            debug!(document = tree.document_id(), "ignoring render for other document");
            return Ok(());
        }
        if let Some(stream) = &self.stream
            && tree.generation() <= stream.generation()
        {
            debug!(generation = tree.generation().0, "ignoring stale render");
            return Ok(());
        }

        let stream = linearize(&tree)?;
        let anchor = self.stream.as_ref().and_then(|old| old.anchor_of(self.current));
        let position = match anchor {
            Some(anchor) => stream.resolve(&anchor).unwrap_or(0),
            None => self.current.min(stream.len().saturating_sub(1)),
        };
        debug!(
            generation = tree.generation().0,
            from = self.current,
            to = position,
            "rebound position to new render"
        );
        let empty = stream.is_empty();
        self.tree = Some(tree);
        self.stream = Some(stream);

        let changed = position != self.current;
        self.current = position;
        if !empty {
            self.emit_position();
            if changed {
                self.persist();
            }
        }

        if self.state == PlaybackState::Playing {
            self.schedule_advance();
        }
        Ok(())
    }

    /// Start or stop auto-advance.
    ///
    /// Starting needs a linearized document with at least one word; otherwise
    /// nothing changes and [`Error::NotReady`] or [`Error::NoContent`] is
    /// returned.
    pub fn toggle_play(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => {
                self.stop(StopReason::UserToggle);
                Ok(())
            }
            PlaybackState::Stopped | PlaybackState::ManualScrub => {
                self.require_words()?;
                self.cancel_continuous();
                self.play();
                Ok(())
            }
        }
    }

    pub fn step_forward(&mut self) -> Result<()> {
        self.manual_step(Direction::Forward)
    }

    pub fn step_backward(&mut self) -> Result<()> {
        self.manual_step(Direction::Backward)
    }

    /// Move `manual_step_multiplier` groups in `direction` and stop.
    pub fn manual_step(&mut self, direction: Direction) -> Result<()> {
        self.require_words()?;
        self.cancel_continuous();
        self.stop(StopReason::ManualStep);
        let hops = self.settings.manual_step_multiplier.max(1) * self.group_size();
        self.move_by(direction, hops);
        Ok(())
    }

    /// Begin a held continuous move: one move now, then one every
    /// [`CONTINUOUS_INTERVAL_MS`] until [`stop_continuous`](Self::stop_continuous).
    pub fn start_continuous(&mut self, direction: Direction) -> Result<()> {
        self.require_words()?;
        self.cancel_continuous();
        self.stop(StopReason::ManualStep);
        self.state = PlaybackState::ManualScrub;
        self.continuous_tick(direction);
        Ok(())
    }

    /// Release a held continuous move.
    pub fn stop_continuous(&mut self) {
        if self.continuous.is_none() && self.state != PlaybackState::ManualScrub {
            return;
        }
        self.cancel_continuous();
        self.state = PlaybackState::Stopped;
        self.persist();
        self.events.push(SessionEvent::PlaybackStopped {
            reason: StopReason::ScrubEnded,
        });
    }

    /// Jump to `ordinal`, or to the first word of `chapter` when given, and
    /// start playing from there.
    pub fn jump_to(&mut self, ordinal: usize, chapter: Option<usize>) -> Result<()> {
        let stream = self.require_words()?;
        let target = chapter
            .and_then(|c| stream.chapter_start(c))
            .unwrap_or(ordinal)
            .min(stream.len() - 1);
        self.cancel_continuous();
        self.cancel_advance();
        self.commit(target);
        self.play();
        Ok(())
    }

    /// "Start reading from here": jump to the word at byte `offset` of text
    /// node `node` in the current render tree.
    pub fn start_reading_from(&mut self, node: NodeId, offset: usize) -> Result<()> {
        let stream = self.require_words()?;
        match stream.ordinal_at(node, offset) {
            Some(ordinal) => self.jump_to(ordinal, None),
            None => {
                debug!(?node, offset, "no word at reading start point");
                Ok(())
            }
        }
    }

    /// Move to a search hit and ask the view to select it.
    ///
    /// Hits from an older render generation are dropped silently.
    pub fn select_search_result(&mut self, result: &SearchResult) -> Result<()> {
        let stream = self.require_words()?;
        if result.generation != stream.generation() {
            debug!(generation = result.generation.0, "ignoring stale search result");
            return Ok(());
        }
        self.cancel_continuous();
        self.stop(StopReason::SearchJump);
        if let Some(ordinal) = result.ordinal {
            self.commit(ordinal);
        }
        self.events.push(SessionEvent::SelectionRequested {
            block: result.block,
            range: result.range.clone(),
        });
        Ok(())
    }

    /// Deliver a fired timer. Tokens this session no longer owns are ignored.
    pub fn on_timer(&mut self, token: TimerToken) {
        if let Some(advance) = self.advance
            && advance.token == token
        {
            self.advance = None;
            self.commit(advance.target);
            if self.state == PlaybackState::Playing {
                self.schedule_advance();
            }
            return;
        }
        if let Some(continuous) = self.continuous
            && continuous.token == token
        {
            self.continuous = None;
            self.continuous_tick(continuous.direction);
            return;
        }
        debug!(?token, "ignoring stale timer");
    }

    /// Run every due timer. Timers that belong to other components (search
    /// debounce) are returned to the caller.
    pub fn pump(&mut self) -> Vec<Fired> {
        let mut foreign = Vec::new();
        for fired in self.scheduler.take_due() {
            match fired.kind {
                TimerKind::Advance | TimerKind::Continuous => self.on_timer(fired.token),
                TimerKind::SearchDebounce => foreign.push(fired),
            }
        }
        foreign
    }

    fn require_words(&mut self) -> Result<&WordStream> {
        match &self.stream {
            None => Err(Error::NotReady),
            Some(stream) if stream.is_empty() => {
                self.events.push(SessionEvent::NoContent);
                Err(Error::NoContent)
            }
            Some(stream) => Ok(stream),
        }
    }

    fn play(&mut self) {
        if !self.settings.sequential_reading_enabled {
            debug!("sequential reading disabled; not starting playback");
            self.stop(StopReason::UserToggle);
            return;
        }
        if self.state != PlaybackState::Playing {
            self.state = PlaybackState::Playing;
            info!(position = self.current, "playback started");
            self.events.push(SessionEvent::PlaybackStarted);
        }
        self.schedule_advance();
    }

    /// Leave `Playing` or `ManualScrub`, saving the position.
    fn stop(&mut self, reason: StopReason) {
        self.cancel_advance();
        if self.state == PlaybackState::Stopped {
            return;
        }
        self.state = PlaybackState::Stopped;
        self.persist();
        info!(?reason, position = self.current, "playback stopped");
        self.events.push(SessionEvent::PlaybackStopped { reason });
    }

    fn teardown(&mut self, reason: StopReason) {
        self.cancel_continuous();
        self.stop(reason);
        if self.document_id.is_some() && self.stream.as_ref().is_some_and(|s| !s.is_empty()) {
            self.persist();
        }
        self.document_id = None;
        self.tree = None;
        self.stream = None;
        self.current = 0;
    }

    /// Plan the next group advance from the current word.
    fn schedule_advance(&mut self) {
        self.cancel_advance();
        let (Some(stream), Some(tree)) = (&self.stream, &self.tree) else {
            return;
        };
        let locator = Locator::new(stream, tree);

        let mut hops = Vec::with_capacity(self.group_size());
        let mut target = self.current;
        for _ in 0..self.group_size() {
            match locator.next(target) {
                Some(step) => {
                    hops.push((step.punctuation, step.crossed_paragraph));
                    target = step.ordinal;
                }
                None => {
                    debug!(position = self.current, "end of document");
                    self.stop(StopReason::EndOfDocument);
                    return;
                }
            }
        }

        let delay = self
            .settings
            .pacing
            .group_delay(self.settings.pace_ms, &hops)
            .max(1);
        let token = self.scheduler.schedule(delay, TimerKind::Advance);
        self.advance = Some(PendingAdvance { token, target });
    }

    fn continuous_tick(&mut self, direction: Direction) {
        let hops = self.settings.continuous_step_multiplier.max(1) * self.group_size();
        self.move_by(direction, hops);
        let token = self
            .scheduler
            .schedule(CONTINUOUS_INTERVAL_MS, TimerKind::Continuous);
        self.continuous = Some(Continuous { token, direction });
    }

    /// Hop up to `hops` words, stopping early at either end. Commits only if
    /// the position changed.
    fn move_by(&mut self, direction: Direction, hops: usize) {
        let (Some(stream), Some(tree)) = (&self.stream, &self.tree) else {
            return;
        };
        let locator = Locator::new(stream, tree);
        let mut target = self.current;
        for _ in 0..hops {
            match locator.step(target, direction) {
                Some(step) => target = step.ordinal,
                None => break,
            }
        }
        if target != self.current {
            self.commit(target);
        }
    }

    fn cancel_advance(&mut self) {
        if let Some(advance) = self.advance.take() {
            self.scheduler.cancel(advance.token);
        }
    }

    fn cancel_continuous(&mut self) {
        if let Some(continuous) = self.continuous.take() {
            self.scheduler.cancel(continuous.token);
        }
    }

    fn commit(&mut self, ordinal: usize) {
        self.current = ordinal;
        self.persist();
        self.emit_position();
    }

    fn persist(&mut self) {
        if let Some(id) = &self.document_id {
            self.positions.set_last_position(id, self.current);
        }
    }

    fn emit_position(&mut self) {
        let Some(id) = &self.document_id else {
            return;
        };
        self.events.push(SessionEvent::PositionChanged {
            position: ReadingPosition {
                document_id: id.clone(),
                word_ordinal: self.current,
            },
            scroll: ScrollRequest {
                ordinal: self.current,
                alignment: self.settings.scroll_alignment,
            },
        });
    }
}

impl<P: PositionStore> ReadingSession<ManualScheduler, P> {
    /// Move the virtual clock forward by `ms`, firing timers at their exact
    /// deadlines in order.
    pub fn advance_time(&mut self, ms: u64) {
        let until = self.scheduler.now_ms().saturating_add(ms);
        while let Some(deadline) = self.scheduler.next_deadline()
            && deadline <= until
        {
            self.scheduler.set_time(deadline);
            self.pump();
        }
        self.scheduler.set_time(until);
    }
}

impl<S: Scheduler, P: PositionStore> Drop for ReadingSession<S, P> {
    fn drop(&mut self) {
        self.cancel_advance();
        self.cancel_continuous();
    }
}
