/// Dialogue scheduler — typewriter reveal, FIFO queueing, interruption and
/// the dim/fade lifecycle of on-screen lines.
///
/// The scheduler is a state machine over simulated time. Every timer it
/// starts is held in its [`TimerWheel`] and owned by exactly one slot
/// (typing, queue advance, idle, mode switch, or one of a visible line's
/// dim/remove/fade slots), so teardown can cancel all of them.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::core::config::SchedulerConfig;
use crate::core::timers::{TimerId, TimerWheel};
use crate::schema::line::{LineId, Mood, ResolvedLine};

/// Voice the narrator is currently speaking in. Selects typing speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NarratorMode {
    /// Disguised as the player's own thoughts.
    #[default]
    Inner,
    /// An overt but composed narrator.
    Narrator,
    /// The disguise is failing.
    Cracking,
    /// Talking to the player directly.
    Conversational,
}

/// Identifies one on-screen line for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineState {
    Typing,
    Displayed,
    Fading,
}

/// Per-line overrides for [`DialogueScheduler::say_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SayOptions {
    /// Milliseconds per character, instead of the mode's speed.
    pub speed_ms: Option<u64>,
    /// How long the completed line stays before fading.
    pub hold_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub line: ResolvedLine,
    pub options: SayOptions,
}

/// What the presentation layer paints for one visible line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderLine {
    pub handle: LineHandle,
    pub id: LineId,
    /// Text revealed so far.
    pub text: String,
    pub mood: Mood,
    pub state: LineState,
    pub dimmed: bool,
    pub interrupted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulerEvent {
    LineStarted { handle: LineHandle, id: LineId },
    LineCompleted { handle: LineHandle, id: LineId },
    LineInterrupted { handle: LineHandle, id: LineId },
    LineDimmed { handle: LineHandle },
    LineFading { handle: LineHandle },
    LineRemoved { handle: LineHandle },
    QueueEmpty,
    Idle,
    ModeChanged { mode: NarratorMode },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Type,
    QueueAdvance,
    Dim(LineHandle),
    Remove(LineHandle),
    FadeOut(LineHandle),
    Idle,
    ModeSwitch(NarratorMode),
}

#[derive(Debug, Clone)]
struct VisibleLine {
    handle: LineHandle,
    line: ResolvedLine,
    len: usize,
    revealed: usize,
    state: LineState,
    dimmed: bool,
    interrupted: bool,
    options: SayOptions,
    dim_timer: Option<TimerId>,
    remove_timer: Option<TimerId>,
    fade_timer: Option<TimerId>,
}

impl VisibleLine {
    fn render(&self) -> RenderLine {
        RenderLine {
            handle: self.handle,
            id: self.line.id.clone(),
            text: self.line.text.chars().take(self.revealed).collect(),
            mood: self.line.mood,
            state: self.state,
            dimmed: self.dimmed,
            interrupted: self.interrupted,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Typing {
    handle: LineHandle,
    timer: TimerId,
}

#[derive(Default)]
struct IdleMonitor {
    timeout_ms: Option<u64>,
    timer: Option<TimerId>,
    callback: Option<Box<dyn FnMut()>>,
}

impl fmt::Debug for IdleMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleMonitor")
            .field("timeout_ms", &self.timeout_ms)
            .field("timer", &self.timer)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

type FollowUpFn<'a> = dyn FnMut(&ResolvedLine) -> Option<ResolvedLine> + 'a;

#[derive(Debug)]
pub struct DialogueScheduler {
    config: SchedulerConfig,
    default_mode: NarratorMode,
    mode: NarratorMode,
    timers: TimerWheel<TimerKind>,
    queue: VecDeque<QueueItem>,
    visible: Vec<VisibleLine>,
    typing: Option<Typing>,
    queue_timer: Option<TimerId>,
    mode_timer: Option<TimerId>,
    idle: IdleMonitor,
    next_handle: u64,
    events: Vec<SchedulerEvent>,
}

impl DialogueScheduler {
    pub fn new(config: SchedulerConfig, mode: NarratorMode) -> Self {
        Self {
            config,
            default_mode: mode,
            mode,
            timers: TimerWheel::new(),
            queue: VecDeque::new(),
            visible: Vec::new(),
            typing: None,
            queue_timer: None,
            mode_timer: None,
            idle: IdleMonitor::default(),
            next_handle: 0,
            events: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn now(&self) -> u64 {
        self.timers.now()
    }

    pub fn mode(&self) -> NarratorMode {
        self.mode
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_some()
    }

    /// True while a line is typing or more lines are waiting to play.
    pub fn is_busy(&self) -> bool {
        self.typing.is_some() || self.queue_timer.is_some() || !self.queue.is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_ids(&self) -> Vec<LineId> {
        self.queue.iter().map(|item| item.line.id.clone()).collect()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// Timers currently scheduled, of every kind.
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Render-ready view of every visible line, oldest first.
    pub fn visible_lines(&self) -> Vec<RenderLine> {
        self.visible.iter().map(VisibleLine::render).collect()
    }

    /// Take the events emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<SchedulerEvent> {
        std::mem::take(&mut self.events)
    }

    fn speed_for(&self, mode: NarratorMode) -> u64 {
        let speeds = &self.config.speeds;
        match mode {
            NarratorMode::Inner => speeds.inner,
            NarratorMode::Narrator => speeds.narrator,
            NarratorMode::Cracking => speeds.cracking,
            NarratorMode::Conversational => speeds.conversational,
        }
    }

    // ------------------------------------------------------------------
    // Speaking
    // ------------------------------------------------------------------

    pub fn say(&mut self, line: ResolvedLine) {
        self.say_with(line, SayOptions::default());
    }

    /// Show or queue a line.
    ///
    /// A line with `delay_ms == 0` is event-triggered: it plays at once,
    /// and if anything is in flight the pending queue is discarded and the
    /// typing line is frozen where it stands. A line with a delay joins the
    /// back of the queue.
    pub fn say_with(&mut self, line: ResolvedLine, options: SayOptions) {
        let item = QueueItem { line, options };
        if item.line.delay_ms == 0 {
            if self.is_busy() {
                self.discard_pending();
            }
            self.display(item);
        } else {
            self.queue.push_back(item);
            self.start_queue_if_idle();
        }
    }

    /// Play a line now, discarding the queue and interrupting any typing,
    /// whatever its delay.
    pub fn say_immediate(&mut self, line: ResolvedLine) {
        self.say_immediate_with(line, SayOptions::default());
    }

    pub fn say_immediate_with(&mut self, line: ResolvedLine, options: SayOptions) {
        self.discard_pending();
        self.display(QueueItem { line, options });
    }

    /// Append a line to the back of the queue whatever its delay. It never
    /// interrupts; it plays once everything ahead of it has finished.
    pub fn enqueue(&mut self, line: ResolvedLine) {
        self.queue.push_back(QueueItem {
            line,
            options: SayOptions::default(),
        });
        self.start_queue_if_idle();
    }

    /// Finish the typing line at once, or stop waiting for the next queued
    /// line. Does nothing when idle.
    pub fn skip<F>(&mut self, mut follow_up: F)
    where
        F: FnMut(&ResolvedLine) -> Option<ResolvedLine>,
    {
        if let Some(typing) = self.typing {
            self.timers.cancel(typing.timer);
            if let Some(line) = self.find_mut(typing.handle) {
                line.revealed = line.len;
            }
            self.complete_typing(&mut follow_up);
        } else if self.queue_timer.is_some() {
            self.timers.cancel_slot(&mut self.queue_timer);
            self.advance_queue();
        }
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Remove every line and stop all speech. The idle monitor and any
    /// pending mode switch are left running.
    pub fn hide(&mut self) {
        if let Some(typing) = self.typing.take() {
            self.timers.cancel(typing.timer);
        }
        self.timers.cancel_slot(&mut self.queue_timer);
        self.queue.clear();
        for mut line in std::mem::take(&mut self.visible) {
            self.cancel_line_timers(&mut line);
            self.events.push(SchedulerEvent::LineRemoved { handle: line.handle });
        }
    }

    /// [`hide`](Self::hide), and also silence the idle monitor until the
    /// next [`notify_activity`](Self::notify_activity) and cancel any
    /// pending mode switch. Nothing fires after this until new work arrives.
    pub fn clear(&mut self) {
        self.hide();
        self.timers.cancel_slot(&mut self.idle.timer);
        self.timers.cancel_slot(&mut self.mode_timer);
    }

    /// [`clear`](Self::clear), restore the starting mode and disable idle
    /// detection.
    pub fn reset(&mut self) {
        self.clear();
        self.idle = IdleMonitor::default();
        self.set_mode(self.default_mode);
    }

    // ------------------------------------------------------------------
    // Mode
    // ------------------------------------------------------------------

    /// Switch mode. A line already typing picks up the new speed from its
    /// next character unless it carries its own speed.
    pub fn set_mode(&mut self, mode: NarratorMode) {
        if self.mode != mode {
            self.mode = mode;
            self.events.push(SchedulerEvent::ModeChanged { mode });
        }
    }

    /// Switch mode after `delay_ms`, replacing any earlier pending switch.
    pub fn schedule_mode(&mut self, mode: NarratorMode, delay_ms: u64) {
        self.timers.cancel_slot(&mut self.mode_timer);
        self.mode_timer = Some(self.timers.schedule(delay_ms, TimerKind::ModeSwitch(mode)));
    }

    // ------------------------------------------------------------------
    // Idle monitor
    // ------------------------------------------------------------------

    /// Call `callback` (and emit [`SchedulerEvent::Idle`]) after
    /// `timeout_ms` without [`notify_activity`](Self::notify_activity).
    pub fn on_idle<F>(&mut self, timeout_ms: u64, callback: F)
    where
        F: FnMut() + 'static,
    {
        self.idle.callback = Some(Box::new(callback));
        self.enable_idle(timeout_ms);
    }

    /// Like [`on_idle`](Self::on_idle) but event-only.
    pub fn enable_idle(&mut self, timeout_ms: u64) {
        self.idle.timeout_ms = Some(timeout_ms);
        self.arm_idle();
    }

    pub fn disable_idle(&mut self) {
        self.timers.cancel_slot(&mut self.idle.timer);
        self.idle = IdleMonitor::default();
    }

    /// Restart the silence window.
    pub fn notify_activity(&mut self) {
        self.arm_idle();
    }

    fn arm_idle(&mut self) {
        self.timers.cancel_slot(&mut self.idle.timer);
        if let Some(timeout) = self.idle.timeout_ms {
            self.idle.timer = Some(self.timers.schedule(timeout, TimerKind::Idle));
        }
    }

    // ------------------------------------------------------------------
    // Language
    // ------------------------------------------------------------------

    /// Replace the text of visible and queued lines in place, e.g. after a
    /// language switch. `retext` returns `None` to leave a line unchanged.
    /// Typing continues from the same character position.
    pub fn relocalize<F>(&mut self, mut retext: F)
    where
        F: FnMut(&ResolvedLine) -> Option<String>,
    {
        let typing = self.typing.map(|t| t.handle);
        for line in &mut self.visible {
            if let Some(text) = retext(&line.line) {
                let finished = line.revealed >= line.len && Some(line.handle) != typing;
                line.line.text = text;
                line.len = line.line.char_len();
                line.revealed = if finished && !line.interrupted {
                    line.len
                } else {
                    line.revealed.min(line.len)
                };
            }
        }
        for item in &mut self.queue {
            if let Some(text) = retext(&item.line) {
                item.line.text = text;
            }
        }
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Advance simulated time by `dt_ms`, firing every timer that falls
    /// due in order. `follow_up` supplies the chained line, if any, for
    /// each line that finishes typing.
    pub fn tick<F>(&mut self, dt_ms: u64, mut follow_up: F)
    where
        F: FnMut(&ResolvedLine) -> Option<ResolvedLine>,
    {
        let target = self.timers.now().saturating_add(dt_ms);
        while let Some((id, kind)) = self.timers.advance_to(target) {
            tracing::trace!(?id, ?kind, now = self.timers.now(), "timer fired");
            self.fire(kind, &mut follow_up);
        }
    }

    fn fire(&mut self, kind: TimerKind, follow_up: &mut FollowUpFn<'_>) {
        match kind {
            TimerKind::Type => self.type_next(follow_up),
            TimerKind::QueueAdvance => {
                self.queue_timer = None;
                self.advance_queue();
            }
            TimerKind::Dim(handle) => {
                if let Some(line) = self.find_mut(handle) {
                    line.dim_timer = None;
                    line.dimmed = true;
                    self.events.push(SchedulerEvent::LineDimmed { handle });
                }
            }
            TimerKind::Remove(handle) => self.start_fade(handle),
            TimerKind::FadeOut(handle) => {
                if let Some(index) = self.position(handle) {
                    let mut line = self.visible.remove(index);
                    line.fade_timer = None;
                    self.cancel_line_timers(&mut line);
                    self.events.push(SchedulerEvent::LineRemoved { handle });
                }
            }
            TimerKind::Idle => {
                self.idle.timer = None;
                self.events.push(SchedulerEvent::Idle);
                if let Some(callback) = self.idle.callback.as_mut() {
                    callback();
                }
                self.arm_idle();
            }
            TimerKind::ModeSwitch(mode) => {
                self.mode_timer = None;
                self.set_mode(mode);
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn position(&self, handle: LineHandle) -> Option<usize> {
        self.visible.iter().position(|l| l.handle == handle)
    }

    fn find_mut(&mut self, handle: LineHandle) -> Option<&mut VisibleLine> {
        self.visible.iter_mut().find(|l| l.handle == handle)
    }

    fn cancel_line_timers(&mut self, line: &mut VisibleLine) {
        self.timers.cancel_slot(&mut line.dim_timer);
        self.timers.cancel_slot(&mut line.remove_timer);
        self.timers.cancel_slot(&mut line.fade_timer);
    }

    /// Drop queued lines and freeze the typing line.
    fn discard_pending(&mut self) {
        if !self.queue.is_empty() {
            tracing::debug!(discarded = self.queue.len(), "discarding stale queued lines");
        }
        self.queue.clear();
        self.timers.cancel_slot(&mut self.queue_timer);
        self.interrupt_typing();
    }

    fn interrupt_typing(&mut self) {
        let Some(typing) = self.typing.take() else {
            return;
        };
        self.timers.cancel(typing.timer);
        if let Some(index) = self.position(typing.handle) {
            let revealed = {
                let line = &mut self.visible[index];
                line.interrupted = true;
                line.state = LineState::Displayed;
                line.revealed
            };
            let id = self.visible[index].line.id.clone();
            tracing::debug!(%id, revealed, "typing interrupted");
            self.events.push(SchedulerEvent::LineInterrupted {
                handle: typing.handle,
                id,
            });
            self.schedule_fade(index, revealed);
        }
    }

    fn start_queue_if_idle(&mut self) {
        if self.typing.is_some() || self.queue_timer.is_some() {
            return;
        }
        if let Some(front) = self.queue.front() {
            let delay = front.line.delay_ms;
            self.queue_timer = Some(self.timers.schedule(delay, TimerKind::QueueAdvance));
        }
    }

    fn advance_queue(&mut self) {
        match self.queue.pop_front() {
            Some(item) => self.display(item),
            None => self.events.push(SchedulerEvent::QueueEmpty),
        }
    }

    fn display(&mut self, item: QueueItem) {
        while self.visible.len() >= self.config.max_visible {
            let mut oldest = self.visible.remove(0);
            self.cancel_line_timers(&mut oldest);
            tracing::debug!(id = %oldest.line.id, "visible cap reached, dropping oldest line");
            self.events.push(SchedulerEvent::LineRemoved { handle: oldest.handle });
        }

        let handle = LineHandle(self.next_handle);
        self.next_handle += 1;
        let len = item.line.char_len();
        self.events.push(SchedulerEvent::LineStarted {
            handle,
            id: item.line.id.clone(),
        });
        self.visible.push(VisibleLine {
            handle,
            line: item.line,
            len,
            revealed: 0,
            state: LineState::Typing,
            dimmed: false,
            interrupted: false,
            options: item.options,
            dim_timer: None,
            remove_timer: None,
            fade_timer: None,
        });

        let speed = item.options.speed_ms.unwrap_or_else(|| self.speed_for(self.mode));
        let timer = self.timers.schedule(speed, TimerKind::Type);
        self.typing = Some(Typing { handle, timer });
    }

    fn type_next(&mut self, follow_up: &mut FollowUpFn<'_>) {
        let Some(typing) = self.typing else {
            return;
        };
        let mode_speed = self.speed_for(self.mode);
        let Some(line) = self.find_mut(typing.handle) else {
            self.typing = None;
            return;
        };
        line.revealed = (line.revealed + 1).min(line.len);
        if line.revealed >= line.len {
            self.complete_typing(follow_up);
        } else {
            let speed = line.options.speed_ms.unwrap_or(mode_speed);
            let timer = self.timers.schedule(speed, TimerKind::Type);
            self.typing = Some(Typing { timer, ..typing });
        }
    }

    fn complete_typing(&mut self, follow_up: &mut FollowUpFn<'_>) {
        let Some(typing) = self.typing.take() else {
            return;
        };
        let Some(index) = self.position(typing.handle) else {
            return;
        };
        let (line, len) = {
            let entry = &mut self.visible[index];
            entry.state = LineState::Displayed;
            entry.revealed = entry.len;
            (entry.line.clone(), entry.len)
        };
        self.events.push(SchedulerEvent::LineCompleted {
            handle: typing.handle,
            id: line.id.clone(),
        });
        self.schedule_fade(index, len);

        // Follow-ups always queue behind whatever is already waiting.
        if let Some(next) = follow_up(&line) {
            self.queue.push_back(QueueItem {
                line: next,
                options: SayOptions::default(),
            });
        }

        match self.queue.front() {
            Some(front) => {
                let delay = self.config.gap.for_len(len).max(front.line.delay_ms);
                self.queue_timer = Some(self.timers.schedule(delay, TimerKind::QueueAdvance));
            }
            None => self.events.push(SchedulerEvent::QueueEmpty),
        }
    }

    fn schedule_fade(&mut self, index: usize, len: usize) {
        let mut dim = self.config.dim.for_len(len);
        let mut remove = self.config.remove.for_len(len);
        if let Some(hold) = self.visible[index].options.hold_ms {
            remove = hold;
            dim = dim.min(hold);
        }
        let handle = self.visible[index].handle;
        let dim_timer = self.timers.schedule(dim, TimerKind::Dim(handle));
        let remove_timer = self.timers.schedule(remove, TimerKind::Remove(handle));
        let line = &mut self.visible[index];
        line.dim_timer = Some(dim_timer);
        line.remove_timer = Some(remove_timer);
    }

    fn start_fade(&mut self, handle: LineHandle) {
        let fade_ms = self.config.fade_ms;
        let Some(index) = self.position(handle) else {
            return;
        };
        let mut dim_timer = {
            let line = &mut self.visible[index];
            line.remove_timer = None;
            line.state = LineState::Fading;
            line.dimmed = true;
            line.dim_timer.take()
        };
        self.timers.cancel_slot(&mut dim_timer);
        let fade_timer = self.timers.schedule(fade_ms, TimerKind::FadeOut(handle));
        self.visible[index].fade_timer = Some(fade_timer);
        self.events.push(SchedulerEvent::LineFading { handle });
    }
}
