/// Narrator session — owns content, progression, decision history and the
/// scheduler, and wires them together: events in, resolved lines out.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::awareness::{is_baseline, AwarenessGrant, AwarenessLevel, Progression, BASELINE_ERA};
use crate::core::config::{ConfigError, NarratorConfig};
use crate::core::content::{ContentError, ContentStore};
use crate::core::resolve::{resolve, ResolveContext};
use crate::core::scheduler::{DialogueScheduler, NarratorMode, RenderLine, SayOptions, SchedulerEvent};
use crate::core::tracker::DecisionTracker;
use crate::schema::decision::DecisionRecord;
use crate::schema::game_state::GameStateQuery;
use crate::schema::line::ResolvedLine;
use crate::schema::memory::{InMemoryMemory, NarratorMemory};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("no content provided")]
    NoContent,
}

/// One play session's narrator. Built via `NarratorSession::builder()`.
pub struct NarratorSession {
    content: ContentStore,
    config: NarratorConfig,
    language: String,
    tracker: DecisionTracker,
    progression: Progression,
    scheduler: DialogueScheduler,
    memory: Box<dyn NarratorMemory>,
    rng: StdRng,
    last_idle_line: Option<String>,
    events: Vec<SchedulerEvent>,
}

/// Builder for constructing a `NarratorSession`.
pub struct NarratorSessionBuilder {
    content_paths: Vec<PathBuf>,
    config_path: Option<PathBuf>,
    era: u32,
    language: Option<String>,
    seed: u64,
    /// Directly provided content (for testing without files).
    content: Option<ContentStore>,
    /// Directly provided config (for testing without files).
    config: Option<NarratorConfig>,
    memory: Option<Box<dyn NarratorMemory>>,
}

fn context<'a>(
    language: &'a str,
    progression: &Progression,
    tracker: &'a DecisionTracker,
    game: &'a dyn GameStateQuery,
) -> ResolveContext<'a> {
    ResolveContext {
        language,
        era: progression.era(),
        awareness: progression.level(),
        tracker,
        game,
    }
}

fn follow_up_for(content: &ContentStore, completed: &ResolvedLine, ctx: &ResolveContext<'_>) -> Option<ResolvedLine> {
    completed
        .follow_up
        .as_deref()
        .and_then(|id| resolve(content, id, ctx))
}

impl NarratorSession {
    pub fn builder() -> NarratorSessionBuilder {
        NarratorSessionBuilder {
            content_paths: Vec::new(),
            config_path: None,
            era: BASELINE_ERA,
            language: None,
            seed: 0,
            content: None,
            config: None,
            memory: None,
        }
    }

    // ------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------

    pub fn era(&self) -> u32 {
        self.progression.era()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn level(&self) -> AwarenessLevel {
        self.progression.level()
    }

    pub fn points(&self) -> u32 {
        self.progression.points()
    }

    pub fn awareness_log(&self) -> &[AwarenessGrant] {
        self.progression.log()
    }

    pub fn mode(&self) -> NarratorMode {
        self.scheduler.mode()
    }

    pub fn tracker(&self) -> &DecisionTracker {
        &self.tracker
    }

    /// For marking explored areas, solved puzzles and found lore.
    pub fn tracker_mut(&mut self) -> &mut DecisionTracker {
        &mut self.tracker
    }

    pub fn scheduler(&self) -> &DialogueScheduler {
        &self.scheduler
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn memory(&self) -> &dyn NarratorMemory {
        self.memory.as_ref()
    }

    pub fn visible_lines(&self) -> Vec<RenderLine> {
        self.scheduler.visible_lines()
    }

    /// Events since the last call, in the order they happened.
    pub fn drain_events(&mut self) -> Vec<SchedulerEvent> {
        let mut events = std::mem::take(&mut self.events);
        events.extend(self.scheduler.drain_events());
        events
    }

    // ------------------------------------------------------------------
    // Dialogue
    // ------------------------------------------------------------------

    /// Resolve a line against the current state without showing it.
    pub fn resolve(&self, line_id: &str, game: &dyn GameStateQuery) -> Option<ResolvedLine> {
        let ctx = context(&self.language, &self.progression, &self.tracker, game);
        resolve(&self.content, line_id, &ctx)
    }

    /// Resolve and show or queue a line. Returns false when the id is
    /// unknown, in which case nothing is said.
    pub fn say(&mut self, line_id: &str, game: &dyn GameStateQuery) -> bool {
        self.say_with(line_id, SayOptions::default(), game)
    }

    pub fn say_with(&mut self, line_id: &str, options: SayOptions, game: &dyn GameStateQuery) -> bool {
        match self.resolve(line_id, game) {
            Some(line) => {
                self.scheduler.say_with(line, options);
                true
            }
            None => false,
        }
    }

    /// Resolve a line and play it now, discarding anything queued.
    pub fn say_immediate(&mut self, line_id: &str, game: &dyn GameStateQuery) -> bool {
        match self.resolve(line_id, game) {
            Some(line) => {
                self.scheduler.say_immediate(line);
                true
            }
            None => false,
        }
    }

    pub fn skip(&mut self, game: &dyn GameStateQuery) {
        let content = &self.content;
        let ctx = context(&self.language, &self.progression, &self.tracker, game);
        self.scheduler.skip(|line| follow_up_for(content, line, &ctx));
    }

    pub fn hide(&mut self) {
        self.scheduler.hide();
    }

    pub fn clear(&mut self) {
        self.scheduler.clear();
    }

    /// Reset the scheduler and settle the mode for the current awareness.
    pub fn reset(&mut self) {
        self.scheduler.reset();
        let mode = self.settled_mode();
        self.scheduler.set_mode(mode);
        if let Some(timeout) = self.config.idle.timeout_ms {
            self.scheduler.enable_idle(timeout);
        }
    }

    pub fn set_mode(&mut self, mode: NarratorMode) {
        self.scheduler.set_mode(mode);
    }

    /// Switch language. Lines on screen and in the queue are re-resolved
    /// in the new language and keep their typing position.
    pub fn set_language(&mut self, language: &str, game: &dyn GameStateQuery) {
        if self.language == language {
            return;
        }
        self.language = language.to_string();
        tracing::debug!(language, "language changed");
        let content = &self.content;
        let ctx = context(&self.language, &self.progression, &self.tracker, game);
        self.scheduler
            .relocalize(|line| resolve(content, &line.id, &ctx).map(|resolved| resolved.text));
    }

    pub fn enable_idle(&mut self, timeout_ms: u64) {
        self.config.idle.timeout_ms = Some(timeout_ms);
        self.scheduler.enable_idle(timeout_ms);
    }

    pub fn notify_activity(&mut self) {
        self.scheduler.notify_activity();
    }

    // ------------------------------------------------------------------
    // Decisions and awareness
    // ------------------------------------------------------------------

    pub fn record_decision(&mut self, instruction: &str, choice: &str, complied: bool) {
        let at = self.scheduler.now();
        self.tracker
            .record(DecisionRecord::new(instruction, choice, complied, at));
    }

    /// Add awareness points. Each level entered switches the narrator's
    /// mode and plays that level's transition line.
    pub fn add_awareness(&mut self, points: u32, source: &str, game: &dyn GameStateQuery) -> Vec<AwarenessLevel> {
        let promoted = self.progression.add_awareness(points, source);
        self.apply_promotions(&promoted, game);
        promoted
    }

    /// Let the next [`force_full_reveal`](Self::force_full_reveal) through
    /// in the baseline era.
    pub fn open_reveal_gate(&mut self) {
        self.progression.open_reveal_gate();
    }

    /// Break the disguise outright. See [`Progression::force_full_reveal`]
    /// for when this is allowed.
    pub fn force_full_reveal(&mut self, game: &dyn GameStateQuery) -> bool {
        if !self.progression.force_full_reveal() {
            return false;
        }
        self.apply_promotions(&[AwarenessLevel::Revealed], game);
        true
    }

    fn settled_mode(&self) -> NarratorMode {
        match self.progression.level() {
            AwarenessLevel::Revealed => NarratorMode::Conversational,
            level => level.mode(self.progression.era()),
        }
    }

    /// Switch modes and announce each level entered. The first transition
    /// line plays like any event line; the rest queue behind it.
    fn apply_promotions(&mut self, levels: &[AwarenessLevel], game: &dyn GameStateQuery) {
        let era = self.progression.era();
        let mut announced = false;
        for &level in levels {
            self.scheduler.set_mode(level.mode(era));
            if level == AwarenessLevel::Revealed {
                if !self.memory.is_revealed() {
                    self.memory.mark_revealed();
                    tracing::info!(era, "narrator marked revealed");
                }
                if is_baseline(era) {
                    self.scheduler.schedule_mode(
                        NarratorMode::Conversational,
                        self.config.awareness.conversational_delay_ms,
                    );
                }
            }
            if let Some(line) = self.resolve(&level.transition_line(), game) {
                if announced {
                    self.scheduler.enqueue(line);
                } else {
                    self.scheduler.say(line);
                    announced = true;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Advance the session by `dt_ms`: play-time awareness grants, typing,
    /// follow-up chaining and idle prompts.
    pub fn tick(&mut self, dt_ms: u64, game: &dyn GameStateQuery) {
        let promoted = self.progression.grant_play_time(game.play_seconds());
        self.apply_promotions(&promoted, game);

        let content = &self.content;
        let ctx = context(&self.language, &self.progression, &self.tracker, game);
        self.scheduler
            .tick(dt_ms, |line| follow_up_for(content, line, &ctx));

        let events = self.scheduler.drain_events();
        let went_idle = events.contains(&SchedulerEvent::Idle);
        self.events.extend(events);
        if went_idle {
            self.say_idle_line(game);
        }
    }

    fn say_idle_line(&mut self, game: &dyn GameStateQuery) {
        // Idle prompts never cut into narration already in flight.
        if self.scheduler.is_busy() {
            tracing::debug!("idle while speaking, prompt skipped");
            return;
        }
        let candidates: Vec<&String> = self
            .config
            .idle
            .pool
            .iter()
            .filter(|id| self.config.idle.pool.len() < 2 || Some(*id) != self.last_idle_line.as_ref())
            .collect();
        let Some(id) = candidates.choose(&mut self.rng).map(|id| (*id).clone()) else {
            return;
        };
        tracing::debug!(%id, "player idle");
        if self.say(&id, game) {
            self.last_idle_line = Some(id);
        }
    }
}

impl NarratorSessionBuilder {
    /// Load a content file. May be called repeatedly; later files override
    /// earlier ones line by line.
    pub fn content_file(mut self, path: impl AsRef<Path>) -> Self {
        self.content_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn era(mut self, era: u32) -> Self {
        self.era = era;
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    /// Seed for idle-line selection.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Provide content directly (for testing without files).
    pub fn with_content(mut self, content: ContentStore) -> Self {
        self.content = Some(content);
        self
    }

    /// Provide config directly (for testing without files).
    pub fn with_config(mut self, config: NarratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_memory(mut self, memory: Box<dyn NarratorMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn build(self) -> Result<NarratorSession, SessionError> {
        let mut content = self.content;
        for path in &self.content_paths {
            let loaded = ContentStore::load_from_ron(path)?;
            match content.as_mut() {
                Some(store) => store.merge(loaded),
                None => content = Some(loaded),
            }
        }
        let content = content.ok_or(SessionError::NoContent)?;

        let config = match (&self.config_path, self.config) {
            (Some(path), _) => NarratorConfig::load_from_ron(path)?,
            (None, Some(config)) => {
                config.validate()?;
                config
            }
            (None, None) => NarratorConfig::default(),
        };

        let language = self
            .language
            .unwrap_or_else(|| content.primary_language.clone());
        let progression = Progression::new(self.era, config.awareness.clone());
        let mut scheduler = DialogueScheduler::new(
            config.scheduler.clone(),
            AwarenessLevel::Dormant.mode(self.era),
        );
        if let Some(timeout) = config.idle.timeout_ms {
            scheduler.enable_idle(timeout);
        }

        tracing::debug!(
            era = self.era,
            %language,
            lines = content.len(),
            "narrator session built"
        );

        Ok(NarratorSession {
            content,
            config,
            language,
            tracker: DecisionTracker::new(),
            progression,
            scheduler,
            memory: self
                .memory
                .unwrap_or_else(|| Box::new(InMemoryMemory::default())),
            rng: StdRng::seed_from_u64(self.seed),
            last_idle_line: None,
            events: Vec::new(),
        })
    }
}
