//! WASM bindings for narrator-engine — powers the interactive web demo.

use wasm_bindgen::prelude::*;

use narrator_engine::core::config::NarratorConfig;
use narrator_engine::core::content::ContentStore;
use narrator_engine::schema::game_state::GameSnapshot;
use narrator_engine::NarratorSession;

// ---------------------------------------------------------------------------
// Embedded demo data — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const CONTENT: &str = include_str!("../../content/narrator.ron");
    pub const CONFIG: &str = include_str!("../../content/config.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Deserialize)]
struct DecisionInput {
    instruction: String,
    choice: String,
    complied: bool,
}

#[derive(serde::Serialize)]
struct StateInfo {
    era: u32,
    language: String,
    level: u8,
    points: u32,
    mode: String,
    revealed: bool,
    defiance_streak: u32,
    compliance_rate: f32,
}

#[wasm_bindgen]
pub struct NarratorDemo {
    session: NarratorSession,
    game: GameSnapshot,
    seed: u64,
}

#[wasm_bindgen]
impl NarratorDemo {
    /// Create a demo session in the given era.
    #[wasm_bindgen(constructor)]
    pub fn new(era: u32, seed: u64) -> Result<NarratorDemo, JsError> {
        Ok(NarratorDemo {
            session: build_session(era, seed)?,
            game: GameSnapshot::new(),
            seed,
        })
    }

    /// Resolve and speak a line. Returns false for unknown ids.
    pub fn say(&mut self, line_id: &str) -> bool {
        self.session.notify_activity();
        self.session.say(line_id, &self.game)
    }

    pub fn say_immediate(&mut self, line_id: &str) -> bool {
        self.session.notify_activity();
        self.session.say_immediate(line_id, &self.game)
    }

    /// Advance the demo by one frame's worth of milliseconds.
    pub fn tick(&mut self, dt_ms: u32) {
        self.session.tick(dt_ms as u64, &self.game);
    }

    pub fn skip(&mut self) {
        self.session.notify_activity();
        self.session.skip(&self.game);
    }

    /// Record a decision from JSON: `{"instruction", "choice", "complied"}`.
    pub fn record(&mut self, decision_json: &str) -> Result<(), JsError> {
        let input: DecisionInput = serde_json::from_str(decision_json)
            .map_err(|e| JsError::new(&format!("Invalid decision JSON: {e}")))?;
        self.session
            .record_decision(&input.instruction, &input.choice, input.complied);
        self.game.decisions.insert(input.instruction);
        Ok(())
    }

    /// Add awareness points. Returns the number of levels gained.
    pub fn add_awareness(&mut self, points: u32, source: &str) -> usize {
        self.session.add_awareness(points, source, &self.game).len()
    }

    /// Open the reveal gate and break the disguise, where the era allows it.
    pub fn reveal(&mut self) -> bool {
        self.session.open_reveal_gate();
        self.session.force_full_reveal(&self.game)
    }

    pub fn set_language(&mut self, language: &str) {
        self.session.set_language(language, &self.game);
    }

    pub fn enter_room(&mut self, room: &str) {
        self.game.enter(room);
        self.session.notify_activity();
    }

    pub fn set_play_seconds(&mut self, seconds: u32) {
        self.game.play_seconds = seconds as u64;
    }

    /// Visible lines as a JSON array, oldest first.
    pub fn visible_lines(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.session.visible_lines())
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Events since the last call, as a JSON array.
    pub fn drain_events(&mut self) -> Result<String, JsError> {
        serde_json::to_string(&self.session.drain_events())
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    pub fn get_state(&self) -> Result<String, JsError> {
        let tracker = self.session.tracker();
        let info = StateInfo {
            era: self.session.era(),
            language: self.session.language().to_string(),
            level: self.session.level().as_u8(),
            points: self.session.points(),
            mode: format!("{:?}", self.session.mode()).to_lowercase(),
            revealed: self.session.memory().is_revealed(),
            defiance_streak: tracker.defiance_streak(),
            compliance_rate: tracker.compliance_rate(),
        };
        serde_json::to_string(&info)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    pub fn clear(&mut self) {
        self.session.clear();
    }

    /// Restart in a new era with fresh state.
    pub fn reset(&mut self, era: u32) -> Result<(), JsError> {
        self.session = build_session(era, self.seed)?;
        self.game = GameSnapshot::new();
        Ok(())
    }
}

fn build_session(era: u32, seed: u64) -> Result<NarratorSession, JsError> {
    let content = ContentStore::parse_ron(data::CONTENT)
        .map_err(|e| JsError::new(&format!("Content parse error: {e}")))?;
    let config = NarratorConfig::parse_ron(data::CONFIG)
        .map_err(|e| JsError::new(&format!("Config parse error: {e}")))?;
    NarratorSession::builder()
        .era(era)
        .seed(seed)
        .with_content(content)
        .with_config(config)
        .build()
        .map_err(|e| JsError::new(&format!("Session build error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_demo_builds() {
        let content = ContentStore::parse_ron(data::CONTENT).unwrap();
        assert!(content.validate().is_empty());
        NarratorConfig::parse_ron(data::CONFIG).unwrap();
    }
}
