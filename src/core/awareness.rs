/// Awareness progression — the narrator's eroding disguise, as a
/// forward-only leveled state machine fed by source-tagged points.
use serde::{Deserialize, Serialize};

use crate::core::config::AwarenessConfig;
use crate::core::scheduler::NarratorMode;

/// The first era. Awareness overrides and inner-voice text only apply here,
/// and the disguise cannot break through points alone.
pub const BASELINE_ERA: u32 = 1;

pub fn is_baseline(era: u32) -> bool {
    era <= BASELINE_ERA
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AwarenessLevel {
    #[default]
    Dormant = 0,
    Seeded = 1,
    Uneasy = 2,
    Questioning = 3,
    Cracking = 4,
    Revealed = 5,
}

impl AwarenessLevel {
    pub const ALL: [AwarenessLevel; 6] = [
        Self::Dormant,
        Self::Seeded,
        Self::Uneasy,
        Self::Questioning,
        Self::Cracking,
        Self::Revealed,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(level: u8) -> Option<Self> {
        Self::ALL.get(level as usize).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_u8(self.as_u8() + 1)
    }

    /// Line id of the one-shot line announcing this level.
    pub fn transition_line(self) -> String {
        format!("awareness_{}", self.as_u8())
    }

    /// Dialogue mode the narrator speaks in at this level.
    pub fn mode(self, era: u32) -> NarratorMode {
        if !is_baseline(era) {
            return NarratorMode::Conversational;
        }
        match self {
            Self::Dormant | Self::Seeded | Self::Uneasy => NarratorMode::Inner,
            Self::Questioning | Self::Cracking | Self::Revealed => NarratorMode::Cracking,
        }
    }
}

/// One entry in the awareness source log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwarenessGrant {
    pub source: String,
    pub points: u32,
    pub running_total: u32,
}

/// Within-session awareness. Points and level only ever go up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwarenessState {
    pub points: u32,
    pub level: AwarenessLevel,
    pub log: Vec<AwarenessGrant>,
    /// Number of play-time grants issued so far.
    pub time_grants: u64,
}

/// Awareness bound to an era and its cap.
#[derive(Debug, Clone)]
pub struct Progression {
    config: AwarenessConfig,
    era: u32,
    state: AwarenessState,
    reveal_gate_open: bool,
}

impl Progression {
    pub fn new(era: u32, config: AwarenessConfig) -> Self {
        Self {
            config,
            era,
            state: AwarenessState::default(),
            reveal_gate_open: false,
        }
    }

    pub fn era(&self) -> u32 {
        self.era
    }

    pub fn level(&self) -> AwarenessLevel {
        self.state.level
    }

    pub fn points(&self) -> u32 {
        self.state.points
    }

    pub fn log(&self) -> &[AwarenessGrant] {
        &self.state.log
    }

    pub fn state(&self) -> &AwarenessState {
        &self.state
    }

    /// Highest level points can reach in this era.
    pub fn cap(&self) -> AwarenessLevel {
        let cap = if is_baseline(self.era) {
            self.config.baseline_cap
        } else {
            self.config.later_era_cap
        };
        AwarenessLevel::from_u8(cap.min(5)).unwrap_or(AwarenessLevel::Revealed)
    }

    pub fn threshold(&self, level: AwarenessLevel) -> u32 {
        self.config.thresholds[level.as_u8() as usize]
    }

    /// Add points and promote through every level whose threshold is now
    /// met, up to the era cap. Returns the levels entered, lowest first.
    pub fn add_awareness(&mut self, points: u32, source: &str) -> Vec<AwarenessLevel> {
        self.state.points = self.state.points.saturating_add(points);
        self.state.log.push(AwarenessGrant {
            source: source.to_string(),
            points,
            running_total: self.state.points,
        });
        tracing::debug!(points, source, total = self.state.points, "awareness points added");

        let cap = self.cap();
        let mut promoted = Vec::new();
        while let Some(next) = self.state.level.next() {
            if next > cap || self.state.points < self.threshold(next) {
                break;
            }
            self.state.level = next;
            promoted.push(next);
            tracing::info!(level = ?next, era = self.era, "awareness promoted");
        }
        promoted
    }

    /// Grant one point for each full interval of play not yet rewarded.
    pub fn grant_play_time(&mut self, play_seconds: u64) -> Vec<AwarenessLevel> {
        let earned = play_seconds / self.config.time_grant_interval_secs;
        let mut promoted = Vec::new();
        while self.state.time_grants < earned {
            self.state.time_grants += 1;
            promoted.extend(self.add_awareness(1, "time"));
        }
        promoted
    }

    /// Allow [`Progression::force_full_reveal`] in the baseline era.
    /// Ending sequences open the gate; regular play never does.
    pub fn open_reveal_gate(&mut self) {
        self.reveal_gate_open = true;
    }

    pub fn reveal_gate_open(&self) -> bool {
        self.reveal_gate_open
    }

    /// Jump straight to [`AwarenessLevel::Revealed`], ignoring thresholds.
    ///
    /// Only effective in the baseline era with the reveal gate open. Later
    /// eras already speak conversationally, so the call does nothing there.
    pub fn force_full_reveal(&mut self) -> bool {
        if !is_baseline(self.era) {
            tracing::debug!(era = self.era, "force reveal ignored outside baseline era");
            return false;
        }
        if !self.reveal_gate_open {
            tracing::debug!("force reveal ignored, gate closed");
            return false;
        }
        if self.state.level == AwarenessLevel::Revealed {
            return false;
        }
        self.state.level = AwarenessLevel::Revealed;
        tracing::info!("narrator disguise forcibly broken");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> Progression {
        Progression::new(BASELINE_ERA, AwarenessConfig::default())
    }

    #[test]
    fn three_points_promote_two_do_not() {
        let mut p = baseline();
        assert!(p.add_awareness(2, "lore").is_empty());
        assert_eq!(p.level(), AwarenessLevel::Dormant);
        assert_eq!(p.add_awareness(1, "exploration"), vec![AwarenessLevel::Seeded]);
        assert_eq!(p.points(), 3);
    }

    #[test]
    fn baseline_caps_at_uneasy() {
        let mut p = baseline();
        let promoted = p.add_awareness(100, "debug");
        assert_eq!(promoted, vec![AwarenessLevel::Seeded, AwarenessLevel::Uneasy]);
        assert_eq!(p.level(), AwarenessLevel::Uneasy);
        assert_eq!(p.points(), 100);
        assert!(p.add_awareness(5, "more").is_empty());
    }

    #[test]
    fn later_era_reaches_revealed() {
        let mut p = Progression::new(2, AwarenessConfig::default());
        let promoted = p.add_awareness(18, "lore");
        assert_eq!(promoted.len(), 5);
        assert_eq!(p.level(), AwarenessLevel::Revealed);
        assert!(p.add_awareness(10, "lore").is_empty());
    }

    #[test]
    fn source_log_tracks_running_total() {
        let mut p = baseline();
        p.add_awareness(2, "lore");
        p.add_awareness(4, "defiance");
        assert_eq!(
            p.log(),
            &[
                AwarenessGrant { source: "lore".to_string(), points: 2, running_total: 2 },
                AwarenessGrant { source: "defiance".to_string(), points: 4, running_total: 6 },
            ]
        );
    }

    #[test]
    fn play_time_grants_once_per_interval() {
        let mut p = baseline();
        assert!(p.grant_play_time(299).is_empty());
        assert_eq!(p.points(), 0);
        p.grant_play_time(300);
        p.grant_play_time(301);
        p.grant_play_time(599);
        assert_eq!(p.points(), 1);
        p.grant_play_time(900);
        assert_eq!(p.points(), 3);
        assert_eq!(p.level(), AwarenessLevel::Seeded);
        assert!(p.log().iter().all(|g| g.source == "time"));
    }

    #[test]
    fn force_reveal_gated_in_baseline() {
        let mut p = baseline();
        assert!(!p.force_full_reveal());
        assert_eq!(p.level(), AwarenessLevel::Dormant);

        p.open_reveal_gate();
        assert!(p.force_full_reveal());
        assert_eq!(p.level(), AwarenessLevel::Revealed);
        assert_eq!(p.points(), 0);
        assert!(!p.force_full_reveal());
    }

    #[test]
    fn force_reveal_noop_in_later_era() {
        let mut p = Progression::new(3, AwarenessConfig::default());
        p.open_reveal_gate();
        assert!(!p.force_full_reveal());
        assert_eq!(p.level(), AwarenessLevel::Dormant);
    }

    #[test]
    fn modes_by_level_and_era() {
        assert_eq!(AwarenessLevel::Uneasy.mode(1), NarratorMode::Inner);
        assert_eq!(AwarenessLevel::Questioning.mode(1), NarratorMode::Cracking);
        assert_eq!(AwarenessLevel::Dormant.mode(2), NarratorMode::Conversational);
        assert_eq!(AwarenessLevel::Seeded.transition_line(), "awareness_1");
    }

    #[test]
    fn level_conversions() {
        assert_eq!(AwarenessLevel::from_u8(3), Some(AwarenessLevel::Questioning));
        assert_eq!(AwarenessLevel::from_u8(6), None);
        assert_eq!(AwarenessLevel::Revealed.next(), None);
        assert!(AwarenessLevel::Cracking < AwarenessLevel::Revealed);
    }
}
