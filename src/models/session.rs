use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Character, CharacterKind};

/// One timeout-bounded stretch of combat. Characters are kept in four maps:
/// outgoing actors (player + pets) with their targets mirrored alongside, and
/// incoming attackers with the defenders mirrored alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatSession {
    /// Seconds-of-day of the first event; may slide forward while the
    /// session has no damage yet.
    pub start_time: i64,
    /// Seconds-of-day of the last damage event. Doubles as the inactivity
    /// marker for the timeout check.
    pub end_time: i64,
    /// Display name. Final once `finalized` is set.
    pub name: String,
    /// Resolved base name before disambiguation; `None` while provisional.
    pub base_name: Option<String>,
    /// A locked base no longer tracks damage (first-enemy mode after the
    /// first hit, or any explicit name).
    pub name_locked: bool,
    pub finalized: bool,
    pub characters_out: HashMap<String, Character>,
    pub targets_out: HashMap<String, Character>,
    pub characters_in: HashMap<String, Character>,
    pub targets_in: HashMap<String, Character>,
    pub exp: u64,
    pub inf: u64,
}

impl CombatSession {
    pub fn new(timestamp: i64) -> Self {
        Self {
            start_time: timestamp,
            end_time: timestamp,
            name: String::new(),
            base_name: None,
            name_locked: false,
            finalized: false,
            characters_out: HashMap::new(),
            targets_out: HashMap::new(),
            characters_in: HashMap::new(),
            targets_in: HashMap::new(),
            exp: 0,
            inf: 0,
        }
    }

    /// Recomputed on read. A span that comes out negative (midnight
    /// rollover, or a provisional start slid past the end marker) clamps
    /// to zero.
    pub fn duration(&self) -> i64 {
        let span = self.end_time - self.start_time;
        if span < 0 {
            warn!(
                start = self.start_time,
                end = self.end_time,
                "negative session span, clamping to zero"
            );
            0
        } else {
            span
        }
    }

    pub fn touch(&mut self, timestamp: i64) {
        self.end_time = timestamp;
    }

    pub fn set_base_name(&mut self, base: &str, locked: bool) {
        self.base_name = Some(base.to_string());
        self.name = base.to_string();
        self.name_locked = locked;
    }

    pub fn character_out_mut(&mut self, name: &str, kind: CharacterKind) -> &mut Character {
        self.characters_out
            .entry(name.to_string())
            .or_insert_with(|| Character::new(name, kind))
    }

    pub fn target_out_mut(&mut self, name: &str) -> &mut Character {
        self.targets_out
            .entry(name.to_string())
            .or_insert_with(|| Character::new(name, CharacterKind::Enemy))
    }

    pub fn character_in_mut(&mut self, name: &str) -> &mut Character {
        self.characters_in
            .entry(name.to_string())
            .or_insert_with(|| Character::new(name, CharacterKind::Enemy))
    }

    pub fn target_in_mut(&mut self, name: &str, kind: CharacterKind) -> &mut Character {
        self.targets_in
            .entry(name.to_string())
            .or_insert_with(|| Character::new(name, kind))
    }

    /// Outgoing damage only. This is what the discard rule keys on.
    pub fn total_damage(&self) -> f64 {
        self.characters_out.values().map(|c| c.total_damage()).sum()
    }

    pub fn dps(&self) -> f64 {
        let duration = self.duration();
        self.characters_out.values().map(|c| c.dps(duration)).sum()
    }

    /// The enemy that has taken the most damage so far, for the
    /// highest-enemy-damaged naming mode.
    pub fn highest_damaged_target(&self) -> Option<&Character> {
        self.targets_out
            .values()
            .max_by(|a, b| a.total_damage().total_cmp(&b.total_damage()))
    }

    pub fn add_rewards(&mut self, exp: u64, inf: u64) {
        self.exp += exp;
        self.inf += inf;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_clamps_negative_spans() {
        let mut session = CombatSession::new(100);
        session.touch(90);
        assert_eq!(session.duration(), 0);
        session.touch(130);
        assert_eq!(session.duration(), 30);
    }

    #[test]
    fn total_damage_counts_outgoing_only() {
        let mut session = CombatSession::new(0);
        session
            .character_out_mut("Kyksie", CharacterKind::Player)
            .ability_mut("Jab")
            .add_damage("Smashing", 25.0);
        session
            .character_in_mut("Rikti Soldier")
            .ability_mut("Rifle Butt")
            .add_damage("Lethal", 400.0);

        assert!((session.total_damage() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn highest_damaged_target_tracks_the_max() {
        let mut session = CombatSession::new(0);
        session
            .target_out_mut("Thorn")
            .ability_mut("Jab")
            .add_damage("Smashing", 10.0);
        session
            .target_out_mut("Cortex")
            .ability_mut("Jab")
            .add_damage("Smashing", 90.0);

        let highest = session.highest_damaged_target().unwrap();
        assert_eq!(highest.name, "Cortex");
    }
}
