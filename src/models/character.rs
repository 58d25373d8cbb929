use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::Ability;

/// What produced (or received) the damage. Direction is carried by which of
/// the session's maps a character lives in, not by the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterKind {
    Player,
    Pet,
    Enemy,
}

/// One actor or target within a combat session, with its per-ability stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub kind: CharacterKind,
    pub abilities: HashMap<String, Ability>,
    /// Name of the most recent ability this character used. A key into
    /// `abilities`, kept as a name so it never dangles.
    pub last_ability: Option<String>,
}

impl Character {
    pub fn new(name: &str, kind: CharacterKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            abilities: HashMap::new(),
            last_ability: None,
        }
    }

    pub fn ability_mut(&mut self, name: &str) -> &mut Ability {
        self.abilities
            .entry(name.to_string())
            .or_insert_with(|| Ability::new(name))
    }

    /// Locate-or-create where a freshly created ability starts out as a proc.
    pub fn proc_ability_mut(&mut self, name: &str) -> &mut Ability {
        self.abilities
            .entry(name.to_string())
            .or_insert_with(|| Ability::new_proc(name))
    }

    pub fn total_damage(&self) -> f64 {
        self.abilities.values().map(|a| a.total_damage()).sum()
    }

    pub fn dps(&self, duration: i64) -> f64 {
        if duration <= 0 {
            self.total_damage()
        } else {
            self.total_damage() / duration as f64
        }
    }

    pub fn tries(&self) -> u32 {
        self.abilities.values().map(|a| a.tries).sum()
    }

    pub fn hits(&self) -> u32 {
        self.abilities.values().map(|a| a.hits).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let tries = self.tries();
        if tries == 0 {
            0.0
        } else {
            f64::from(self.hits()) / f64::from(tries) * 100.0
        }
    }
}
