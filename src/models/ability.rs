use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::DamageComponent;

/// One power as used by a single character: activation / hit-roll counters
/// plus its damage broken out per damage type and flair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    /// Times the power was activated (or, for procs, times it fired).
    pub activations: u32,
    /// Hit rolls attempted.
    pub tries: u32,
    /// Hit rolls that landed. Never exceeds `tries`.
    pub hits: u32,
    pub components: HashMap<String, DamageComponent>,
    pub is_proc: bool,
    /// Set when damage arrives for a power that never rolls to hit (auras,
    /// toggles); activations and hits are synthesized per damage instead.
    pub no_hit_roll: bool,
}

impl Ability {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            activations: 0,
            tries: 0,
            hits: 0,
            components: HashMap::new(),
            is_proc: false,
            no_hit_roll: false,
        }
    }

    pub fn new_proc(name: &str) -> Self {
        Self {
            is_proc: true,
            ..Self::new(name)
        }
    }

    pub fn record_activation(&mut self) {
        self.activations += 1;
    }

    pub fn record_hit_roll(&mut self, hit: bool) {
        self.tries += 1;
        if hit {
            self.hits += 1;
        }
    }

    /// Accumulates damage under the `(damage type, flair)` key. A proc
    /// ability counts each damage instance as a firing.
    pub fn add_damage(&mut self, key: &str, value: f64) {
        if self.is_proc {
            self.activations += 1;
        }
        self.components
            .entry(key.to_string())
            .or_insert_with(|| DamageComponent::new(key))
            .add_damage(value);
    }

    /// Accumulates proc damage merged under this (parent) ability.
    pub fn add_proc_damage(&mut self, key: &str, value: f64) {
        self.components
            .entry(key.to_string())
            .or_insert_with(|| DamageComponent::new_proc(key))
            .add_damage(value);
    }

    pub fn total_damage(&self) -> f64 {
        self.components.values().map(|c| c.total_damage).sum()
    }

    pub fn dps(&self, duration: i64) -> f64 {
        if duration <= 0 {
            self.total_damage()
        } else {
            self.total_damage() / duration as f64
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.tries == 0 {
            0.0
        } else {
            f64::from(self.hits) / f64::from(self.tries) * 100.0
        }
    }

    /// Average damage per use, preferring activations as the denominator and
    /// falling back to hits when no activation was ever seen.
    pub fn average_damage(&self) -> f64 {
        let denominator = if self.activations > 0 {
            self.activations
        } else {
            self.hits
        };
        if denominator == 0 {
            0.0
        } else {
            self.total_damage() / f64::from(denominator)
        }
    }

    /// Firing rate of a proc component merged under this ability, as a
    /// percentage of this ability's landed hits.
    pub fn proc_rate(&self, component: &DamageComponent) -> f64 {
        if self.hits == 0 {
            0.0
        } else {
            f64::from(component.count) / f64::from(self.hits) * 100.0
        }
    }
}
