use serde::{Deserialize, Serialize};

/// Damage accumulated for one damage type / flair pairing within an ability,
/// e.g. `"Smashing"` or `"Fire Critical"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageComponent {
    pub damage_type: String,
    pub count: u32,
    pub total_damage: f64,
    pub last_damage: f64,
    pub highest_damage: f64,
    pub lowest_damage: f64,
    pub is_proc: bool,
}

impl DamageComponent {
    pub fn new(damage_type: &str) -> Self {
        Self {
            damage_type: damage_type.to_string(),
            count: 0,
            total_damage: 0.0,
            last_damage: 0.0,
            highest_damage: 0.0,
            lowest_damage: 0.0,
            is_proc: false,
        }
    }

    pub fn new_proc(damage_type: &str) -> Self {
        Self {
            is_proc: true,
            ..Self::new(damage_type)
        }
    }

    pub fn add_damage(&mut self, value: f64) {
        self.count += 1;
        self.total_damage += value;
        self.last_damage = value;
        if self.count == 1 || value > self.highest_damage {
            self.highest_damage = value;
        }
        if self.count == 1 || value < self.lowest_damage {
            self.lowest_damage = value;
        }
    }

    pub fn average_damage(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_damage / f64::from(self.count)
        }
    }

    /// A zero or negative span yields the raw total rather than a division.
    pub fn dps(&self, duration: i64) -> f64 {
        if duration <= 0 {
            self.total_damage
        } else {
            self.total_damage / duration as f64
        }
    }
}
