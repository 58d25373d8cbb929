use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How finalized sessions get their base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingMode {
    /// Use the configured prefix (or a chat-command override).
    Prefix,
    /// Use the tracked player's name.
    PlayerName,
    /// Use the session's start time of day.
    Timestamp,
    /// Lock onto the first enemy the player damages.
    FirstEnemyDamaged,
    /// Track the most-damaged enemy; provisional until finalize.
    HighestEnemyDamaged,
}

impl FromStr for NamingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prefix" => Ok(Self::Prefix),
            "player-name" => Ok(Self::PlayerName),
            "timestamp" => Ok(Self::Timestamp),
            "first-enemy" => Ok(Self::FirstEnemyDamaged),
            "highest-enemy" => Ok(Self::HighestEnemyDamaged),
            other => Err(format!(
                "unknown naming mode '{other}' (expected prefix, player-name, \
                 timestamp, first-enemy or highest-enemy)"
            )),
        }
    }
}

/// Read-only configuration snapshot consumed at parser start. The catalogs
/// exist because the log itself does not distinguish pseudopets from real
/// pets, nor auras from rolled attacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Inactivity gap, in seconds, that closes a session. 0 never expires.
    pub session_timeout_seconds: i64,
    /// Merge proc damage under the last ability the character used.
    pub associate_procs_to_powers: bool,
    pub naming_mode: NamingMode,
    pub default_name_prefix: String,
    /// Entity names folded into the player rather than tracked as pets.
    /// Matched exactly.
    pub pseudopets: Vec<String>,
    /// Powers that deal damage without ever rolling to hit. Matched by
    /// substring.
    pub no_hit_roll_abilities: Vec<String>,
    /// Abilities treated as procs even without a damage-chance description.
    pub always_proc_abilities: Vec<String>,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            session_timeout_seconds: 15,
            associate_procs_to_powers: true,
            naming_mode: NamingMode::Prefix,
            default_name_prefix: "Session".to_string(),
            pseudopets: vec![
                "Caltrops".to_string(),
                "Trip Mine".to_string(),
                "Time Bomb".to_string(),
                "Burn".to_string(),
                "Lightning Rod".to_string(),
                "Whirlwind".to_string(),
                "Tornado".to_string(),
                "Rain of Fire".to_string(),
                "Ice Storm".to_string(),
                "Blizzard".to_string(),
                "Rain of Arrows".to_string(),
                "Oil Slick".to_string(),
                "Burning Oil Slick".to_string(),
                "Voltaic Sentinel".to_string(),
                "Shield Charge".to_string(),
                "Ion Judgement".to_string(),
                "Ion Judgement Chain".to_string(),
                "Chain Induction Jump 1".to_string(),
                "Chain Induction Jump 2".to_string(),
                "Chain Induction Jump 3".to_string(),
                "Chain Induction Jump 4".to_string(),
                "Chain Induction Jump 5".to_string(),
                "Chain Induction Jump 6".to_string(),
                "Chain Induction Jump 7".to_string(),
                "Chain Induction Jump 8".to_string(),
                "Chain Induction Jump 9".to_string(),
                "Chain Induction Jump 10".to_string(),
            ],
            no_hit_roll_abilities: vec![
                "Interface".to_string(),
                "Shifting Tides".to_string(),
            ],
            always_proc_abilities: vec!["Doublehit".to_string()],
        }
    }
}

impl ParserSettings {
    pub fn is_pseudopet(&self, name: &str) -> bool {
        self.pseudopets.iter().any(|p| p == name)
    }

    pub fn is_no_hit_roll_ability(&self, ability: &str) -> bool {
        self.no_hit_roll_abilities
            .iter()
            .any(|a| ability.contains(a.as_str()))
    }

    pub fn is_always_proc(&self, ability: &str) -> bool {
        self.always_proc_abilities.iter().any(|a| a == ability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudopets_match_exactly() {
        let settings = ParserSettings::default();
        assert!(settings.is_pseudopet("Lightning Rod"));
        assert!(!settings.is_pseudopet("Lightning Rod Mk II"));
    }

    #[test]
    fn no_hit_roll_matches_by_substring() {
        let settings = ParserSettings::default();
        assert!(settings.is_no_hit_roll_ability("Interface"));
        assert!(settings.is_no_hit_roll_ability("Degenerative Interface"));
        assert!(!settings.is_no_hit_roll_ability("Jab"));
    }

    #[test]
    fn naming_mode_parses_from_cli_strings() {
        assert_eq!("prefix".parse::<NamingMode>(), Ok(NamingMode::Prefix));
        assert_eq!(
            "highest-enemy".parse::<NamingMode>(),
            Ok(NamingMode::HighestEnemyDamaged)
        );
        assert!("bogus".parse::<NamingMode>().is_err());
    }

    #[test]
    fn deserializes_with_defaults_for_missing_fields() {
        let settings: ParserSettings =
            serde_json::from_str(r#"{ "session_timeout_seconds": 30 }"#).unwrap();
        assert_eq!(settings.session_timeout_seconds, 30);
        assert!(settings.associate_procs_to_powers);
        assert_eq!(settings.default_name_prefix, "Session");
    }
}
