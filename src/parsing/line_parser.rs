use regex::Captures;

use crate::parsing::regex::{PatternSet, RE_DATETIME};
use crate::utils::time::seconds_of_day;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    Hit,
    Miss,
}

/// Commands smuggled through the chat channel. Unknown commands are kept so
/// the processor can log them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    SetName(String),
    StartSession(Option<String>),
    Unknown(String),
}

/// One classified log line: its seconds-of-day timestamp plus what happened.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: i64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    AbilityActivate {
        ability: String,
    },
    /// An outgoing to-hit roll; `pet` is the acting pet's name, `None` when
    /// the player rolled.
    HitRoll {
        pet: Option<String>,
        outcome: HitOutcome,
        target: String,
        ability: String,
    },
    Damage {
        pet: Option<String>,
        target: String,
        ability: String,
        description: String,
        value: f64,
        damage_type: String,
        flair: String,
    },
    /// An enemy rolling to hit the player or a pet.
    FoeHitRoll {
        pet_echo: Option<String>,
        enemy: String,
        outcome: HitOutcome,
        ability: String,
    },
    /// Self-buff style attacks that never roll; counted as a landed hit.
    FoeAutohit {
        enemy: String,
        ability: String,
    },
    FoeDamage {
        enemy: String,
        defender: Option<String>,
        ability: String,
        value: f64,
        damage_type: String,
        flair: String,
    },
    Reward {
        exp: u64,
        inf: u64,
    },
    PlayerName {
        name: String,
    },
    Command {
        player: String,
        command: ChatCommand,
    },
}

/// Classifies one raw line against the grammar table. First match wins;
/// lines with no datetime prefix or no matching grammar yield `None`.
/// Stateless: the same line always classifies the same way.
pub fn classify(line: &str, patterns: &PatternSet) -> Option<LogEvent> {
    let prefix = RE_DATETIME.captures(line)?;
    let timestamp = seconds_of_day(&prefix["date"], &prefix["time"])?;
    let body = &line[prefix.get(0)?.end()..];

    let kind = classify_body(body, patterns)?;
    Some(LogEvent { timestamp, kind })
}

fn classify_body(body: &str, patterns: &PatternSet) -> Option<EventKind> {
    if let Some(caps) = patterns.ability_activate.captures(body) {
        return Some(EventKind::AbilityActivate {
            ability: caps["ability"].to_string(),
        });
    }

    if let Some(caps) = patterns.hit_roll.captures(body) {
        return Some(hit_roll_event(&caps, None));
    }
    if let Some(caps) = patterns.pet_hit_roll.captures(body) {
        let pet = caps["pet"].trim().to_string();
        return Some(hit_roll_event(&caps, Some(pet)));
    }

    if let Some(caps) = patterns.damage.captures(body) {
        return Some(damage_event(&caps, None));
    }
    if let Some(caps) = patterns.pet_damage.captures(body) {
        let pet = caps["pet"].trim().to_string();
        return Some(damage_event(&caps, Some(pet)));
    }

    if let Some(caps) = patterns.foe_pet_hit_roll.captures(body) {
        let pet = caps["pet"].trim().to_string();
        return Some(foe_hit_roll_event(&caps, Some(pet)));
    }
    if let Some(caps) = patterns.foe_hit_roll.captures(body) {
        return Some(foe_hit_roll_event(&caps, None));
    }
    if let Some(caps) = patterns.foe_autohit.captures(body) {
        return Some(EventKind::FoeAutohit {
            enemy: caps["enemy"].trim().to_string(),
            ability: caps["ability"].to_string(),
        });
    }
    if let Some(caps) = patterns.foe_damage.captures(body) {
        return Some(foe_damage_event(&caps));
    }
    if let Some(caps) = patterns.foe_pet_damage.captures(body) {
        return Some(foe_damage_event(&caps));
    }

    if let Some(caps) = patterns.reward_both.captures(body) {
        return Some(EventKind::Reward {
            exp: parse_grouped(&caps["exp"]),
            inf: parse_grouped(&caps["inf"]),
        });
    }
    if let Some(caps) = patterns.reward_exp.captures(body) {
        return Some(EventKind::Reward {
            exp: parse_grouped(&caps["exp"]),
            inf: 0,
        });
    }
    if let Some(caps) = patterns.reward_inf.captures(body) {
        return Some(EventKind::Reward {
            exp: 0,
            inf: parse_grouped(&caps["inf"]),
        });
    }

    if let Some(caps) = patterns.player_name.captures(body) {
        return Some(EventKind::PlayerName {
            name: caps["name"].to_string(),
        });
    }
    if let Some(caps) = patterns.player_name_backup.captures(body) {
        return Some(EventKind::PlayerName {
            name: caps["name"].to_string(),
        });
    }

    if let Some(caps) = patterns.command.captures(body) {
        let value = caps.name("value").map(|m| m.as_str().trim().to_string());
        let command = match (&caps["command"], value) {
            ("SET_NAME", Some(prefix)) if !prefix.is_empty() => ChatCommand::SetName(prefix),
            ("START_SESSION", prefix) => ChatCommand::StartSession(prefix),
            (other, _) => ChatCommand::Unknown(other.to_string()),
        };
        return Some(EventKind::Command {
            player: caps["player"].to_string(),
            command,
        });
    }

    None
}

fn outcome_of(text: &str) -> HitOutcome {
    if text.starts_with("HIT") {
        HitOutcome::Hit
    } else {
        HitOutcome::Miss
    }
}

fn hit_roll_event(caps: &Captures<'_>, pet: Option<String>) -> EventKind {
    EventKind::HitRoll {
        pet,
        outcome: outcome_of(&caps["outcome"]),
        target: caps["target"].trim().to_string(),
        ability: caps["ability"].to_string(),
    }
}

fn damage_event(caps: &Captures<'_>, pet: Option<String>) -> EventKind {
    EventKind::Damage {
        pet,
        target: caps["target"].trim().to_string(),
        ability: caps["ability"].to_string(),
        description: caps
            .name("desc")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        value: caps["value"].parse().unwrap_or(0.0),
        damage_type: caps["damage_type"].to_string(),
        flair: caps
            .name("flair")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
    }
}

fn foe_hit_roll_event(caps: &Captures<'_>, pet_echo: Option<String>) -> EventKind {
    EventKind::FoeHitRoll {
        pet_echo,
        enemy: caps["enemy"].trim().to_string(),
        outcome: outcome_of(&caps["outcome"]),
        ability: caps["ability"].to_string(),
    }
}

fn foe_damage_event(caps: &Captures<'_>) -> EventKind {
    let defender = match &caps["defender"] {
        "you" => None,
        other => Some(other.trim().to_string()),
    };
    EventKind::FoeDamage {
        enemy: caps["enemy"].trim().to_string(),
        defender,
        ability: caps["ability"].to_string(),
        value: caps["value"].parse().unwrap_or(0.0),
        damage_type: caps["damage_type"].to_string(),
        flair: caps
            .name("flair")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
    }
}

fn parse_grouped(raw: &str) -> u64 {
    raw.replace(',', "").parse().unwrap_or(0)
}
