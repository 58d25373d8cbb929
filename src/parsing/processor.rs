use std::collections::HashMap;

use tracing::{debug, info};

use crate::models::{CharacterKind, CombatSession, NamingMode, ParserSettings};
use crate::parsing::line_parser::{classify, ChatCommand, EventKind, HitOutcome, LogEvent};
use crate::parsing::regex::PatternSet;
use crate::utils::time::format_time_of_day;

/// Where the live session stands relative to an observed timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NoSession,
    Active,
    TimedOut,
}

/// Log-derived time. Wall clock never feeds this; batch and live runs behave
/// identically for the same lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    pub log_start: Option<i64>,
    pub current: i64,
}

impl Clock {
    pub fn advance(&mut self, timestamp: i64) {
        if self.log_start.is_none() {
            self.log_start = Some(timestamp);
        }
        self.current = timestamp;
    }

    pub fn log_duration(&self) -> i64 {
        self.log_start
            .map_or(0, |start| (self.current - start).max(0))
    }
}

/// Everything one parsing run accumulates: identity, clock, session history
/// and the live session, reward totals, and naming state. One instance per
/// run, shared behind `Arc<Mutex<_>>` between driver and observer.
pub struct ParserState {
    pub player_name: String,
    patterns: PatternSet,
    pub clock: Clock,
    pub sessions: Vec<CombatSession>,
    pub total_exp: u64,
    pub total_inf: u64,
    pub lines_processed: u64,
    settings: ParserSettings,
    session_live: bool,
    stopped: bool,
    name_override: Option<String>,
    name_counts: HashMap<String, u32>,
    pending_notify: bool,
}

impl ParserState {
    pub fn new(settings: ParserSettings) -> Self {
        Self {
            player_name: String::new(),
            patterns: PatternSet::compile(""),
            clock: Clock::default(),
            sessions: Vec::new(),
            total_exp: 0,
            total_inf: 0,
            lines_processed: 0,
            settings,
            session_live: false,
            stopped: false,
            name_override: None,
            name_counts: HashMap::new(),
            pending_notify: false,
        }
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Rebuilds the name-parameterized grammars. Called on initial detection
    /// and again whenever a welcome line shows a different character.
    pub fn set_player_name(&mut self, name: &str) {
        if name == self.player_name {
            return;
        }
        info!(player = name, "tracking player");
        self.player_name = name.to_string();
        self.patterns = PatternSet::compile(name);
    }

    pub fn process_line(&mut self, line: &str) {
        self.lines_processed += 1;
        if let Some(event) = classify(line.trim_end(), &self.patterns) {
            self.apply_event(event);
        }
    }

    pub fn apply_event(&mut self, event: LogEvent) {
        let LogEvent { timestamp, kind } = event;
        self.clock.advance(timestamp);
        let now = self.clock.current;

        if self.session_status(now) == SessionStatus::TimedOut {
            self.close_live_session();
        }

        match kind {
            EventKind::AbilityActivate { ability } => {
                self.ensure_session(now);
                self.on_activation(&ability);
            }
            EventKind::HitRoll {
                pet,
                outcome,
                target,
                ability,
            } => {
                if self.is_self(&target) {
                    debug!(%ability, "dropping self-targeted hit roll");
                    return;
                }
                self.ensure_session(now);
                self.on_hit_roll(pet.as_deref(), outcome, &target, &ability);
            }
            EventKind::Damage {
                pet,
                target,
                ability,
                description,
                value,
                damage_type,
                flair,
            } => {
                if self.is_self(&target) {
                    debug!(%ability, "dropping self-targeted damage");
                    return;
                }
                self.ensure_session(now);
                self.touch_session(now);
                self.on_damage(
                    pet.as_deref(),
                    &target,
                    &ability,
                    &description,
                    value,
                    &damage_type,
                    &flair,
                );
            }
            EventKind::FoeHitRoll {
                pet_echo,
                enemy,
                outcome,
                ability,
            } => {
                self.ensure_session(now);
                self.on_foe_hit_roll(pet_echo.as_deref(), &enemy, outcome, &ability);
            }
            EventKind::FoeAutohit { enemy, ability } => {
                self.ensure_session(now);
                self.on_foe_autohit(&enemy, &ability);
            }
            EventKind::FoeDamage {
                enemy,
                defender,
                ability,
                value,
                damage_type,
                flair,
            } => {
                self.ensure_session(now);
                self.touch_session(now);
                self.on_foe_damage(
                    &enemy,
                    defender.as_deref(),
                    &ability,
                    value,
                    &damage_type,
                    &flair,
                );
            }
            EventKind::Reward { exp, inf } => self.on_reward(exp, inf),
            EventKind::PlayerName { name } => self.set_player_name(&name),
            EventKind::Command { player, command } => self.on_command(now, &player, command),
        }
    }

    pub fn session_status(&self, now: i64) -> SessionStatus {
        if !self.session_live {
            return SessionStatus::NoSession;
        }
        let timeout = self.settings.session_timeout_seconds;
        if timeout == 0 {
            return SessionStatus::Active;
        }
        match self.sessions.last() {
            Some(session) if now - session.end_time > timeout => SessionStatus::TimedOut,
            _ => SessionStatus::Active,
        }
    }

    /// Ends the run. A still-live session is finalized regardless of the
    /// timeout. Safe to call more than once; only the first call acts.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if self.session_live {
            self.session_live = false;
            self.finalize_last();
            self.pending_notify = true;
        }
    }

    pub fn snapshot(&self) -> Vec<CombatSession> {
        self.sessions.clone()
    }

    pub fn live_session(&self) -> Option<&CombatSession> {
        if self.session_live {
            self.sessions.last()
        } else {
            None
        }
    }

    /// True once per lifecycle edge (session closed, command handled), so
    /// the live driver can push a snapshot ahead of the periodic tick.
    pub fn take_notify(&mut self) -> bool {
        std::mem::take(&mut self.pending_notify)
    }

    /// Periodic live-mode maintenance: while the current session has no
    /// damage yet, its start slides to the present so the measured span
    /// starts near the first damage rather than at a stray activation.
    pub fn refresh_live_session(&mut self) {
        if !self.session_live {
            return;
        }
        let now = self.clock.current;
        if let Some(session) = self.sessions.last_mut() {
            if session.duration() > 0 && session.total_damage() == 0.0 {
                session.start_time = now;
            }
        }
    }

    fn is_self(&self, target: &str) -> bool {
        !self.player_name.is_empty() && target == self.player_name
    }

    fn display_player(&self) -> String {
        if self.player_name.is_empty() {
            "You".to_string()
        } else {
            self.player_name.clone()
        }
    }

    /// Folds pseudopets (and the player's own echo prefix) into the player.
    /// Returns the actor name, its kind, and whether an activation should be
    /// synthesized because this actor never logs activation lines.
    fn resolve_actor(&self, pet: Option<&str>) -> (String, CharacterKind, bool) {
        match pet {
            Some(p) if p == self.player_name => (self.display_player(), CharacterKind::Player, false),
            Some(p) if self.settings.is_pseudopet(p) => {
                (self.display_player(), CharacterKind::Player, true)
            }
            Some(p) => (p.to_string(), CharacterKind::Pet, true),
            None => (self.display_player(), CharacterKind::Player, false),
        }
    }

    fn ensure_session(&mut self, now: i64) {
        if !self.session_live {
            self.open_session(now);
        }
    }

    fn open_session(&mut self, now: i64) {
        let mut session = CombatSession::new(now);
        if let Some(base) = self.name_override.clone() {
            session.set_base_name(&base, true);
        } else {
            match self.settings.naming_mode {
                NamingMode::Prefix => {
                    let base = self.settings.default_name_prefix.clone();
                    session.set_base_name(&base, true);
                }
                NamingMode::PlayerName => {
                    if !self.player_name.is_empty() {
                        let base = self.player_name.clone();
                        session.set_base_name(&base, true);
                    }
                }
                NamingMode::Timestamp => {
                    session.set_base_name(&format_time_of_day(now), true);
                }
                // Both enemy-derived modes start provisional.
                NamingMode::FirstEnemyDamaged | NamingMode::HighestEnemyDamaged => {}
            }
        }
        debug!(start = now, "combat session opened");
        self.sessions.push(session);
        self.session_live = true;
    }

    /// Damage events are the only thing that advances the inactivity marker.
    fn touch_session(&mut self, now: i64) {
        if let Some(session) = self.sessions.last_mut() {
            session.touch(now);
        }
    }

    /// Timeout path: a session that never landed outgoing damage vanishes
    /// without a trace; anything else is finalized.
    fn close_live_session(&mut self) {
        if !self.session_live {
            return;
        }
        self.session_live = false;
        let discard = self
            .sessions
            .last()
            .map_or(true, |s| s.total_damage() == 0.0);
        if discard {
            debug!("discarding combat session with no outgoing damage");
            self.sessions.pop();
        } else {
            self.finalize_last();
        }
        self.pending_notify = true;
    }

    fn finalize_last(&mut self) {
        let default_base = self.settings.default_name_prefix.clone();
        let Some(session) = self.sessions.last_mut() else {
            return;
        };
        if session.finalized {
            return;
        }
        let base = session.base_name.clone().unwrap_or(default_base);
        let count = self.name_counts.entry(base.clone()).or_insert(0);
        *count += 1;
        session.name = if *count == 1 {
            base
        } else {
            format!("{base} ({count})")
        };
        session.finalized = true;
        info!(
            name = %session.name,
            duration = session.duration(),
            damage = session.total_damage(),
            "combat session finalized"
        );
    }

    fn on_activation(&mut self, ability: &str) {
        let player = self.display_player();
        let Some(session) = self.sessions.last_mut() else {
            return;
        };
        let character = session.character_out_mut(&player, CharacterKind::Player);
        character.ability_mut(ability).record_activation();
        character.last_ability = Some(ability.to_string());
    }

    fn on_hit_roll(&mut self, pet: Option<&str>, outcome: HitOutcome, target: &str, ability: &str) {
        let (actor, kind, synthesize) = self.resolve_actor(pet);
        let hit = outcome == HitOutcome::Hit;
        let Some(session) = self.sessions.last_mut() else {
            return;
        };

        let character = session.character_out_mut(&actor, kind);
        let record = character.ability_mut(ability);
        if synthesize {
            record.record_activation();
        }
        record.record_hit_roll(hit);
        character.last_ability = Some(ability.to_string());

        let target_char = session.target_out_mut(target);
        target_char.ability_mut(ability).record_hit_roll(hit);
        target_char.last_ability = Some(ability.to_string());
    }

    #[allow(clippy::too_many_arguments)]
    fn on_damage(
        &mut self,
        pet: Option<&str>,
        target: &str,
        ability: &str,
        description: &str,
        value: f64,
        damage_type: &str,
        flair: &str,
    ) {
        let (actor, kind, _) = self.resolve_actor(pet);
        let is_proc = description.contains("Damage") || self.settings.is_always_proc(ability);
        let component_key = component_key(damage_type, flair);
        let no_hit_roll_catalog = self.settings.is_no_hit_roll_ability(ability);
        let associate = self.settings.associate_procs_to_powers;

        let Some(session) = self.sessions.last_mut() else {
            return;
        };

        if is_proc && associate {
            let character = session.character_out_mut(&actor, kind);
            if let Some(parent) = character.last_ability.clone() {
                // The proc rides the most recent real power; its damage
                // becomes a component named after the proc itself.
                let proc_key = if flair.is_empty() {
                    ability.to_string()
                } else {
                    format!("{ability} {flair}")
                };
                character.ability_mut(&parent).add_proc_damage(&proc_key, value);
                session
                    .target_out_mut(target)
                    .ability_mut(&parent)
                    .add_proc_damage(&proc_key, value);
                self.note_damaged_target(target);
                return;
            }
            if value == 0.0 {
                debug!(ability, "dropping unattributable zero-value proc");
                return;
            }
            // A proc with real damage and nothing to attach to stands alone.
        }

        let character = session.character_out_mut(&actor, kind);
        let record = if is_proc {
            character.proc_ability_mut(ability)
        } else {
            character.ability_mut(ability)
        };
        if !is_proc && !record.is_proc && record.hits == 0 && record.tries == 0 {
            record.no_hit_roll = true;
        }
        if no_hit_roll_catalog {
            record.no_hit_roll = true;
        }
        if record.no_hit_roll {
            // Auras never roll; give them an activation and a landed hit per
            // damage instance so accuracy and averages stay meaningful.
            record.record_activation();
            record.record_hit_roll(true);
        }
        record.add_damage(&component_key, value);
        character.last_ability = Some(ability.to_string());

        let target_char = session.target_out_mut(target);
        target_char
            .ability_mut(ability)
            .add_damage(&component_key, value);
        target_char.last_ability = Some(ability.to_string());

        self.note_damaged_target(target);
    }

    /// Enemy-derived naming. First-enemy locks on the first damaged target;
    /// highest-enemy keeps chasing the current maximum until finalize.
    fn note_damaged_target(&mut self, target: &str) {
        if self.name_override.is_some() {
            return;
        }
        let mode = self.settings.naming_mode;
        let Some(session) = self.sessions.last_mut() else {
            return;
        };
        if session.name_locked || session.finalized {
            return;
        }
        match mode {
            NamingMode::FirstEnemyDamaged => session.set_base_name(target, true),
            NamingMode::HighestEnemyDamaged => {
                if let Some(top) = session.highest_damaged_target() {
                    let name = top.name.clone();
                    session.set_base_name(&name, false);
                }
            }
            _ => {}
        }
    }

    fn on_foe_hit_roll(
        &mut self,
        pet_echo: Option<&str>,
        enemy: &str,
        outcome: HitOutcome,
        ability: &str,
    ) {
        let hit = outcome == HitOutcome::Hit;
        let defender = self.resolve_defender(pet_echo);
        let Some(session) = self.sessions.last_mut() else {
            return;
        };

        let attacker = session.character_in_mut(enemy);
        let record = attacker.ability_mut(ability);
        // Enemies never log activation lines; the roll stands in for one.
        record.record_activation();
        record.record_hit_roll(hit);
        attacker.last_ability = Some(ability.to_string());

        let (name, kind) = defender;
        let defender_char = session.target_in_mut(&name, kind);
        defender_char.ability_mut(ability).record_hit_roll(hit);
        defender_char.last_ability = Some(ability.to_string());
    }

    fn on_foe_autohit(&mut self, enemy: &str, ability: &str) {
        let player = self.display_player();
        let Some(session) = self.sessions.last_mut() else {
            return;
        };

        let attacker = session.character_in_mut(enemy);
        let record = attacker.ability_mut(ability);
        record.no_hit_roll = true;
        record.record_activation();
        record.record_hit_roll(true);
        attacker.last_ability = Some(ability.to_string());

        let defender_char = session.target_in_mut(&player, CharacterKind::Player);
        defender_char.ability_mut(ability).record_hit_roll(true);
        defender_char.last_ability = Some(ability.to_string());
    }

    fn on_foe_damage(
        &mut self,
        enemy: &str,
        defender: Option<&str>,
        ability: &str,
        value: f64,
        damage_type: &str,
        flair: &str,
    ) {
        let component_key = component_key(damage_type, flair);
        let (name, kind) = self.resolve_defender(defender);
        let Some(session) = self.sessions.last_mut() else {
            return;
        };

        let attacker = session.character_in_mut(enemy);
        let record = attacker.ability_mut(ability);
        if record.hits == 0 && record.tries == 0 {
            record.no_hit_roll = true;
        }
        if record.no_hit_roll {
            record.record_activation();
            record.record_hit_roll(true);
        }
        record.add_damage(&component_key, value);
        attacker.last_ability = Some(ability.to_string());

        let defender_char = session.target_in_mut(&name, kind);
        defender_char
            .ability_mut(ability)
            .add_damage(&component_key, value);
        defender_char.last_ability = Some(ability.to_string());
    }

    fn resolve_defender(&self, pet: Option<&str>) -> (String, CharacterKind) {
        match pet {
            Some(p) if p != self.player_name && !self.settings.is_pseudopet(p) => {
                (p.to_string(), CharacterKind::Pet)
            }
            _ => (self.display_player(), CharacterKind::Player),
        }
    }

    /// Rewards never open or extend a session; they count globally and, when
    /// one is live, against it too.
    fn on_reward(&mut self, exp: u64, inf: u64) {
        self.total_exp += exp;
        self.total_inf += inf;
        if self.session_live {
            if let Some(session) = self.sessions.last_mut() {
                session.add_rewards(exp, inf);
            }
        }
    }

    fn on_command(&mut self, now: i64, player: &str, command: ChatCommand) {
        if self.player_name.is_empty() || player != self.player_name {
            debug!(sender = player, "ignoring chat command from untracked sender");
            return;
        }
        match command {
            ChatCommand::SetName(prefix) => {
                info!(prefix = %prefix, "session naming override set");
                if self.session_live {
                    if let Some(session) = self.sessions.last_mut() {
                        session.set_base_name(&prefix, true);
                    }
                }
                self.name_override = Some(prefix);
                self.pending_notify = true;
            }
            ChatCommand::StartSession(prefix) => {
                info!("session split requested");
                self.close_live_session();
                self.open_session(now);
                if let Some(prefix) = prefix {
                    if let Some(session) = self.sessions.last_mut() {
                        session.set_base_name(&prefix, true);
                    }
                }
                self.pending_notify = true;
            }
            ChatCommand::Unknown(command) => {
                debug!(command = %command, "unknown chat command");
            }
        }
    }
}

fn component_key(damage_type: &str, flair: &str) -> String {
    if flair.is_empty() {
        damage_type.to_string()
    } else {
        format!("{damage_type} {flair}")
    }
}
