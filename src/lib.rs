pub mod error;
pub mod log;
pub mod models;
pub mod parsing;
pub mod utils;

#[cfg(test)]
mod test;

pub use error::ParseError;
pub use log::{monitor_live_log, process_log_file, ParserUpdate};
pub use models::{
    Ability, Character, CharacterKind, CombatSession, DamageComponent, NamingMode, ParserSettings,
};
pub use parsing::{classify, EventKind, LogEvent, ParserState, SessionStatus};
