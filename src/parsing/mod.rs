pub mod line_parser;
pub mod processor;
pub mod regex;

pub use line_parser::{classify, ChatCommand, EventKind, HitOutcome, LogEvent};
pub use processor::{Clock, ParserState, SessionStatus};
pub use regex::PatternSet;
