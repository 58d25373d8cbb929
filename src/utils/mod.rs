pub mod time;

pub use time::{format_duration, format_time_of_day, seconds_of_day};
