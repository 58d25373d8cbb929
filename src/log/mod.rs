pub mod watcher;

pub use watcher::{
    find_player_name, monitor_live_log, process_log_file, ParserUpdate, BATCH_SNAPSHOT_LINES,
    LIVE_POLL_INTERVAL, LIVE_SNAPSHOT_INTERVAL,
};
