use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::error::ParseError;
use crate::models::CombatSession;
use crate::parsing::line_parser::{classify, EventKind};
use crate::parsing::processor::ParserState;
use crate::parsing::regex::PatternSet;

/// Batch mode checks the cancel flag and publishes a snapshot once per this
/// many lines.
pub const BATCH_SNAPSHOT_LINES: u64 = 500;
/// Live mode sleeps this long when the tail has no new data.
pub const LIVE_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Live mode publishes a snapshot at least this often.
pub const LIVE_SNAPSHOT_INTERVAL: Duration = Duration::from_millis(250);

/// Messages the drivers push to the observer over the channel.
#[derive(Debug)]
pub enum ParserUpdate {
    /// In-progress view of the session history (live session included).
    Snapshot(Vec<CombatSession>),
    /// The run ended; every surviving session is finalized.
    Finished(Vec<CombatSession>),
    /// A fatal failure; the run is over and cannot be resumed.
    Error { title: String, message: String },
}

fn validate_path(path: &Path) -> Result<(), ParseError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ParseError::InvalidPath(path.to_path_buf()))
    }
}

/// One pass over a complete log file. Every `BATCH_SNAPSHOT_LINES` lines the
/// cancel flag is honored and a snapshot goes out, so an observer can render
/// progress and a cancel is never more than one batch away. EOF counts as
/// the run's stop: a still-live session is finalized before `Finished`.
pub fn process_log_file(
    path: &Path,
    state: &Arc<Mutex<ParserState>>,
    updates: &Sender<ParserUpdate>,
    cancel: &AtomicBool,
) -> Result<Vec<CombatSession>, ParseError> {
    validate_path(path)?;
    let started = Instant::now();
    let reader = BufReader::new(File::open(path)?);

    let mut since_snapshot = 0u64;
    for line in reader.lines() {
        let line = line?;
        if let Ok(mut guard) = state.lock() {
            guard.process_line(&line);
        }
        since_snapshot += 1;
        if since_snapshot >= BATCH_SNAPSHOT_LINES {
            since_snapshot = 0;
            if cancel.load(Ordering::Relaxed) {
                info!("batch parse cancelled");
                break;
            }
            if let Ok(guard) = state.lock() {
                let _ = updates.send(ParserUpdate::Snapshot(guard.snapshot()));
            }
        }
    }

    let sessions = match state.lock() {
        Ok(mut guard) => {
            guard.stop();
            info!(
                lines = guard.lines_processed,
                sessions = guard.sessions.len(),
                elapsed = ?started.elapsed(),
                "log file processed"
            );
            guard.snapshot()
        }
        Err(_) => Vec::new(),
    };
    let _ = updates.send(ParserUpdate::Finished(sessions.clone()));
    Ok(sessions)
}

/// Scans a whole file for the player's identity, keeping the last match so a
/// relog mid-file wins.
pub fn find_player_name(path: &Path) -> Result<Option<String>, ParseError> {
    validate_path(path)?;
    // Identity grammars don't embed the player's name, so an empty set works.
    let patterns = PatternSet::compile("");
    let reader = BufReader::new(File::open(path)?);
    let mut found = None;
    for line in reader.lines() {
        let line = line?;
        if let Some(event) = classify(&line, &patterns) {
            if let EventKind::PlayerName { name } = event.kind {
                found = Some(name);
            }
        }
    }
    Ok(found)
}

/// Tails a log that the game is still writing. History is skipped: identity
/// is pre-scanned from the existing content, then the cursor seeks to EOF
/// and only new lines are interpreted. A read failure mid-poll is fatal for
/// the run; ending it cleanly is done by setting `stop`.
pub fn monitor_live_log(
    path: &Path,
    state: &Arc<Mutex<ParserState>>,
    updates: &Sender<ParserUpdate>,
    stop: &AtomicBool,
) -> Result<Vec<CombatSession>, ParseError> {
    validate_path(path)?;
    match find_player_name(path)? {
        Some(name) => {
            if let Ok(mut guard) = state.lock() {
                guard.set_player_name(&name);
            }
        }
        None => warn!("no player identity found in existing log content"),
    }

    let mut reader = BufReader::new(File::open(path)?);
    reader.seek(SeekFrom::End(0))?;
    info!(path = %path.display(), "tailing live log");

    let mut last_snapshot = Instant::now();
    let mut buffer = String::new();
    while !stop.load(Ordering::Relaxed) {
        buffer.clear();
        match reader.read_line(&mut buffer) {
            Ok(0) => thread::sleep(LIVE_POLL_INTERVAL),
            Ok(_) => {
                let notify = match state.lock() {
                    Ok(mut guard) => {
                        guard.process_line(&buffer);
                        guard.take_notify().then(|| guard.snapshot())
                    }
                    Err(_) => None,
                };
                if let Some(snapshot) = notify {
                    let _ = updates.send(ParserUpdate::Snapshot(snapshot));
                    last_snapshot = Instant::now();
                }
            }
            Err(e) => {
                error!(error = %e, "live log read failed");
                let _ = updates.send(ParserUpdate::Error {
                    title: "Log read failure".to_string(),
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        }

        if last_snapshot.elapsed() >= LIVE_SNAPSHOT_INTERVAL {
            last_snapshot = Instant::now();
            if let Ok(mut guard) = state.lock() {
                guard.refresh_live_session();
                let snapshot = guard.snapshot();
                drop(guard);
                let _ = updates.send(ParserUpdate::Snapshot(snapshot));
            }
        }
    }

    let sessions = match state.lock() {
        Ok(mut guard) => {
            guard.stop();
            guard.snapshot()
        }
        Err(_) => Vec::new(),
    };
    let _ = updates.send(ParserUpdate::Finished(sessions.clone()));
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParserSettings;
    use std::io::Write;
    use std::sync::mpsc;

    fn write_log(name: &str, lines: &[&str]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = File::create(&path).expect("create temp log");
        for line in lines {
            writeln!(file, "{line}").expect("write line");
        }
        path
    }

    #[test]
    fn invalid_path_is_rejected_before_parsing() {
        let state = Arc::new(Mutex::new(ParserState::new(ParserSettings::default())));
        let (tx, rx) = mpsc::channel();
        let cancel = AtomicBool::new(false);

        let result = process_log_file(Path::new("/nonexistent/chatlog.txt"), &state, &tx, &cancel);
        assert!(matches!(result, Err(ParseError::InvalidPath(_))));
        assert_eq!(state.lock().unwrap().lines_processed, 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn batch_run_finalizes_and_reports_sessions() {
        let path = write_log(
            "coh_parser_batch_test.txt",
            &[
                "2023-11-18 14:00:00 Welcome to City of Heroes, Kyksie!",
                "2023-11-18 14:00:01 You activated the Jab power.",
                "2023-11-18 14:00:01 HIT Thorn! Your Jab power had a 95.00% chance to hit, you rolled a 10.00.",
                "2023-11-18 14:00:02 You hit Thorn with your Jab for 25.00 points of Smashing damage.",
                "2023-11-18 14:00:03 You gain 250 experience and 1,000 influence.",
                "random chatter that matches nothing",
            ],
        );
        let state = Arc::new(Mutex::new(ParserState::new(ParserSettings::default())));
        let (tx, rx) = mpsc::channel();
        let cancel = AtomicBool::new(false);

        let sessions = process_log_file(&path, &state, &tx, &cancel).expect("batch run");
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].finalized);
        assert_eq!(sessions[0].name, "Session");
        assert_eq!(sessions[0].exp, 250);
        assert!((sessions[0].total_damage() - 25.0).abs() < 1e-9);

        match rx.recv().expect("completion update") {
            ParserUpdate::Finished(finished) => assert_eq!(finished.len(), 1),
            other => panic!("unexpected update: {other:?}"),
        }

        let guard = state.lock().unwrap();
        assert_eq!(guard.player_name, "Kyksie");
        assert_eq!(guard.lines_processed, 6);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn find_player_name_keeps_the_last_match() {
        let path = write_log(
            "coh_parser_identity_test.txt",
            &[
                "2023-11-18 13:00:00 Welcome to City of Heroes, Old Alt!",
                "2023-11-18 14:00:00 Welcome to City of Heroes, Kyksie!",
            ],
        );
        let found = find_player_name(&path).expect("scan");
        assert_eq!(found.as_deref(), Some("Kyksie"));
        let _ = std::fs::remove_file(&path);
    }
}
