use std::error::Error;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use coh_parser::log::{monitor_live_log, process_log_file, ParserUpdate};
use coh_parser::models::{CombatSession, NamingMode, ParserSettings};
use coh_parser::parsing::ParserState;
use coh_parser::utils::time::format_duration;

#[derive(Parser)]
#[command(name = "coh_parser", version, about = "City of Heroes combat log parser")]
struct Cli {
    /// Path to the chat log file
    log_file: PathBuf,

    /// Tail the file for new entries instead of scanning it once
    #[arg(short, long)]
    live: bool,

    /// Seconds of inactivity that close a combat session (0 = never)
    #[arg(long)]
    timeout: Option<i64>,

    /// Session naming mode: prefix, player-name, timestamp, first-enemy,
    /// highest-enemy
    #[arg(long)]
    naming: Option<NamingMode>,

    /// JSON file holding a parser settings snapshot
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("coh_parser=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings: ParserSettings = match &cli.settings {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => ParserSettings::default(),
    };
    if let Some(timeout) = cli.timeout {
        settings.session_timeout_seconds = timeout;
    }
    if let Some(naming) = cli.naming {
        settings.naming_mode = naming;
    }

    let state = Arc::new(Mutex::new(ParserState::new(settings)));
    let (tx, rx) = mpsc::channel();
    let halt = Arc::new(AtomicBool::new(false));

    let worker = {
        let path = cli.log_file.clone();
        let state = state.clone();
        let halt = halt.clone();
        let live = cli.live;
        thread::spawn(move || {
            if live {
                monitor_live_log(&path, &state, &tx, &halt)
            } else {
                process_log_file(&path, &state, &tx, &halt)
            }
        })
    };

    for update in rx {
        match update {
            ParserUpdate::Snapshot(sessions) => {
                if cli.live {
                    print_live_line(&sessions);
                }
            }
            ParserUpdate::Finished(sessions) => {
                if cli.live {
                    println!();
                }
                print_summary(&sessions);
                break;
            }
            ParserUpdate::Error { title, message } => {
                eprintln!("{title}: {message}");
                break;
            }
        }
    }

    halt.store(true, Ordering::Relaxed);
    let sessions = match worker.join() {
        Ok(result) => result?,
        Err(_) => {
            error!("parser thread panicked");
            return Err("parser thread panicked".into());
        }
    };

    if let Ok(guard) = state.lock() {
        println!(
            "{} lines, {} sessions, {} exp, {} inf total",
            guard.lines_processed,
            sessions.len(),
            guard.total_exp,
            guard.total_inf
        );
    }
    Ok(())
}

fn print_live_line(sessions: &[CombatSession]) {
    let Some(session) = sessions.last() else {
        return;
    };
    print!(
        "\r{} | {} | {:.2} damage | {:.2} dps    ",
        session.name,
        format_duration(session.duration()),
        session.total_damage(),
        session.dps()
    );
    let _ = std::io::stdout().flush();
}

fn print_summary(sessions: &[CombatSession]) {
    for session in sessions {
        println!(
            "=== {} [{}]  {:.2} damage, {:.2} dps, {} exp, {} inf ===",
            session.name,
            format_duration(session.duration()),
            session.total_damage(),
            session.dps(),
            session.exp,
            session.inf
        );

        let mut actors: Vec<_> = session.characters_out.values().collect();
        actors.sort_by(|a, b| b.total_damage().total_cmp(&a.total_damage()));
        for character in actors {
            println!(
                "  {}: {:.2} damage, {:.2} dps, {:.1}% accuracy",
                character.name,
                character.total_damage(),
                character.dps(session.duration()),
                character.accuracy()
            );

            let mut abilities: Vec<_> = character.abilities.values().collect();
            abilities.sort_by(|a, b| b.total_damage().total_cmp(&a.total_damage()));
            for ability in abilities {
                println!(
                    "    {}: {} uses, {:.1}% accuracy, {:.2} damage (avg {:.2})",
                    ability.name,
                    ability.activations,
                    ability.accuracy(),
                    ability.total_damage(),
                    ability.average_damage()
                );

                let mut components: Vec<_> = ability.components.values().collect();
                components.sort_by(|a, b| b.total_damage.total_cmp(&a.total_damage));
                for component in components {
                    if component.is_proc {
                        println!(
                            "      {} (proc): {}x, {:.2} damage, {:.1}% rate",
                            component.damage_type,
                            component.count,
                            component.total_damage,
                            ability.proc_rate(component)
                        );
                    } else {
                        println!(
                            "      {}: {}x, {:.2} damage (max {:.2}, min {:.2})",
                            component.damage_type,
                            component.count,
                            component.total_damage,
                            component.highest_damage,
                            component.lowest_damage
                        );
                    }
                }
            }
        }

        if !session.characters_in.is_empty() {
            let incoming: f64 = session
                .characters_in
                .values()
                .map(|c| c.total_damage())
                .sum();
            println!(
                "  incoming: {:.2} damage from {} attackers",
                incoming,
                session.characters_in.len()
            );
        }
    }
}
