use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc, Mutex};

use crate::log::{process_log_file, ParserUpdate};
use crate::models::{NamingMode, ParserSettings};
use crate::parsing::ParserState;

fn write_log(name: &str, lines: &[&str]) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    let mut file = File::create(&path).expect("create test log");
    for line in lines {
        writeln!(file, "{line}").expect("write test log");
    }
    path
}

fn run_batch(path: &PathBuf, settings: ParserSettings) -> (ParserState, Vec<ParserUpdate>) {
    let state = Arc::new(Mutex::new(ParserState::new(settings)));
    let (tx, rx) = mpsc::channel();
    let cancel = AtomicBool::new(false);
    process_log_file(path, &state, &tx, &cancel).expect("batch run");
    drop(tx);
    let updates: Vec<_> = rx.try_iter().collect();
    let state = Arc::try_unwrap(state)
        .unwrap_or_else(|_| panic!("state still shared"))
        .into_inner()
        .expect("unlock state");
    (state, updates)
}

#[test]
fn full_mission_log_end_to_end() {
    let path = write_log(
        "coh_parser_e2e_mission.txt",
        &[
            "2023-11-18 14:00:00 Welcome to City of Heroes, Kyksie!",
            // First fight: player plus a pet, rewards, incoming fire.
            "2023-11-18 14:00:05 You activated the Gladiator's Strike power.",
            "2023-11-18 14:00:05 HIT Thorn! Your Gladiator's Strike power had a 95.00% chance to hit, you rolled a 31.37.",
            "2023-11-18 14:00:06 You hit Thorn with your Gladiator's Strike for 100.00 points of Smashing damage.",
            "2023-11-18 14:00:06 You hit Thorn with your Perfect Zinger: Chance for Psionic Damage for 71.80 points of Psionic damage.",
            "2023-11-18 14:00:07 Fire Imp:  HIT Thorn! Your Fire Blast power had a 90.00% chance to hit, you rolled a 4.00.",
            "2023-11-18 14:00:08 Fire Imp:  You hit Thorn with your Fire Blast for 30.00 points of Fire damage.",
            "2023-11-18 14:00:09 Thorn MISSES! Swipe power had a 50.00% chance to hit, but rolled a 92.00.",
            "2023-11-18 14:00:10 Thorn hits you with their Fiery Breath for 12.00 points of Fire damage.",
            "2023-11-18 14:00:11 You gain 250 experience and 1,000 influence.",
            // Out-of-combat filler that must not extend the session.
            "2023-11-18 14:00:20 HIT Kyksie! Your Stamina power is autohit.",
            // Second fight past the timeout.
            "2023-11-18 14:00:40 You activated the Jab power.",
            "2023-11-18 14:00:40 MISSED Cortex!! Your Jab power had a 75.00% chance to hit, you rolled a 93.68.",
            "2023-11-18 14:00:42 HIT Cortex! Your Jab power was forced to hit by streakbreaker.",
            "2023-11-18 14:00:43 You hit Cortex with your Jab for 25.00 points of Smashing damage.",
            "2023-11-18 14:00:44 You gain 100 experience.",
        ],
    );

    let (state, updates) = run_batch(&path, ParserSettings::default());

    assert_eq!(state.player_name, "Kyksie");
    assert_eq!(state.sessions.len(), 2);
    assert!(updates
        .iter()
        .any(|u| matches!(u, ParserUpdate::Finished(_))));

    let first = &state.sessions[0];
    assert_eq!(first.name, "Session");
    assert!(first.finalized);
    // 100 direct + 71.8 proc + 30 pet outgoing; incoming 12 excluded.
    assert!((first.total_damage() - 201.8).abs() < 1e-9);
    assert_eq!(first.exp, 250);
    assert_eq!(first.inf, 1000);

    let kyksie = &first.characters_out["Kyksie"];
    let strike = &kyksie.abilities["Gladiator's Strike"];
    assert_eq!(strike.activations, 1);
    assert_eq!(strike.hits, 1);
    assert!(strike.components.contains_key("Perfect Zinger"));
    assert!(!kyksie.abilities.contains_key("Perfect Zinger"));

    let imp = &first.characters_out["Fire Imp"];
    assert!((imp.total_damage() - 30.0).abs() < 1e-9);

    let thorn_in = &first.characters_in["Thorn"];
    assert_eq!(thorn_in.tries(), 2);
    assert_eq!(thorn_in.hits(), 1);
    assert!((thorn_in.total_damage() - 12.0).abs() < 1e-9);

    let second = &state.sessions[1];
    assert_eq!(second.name, "Session (2)");
    let jab = &second.characters_out["Kyksie"].abilities["Jab"];
    assert_eq!(jab.tries, 2);
    assert_eq!(jab.hits, 1);
    assert!((jab.accuracy() - 50.0).abs() < 1e-9);
    assert_eq!(second.exp, 100);

    assert_eq!(state.total_exp, 350);
    assert_eq!(state.total_inf, 1000);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn dangling_activity_without_damage_leaves_no_session() {
    let path = write_log(
        "coh_parser_e2e_whiff.txt",
        &[
            "2023-11-18 14:00:00 Welcome to City of Heroes, Kyksie!",
            "2023-11-18 14:00:01 You activated the Jab power.",
            "2023-11-18 14:00:01 MISSED Thorn!! Your Jab power had a 75.00% chance to hit, you rolled a 93.68.",
            // Past the timeout with no damage ever landed.
            "2023-11-18 14:00:30 You hit Cortex with your Punch for 10.00 points of Smashing damage.",
        ],
    );

    let (state, _) = run_batch(&path, ParserSettings::default());

    assert_eq!(state.sessions.len(), 1);
    let session = &state.sessions[0];
    assert!(session.characters_out["Kyksie"]
        .abilities
        .contains_key("Punch"));
    assert!(!session.characters_out["Kyksie"].abilities.contains_key("Jab"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn chat_commands_shape_session_history() {
    let path = write_log(
        "coh_parser_e2e_commands.txt",
        &[
            "2023-11-18 14:00:00 Welcome to City of Heroes, Kyksie!",
            "2023-11-18 14:00:01 You hit Thorn with your Jab for 10.00 points of Smashing damage.",
            "2023-11-18 14:00:02 [Local] Kyksie: ##START_SESSION boss pull",
            "2023-11-18 14:00:03 You hit Cortex with your Jab for 10.00 points of Smashing damage.",
            "2023-11-18 14:00:04 [Local] Someone Else: ##SET_NAME hijacked",
            "2023-11-18 14:00:05 [SuperGroup] Kyksie: ##SET_NAME farm",
            "2023-11-18 14:00:30 You hit Cortex with your Jab for 10.00 points of Smashing damage.",
        ],
    );

    let (state, _) = run_batch(&path, ParserSettings::default());

    let names: Vec<_> = state.sessions.iter().map(|s| s.name.as_str()).collect();
    // First session closed by the split, second renamed by SET_NAME, third
    // inherits the standing override.
    assert_eq!(names, vec!["Session", "farm", "farm (2)"]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn highest_enemy_naming_over_a_full_file() {
    let settings = ParserSettings {
        naming_mode: NamingMode::HighestEnemyDamaged,
        ..ParserSettings::default()
    };
    let path = write_log(
        "coh_parser_e2e_highest.txt",
        &[
            "2023-11-18 14:00:00 Welcome to City of Heroes, Kyksie!",
            "2023-11-18 14:00:01 You hit Minion with your Jab for 10.00 points of Smashing damage.",
            "2023-11-18 14:00:02 You hit Elite Boss with your Haymaker for 200.00 points of Smashing damage.",
            "2023-11-18 14:00:03 You hit Minion with your Jab for 10.00 points of Smashing damage.",
        ],
    );

    let (state, _) = run_batch(&path, settings);
    assert_eq!(state.sessions.len(), 1);
    assert_eq!(state.sessions[0].name, "Elite Boss");
    let _ = std::fs::remove_file(&path);
}
