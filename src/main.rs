// Command-line runner: plays a saved project (or a built-in demo) against a logging engine
//
// Usage: studio_sequencer [PROJECT_DIR] [--config FILE.ron]

use std::time::Duration;

use studio_sequencer::command::commands::{
    AddAutomationPointCommand, AddClipInstanceCommand, AddNoteCommand, AddTrackCommand,
    CreateClipCommand,
};
use studio_sequencer::{
    Clock, FsStore, LoggingEngine, SequencerConfig, Session, SystemClock, UndoableCommand,
};

// Tick period of the playback loop (~200 Hz)
const TICK_INTERVAL: Duration = Duration::from_millis(5);

// Extra time after the last clip so the final releases fire
const RELEASE_TAIL_SECONDS: f64 = 0.5;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Studio Sequencer ===");
    println!("Version {}\n", env!("CARGO_PKG_VERSION"));

    let mut project_dir = None;
    let mut config_path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next(),
            _ => project_dir = Some(arg),
        }
    }

    let config = match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            let config = SequencerConfig::from_ron_str(&text)?;
            log::info!("Loaded configuration from {}", path);
            config
        }
        None => SequencerConfig::default(),
    };

    let mut session = Session::with_config(LoggingEngine, SystemClock::new(), config);

    match &project_dir {
        Some(dir) => {
            let store = FsStore::new(dir);
            let report = session.load_project(&store, "")?;
            println!(
                "Loaded {}: {} clip(s), {} instance(s)",
                dir, report.clips_loaded, report.instances_placed
            );
        }
        None => {
            build_demo(&mut session)?;
            println!("No project given, playing the built-in demo");
        }
    }

    for notification in session.drain_notifications() {
        println!("[{:?}] {}", notification.level, notification.message);
    }

    let play_seconds = session.state().arrangement_end() + RELEASE_TAIL_SECONDS;
    println!(
        "Tempo {} | snap {} | playing {:.2}s\n",
        session.tempo(),
        session.snap_mode(),
        play_seconds
    );

    session.play();
    let started = session.clock().now();
    let mut triggered = 0;
    while session.clock().now() - started < play_seconds {
        if let Some(report) = session.tick() {
            triggered += report.triggered;
        }
        session.poll_releases();
        std::thread::sleep(TICK_INTERVAL);
    }
    session.stop();

    println!("\nDone: {} voice(s) triggered", triggered);
    Ok(())
}

/// Two clips on two tracks, with a filter sweep on the lead
fn build_demo<C: Clock>(session: &mut Session<LoggingEngine, C>) -> Result<(), Box<dyn std::error::Error>> {
    let mut lead = CreateClipCommand::new(
        "Lead",
        "sine",
        vec!["freq".into(), "amp".into(), "cutoff".into()],
    );
    session.execute(&mut lead)?;
    let lead = lead.clip_id().ok_or("lead clip was not created")?;

    for (i, freq) in [440.0, 554.37, 659.25, 880.0].into_iter().enumerate() {
        session.execute(&mut AddNoteCommand::new(
            lead,
            i as f64 * 0.5,
            0.4,
            vec![freq, 0.6, 800.0],
        ))?;
    }
    session.execute(&mut AddAutomationPointCommand::new(lead, "cutoff", 0.0, 400.0))?;
    session.execute(&mut AddAutomationPointCommand::new(lead, "cutoff", 2.0, 4000.0))?;

    let mut bass = CreateClipCommand::new("Bass", "saw", vec!["freq".into(), "amp".into()]);
    session.execute(&mut bass)?;
    let bass = bass.clip_id().ok_or("bass clip was not created")?;
    session.execute(&mut AddNoteCommand::new(bass, 0.0, 1.0, vec![110.0, 0.8]))?;
    session.execute(&mut AddNoteCommand::new(bass, 1.0, 1.0, vec![82.41, 0.8]))?;

    let mut commands: Vec<Box<dyn UndoableCommand>> = vec![
        Box::new(AddTrackCommand::for_synth("sine")),
        Box::new(AddTrackCommand::for_synth("saw")),
        Box::new(AddClipInstanceCommand::new(lead, 0, 0.0)),
        Box::new(AddClipInstanceCommand::new(lead, 0, 2.0)),
        Box::new(AddClipInstanceCommand::new(bass, 1, 0.0)),
        Box::new(AddClipInstanceCommand::new(bass, 1, 2.0)),
    ];
    for command in commands.iter_mut() {
        session.execute(command.as_mut())?;
    }
    Ok(())
}
