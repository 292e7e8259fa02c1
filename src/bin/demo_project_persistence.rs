// Quick demonstration of the project persistence system
// Run with: cargo run --bin demo_project_persistence

use studio_sequencer::command::commands::{
    AddClipInstanceCommand, AddNoteCommand, AddTrackCommand, CreateClipCommand,
};
use studio_sequencer::{FsStore, ManualClock, RecordingEngine, Session, SnapMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("🎵 Studio Sequencer - Project Persistence Demo");
    println!("==============================================");

    let mut session = Session::new(RecordingEngine::new(), ManualClock::new());
    session.set_bpm(96.0);
    session.set_snap_mode(SnapMode::Eighth);
    session.set_loop_region(0.0, 2.5);
    session.set_loop_enabled(true);

    let mut create = CreateClipCommand::new("Arp", "sine", vec!["freq".into(), "amp".into()]);
    session.execute(&mut create)?;
    let arp = create.clip_id().ok_or("clip was not created")?;
    for (i, freq) in [261.63, 329.63, 392.0, 523.25].into_iter().enumerate() {
        session.execute(&mut AddNoteCommand::new(arp, i as f64 * 0.3125, 0.25, vec![freq, 0.7]))?;
    }

    let mut track = AddTrackCommand::for_synth("sine");
    session.execute(&mut track)?;
    let track = track.track_index().ok_or("track was not created")?;
    session.execute(&mut AddClipInstanceCommand::new(arp, track, 0.0))?;
    session.execute(&mut AddClipInstanceCommand::new(arp, track, 1.25))?;

    println!("✅ Built arrangement");
    println!("   - Tempo: {}", session.tempo());
    println!("   - Clips: {}", session.state().clips.len());
    println!("   - Tracks: {}", session.state().arrangement.track_count());
    println!(
        "   - Instances: {}",
        session.state().arrangement.instances().len()
    );

    // Save project
    let project_root = std::env::temp_dir().join("studio_sequencer_demo");
    let mut store = FsStore::new(project_root.clone());
    let report = session.save_project(&mut store, "")?;

    println!("\n💾 Saved project to: {}", project_root.display());
    println!("   - Clip files written: {}", report.clips_written);
    let metadata = std::fs::metadata(project_root.join(&report.document_path))?;
    println!("   - Document size: {} bytes", metadata.len());

    // Saving again only rewrites modified clips
    let again = session.save_project(&mut store, "")?;
    println!("   - Clip files written on second save: {}", again.clips_written);

    // Load project back into a fresh session
    let mut loaded = Session::new(RecordingEngine::new(), ManualClock::new());
    let report = loaded.load_project(&store, "")?;

    println!("\n📂 Loaded project successfully:");
    println!("   - Tempo: {}", loaded.tempo());
    println!("   - Snap: {}", loaded.snap_mode());
    println!("   - Loop: {:?}", loaded.transport().loop_region());
    println!("   - Clips loaded: {}", report.clips_loaded);
    println!("   - Instances placed: {}", report.instances_placed);
    for warning in &report.warnings {
        println!("   ⚠️  {}", warning);
    }

    let original = &session.state().clips;
    let restored = &loaded.state().clips;
    let same_notes = original.len() == restored.len()
        && original
            .iter()
            .zip(restored)
            .all(|(a, b)| a.note_count() == b.note_count());
    println!("\n🔍 Note counts match: {}", same_notes);

    println!("\n🎉 Demo completed successfully!");
    Ok(())
}
