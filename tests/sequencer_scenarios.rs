// End-to-end playback and editing scenarios
// Drive a Session with a manual clock and inspect the engine calls it produced

use studio_sequencer::command::commands::{
    AddAutomationPointCommand, AddClipInstanceCommand, AddNoteCommand, CreateClipCommand,
    DeleteNoteCommand, DeleteTrackCommand, RenameClipCommand, SetTrackMutedCommand,
    SetTrackSoloCommand,
};
use studio_sequencer::synth::EngineCall;
use studio_sequencer::{ClipId, ManualClock, RecordingEngine, Session};

type TestSession = Session<RecordingEngine, ManualClock>;

fn new_session() -> (TestSession, ManualClock) {
    let clock = ManualClock::new();
    (Session::new(RecordingEngine::new(), clock.clone()), clock)
}

fn create_clip(session: &mut TestSession, synth: &str, params: &[&str]) -> ClipId {
    let mut create = CreateClipCommand::new(synth, synth, params.iter().map(|p| p.to_string()).collect());
    session.execute(&mut create).unwrap();
    create.clip_id().unwrap()
}

fn add_note(session: &mut TestSession, clip: ClipId, start: f64, duration: f64, params: Vec<f64>) -> u64 {
    let mut add = AddNoteCommand::new(clip, start, duration, params);
    session.execute(&mut add).unwrap();
    add.note_id().unwrap()
}

fn place(session: &mut TestSession, clip: ClipId, track: usize, start: f64) -> u64 {
    let mut add = AddClipInstanceCommand::new(clip, track, start);
    session.execute(&mut add).unwrap();
    add.instance_id().unwrap()
}

#[test]
fn test_loop_wrap_releases_then_retriggers_from_loop_start() {
    let (mut session, clock) = new_session();
    let clip = create_clip(&mut session, "sine", &["freq"]);
    add_note(&mut session, clip, 0.0, 0.25, vec![440.0]);
    add_note(&mut session, clip, 1.5, 0.5, vec![660.0]);
    place(&mut session, clip, 0, 0.0);
    place(&mut session, clip, 0, 2.0);

    session.set_loop_region(0.0, 4.0);
    session.set_loop_enabled(true);
    session.set_position(3.4);
    session.play();

    // [3.4, 3.6) contains the second instance's 660 Hz note at 3.5
    clock.advance(0.2);
    let report = session.tick().unwrap();
    assert_eq!(report.triggered, 1);
    assert!(!report.wrapped);

    clock.advance(0.3);
    let report = session.tick().unwrap();
    assert_eq!(report.triggered, 0);

    // 4.2 wraps to 0.2: the sounding voice is cut, the note at 0 starts again
    clock.advance(0.3);
    let report = session.tick().unwrap();
    assert!(report.wrapped);
    assert_eq!(report.triggered, 1);
    assert!(report.released >= 1);
    assert!((session.transport().position() - 0.2).abs() < 1e-9);

    // The cancelled timer of the cut voice never fires a second release
    clock.advance(1.0);
    session.poll_releases();
    let released_first = session
        .engine()
        .released()
        .iter()
        .filter(|&&v| v == 1)
        .count();
    assert_eq!(released_first, 1);

    let frequencies: Vec<f64> = session
        .engine()
        .calls()
        .iter()
        .filter_map(|call| match call {
            EngineCall::Trigger { frequency, .. } => Some(*frequency),
            _ => None,
        })
        .collect();
    assert_eq!(frequencies, vec![660.0, 440.0]);
}

#[test]
fn test_solo_excludes_other_tracks_and_mute_wins() {
    let (mut session, clock) = new_session();
    for (track, synth) in ["sine", "saw", "square"].into_iter().enumerate() {
        let clip = create_clip(&mut session, synth, &["freq"]);
        add_note(&mut session, clip, 0.0, 0.5, vec![100.0 * (track + 1) as f64]);
        place(&mut session, clip, track, 0.0);
    }
    session.execute(&mut SetTrackSoloCommand::new(1, true)).unwrap();

    session.play();
    clock.advance(0.1);
    let report = session.tick().unwrap();
    assert_eq!(report.triggered, 1);
    assert!(matches!(
        session.engine().calls().last(),
        Some(EngineCall::Trigger { frequency, .. }) if *frequency == 200.0
    ));

    session.stop();
    session.execute(&mut SetTrackMutedCommand::new(1, true)).unwrap();
    session.play();
    clock.advance(0.1);
    let report = session.tick().unwrap();
    assert_eq!(report.triggered, 0);
}

#[test]
fn test_delete_middle_track_shifts_instances_and_undoes() {
    let (mut session, _clock) = new_session();
    let mut clips = Vec::new();
    for (track, synth) in ["sine", "saw", "square"].into_iter().enumerate() {
        let clip = create_clip(&mut session, synth, &["freq"]);
        place(&mut session, clip, track, 0.0);
        clips.push(clip);
    }

    session.execute(&mut DeleteTrackCommand::new(1)).unwrap();
    let arrangement = &session.state().arrangement;
    assert_eq!(arrangement.track_count(), 2);
    let placed: Vec<(ClipId, usize)> = arrangement
        .instances()
        .iter()
        .map(|i| (i.clip_id, i.track_index))
        .collect();
    assert_eq!(placed, vec![(clips[0], 0), (clips[2], 1)]);
    // The clip itself survives in the pool
    assert_eq!(session.state().clips.len(), 3);

    assert_eq!(session.undo().as_deref(), Some("Delete Track 2"));
    let arrangement = &session.state().arrangement;
    assert_eq!(arrangement.track_count(), 3);
    assert_eq!(arrangement.instances()[1].track_index, 1);
    assert_eq!(arrangement.instances()[2].track_index, 2);
}

#[test]
fn test_deleting_a_sounding_note_still_releases_it() {
    let (mut session, clock) = new_session();
    let clip = create_clip(&mut session, "sine", &["freq"]);
    let note = add_note(&mut session, clip, 0.0, 1.0, vec![440.0]);
    place(&mut session, clip, 0, 0.0);

    session.play();
    clock.advance(0.1);
    session.tick();
    session
        .execute(&mut DeleteNoteCommand::new(clip, note))
        .unwrap();

    clock.advance(0.5);
    session.tick();
    assert!(session.engine().released().is_empty());

    clock.advance(0.5);
    session.tick();
    session.poll_releases();
    assert_eq!(session.engine().released(), vec![1]);
}

#[test]
fn test_automation_sets_trigger_value_and_follows_playhead() {
    let (mut session, clock) = new_session();
    let clip = create_clip(&mut session, "sine", &["freq", "amp", "cutoff"]);
    add_note(&mut session, clip, 0.0, 0.5, vec![440.0, 0.5, 1000.0]);
    add_note(&mut session, clip, 1.0, 0.5, vec![440.0, 0.5, 1000.0]);
    session
        .execute(&mut AddAutomationPointCommand::new(clip, "cutoff", 0.0, 100.0))
        .unwrap();
    session
        .execute(&mut AddAutomationPointCommand::new(clip, "cutoff", 2.0, 300.0))
        .unwrap();
    place(&mut session, clip, 0, 0.0);

    session.play();
    for _ in 0..12 {
        clock.advance(0.1);
        session.tick();
        session.poll_releases();
    }

    let first = session.engine().params_for(1);
    assert_eq!(first.iter().find(|(i, _)| *i == 2), Some(&(2, 100.0)));
    // Later pushes follow the curve upwards
    let cutoffs: Vec<f64> = first.iter().filter(|(i, _)| *i == 2).map(|(_, v)| *v).collect();
    assert!(cutoffs.len() > 1);
    assert!(cutoffs.windows(2).all(|w| w[1] >= w[0]));

    let second = session.engine().params_for(2);
    assert_eq!(second.iter().find(|(i, _)| *i == 2), Some(&(2, 200.0)));
}

#[test]
fn test_history_is_bounded() {
    let (mut session, _clock) = new_session();
    let clip = create_clip(&mut session, "sine", &[]);
    for i in 0..60 {
        session
            .execute(&mut RenameClipCommand::new(clip, &format!("take {}", i)))
            .unwrap();
    }
    assert_eq!(session.history().undo_count(), 50);

    while session.undo().is_some() {}
    // The oldest surviving state is after the 10th rename
    assert_eq!(session.state().clip(clip).unwrap().name, "take 9");
}
