// Session - Ties the model, undo history, transport and scheduler together
//
// The host owns a Session, forwards edits as commands, and calls `tick()` from a periodic
// callback while `is_tick_scheduled()` is true. Every operation that invalidates the
// playhead (stop, pause, seek, loop wrap) force-releases the sounding voices.

use crate::command::manager::CommandManager;
use crate::command::state::SequencerState;
use crate::command::trait_def::{CommandResult, UndoableCommand};
use crate::config::SequencerConfig;
use crate::messaging::notification::{Notification, NotificationCategory, NotificationQueue};
use crate::project::document::Viewport;
use crate::project::manager::{LoadReport, ProjectError, ProjectManager, ProjectSettings, SaveReport};
use crate::project::store::FileStore;
use crate::sequencer::arrangement::InstanceId;
use crate::sequencer::clip::{Clip, ClipId};
use crate::sequencer::clock::Clock;
use crate::sequencer::note::NoteId;
use crate::sequencer::player::{PlaybackScheduler, TickReport};
use crate::sequencer::timeline::{Quantizer, SnapMode, Tempo};
use crate::sequencer::transport::{Transport, TransportState};
use crate::synth::engine::SynthEngine;

pub struct Session<E: SynthEngine, C: Clock> {
    state: SequencerState,
    history: CommandManager,
    transport: Transport,
    scheduler: PlaybackScheduler,
    engine: E,
    clock: C,
    projects: ProjectManager,
    config: SequencerConfig,
    notifications: NotificationQueue,
    viewport: Viewport,
}

impl<E: SynthEngine, C: Clock> Session<E, C> {
    pub fn new(engine: E, clock: C) -> Self {
        Self::with_config(engine, clock, SequencerConfig::default())
    }

    pub fn with_config(engine: E, clock: C, config: SequencerConfig) -> Self {
        let tempo = config.tempo();
        let mut state = SequencerState::new(Quantizer::new(tempo, config.snap_mode));
        state.default_clip_duration = config.default_clip_duration;

        let mut transport = Transport::new();
        transport.set_tempo(tempo);

        Self {
            state,
            history: CommandManager::with_capacity(config.history_capacity),
            transport,
            scheduler: PlaybackScheduler::new(),
            engine,
            clock,
            projects: ProjectManager::new(&config),
            config,
            notifications: NotificationQueue::default(),
            viewport: Viewport::default(),
        }
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn history(&self) -> &CommandManager {
        &self.history
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    // ---- Editing ----

    /// Run an undo-worthy edit. Failures are logged, reported as a notification and leave
    /// the model unchanged.
    pub fn execute(&mut self, command: &mut dyn UndoableCommand) -> CommandResult<()> {
        let result = self.history.execute(command, &mut self.state);
        if let Err(e) = &result {
            log::warn!("{} failed: {}", command.description(), e);
            self.notifications.push(Notification::warning(
                NotificationCategory::Editing,
                format!("{}: {}", command.description(), e),
            ));
        }
        result
    }

    /// Undo the last edit. `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<String> {
        self.history.undo(&mut self.state)
    }

    pub fn redo(&mut self) -> Option<String> {
        self.history.redo(&mut self.state)
    }

    /// Select a clip instance (not recorded in history)
    pub fn select_instance(&mut self, instance_id: InstanceId, additive: bool) -> bool {
        self.state.arrangement.select_instance(instance_id, additive)
    }

    pub fn clear_instance_selection(&mut self) {
        self.state.arrangement.clear_selection();
    }

    /// Select or deselect a note (not recorded in history)
    pub fn select_note(&mut self, clip_id: ClipId, note_id: NoteId, selected: bool) -> bool {
        self.state
            .clip_mut(clip_id)
            .is_some_and(|clip| clip.set_note_selected(note_id, selected))
    }

    /// Rubber-band selection: select every note overlapping `[start, end)` of a clip.
    /// Returns how many notes the range hit.
    pub fn select_notes_in_range(
        &mut self,
        clip_id: ClipId,
        start: f64,
        end: f64,
        additive: bool,
    ) -> usize {
        let Some(clip) = self.state.clip_mut(clip_id) else {
            return 0;
        };
        if !additive {
            clip.clear_note_selection();
        }
        let hits: Vec<NoteId> = clip
            .notes_in_range(start, end)
            .iter()
            .map(|note| note.id)
            .collect();
        for note_id in &hits {
            clip.set_note_selected(*note_id, true);
        }
        hits.len()
    }

    pub fn clear_note_selection(&mut self, clip_id: ClipId) {
        if let Some(clip) = self.state.clip_mut(clip_id) {
            clip.clear_note_selection();
        }
    }

    pub fn selected_notes(&self, clip_id: ClipId) -> Vec<NoteId> {
        self.state
            .clip(clip_id)
            .map(Clip::selected_note_ids)
            .unwrap_or_default()
    }

    /// Notes sounding at a clip-relative time (end exclusive), for hit testing
    pub fn notes_at(&self, clip_id: ClipId, time: f64) -> Vec<NoteId> {
        self.state
            .clip(clip_id)
            .map(|clip| {
                clip.notes()
                    .iter()
                    .filter(|note| note.contains_time(time))
                    .map(|note| note.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    // ---- Transport ----

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_tick_scheduled(&self) -> bool {
        self.transport.is_tick_scheduled()
    }

    /// Playhead position now
    pub fn current_time(&self) -> f64 {
        self.transport.current_time(self.clock.now())
    }

    pub fn play(&mut self) -> bool {
        let started = self.transport.play(self.clock.now());
        if started {
            log::debug!("Play from {:.3}s", self.transport.position());
        }
        started
    }

    pub fn pause(&mut self) {
        if self.transport.pause(self.clock.now()) {
            self.scheduler.release_all(&mut self.engine);
        }
    }

    pub fn stop(&mut self) {
        self.transport.stop();
        self.scheduler.release_all(&mut self.engine);
    }

    pub fn toggle_play(&mut self) {
        if self.transport.toggle_play(self.clock.now()) {
            self.scheduler.release_all(&mut self.engine);
        }
    }

    /// Seek. Sounding voices are released if playing.
    pub fn set_position(&mut self, time: f64) {
        if self.transport.set_position(time, self.clock.now()) {
            self.scheduler.release_all(&mut self.engine);
        }
    }

    /// Advance the playhead and trigger/release voices. `None` when not playing.
    pub fn tick(&mut self) -> Option<TickReport> {
        let now = self.clock.now();
        let advance = self.transport.advance(now)?;

        let mut forced = 0;
        if advance.wrapped {
            forced = self.scheduler.release_all(&mut self.engine);
            log::debug!("Loop wrap to {:.3}s", advance.current_time);
        }

        let mut report = self.scheduler.process(
            &self.state.arrangement,
            &self.state.clips,
            advance.prev_time,
            advance.current_time,
            now,
            &mut self.engine,
        );
        report.released += forced;
        report.wrapped = advance.wrapped;
        Some(report)
    }

    /// Fire release timers that came due between ticks
    pub fn poll_releases(&mut self) -> usize {
        self.scheduler
            .poll_releases(self.clock.now(), &mut self.engine)
    }

    /// Wall-clock time of the next pending release
    pub fn next_release_due(&self) -> Option<f64> {
        self.scheduler.pending_releases().next_due()
    }

    pub fn tempo(&self) -> Tempo {
        *self.transport.tempo()
    }

    /// Change the tempo of the transport and the snap grid. Out-of-range values are rejected.
    pub fn set_bpm(&mut self, bpm: f64) -> bool {
        match Tempo::try_new(bpm) {
            Some(tempo) => {
                self.transport.set_tempo(tempo);
                self.state.quantizer.set_tempo(tempo);
                true
            }
            None => {
                log::warn!("Rejected tempo {} BPM", bpm);
                false
            }
        }
    }

    pub fn snap_mode(&self) -> SnapMode {
        self.state.quantizer.mode()
    }

    pub fn set_snap_mode(&mut self, mode: SnapMode) {
        self.state.quantizer.set_mode(mode);
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.transport.set_loop_enabled(enabled);
    }

    pub fn set_loop_region(&mut self, start: f64, end: f64) -> bool {
        self.transport.set_loop_region(start, end)
    }

    // ---- Persistence ----

    fn project_settings(&self) -> ProjectSettings {
        let (loop_start, loop_end) = self.transport.loop_region();
        ProjectSettings {
            bpm: self.transport.tempo().bpm(),
            loop_enabled: self.transport.is_loop_enabled(),
            loop_start,
            loop_end,
            snap_mode: self.state.quantizer.mode(),
            viewport: self.viewport,
        }
    }

    fn report_failure(&mut self, action: &str, error: &ProjectError) {
        log::warn!("{} failed: {}", action, error);
        self.notifications.push(Notification::error(
            NotificationCategory::Persistence,
            format!("{} failed: {}", action, error),
        ));
    }

    /// Write one clip to `path`
    pub fn save_clip<S: FileStore + ?Sized>(
        &mut self,
        store: &mut S,
        clip_id: ClipId,
        path: &str,
    ) -> Result<(), ProjectError> {
        let bpm = self.transport.tempo().bpm();
        let Some(clip) = self.state.clip_mut(clip_id) else {
            let error = ProjectError::NotFound(format!("clip {}", clip_id));
            self.report_failure("Save clip", &error);
            return Err(error);
        };
        let result = self.projects.save_clip(store, clip, path, bpm);
        if let Err(e) = &result {
            self.report_failure("Save clip", e);
        }
        result
    }

    /// Add a clip file to the clip pool (undoable)
    pub fn load_clip<S: FileStore + ?Sized>(
        &mut self,
        store: &S,
        path: &str,
    ) -> Result<ClipId, ProjectError> {
        match self.projects.load_clip(store, path, &mut self.state.ids) {
            Ok(import) => {
                self.history.checkpoint("Load Clip", &self.state);
                Ok(self.state.insert_clip(import.clip))
            }
            Err(e) => {
                self.report_failure("Load clip", &e);
                Err(e)
            }
        }
    }

    pub fn save_project<S: FileStore + ?Sized>(
        &mut self,
        store: &mut S,
        project_dir: &str,
    ) -> Result<SaveReport, ProjectError> {
        let settings = self.project_settings();
        let result = self
            .projects
            .save_project(store, project_dir, &mut self.state, &settings);
        match &result {
            Ok(report) => self.notifications.push(Notification::info(
                NotificationCategory::Persistence,
                format!("Saved {}", report.document_path),
            )),
            Err(e) => self.report_failure("Save project", e),
        }
        result
    }

    /// Replace the session content with a saved project. Playback stops and history is cleared.
    pub fn load_project<S: FileStore + ?Sized>(
        &mut self,
        store: &S,
        project_dir: &str,
    ) -> Result<LoadReport, ProjectError> {
        self.stop();

        let report = match self.projects.load_project(store, project_dir, &mut self.state) {
            Ok(report) => report,
            Err(e) => {
                self.report_failure("Load project", &e);
                return Err(e);
            }
        };

        let settings = &report.settings;
        self.set_bpm(settings.bpm);
        self.set_snap_mode(settings.snap_mode);
        self.transport
            .set_loop_region(settings.loop_start, settings.loop_end);
        self.transport.set_loop_enabled(settings.loop_enabled);
        // Stopping again rewinds to the freshly loaded loop start
        self.transport.stop();
        self.viewport = settings.viewport;
        self.history.clear();

        for warning in &report.warnings {
            self.notifications.push(Notification::warning(
                NotificationCategory::Persistence,
                warning.clone(),
            ));
        }
        Ok(report)
    }

    /// Take every pending notification, oldest first
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }
}
