// Project manager for loading and saving clips and arrangements

use crate::command::state::SequencerState;
use crate::config::SequencerConfig;
use crate::project::document::{
    ArrangementDocument, ClipInstanceDocument, TrackDocument, Viewport,
};
use crate::project::sequence_text::{self, ClipImport, ParseOptions};
use crate::project::store::{FileStore, join_path};
use crate::sequencer::clip::{Clip, ClipId};
use crate::sequencer::ids::IdGenerator;
use crate::sequencer::timeline::{SnapMode, Tempo};
use crate::sequencer::transport::Transport;
use std::collections::HashMap;

/// Project error types
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid arrangement document: {0}")]
    InvalidDocument(String),
}

/// Transport and view settings stored with an arrangement
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSettings {
    pub bpm: f64,
    pub loop_enabled: bool,
    pub loop_start: f64,
    pub loop_end: f64,
    pub snap_mode: SnapMode,
    pub viewport: Viewport,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            loop_enabled: false,
            loop_start: 0.0,
            loop_end: Transport::DEFAULT_LOOP_END,
            snap_mode: SnapMode::default(),
            viewport: Viewport::default(),
        }
    }
}

/// Outcome of a successful project save
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub document_path: String,
    pub clips_written: usize,
}

/// Outcome of a project load. Clip files that could not be read are reported in `warnings`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub settings: ProjectSettings,
    pub clips_loaded: usize,
    pub instances_placed: usize,
    pub warnings: Vec<String>,
}

/// Project manager - handles saving/loading clips and arrangements through a `FileStore`
#[derive(Debug, Clone)]
pub struct ProjectManager {
    parse_options: ParseOptions,
    clips_folder: String,
    arrangement_file: String,
    clip_extension: String,
}

impl ProjectManager {
    pub fn new(config: &SequencerConfig) -> Self {
        Self {
            parse_options: ParseOptions {
                orphan_duration_beats: config.orphan_duration_beats,
                default_synth_name: config.default_synth_name.clone(),
            },
            clips_folder: config.clips_folder.clone(),
            arrangement_file: config.arrangement_file.clone(),
            clip_extension: config.clip_extension.clone(),
        }
    }

    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse_options
    }

    /// Write a clip as sequence text. The clip is marked saved only if the write succeeds.
    pub fn save_clip<S: FileStore + ?Sized>(
        &self,
        store: &mut S,
        clip: &mut Clip,
        path: &str,
        bpm: f64,
    ) -> Result<(), ProjectError> {
        let text = sequence_text::serialize(clip, bpm);
        store
            .write_file(path, &text)
            .map_err(|source| ProjectError::Io {
                path: path.to_string(),
                source,
            })?;
        clip.mark_saved(path);
        log::debug!("Saved clip {} to {}", clip.name, path);
        Ok(())
    }

    /// Read a clip file. The clip gets fresh IDs from `ids` and is marked saved at `path`.
    pub fn load_clip<S: FileStore + ?Sized>(
        &self,
        store: &S,
        path: &str,
        ids: &mut IdGenerator,
    ) -> Result<ClipImport, ProjectError> {
        let text = store
            .read_file(path)
            .ok_or_else(|| ProjectError::NotFound(path.to_string()))?;

        let clip_id = ids.next_id();
        let mut import = sequence_text::clip_from_text(
            &text,
            clip_id,
            file_stem(path),
            &self.parse_options,
            || ids.next_id(),
        );
        import.clip.mark_saved(path);

        if import.skipped_lines > 0 {
            log::warn!(
                "{}: skipped {} unparsable line(s)",
                path,
                import.skipped_lines
            );
        }
        Ok(import)
    }

    /// Save every unsaved or modified clip, then the arrangement document
    ///
    /// Clips without a file get one under the clips folder. On the first failed write the
    /// error is returned: clips not yet written stay dirty and the document is not written.
    pub fn save_project<S: FileStore + ?Sized>(
        &self,
        store: &mut S,
        project_dir: &str,
        state: &mut SequencerState,
        settings: &ProjectSettings,
    ) -> Result<SaveReport, ProjectError> {
        let clips_dir = join_path(project_dir, &self.clips_folder);
        for folder in [project_dir, clips_dir.as_str()] {
            if folder.is_empty() {
                continue;
            }
            store
                .create_folder(folder)
                .map_err(|source| ProjectError::Io {
                    path: folder.to_string(),
                    source,
                })?;
        }

        let mut clips_written = 0;
        for clip in state.clips.iter_mut() {
            let path = match &clip.file_path {
                Some(_) if !clip.is_dirty() => continue,
                Some(path) => path.clone(),
                None => join_path(
                    &clips_dir,
                    &format!("{}-{}.{}", slug(&clip.name), clip.id, self.clip_extension),
                ),
            };
            self.save_clip(store, clip, &path, settings.bpm)?;
            clips_written += 1;
        }

        let document = self.capture_document(project_dir, state, settings)?;
        let json = document.to_json()?;
        let document_path = join_path(project_dir, &self.arrangement_file);
        store
            .write_file(&document_path, &json)
            .map_err(|source| ProjectError::Io {
                path: document_path.clone(),
                source,
            })?;

        log::info!(
            "Saved project to {} ({} clip file(s) written)",
            document_path,
            clips_written
        );
        Ok(SaveReport {
            document_path,
            clips_written,
        })
    }

    fn capture_document(
        &self,
        project_dir: &str,
        state: &SequencerState,
        settings: &ProjectSettings,
    ) -> Result<ArrangementDocument, ProjectError> {
        let arrangement = &state.arrangement;

        let tracks = arrangement
            .tracks()
            .iter()
            .map(|track| TrackDocument {
                synth_name: track.synth_name.clone(),
                name: track.name.clone(),
                color: track.color,
                muted: track.muted,
                solo: track.solo,
                expanded: track.expanded,
                automation_lanes: track.automation_lanes.clone(),
            })
            .collect();

        let mut clip_instances = Vec::with_capacity(arrangement.instances().len());
        for instance in arrangement.instances() {
            let path = state
                .clip(instance.clip_id)
                .and_then(|clip| clip.file_path.as_deref())
                .ok_or_else(|| {
                    ProjectError::InvalidDocument(format!(
                        "clip instance {} has no saved clip",
                        instance.id
                    ))
                })?;
            let track_synth_name = arrangement
                .track(instance.track_index)
                .and_then(|t| t.synth_name.clone());
            let track_index = track_synth_name
                .is_none()
                .then_some(instance.track_index);

            clip_instances.push(ClipInstanceDocument {
                file_path: relative_path(project_dir, path),
                track_synth_name,
                track_index,
                start_time: instance.start_time,
            });
        }

        Ok(ArrangementDocument {
            bpm: settings.bpm,
            loop_enabled: settings.loop_enabled,
            loop_start: settings.loop_start,
            loop_end: settings.loop_end,
            viewport: settings.viewport,
            tracks,
            clip_instances,
            snap_mode: Some(settings.snap_mode),
            saved_at: Some(chrono::Utc::now()),
        })
    }

    /// Replace the model with the arrangement stored in `project_dir`
    ///
    /// Tracks are re-created by synth name (deduplicated). Each referenced clip file is read
    /// once; instances of the same file share one clip. The model is only touched once the
    /// document itself has been read and validated.
    pub fn load_project<S: FileStore + ?Sized>(
        &self,
        store: &S,
        project_dir: &str,
        state: &mut SequencerState,
    ) -> Result<LoadReport, ProjectError> {
        let document_path = join_path(project_dir, &self.arrangement_file);
        let text = store
            .read_file(&document_path)
            .ok_or_else(|| ProjectError::NotFound(document_path.clone()))?;
        let document = ArrangementDocument::from_json(&text)?;

        if Tempo::try_new(document.bpm).is_none() {
            return Err(ProjectError::InvalidDocument(format!(
                "bpm {} out of range",
                document.bpm
            )));
        }

        let mut warnings = Vec::new();
        let defaults = ProjectSettings::default();
        let (loop_start, loop_end) = if document.loop_start >= 0.0
            && document.loop_end > document.loop_start
        {
            (document.loop_start, document.loop_end)
        } else {
            warnings.push(format!(
                "Invalid loop region [{}, {}), using default",
                document.loop_start, document.loop_end
            ));
            (defaults.loop_start, defaults.loop_end)
        };

        state.clear();

        // Document track position -> model track index
        let mut track_map = Vec::with_capacity(document.tracks.len());
        for track_doc in &document.tracks {
            let before = state.arrangement.track_count();
            let index = match &track_doc.synth_name {
                Some(synth) => state
                    .arrangement
                    .ensure_track_for_synth(synth, &mut state.ids),
                None => state
                    .arrangement
                    .push_track(track_doc.name.clone(), None, &mut state.ids),
            };
            if state.arrangement.track_count() > before {
                if let Some(track) = state.arrangement.track_mut(index) {
                    track.name = track_doc.name.clone();
                    track.color = track_doc.color;
                    track.muted = track_doc.muted;
                    track.solo = track_doc.solo;
                    track.expanded = track_doc.expanded;
                    track.automation_lanes = track_doc.automation_lanes.clone();
                }
            } else {
                log::debug!("Merged duplicate track {}", track_doc.name);
            }
            track_map.push(index);
        }

        let mut loaded: HashMap<String, Option<ClipId>> = HashMap::new();
        let mut clips_loaded = 0;
        let mut instances_placed = 0;

        for instance_doc in &document.clip_instances {
            let clip_id = match loaded.get(&instance_doc.file_path) {
                Some(cached) => *cached,
                None => {
                    let path = join_path(project_dir, &instance_doc.file_path);
                    let result = match self.load_clip(store, &path, &mut state.ids) {
                        Ok(import) => {
                            if import.skipped_lines > 0 {
                                warnings.push(format!(
                                    "{}: skipped {} unparsable line(s)",
                                    path, import.skipped_lines
                                ));
                            }
                            clips_loaded += 1;
                            Some(state.insert_clip(import.clip))
                        }
                        Err(e) => {
                            log::warn!("Could not load clip: {}", e);
                            warnings.push(e.to_string());
                            None
                        }
                    };
                    loaded.insert(instance_doc.file_path.clone(), result);
                    result
                }
            };
            let Some(clip_id) = clip_id else {
                continue;
            };

            let track_index = match (&instance_doc.track_synth_name, instance_doc.track_index) {
                (Some(synth), _) => state
                    .arrangement
                    .ensure_track_for_synth(synth, &mut state.ids),
                (None, Some(position)) => match track_map.get(position) {
                    Some(index) => *index,
                    None => {
                        state.arrangement.ensure_track(position, &mut state.ids);
                        position
                    }
                },
                (None, None) => {
                    let synth = state
                        .clip(clip_id)
                        .map(|c| c.synth_name.clone())
                        .unwrap_or_else(|| self.parse_options.default_synth_name.clone());
                    state
                        .arrangement
                        .ensure_track_for_synth(&synth, &mut state.ids)
                }
            };

            state.arrangement.add_clip_instance(
                clip_id,
                track_index,
                instance_doc.start_time.max(0.0),
                &mut state.ids,
            );
            instances_placed += 1;
        }

        for index in 0..state.arrangement.track_count() {
            state.sync_track_lanes(index);
        }

        log::info!(
            "Loaded project {} ({} clips, {} instances, {} warning(s))",
            document_path,
            clips_loaded,
            instances_placed,
            warnings.len()
        );

        Ok(LoadReport {
            settings: ProjectSettings {
                bpm: document.bpm,
                loop_enabled: document.loop_enabled,
                loop_start,
                loop_end,
                snap_mode: document.snap_mode.unwrap_or_default(),
                viewport: document.viewport,
            },
            clips_loaded,
            instances_placed,
            warnings,
        })
    }
}

impl Default for ProjectManager {
    fn default() -> Self {
        Self::new(&SequencerConfig::default())
    }
}

/// File name without folder and extension
fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Lowercase file-name-safe version of a clip name
fn slug(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if slug.is_empty() {
        "clip".to_string()
    } else {
        slug
    }
}

fn relative_path(project_dir: &str, path: &str) -> String {
    let dir = project_dir.trim_end_matches('/');
    if dir.is_empty() {
        return path.to_string();
    }
    path.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
        .to_string()
}
