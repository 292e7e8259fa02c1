// Clip - Reusable collection of notes
// A clip is placed on the arrangement through clip instances, which share its notes

use crate::sequencer::automation::AutomationCurve;
use crate::sequencer::note::{Note, NoteId};
use crate::sequencer::timeline::Quantizer;
use serde::{Deserialize, Serialize};

/// Unique identifier for clips
pub type ClipId = u64;

/// Default clip length in seconds (one 4/4 bar at 120 BPM)
pub const DEFAULT_CLIP_DURATION: f64 = 2.0;

/// A clip containing notes and automation curves
///
/// `duration` is always at least the end of the last note: it grows automatically when notes
/// are added or moved but never shrinks on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Unique identifier
    pub id: ClipId,

    /// Clip name
    pub name: String,

    duration: f64,

    /// Primary voice type
    pub synth_name: String,

    /// Declared parameter schema
    pub param_names: Vec<String>,

    /// External text representation, if the clip was ever saved or loaded
    pub file_path: Option<String>,

    is_dirty: bool,

    /// Notes sorted by start time
    notes: Vec<Note>,

    automation: Vec<AutomationCurve>,
}

impl Clip {
    /// Create a new empty clip
    pub fn new(
        id: ClipId,
        name: impl Into<String>,
        synth_name: impl Into<String>,
        param_names: Vec<String>,
        duration: f64,
    ) -> Self {
        assert!(duration > 0.0, "Clip duration must be > 0");

        Self {
            id,
            name: name.into(),
            duration,
            synth_name: synth_name.into(),
            param_names,
            file_path: None,
            is_dirty: true,
            notes: Vec::new(),
            automation: Vec::new(),
        }
    }

    /// Create a new clip with the default duration
    pub fn new_default(id: ClipId, name: impl Into<String>, synth_name: impl Into<String>) -> Self {
        Self::new(id, name, synth_name, Vec::new(), DEFAULT_CLIP_DURATION)
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// End time of the last-ending note (0 for an empty clip)
    pub fn content_end(&self) -> f64 {
        self.notes
            .iter()
            .map(Note::end_time)
            .fold(0.0, f64::max)
    }

    /// Set the duration explicitly. Never goes below the content end.
    /// Automation points are re-clamped to the new range.
    pub fn set_duration(&mut self, duration: f64) {
        let duration = duration.max(self.content_end());
        if duration <= 0.0 || duration == self.duration {
            return;
        }
        self.duration = duration;
        for curve in &mut self.automation {
            curve.clamp_to(duration);
        }
        self.is_dirty = true;
    }

    fn extend_to_fit(&mut self, end_time: f64) {
        if end_time > self.duration {
            self.duration = end_time;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Record a successful save/load at `path`
    pub fn mark_saved(&mut self, path: impl Into<String>) {
        self.file_path = Some(path.into());
        self.is_dirty = false;
    }

    /// Get all notes
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Add a note to the clip
    pub fn add_note(&mut self, note: Note) {
        self.extend_to_fit(note.end_time());

        // Keep notes sorted by start time for efficient playback
        let insert_pos = self
            .notes
            .partition_point(|n| n.start_time <= note.start_time);

        self.notes.insert(insert_pos, note);
        self.is_dirty = true;
    }

    /// Remove a note by ID
    pub fn remove_note(&mut self, note_id: NoteId) -> Option<Note> {
        let index = self.notes.iter().position(|n| n.id == note_id)?;
        self.is_dirty = true;
        Some(self.notes.remove(index))
    }

    /// Get a note by ID
    pub fn get_note(&self, note_id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == note_id)
    }

    /// Move a note to a new start time (clamped to >= 0). Returns false if not found.
    pub fn move_note(&mut self, note_id: NoteId, start_time: f64) -> bool {
        let Some(mut note) = self.remove_note(note_id) else {
            return false;
        };
        note.start_time = start_time.max(0.0);
        self.add_note(note);
        true
    }

    /// Change a note's duration. Returns false if not found or duration <= 0.
    pub fn resize_note(&mut self, note_id: NoteId, duration: f64) -> bool {
        if !(duration > 0.0) {
            return false;
        }
        let Some(note) = self.notes.iter_mut().find(|n| n.id == note_id) else {
            return false;
        };
        note.duration = duration;
        let end = note.end_time();
        self.extend_to_fit(end);
        self.is_dirty = true;
        true
    }

    /// Set one parameter of a note. Returns false if not found.
    pub fn set_note_param(&mut self, note_id: NoteId, index: usize, value: f64) -> bool {
        let Some(note) = self.notes.iter_mut().find(|n| n.id == note_id) else {
            return false;
        };
        note.set_param(index, value);
        self.is_dirty = true;
        true
    }

    /// Mute or unmute a note. Returns false if not found.
    pub fn set_note_muted(&mut self, note_id: NoteId, muted: bool) -> bool {
        let Some(note) = self.notes.iter_mut().find(|n| n.id == note_id) else {
            return false;
        };
        if note.muted != muted {
            note.muted = muted;
            self.is_dirty = true;
        }
        true
    }

    /// Selection is UI state: it neither dirties the clip nor enters undo history
    pub fn set_note_selected(&mut self, note_id: NoteId, selected: bool) -> bool {
        match self.notes.iter_mut().find(|n| n.id == note_id) {
            Some(note) => {
                note.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn clear_note_selection(&mut self) {
        for note in &mut self.notes {
            note.selected = false;
        }
    }

    pub fn selected_note_ids(&self) -> Vec<NoteId> {
        self.notes
            .iter()
            .filter(|n| n.selected)
            .map(|n| n.id)
            .collect()
    }

    /// Find notes overlapping a clip-relative time range
    pub fn notes_in_range(&self, start: f64, end: f64) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| n.start_time < end && n.end_time() > start)
            .collect()
    }

    /// Snap every note start to the quantizer grid
    pub fn quantize_all(&mut self, quantizer: &Quantizer) {
        for note in self.notes.iter_mut() {
            note.start_time = quantizer.snap(note.start_time).max(0.0);
        }

        // Re-sort after quantization
        self.notes
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        let end = self.content_end();
        self.extend_to_fit(end);
        self.is_dirty = true;
    }

    /// Get the number of notes
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Check if clip is empty
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn automation(&self) -> &[AutomationCurve] {
        &self.automation
    }

    pub fn automation_curve(&self, param_name: &str) -> Option<&AutomationCurve> {
        self.automation
            .iter()
            .find(|c| c.param_name() == param_name)
    }

    /// Add an automation point, creating the curve on first use.
    /// Returns the index of the point in its curve.
    pub fn add_automation_point(&mut self, param_name: &str, time: f64, value: f64) -> usize {
        let duration = self.duration;
        let index = match self
            .automation
            .iter_mut()
            .find(|c| c.param_name() == param_name)
        {
            Some(curve) => curve.insert_point(time, value, duration),
            None => {
                let mut curve = AutomationCurve::new(param_name);
                let index = curve.insert_point(time, value, duration);
                self.automation.push(curve);
                index
            }
        };
        self.is_dirty = true;
        index
    }

    /// Move an automation point. Returns its new index.
    pub fn move_automation_point(
        &mut self,
        param_name: &str,
        index: usize,
        time: f64,
        value: f64,
    ) -> Option<usize> {
        let duration = self.duration;
        let curve = self
            .automation
            .iter_mut()
            .find(|c| c.param_name() == param_name)?;
        let new_index = curve.move_point(index, time, value, duration)?;
        self.is_dirty = true;
        Some(new_index)
    }

    /// Remove an automation point. A curve left without points is removed.
    pub fn remove_automation_point(&mut self, param_name: &str, index: usize) -> bool {
        let Some(pos) = self
            .automation
            .iter()
            .position(|c| c.param_name() == param_name)
        else {
            return false;
        };
        if self.automation[pos].remove_point(index).is_none() {
            return false;
        }
        if self.automation[pos].is_empty() {
            self.automation.remove(pos);
        }
        self.is_dirty = true;
        true
    }

    /// Evaluate a parameter's automation at a clip-relative time
    pub fn automation_value_at(&self, param_name: &str, time: f64) -> Option<f64> {
        self.automation_curve(param_name)?.value_at(time)
    }

    /// Deep copy with fresh identity: new clip ID, new note IDs, no file path, dirty
    pub fn duplicate(
        &self,
        id: ClipId,
        name: impl Into<String>,
        mut next_note_id: impl FnMut() -> NoteId,
    ) -> Clip {
        let mut copy = self.clone();
        copy.id = id;
        copy.name = name.into();
        copy.file_path = None;
        copy.is_dirty = true;
        for note in &mut copy.notes {
            note.id = next_note_id();
            note.selected = false;
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::ids::IdGenerator;
    use crate::sequencer::timeline::{SnapMode, Tempo};

    fn note(id: NoteId, start: f64, duration: f64) -> Note {
        Note::new(id, "sine", start, duration, vec![440.0, 0.8], Vec::new())
    }

    #[test]
    fn test_clip_creation() {
        let clip = Clip::new_default(1, "Lead", "sine");

        assert_eq!(clip.id, 1);
        assert_eq!(clip.name, "Lead");
        assert_eq!(clip.duration(), DEFAULT_CLIP_DURATION);
        assert!(clip.is_empty());
        assert!(clip.is_dirty());
        assert!(clip.file_path.is_none());
    }

    #[test]
    fn test_add_note_extends_duration() {
        let mut clip = Clip::new_default(1, "Lead", "sine");
        clip.add_note(note(1, 1.5, 1.0));

        assert_eq!(clip.note_count(), 1);
        assert!(clip.duration() >= 2.5);
    }

    #[test]
    fn test_duration_never_auto_shrinks() {
        let mut clip = Clip::new_default(1, "Lead", "sine");
        clip.add_note(note(1, 3.0, 1.0));
        clip.remove_note(1);

        assert_eq!(clip.duration(), 4.0);
    }

    #[test]
    fn test_set_duration_clamps_to_content() {
        let mut clip = Clip::new_default(1, "Lead", "sine");
        clip.add_note(note(1, 0.0, 1.5));

        clip.set_duration(0.5);
        assert_eq!(clip.duration(), 1.5);

        clip.set_duration(8.0);
        assert_eq!(clip.duration(), 8.0);
    }

    #[test]
    fn test_notes_sorted_by_start_time() {
        let mut clip = Clip::new_default(1, "Lead", "sine");
        clip.add_note(note(1, 1.0, 0.25));
        clip.add_note(note(2, 0.5, 0.25));
        clip.add_note(note(3, 0.0, 0.25));

        let starts: Vec<f64> = clip.notes().iter().map(|n| n.start_time).collect();
        assert_eq!(starts, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_move_note_resorts_and_extends() {
        let mut clip = Clip::new_default(1, "Lead", "sine");
        clip.add_note(note(1, 0.0, 0.5));
        clip.add_note(note(2, 1.0, 0.5));

        assert!(clip.move_note(1, 3.0));
        assert_eq!(clip.notes()[1].id, 1);
        assert_eq!(clip.duration(), 3.5);

        assert!(clip.move_note(1, -2.0));
        assert_eq!(clip.get_note(1).map(|n| n.start_time), Some(0.0));

        assert!(!clip.move_note(99, 0.0));
    }

    #[test]
    fn test_resize_note() {
        let mut clip = Clip::new_default(1, "Lead", "sine");
        clip.add_note(note(1, 1.0, 0.5));

        assert!(clip.resize_note(1, 2.0));
        assert_eq!(clip.duration(), 3.0);
        assert!(!clip.resize_note(1, 0.0));
        assert!(!clip.resize_note(42, 1.0));
    }

    #[test]
    fn test_selection_does_not_dirty() {
        let mut clip = Clip::new_default(1, "Lead", "sine");
        clip.add_note(note(1, 0.0, 0.5));
        clip.mark_saved("clips/lead.seq");

        assert!(clip.set_note_selected(1, true));
        assert_eq!(clip.selected_note_ids(), vec![1]);
        assert!(!clip.is_dirty());

        clip.clear_note_selection();
        assert!(clip.selected_note_ids().is_empty());
    }

    #[test]
    fn test_edits_mark_dirty() {
        let mut clip = Clip::new_default(1, "Lead", "sine");
        clip.add_note(note(1, 0.0, 0.5));
        clip.mark_saved("clips/lead.seq");
        assert!(!clip.is_dirty());

        clip.set_note_param(1, 0, 220.0);
        assert!(clip.is_dirty());
        assert_eq!(clip.get_note(1).map(|n| n.frequency), Some(220.0));
    }

    #[test]
    fn test_notes_in_range() {
        let mut clip = Clip::new_default(1, "Lead", "sine");
        clip.add_note(note(1, 0.0, 0.25));
        clip.add_note(note(2, 0.5, 0.25));
        clip.add_note(note(3, 1.0, 0.25));

        assert_eq!(clip.notes_in_range(0.0, 0.3).len(), 1);
        assert_eq!(clip.notes_in_range(0.4, 0.9).len(), 1);
        assert_eq!(clip.notes_in_range(0.0, 2.0).len(), 3);
    }

    #[test]
    fn test_quantize_all() {
        let mut clip = Clip::new_default(1, "Lead", "sine");
        clip.add_note(note(1, 0.26, 0.1));
        clip.add_note(note(2, 0.49, 0.1));

        let quantizer = Quantizer::new(Tempo::new(120.0), SnapMode::Beat);
        clip.quantize_all(&quantizer);

        let starts: Vec<f64> = clip.notes().iter().map(|n| n.start_time).collect();
        assert_eq!(starts, vec![0.5, 0.5]);
    }

    #[test]
    fn test_automation_lifecycle() {
        let mut clip = Clip::new_default(1, "Lead", "sine");
        clip.add_automation_point("cutoff", 0.0, 100.0);
        clip.add_automation_point("cutoff", 1.0, 200.0);

        assert_eq!(clip.automation().len(), 1);
        assert_eq!(clip.automation_value_at("cutoff", 0.5), Some(150.0));

        assert_eq!(clip.move_automation_point("cutoff", 0, 9.0, 300.0), Some(1));
        let curve = clip.automation_curve("cutoff").map(|c| c.points().to_vec());
        assert_eq!(curve.map(|p| p[1].time), Some(DEFAULT_CLIP_DURATION));

        assert!(clip.remove_automation_point("cutoff", 0));
        assert!(clip.remove_automation_point("cutoff", 0));
        assert!(clip.automation_curve("cutoff").is_none());
        assert!(!clip.remove_automation_point("cutoff", 0));
    }

    #[test]
    fn test_duplicate_gets_fresh_identity() {
        let mut ids = IdGenerator::new();
        let mut clip = Clip::new_default(ids.next_id(), "Lead", "sine");
        clip.add_note(note(ids.next_id(), 0.0, 0.5));
        clip.mark_saved("clips/lead.seq");

        let copy = clip.duplicate(ids.next_id(), "Lead copy", || ids.next_id());

        assert_ne!(copy.id, clip.id);
        assert_ne!(copy.notes()[0].id, clip.notes()[0].id);
        assert!(copy.file_path.is_none());
        assert!(copy.is_dirty());
        assert_eq!(copy.note_count(), 1);
    }
}
