// Arrangement - Tracks and clip instances
// Clip instances reference clips by ID and tracks by position

use crate::sequencer::clip::ClipId;
use crate::sequencer::ids::IdGenerator;
use serde::{Deserialize, Serialize};

/// Unique identifier for tracks
pub type TrackId = u64;

/// Unique identifier for clip instances
pub type InstanceId = u64;

/// Default track color (RGB)
pub const DEFAULT_TRACK_COLOR: [u8; 3] = [100, 150, 200];

/// Display configuration of one automation lane under a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationLane {
    pub param_index: usize,
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub collapsed: bool,
}

impl AutomationLane {
    pub fn new(param_index: usize, name: impl Into<String>) -> Self {
        Self {
            param_index,
            name: name.into(),
            min: 0.0,
            max: 1.0,
            collapsed: true,
        }
    }
}

/// A lane in the arrangement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangementTrack {
    pub id: TrackId,
    pub name: String,
    pub color: [u8; 3],
    pub muted: bool,
    pub solo: bool,
    pub expanded: bool,
    /// Synth this track is locked to (deduplication key), `None` for generic tracks
    pub synth_name: Option<String>,
    pub automation_lanes: Vec<AutomationLane>,
}

impl ArrangementTrack {
    pub fn new(id: TrackId, name: impl Into<String>, synth_name: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: DEFAULT_TRACK_COLOR,
            muted: false,
            solo: false,
            expanded: false,
            synth_name,
            automation_lanes: Vec::new(),
        }
    }

    /// Replace the lane list with one lane per parameter name, keeping the settings of
    /// lanes that already existed for the same name
    pub fn sync_automation_lanes(&mut self, param_names: &[String]) {
        let previous = std::mem::take(&mut self.automation_lanes);
        self.automation_lanes = param_names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                match previous.iter().find(|lane| &lane.name == name) {
                    Some(existing) => AutomationLane {
                        param_index: index,
                        ..existing.clone()
                    },
                    None => AutomationLane::new(index, name.clone()),
                }
            })
            .collect();
    }
}

/// A placement of a clip on a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipInstance {
    pub id: InstanceId,
    pub clip_id: ClipId,
    pub track_index: usize,
    /// Absolute start time in seconds
    pub start_time: f64,
    pub selected: bool,
}

/// Tracks plus clip instances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arrangement {
    tracks: Vec<ArrangementTrack>,
    instances: Vec<ClipInstance>,
}

impl Arrangement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[ArrangementTrack] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&ArrangementTrack> {
        self.tracks.get(index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut ArrangementTrack> {
        self.tracks.get_mut(index)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn instances(&self) -> &[ClipInstance] {
        &self.instances
    }

    pub fn instance(&self, id: InstanceId) -> Option<&ClipInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    pub fn instances_on_track(&self, track_index: usize) -> impl Iterator<Item = &ClipInstance> {
        self.instances
            .iter()
            .filter(move |i| i.track_index == track_index)
    }

    /// Append a generic track and return its index
    pub fn push_track(
        &mut self,
        name: impl Into<String>,
        synth_name: Option<String>,
        ids: &mut IdGenerator,
    ) -> usize {
        self.tracks
            .push(ArrangementTrack::new(ids.next_id(), name, synth_name));
        self.tracks.len() - 1
    }

    /// Grow the track list with default tracks up to and including `index`
    pub fn ensure_track(&mut self, index: usize, ids: &mut IdGenerator) {
        while self.tracks.len() <= index {
            let name = format!("Track {}", self.tracks.len() + 1);
            self.push_track(name, None, ids);
        }
    }

    /// Index of the track locked to `synth_name`
    pub fn track_for_synth(&self, synth_name: &str) -> Option<usize> {
        self.tracks
            .iter()
            .position(|t| t.synth_name.as_deref() == Some(synth_name))
    }

    /// Return the track for `synth_name`, creating it if none exists
    pub fn ensure_track_for_synth(&mut self, synth_name: &str, ids: &mut IdGenerator) -> usize {
        if let Some(index) = self.track_for_synth(synth_name) {
            return index;
        }
        self.push_track(synth_name, Some(synth_name.to_string()), ids)
    }

    /// Place a clip. `start_time` is expected to be snapped already.
    pub fn add_clip_instance(
        &mut self,
        clip_id: ClipId,
        track_index: usize,
        start_time: f64,
        ids: &mut IdGenerator,
    ) -> InstanceId {
        self.ensure_track(track_index, ids);
        let id = ids.next_id();
        self.instances.push(ClipInstance {
            id,
            clip_id,
            track_index,
            start_time: start_time.max(0.0),
            selected: false,
        });
        id
    }

    /// Move an instance. The track index is clamped to existing tracks.
    pub fn move_clip_instance(
        &mut self,
        id: InstanceId,
        start_time: f64,
        track_index: Option<usize>,
    ) -> bool {
        let max_track = self.tracks.len().saturating_sub(1);
        let Some(instance) = self.instances.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        instance.start_time = start_time.max(0.0);
        if let Some(track_index) = track_index {
            instance.track_index = track_index.min(max_track);
        }
        true
    }

    pub fn remove_clip_instance(&mut self, id: InstanceId) -> Option<ClipInstance> {
        let index = self.instances.iter().position(|i| i.id == id)?;
        Some(self.instances.remove(index))
    }

    /// Remove every instance of a clip. Returns how many were removed.
    pub fn remove_instances_of_clip(&mut self, clip_id: ClipId) -> usize {
        let before = self.instances.len();
        self.instances.retain(|i| i.clip_id != clip_id);
        before - self.instances.len()
    }

    /// Delete a track, its instances, and shift higher tracks down by one
    pub fn delete_track(&mut self, index: usize) -> Option<ArrangementTrack> {
        if index >= self.tracks.len() {
            return None;
        }
        let track = self.tracks.remove(index);
        self.instances.retain(|i| i.track_index != index);
        for instance in &mut self.instances {
            if instance.track_index > index {
                instance.track_index -= 1;
            }
        }
        Some(track)
    }

    pub fn set_track_muted(&mut self, index: usize, muted: bool) -> bool {
        match self.tracks.get_mut(index) {
            Some(track) => {
                track.muted = muted;
                true
            }
            None => false,
        }
    }

    pub fn set_track_solo(&mut self, index: usize, solo: bool) -> bool {
        match self.tracks.get_mut(index) {
            Some(track) => {
                track.solo = solo;
                true
            }
            None => false,
        }
    }

    pub fn any_solo(&self) -> bool {
        self.tracks.iter().any(|t| t.solo)
    }

    /// Muted tracks are never audible; otherwise a track is audible when nothing is
    /// soloed or when it is soloed itself
    pub fn is_track_audible(&self, index: usize) -> bool {
        match self.tracks.get(index) {
            Some(track) if track.muted => false,
            Some(track) => !self.any_solo() || track.solo,
            None => false,
        }
    }

    pub fn select_instance(&mut self, id: InstanceId, additive: bool) -> bool {
        if !additive {
            self.clear_selection();
        }
        match self.instances.iter_mut().find(|i| i.id == id) {
            Some(instance) => {
                instance.selected = true;
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&mut self) {
        for instance in &mut self.instances {
            instance.selected = false;
        }
    }

    pub fn selected_instances(&self) -> Vec<InstanceId> {
        self.instances
            .iter()
            .filter(|i| i.selected)
            .map(|i| i.id)
            .collect()
    }
}
