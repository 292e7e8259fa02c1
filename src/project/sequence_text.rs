// Sequence text format
//
//   tempo 120
//   duration 4
//   # sine freq amp cutoff
//   % cutoff 0 200
//   @0 on sine 0 440 0.8 1200
//   @0.5 off sine 0
//
// Times are in beats. `duration` is the clip length, `%` lines are automation points. `on`/`off` events are paired per (synth, channel) in FIFO order.
// Parsing is best effort: lines that do not match the grammar are skipped and counted.

use crate::sequencer::clip::{Clip, ClipId, DEFAULT_CLIP_DURATION};
use crate::sequencer::note::{Note, NoteId};
use crate::sequencer::timeline::Tempo;
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;

/// Tempo assumed when a file declares none (or only invalid ones)
pub const DEFAULT_FILE_BPM: f64 = 120.0;

/// Whether an event starts or ends a note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    On,
    Off,
}

/// One `@<beats> on|off ...` line
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEvent {
    pub time_beats: f64,
    pub kind: EventKind,
    pub synth_name: String,
    pub channel: u32,
    pub params: Vec<f64>,
}

/// One `% <param> <beats> <value>` line
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationEntry {
    pub param_name: String,
    pub time_beats: f64,
    pub value: f64,
}

/// Result of parsing a sequence file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSequence {
    pub bpm: f64,
    /// Declared clip length in beats
    pub duration_beats: Option<f64>,
    /// Parameter names per synth, in declaration order
    pub headers: Vec<(String, Vec<String>)>,
    /// Events in file order
    pub events: Vec<SequenceEvent>,
    /// Automation points in file order
    pub automation: Vec<AutomationEntry>,
    /// Number of lines that did not match the grammar
    pub skipped_lines: usize,
}

impl ParsedSequence {
    pub fn param_names(&self, synth_name: &str) -> Option<&[String]> {
        self.headers
            .iter()
            .find(|(name, _)| name == synth_name)
            .map(|(_, params)| params.as_slice())
    }
}

/// A matched on/off pair
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerPair {
    pub start_beats: f64,
    pub duration_beats: f64,
    pub synth_name: String,
    pub channel: u32,
    pub params: Vec<f64>,
}

/// Knobs for turning text into a clip
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// Duration given to an `on` without a matching `off`, in beats
    pub orphan_duration_beats: f64,
    /// Synth name used when the file declares no header and no event
    pub default_synth_name: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            orphan_duration_beats: 0.25,
            default_synth_name: "unknown".to_string(),
        }
    }
}

/// Clip built from a sequence file
#[derive(Debug, Clone)]
pub struct ClipImport {
    pub clip: Clip,
    pub bpm: f64,
    pub skipped_lines: usize,
}

/// Parse sequence text. Never fails; see `ParsedSequence::skipped_lines`.
pub fn parse(text: &str) -> ParsedSequence {
    let mut bpm: Option<f64> = None;
    let mut duration_beats: Option<f64> = None;
    let mut headers: Vec<(String, Vec<String>)> = Vec::new();
    let mut events = Vec::new();
    let mut automation = Vec::new();
    let mut skipped_lines = 0;

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let parsed = if let Some(rest) = line.strip_prefix("tempo") {
            match parse_tempo(rest) {
                Some(value) => {
                    // First valid occurrence wins
                    bpm.get_or_insert(value);
                    true
                }
                None => false,
            }
        } else if let Some(rest) = line.strip_prefix("duration") {
            match parse_keyword_value(rest).filter(|beats| *beats > 0.0) {
                Some(beats) => {
                    duration_beats.get_or_insert(beats);
                    true
                }
                None => false,
            }
        } else if let Some(rest) = line.strip_prefix('%') {
            match parse_automation(rest) {
                Some(entry) => {
                    automation.push(entry);
                    true
                }
                None => false,
            }
        } else if let Some(rest) = line.strip_prefix('#') {
            let mut words = rest.split_whitespace();
            match words.next() {
                Some(synth) => {
                    let names: Vec<String> = words.map(str::to_string).collect();
                    match headers.iter_mut().find(|(name, _)| name == synth) {
                        Some(entry) => entry.1 = names,
                        None => headers.push((synth.to_string(), names)),
                    }
                    true
                }
                None => false,
            }
        } else if let Some(rest) = line.strip_prefix('@') {
            match parse_event(rest) {
                Some(event) => {
                    events.push(event);
                    true
                }
                None => false,
            }
        } else {
            false
        };

        if !parsed {
            log::warn!("Skipping unparsable sequence line {}: {}", line_no + 1, line);
            skipped_lines += 1;
        }
    }

    ParsedSequence {
        bpm: bpm.unwrap_or(DEFAULT_FILE_BPM),
        duration_beats,
        headers,
        events,
        automation,
        skipped_lines,
    }
}

fn parse_tempo(rest: &str) -> Option<f64> {
    Tempo::try_new(parse_keyword_value(rest)?).map(|t| t.bpm())
}

/// Single finite number after a keyword, which must be a whole word
fn parse_keyword_value(rest: &str) -> Option<f64> {
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let mut words = rest.split_whitespace();
    let value: f64 = words.next()?.parse().ok()?;
    if words.next().is_some() || !value.is_finite() {
        return None;
    }
    Some(value)
}

fn parse_automation(rest: &str) -> Option<AutomationEntry> {
    let mut words = rest.split_whitespace();
    let param_name = words.next()?.to_string();
    let time_beats: f64 = words.next()?.parse().ok()?;
    let value: f64 = words.next()?.parse().ok()?;
    if words.next().is_some()
        || !(time_beats.is_finite() && time_beats >= 0.0)
        || !value.is_finite()
    {
        return None;
    }
    Some(AutomationEntry {
        param_name,
        time_beats,
        value,
    })
}

fn parse_event(rest: &str) -> Option<SequenceEvent> {
    let mut words = rest.split_whitespace();
    let time_beats: f64 = words.next()?.parse().ok()?;
    if !(time_beats.is_finite() && time_beats >= 0.0) {
        return None;
    }
    let kind = match words.next()? {
        "on" => EventKind::On,
        "off" => EventKind::Off,
        _ => return None,
    };
    let synth_name = words.next()?.to_string();
    let channel: u32 = words.next()?.parse().ok()?;
    let params = words
        .map(|w| w.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<f64>>>()?;

    Some(SequenceEvent {
        time_beats,
        kind,
        synth_name,
        channel,
        params,
    })
}

/// Pair `on` and `off` events
///
/// Events are ordered by time with `off` before `on` at equal times (file order otherwise).
/// Each `on` is matched with the next `off` of the same synth and channel, first in first out.
/// An unmatched `on` gets `orphan_duration_beats`; an unmatched `off` is ignored.
/// Pairs come back in start order.
pub fn resolve_trigger_pairs(
    events: &[SequenceEvent],
    orphan_duration_beats: f64,
) -> Vec<TriggerPair> {
    let mut ordered: Vec<&SequenceEvent> = events.iter().collect();
    // Stable sort keeps file order for ties
    ordered.sort_by(|a, b| {
        a.time_beats
            .total_cmp(&b.time_beats)
            .then_with(|| kind_rank(a.kind).cmp(&kind_rank(b.kind)))
    });

    let mut pairs: Vec<TriggerPair> = Vec::new();
    let mut resolved: Vec<bool> = Vec::new();
    let mut open: HashMap<(&str, u32), VecDeque<usize>> = HashMap::new();

    for event in ordered {
        let key = (event.synth_name.as_str(), event.channel);
        match event.kind {
            EventKind::On => {
                open.entry(key).or_default().push_back(pairs.len());
                pairs.push(TriggerPair {
                    start_beats: event.time_beats,
                    duration_beats: orphan_duration_beats,
                    synth_name: event.synth_name.clone(),
                    channel: event.channel,
                    params: event.params.clone(),
                });
                resolved.push(false);
            }
            EventKind::Off => {
                let Some(index) = open.get_mut(&key).and_then(VecDeque::pop_front) else {
                    log::debug!(
                        "Ignoring unmatched off for {} channel {} at beat {}",
                        event.synth_name,
                        event.channel,
                        event.time_beats
                    );
                    continue;
                };
                pairs[index].duration_beats = event.time_beats - pairs[index].start_beats;
                resolved[index] = true;
            }
        }
    }

    let orphans = resolved.iter().filter(|r| !**r).count();
    if orphans > 0 {
        log::debug!(
            "{} note(s) without off event, using {} beats",
            orphans,
            orphan_duration_beats
        );
    }

    pairs
}

fn kind_rank(kind: EventKind) -> u8 {
    match kind {
        EventKind::Off => 0,
        EventKind::On => 1,
    }
}

/// Build a clip from sequence text
///
/// Times are converted from beats to seconds with the file's tempo. The clip's synth is the
/// first declared header (or the first event's synth); its duration is the declared
/// `duration` stretched to cover the notes, or the default clip duration when both are empty.
/// Notes whose length rounds to nothing in seconds are dropped and counted as skipped.
pub fn clip_from_text(
    text: &str,
    clip_id: ClipId,
    name: &str,
    options: &ParseOptions,
    mut next_note_id: impl FnMut() -> NoteId,
) -> ClipImport {
    let parsed = parse(text);
    let tempo = Tempo::try_new(parsed.bpm).unwrap_or_default();

    let synth_name = parsed
        .headers
        .first()
        .map(|(name, _)| name.clone())
        .or_else(|| parsed.events.first().map(|e| e.synth_name.clone()))
        .unwrap_or_else(|| options.default_synth_name.clone());
    let clip_params = parsed
        .param_names(&synth_name)
        .map(<[String]>::to_vec)
        .unwrap_or_default();

    let mut skipped_lines = parsed.skipped_lines;
    let mut notes: Vec<Note> = Vec::new();
    for pair in resolve_trigger_pairs(&parsed.events, options.orphan_duration_beats) {
        let start = tempo.beats_to_seconds(pair.start_beats);
        let duration = tempo.beats_to_seconds(pair.duration_beats);
        if !(duration > 0.0 && (start + duration).is_finite()) {
            log::warn!(
                "Dropping {} note at beat {} with unusable length {} beats",
                pair.synth_name,
                pair.start_beats,
                pair.duration_beats
            );
            skipped_lines += 1;
            continue;
        }
        let param_names = parsed
            .param_names(&pair.synth_name)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        notes.push(Note::new(
            next_note_id(),
            pair.synth_name,
            start,
            duration,
            pair.params,
            param_names,
        ));
    }

    let content_end = notes.iter().map(Note::end_time).fold(0.0, f64::max);
    let declared = parsed
        .duration_beats
        .map(|beats| tempo.beats_to_seconds(beats))
        .filter(|seconds| seconds.is_finite())
        .unwrap_or(0.0);
    let duration = declared.max(content_end);
    let duration = if duration > 0.0 {
        duration
    } else {
        DEFAULT_CLIP_DURATION
    };

    let mut clip = Clip::new(clip_id, name, synth_name, clip_params, duration);
    for note in notes {
        clip.add_note(note);
    }
    for entry in &parsed.automation {
        let time = tempo.beats_to_seconds(entry.time_beats);
        if !time.is_finite() {
            skipped_lines += 1;
            continue;
        }
        clip.add_automation_point(&entry.param_name, time, entry.value);
    }

    ClipImport {
        clip,
        bpm: parsed.bpm,
        skipped_lines,
    }
}

/// Serialize a clip to sequence text at `bpm`
///
/// Writes the clip length and automation points too. Muted notes are left out. Overlapping notes of the same synth are spread over channels
/// (lowest free channel first) so FIFO pairing reproduces them.
pub fn serialize(clip: &Clip, bpm: f64) -> String {
    let tempo = Tempo::try_new(bpm).unwrap_or_default();
    let mut out = String::new();
    let _ = writeln!(out, "tempo {}", tempo.bpm());
    let _ = writeln!(out, "duration {}", tempo.seconds_to_beats(clip.duration()));

    let audible: Vec<&Note> = clip.notes().iter().filter(|n| !n.muted).collect();

    // Headers: the clip's synth first, then every other synth in note order
    write_header(&mut out, &clip.synth_name, &clip.param_names);
    let mut declared = vec![clip.synth_name.as_str()];
    for note in &audible {
        if !declared.contains(&note.synth_name.as_str()) {
            declared.push(note.synth_name.as_str());
            write_header(&mut out, &note.synth_name, &note.param_names);
        }
    }

    for curve in clip.automation() {
        for point in curve.points() {
            let _ = writeln!(
                out,
                "% {} {} {}",
                curve.param_name(),
                tempo.seconds_to_beats(point.time),
                point.value
            );
        }
    }

    struct Line<'a> {
        time_beats: f64,
        kind: EventKind,
        synth: &'a str,
        channel: u32,
        params: &'a [f64],
    }

    let mut lines: Vec<Line> = Vec::with_capacity(audible.len() * 2);
    // Per synth: end time of the last note on each channel
    let mut channel_ends: HashMap<&str, Vec<f64>> = HashMap::new();

    for note in &audible {
        let ends = channel_ends.entry(note.synth_name.as_str()).or_default();
        let channel = match ends.iter().position(|end| *end <= note.start_time) {
            Some(free) => free,
            None => {
                ends.push(0.0);
                ends.len() - 1
            }
        };
        ends[channel] = note.end_time();

        lines.push(Line {
            time_beats: tempo.seconds_to_beats(note.start_time),
            kind: EventKind::On,
            synth: &note.synth_name,
            channel: channel as u32,
            params: note.params(),
        });
        lines.push(Line {
            time_beats: tempo.seconds_to_beats(note.end_time()),
            kind: EventKind::Off,
            synth: &note.synth_name,
            channel: channel as u32,
            params: &[],
        });
    }

    lines.sort_by(|a, b| {
        a.time_beats
            .total_cmp(&b.time_beats)
            .then_with(|| kind_rank(a.kind).cmp(&kind_rank(b.kind)))
    });

    for line in lines {
        let kind = match line.kind {
            EventKind::On => "on",
            EventKind::Off => "off",
        };
        let _ = write!(
            out,
            "@{} {} {} {}",
            line.time_beats, kind, line.synth, line.channel
        );
        for value in line.params {
            let _ = write!(out, " {}", value);
        }
        out.push('\n');
    }

    out
}

fn write_header(out: &mut String, synth_name: &str, param_names: &[String]) {
    out.push_str("# ");
    out.push_str(synth_name);
    for name in param_names {
        out.push(' ');
        out.push_str(name);
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "tempo 120\n\
                          # sine freq amp cutoff\n\
                          @0 on sine 0 440 0.8 1200\n\
                          @0.5 off sine 0\n";

    fn import(text: &str) -> ClipImport {
        let mut next = 100;
        clip_from_text(text, 1, "Test", &ParseOptions::default(), || {
            next += 1;
            next
        })
    }

    #[test]
    fn test_parse_sample() {
        let parsed = parse(SAMPLE);
        assert_eq!(parsed.bpm, 120.0);
        assert_eq!(
            parsed.param_names("sine"),
            Some(&["freq".to_string(), "amp".to_string(), "cutoff".to_string()][..])
        );
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.events[0].kind, EventKind::On);
        assert_eq!(parsed.events[0].params, vec![440.0, 0.8, 1200.0]);
        assert_eq!(parsed.skipped_lines, 0);
    }

    #[test]
    fn test_first_valid_tempo_wins() {
        assert_eq!(parse("tempo fast\ntempo 90\ntempo 140\n").bpm, 90.0);
        assert_eq!(parse("tempo 0\n").bpm, DEFAULT_FILE_BPM);
        assert_eq!(parse("").bpm, DEFAULT_FILE_BPM);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let parsed = parse("hello\n@x on sine 0\n@1 up sine 0\n@1 on sine zero\n@1 on sine 0 abc\n#\n");
        assert!(parsed.events.is_empty());
        assert_eq!(parsed.skipped_lines, 6);
    }

    #[test]
    fn test_fifo_pairing_per_channel() {
        let parsed = parse(
            "@0 on sine 0 100\n\
             @0.5 on sine 0 200\n\
             @1 off sine 0\n\
             @1 on sine 1 300\n\
             @2 off sine 0\n\
             @2 off sine 1\n",
        );
        let pairs = resolve_trigger_pairs(&parsed.events, 0.25);

        let summary: Vec<(f64, f64, f64)> = pairs
            .iter()
            .map(|p| (p.start_beats, p.duration_beats, p.params[0]))
            .collect();
        assert_eq!(
            summary,
            vec![(0.0, 1.0, 100.0), (0.5, 1.5, 200.0), (1.0, 1.0, 300.0)]
        );
    }

    #[test]
    fn test_off_before_on_at_same_time() {
        // The off at beat 1 closes the first note, not the one starting at beat 1
        let parsed = parse("@1 on sine 0 2\n@0 on sine 0 1\n@1 off sine 0\n@2 off sine 0\n");
        let pairs = resolve_trigger_pairs(&parsed.events, 0.25);
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[0].start_beats, pairs[0].duration_beats), (0.0, 1.0));
        assert_eq!((pairs[1].start_beats, pairs[1].duration_beats), (1.0, 1.0));
    }

    #[test]
    fn test_orphans_and_stray_offs() {
        let parsed = parse("@0 off sine 0\n@1 on sine 0 440\n");
        let pairs = resolve_trigger_pairs(&parsed.events, 0.5);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].duration_beats, 0.5);
    }

    #[test]
    fn test_clip_from_text_converts_beats() {
        let imported = import(SAMPLE);
        let clip = imported.clip;

        assert_eq!(clip.synth_name, "sine");
        assert_eq!(clip.param_names, vec!["freq", "amp", "cutoff"]);
        assert_eq!(clip.note_count(), 1);

        let note = &clip.notes()[0];
        assert_eq!(note.start_time, 0.0);
        assert_eq!(note.duration, 0.25);
        assert_eq!(note.frequency, 440.0);
        assert_eq!(note.amplitude, 0.8);
        assert_eq!(clip.duration(), 0.25);
    }

    #[test]
    fn test_clip_without_header_uses_defaults() {
        let imported = import("");
        assert_eq!(imported.clip.synth_name, "unknown");
        assert_eq!(imported.clip.duration(), DEFAULT_CLIP_DURATION);
        assert_eq!(imported.bpm, 120.0);

        let imported = import("@0 on saw 0 110\n@1 off saw 0\n");
        assert_eq!(imported.clip.synth_name, "saw");
        assert!(imported.clip.param_names.is_empty());
    }

    #[test]
    fn test_serialize_assigns_channels_to_overlaps() {
        let mut clip = Clip::new_default(1, "Chord", "sine");
        for (id, freq) in [(1, 261.5), (2, 329.5)] {
            clip.add_note(Note::new(id, "sine", 0.0, 0.5, vec![freq, 1.0], Vec::new()));
        }
        clip.add_note(Note::new(3, "sine", 0.5, 0.5, vec![392.0, 1.0], Vec::new()));

        let text = serialize(&clip, 120.0);
        let parsed = parse(&text);
        let channels: Vec<u32> = parsed
            .events
            .iter()
            .filter(|e| e.kind == EventKind::On)
            .map(|e| e.channel)
            .collect();
        assert_eq!(channels, vec![0, 1, 0]);

        let pairs = resolve_trigger_pairs(&parsed.events, 0.25);
        assert!(pairs.iter().all(|p| p.duration_beats == 1.0));
    }

    #[test]
    fn test_serialize_skips_muted_notes() {
        let mut clip = Clip::new(1, "Lead", "sine", vec!["freq".into()], 2.0);
        clip.add_note(Note::new(1, "sine", 0.0, 0.5, vec![440.0], vec!["freq".into()]));
        clip.add_note(Note::new(2, "saw", 0.5, 0.5, vec![220.0], vec!["freq".into()]));
        clip.set_note_muted(2, true);

        let text = serialize(&clip, 120.0);
        assert_eq!(
            text,
            "tempo 120\nduration 4\n# sine freq\n@0 on sine 0 440\n@1 off sine 0\n"
        );
    }

    #[test]
    fn test_text_round_trip() {
        let imported = import(SAMPLE);
        let text = serialize(&imported.clip, imported.bpm);
        let again = import(&text).clip;

        assert_eq!(again.synth_name, imported.clip.synth_name);
        assert_eq!(again.param_names, imported.clip.param_names);
        assert_eq!(again.note_count(), 1);
        assert_eq!(again.notes()[0].start_time, imported.clip.notes()[0].start_time);
        assert_eq!(again.notes()[0].duration, imported.clip.notes()[0].duration);
        assert_eq!(again.notes()[0].params(), imported.clip.notes()[0].params());
    }

    #[test]
    fn test_vanishing_duration_is_skipped() {
        // A subnormal length in beats underflows to zero seconds
        let imported = import("@0 on sine 0 440\n@5e-324 off sine 0\n@1 on sine 0 220\n@2 off sine 0\n");
        assert_eq!(imported.clip.note_count(), 1);
        assert_eq!(imported.clip.notes()[0].frequency, 220.0);
        assert_eq!(imported.skipped_lines, 1);

        let imported = import("tempo 20\n@1e308 on sine 0 440\n");
        assert!(imported.clip.is_empty());
        assert_eq!(imported.clip.duration(), DEFAULT_CLIP_DURATION);
    }

    #[test]
    fn test_parse_duration_and_automation() {
        let parsed = parse(
            "duration 0\nduration 8\nduration 16\n\
             % cutoff 0 200\n% cutoff 2 800\n% cutoff -1 5\n% cutoff 1\n%\n",
        );
        assert_eq!(parsed.duration_beats, Some(8.0));
        assert_eq!(parsed.automation.len(), 2);
        assert_eq!(parsed.automation[1].param_name, "cutoff");
        assert_eq!((parsed.automation[1].time_beats, parsed.automation[1].value), (2.0, 800.0));
        assert_eq!(parsed.skipped_lines, 4);
    }

    #[test]
    fn test_declared_duration_stretches_to_cover_notes() {
        let imported = import("duration 8\n@0 on sine 0 440\n@1 off sine 0\n");
        assert_eq!(imported.clip.duration(), 4.0);

        let imported = import("duration 1\n@0 on sine 0 440\n@4 off sine 0\n");
        assert_eq!(imported.clip.duration(), 2.0);
    }

    #[test]
    fn test_duration_and_automation_round_trip() {
        let mut clip = Clip::new(1, "Pad", "sine", vec!["freq".into(), "cutoff".into()], 3.0);
        clip.add_note(Note::new(1, "sine", 0.0, 0.5, vec![440.0, 900.0], Vec::new()));
        clip.add_automation_point("cutoff", 0.0, 200.0);
        clip.add_automation_point("cutoff", 2.5, 1800.0);
        clip.add_automation_point("freq", 1.0, 330.0);

        let text = serialize(&clip, 60.0);
        assert!(text.contains("duration 3\n"));
        assert!(text.contains("% cutoff 2.5 1800\n"));

        let imported = import(&text);
        assert_eq!(imported.skipped_lines, 0);
        let again = imported.clip;
        assert_eq!(again.duration(), 3.0);
        assert_eq!(again.automation(), clip.automation());
        assert_eq!(again.automation_value_at("cutoff", 1.25), Some(1000.0));
    }
}
