//! Reference host for the timeline: owns the arrangement and applies the
//! actions the engine emits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::action::TimelineAction;
use crate::engine::TimelineProps;
use crate::loop_region::{LoopRegion, LoopRegionManager};
use crate::model::{Clip, ClipId, LaneRef, Track, TrackId, TrackKind};

const BEAT_TRACK_ID: TrackId = TrackId(0);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no beat is loaded")]
    NoBeat,
    #[error("unknown track {0:?}")]
    UnknownTrack(TrackId),
    #[error("unknown clip {0:?}")]
    UnknownClip(ClipId),
}

/// Gain a lane contributes to the mix after mute and solo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LaneGain {
    pub lane: LaneRef,
    pub gain: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrangementSession {
    #[serde(default)]
    pub beat: Option<Track>,
    #[serde(default = "default_beat_label")]
    pub beat_label: String,
    #[serde(default)]
    pub vocals: Vec<Track>,
    #[serde(default)]
    pub selected_vocal: Option<TrackId>,
    #[serde(default)]
    pub beat_selected: bool,
    #[serde(default = "default_snap")]
    pub snap_enabled: bool,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub playing: bool,
    #[serde(default, rename = "loop_region")]
    pub looping: LoopRegionManager,
    /// Peaks of takes still being recorded, keyed by clip.
    #[serde(skip)]
    pub live_waveforms: HashMap<ClipId, Vec<f32>>,
    #[serde(default)]
    pub bpm: Option<f64>,
    /// Lower bound for the next clip id. Ids are never handed out twice,
    /// even after the clip holding the highest one is deleted.
    #[serde(default)]
    next_clip: u64,
}

fn default_beat_label() -> String {
    "Beat".to_owned()
}

fn default_snap() -> bool {
    true
}

impl Default for ArrangementSession {
    fn default() -> Self {
        Self {
            beat: None,
            beat_label: default_beat_label(),
            vocals: Vec::new(),
            selected_vocal: None,
            beat_selected: false,
            snap_enabled: default_snap(),
            current_time: 0.0,
            playing: false,
            looping: LoopRegionManager::default(),
            live_waveforms: HashMap::new(),
            bpm: None,
            next_clip: 1,
        }
    }
}

impl ArrangementSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn props(&self) -> TimelineProps<'_> {
        TimelineProps {
            beat: self.beat.as_ref(),
            beat_label: &self.beat_label,
            vocals: &self.vocals,
            selected_vocal: self.selected_vocal,
            beat_selected: self.beat_selected,
            snap_enabled: self.snap_enabled,
            current_time: self.current_time,
            playing: self.playing,
            loop_region: self.looping.region(),
            live_waveforms: &self.live_waveforms,
            bpm: self.bpm,
        }
    }

    pub fn loop_region(&self) -> LoopRegion {
        self.looping.region()
    }

    fn next_clip_id(&mut self) -> ClipId {
        let highest = self
            .beat
            .iter()
            .chain(self.vocals.iter())
            .filter_map(|track| track.clip.as_ref().map(|clip| clip.id.0))
            .max()
            .unwrap_or(0);
        let id = self.next_clip.max(highest + 1);
        self.next_clip = id + 1;
        ClipId(id)
    }

    fn next_track_id(&self) -> TrackId {
        let highest = self
            .vocals
            .iter()
            .map(|track| track.id.0)
            .max()
            .unwrap_or(BEAT_TRACK_ID.0);
        TrackId(highest + 1)
    }

    /// Replaces the beat lane with one clip of `duration_sec` at time zero.
    pub fn load_beat(
        &mut self,
        label: impl Into<String>,
        url: impl Into<String>,
        duration_sec: f64,
    ) -> ClipId {
        let id = self.next_clip_id();
        let clip =
            Clip::new(id, BEAT_TRACK_ID, TrackKind::Beat, 0.0, duration_sec).with_audio_url(url);
        let label = label.into();
        let track = match self.beat.take() {
            Some(mut track) => {
                track.clip = Some(clip);
                track
            }
            None => Track::new(BEAT_TRACK_ID, TrackKind::Beat, label.clone()).with_clip(clip),
        };
        info!(label = %label, duration_sec, "beat loaded");
        self.beat_label = label;
        self.beat = Some(track);
        id
    }

    pub fn add_vocal_track(&mut self) -> TrackId {
        let id = self.next_track_id();
        let name = format!("Vocal {}", self.vocals.len() + 1);
        debug!(?id, name = %name, "vocal track added");
        self.vocals.push(Track::new(id, TrackKind::Vocal, name));
        id
    }

    /// Places a take on a vocal lane, replacing any clip already there.
    /// `audio_url` is `None` while the take is still recording.
    pub fn place_take(
        &mut self,
        track: TrackId,
        start_sec: f64,
        duration_sec: f64,
        audio_url: Option<String>,
    ) -> Result<ClipId, SessionError> {
        let id = self.next_clip_id();
        let lane = self.vocal_mut(track)?;
        let mut clip = Clip::new(id, track, TrackKind::Vocal, start_sec, duration_sec);
        clip.audio_url = audio_url;
        let previous = lane.clip.replace(clip);
        if let Some(previous) = previous {
            self.live_waveforms.remove(&previous.id);
        }
        Ok(id)
    }

    /// Swaps a finished recording's live peaks for its uploaded audio.
    pub fn finish_take(
        &mut self,
        clip: ClipId,
        audio_url: impl Into<String>,
    ) -> Result<(), SessionError> {
        let found = self.vocal_clip_mut(clip)?;
        found.audio_url = Some(audio_url.into());
        self.live_waveforms.remove(&clip);
        Ok(())
    }

    fn beat_mut(&mut self) -> Result<&mut Track, SessionError> {
        self.beat.as_mut().ok_or(SessionError::NoBeat)
    }

    fn beat_clip_mut(&mut self) -> Result<&mut Clip, SessionError> {
        self.beat_mut()?.clip.as_mut().ok_or(SessionError::NoBeat)
    }

    fn vocal_mut(&mut self, track: TrackId) -> Result<&mut Track, SessionError> {
        self.vocals
            .iter_mut()
            .find(|lane| lane.id == track)
            .ok_or(SessionError::UnknownTrack(track))
    }

    fn vocal_clip_mut(&mut self, clip: ClipId) -> Result<&mut Clip, SessionError> {
        self.vocals
            .iter_mut()
            .filter_map(|track| track.clip.as_mut())
            .find(|candidate| candidate.id == clip)
            .ok_or(SessionError::UnknownClip(clip))
    }

    /// Applies one engine action to the arrangement.
    pub fn apply(&mut self, action: &TimelineAction) -> Result<(), SessionError> {
        debug!(?action, "applying timeline action");
        match *action {
            TimelineAction::BeatClipMoved { start_sec } => {
                self.beat_clip_mut()?.set_start(start_sec);
            }
            TimelineAction::VocalClipMoved { clip, start_sec } => {
                self.vocal_clip_mut(clip)?.set_start(start_sec);
            }
            TimelineAction::BeatClipResized {
                start_sec,
                duration_sec,
                ..
            } => {
                self.beat_clip_mut()?.set_bounds(start_sec, duration_sec);
            }
            TimelineAction::VocalClipResized {
                track,
                start_sec,
                duration_sec,
                clip,
                ..
            } => {
                let target = self
                    .vocal_mut(track)?
                    .clip
                    .as_mut()
                    .filter(|candidate| candidate.id == clip)
                    .ok_or(SessionError::UnknownClip(clip))?;
                target.set_bounds(start_sec, duration_sec);
            }
            TimelineAction::AddVocalTrack => {
                self.add_vocal_track();
            }
            TimelineAction::Seek { time_sec } => {
                self.current_time = time_sec.max(0.0);
            }
            TimelineAction::PlayFromCursor => self.playing = true,
            TimelineAction::StopPlayback => self.playing = false,
            TimelineAction::ToggleBeatMute => {
                let beat = self.beat_mut()?;
                beat.muted = !beat.muted;
            }
            TimelineAction::ToggleVocalMute { track } => {
                let lane = self.vocal_mut(track)?;
                lane.muted = !lane.muted;
            }
            TimelineAction::ToggleBeatSolo => {
                let beat = self.beat_mut()?;
                beat.solo = !beat.solo;
            }
            TimelineAction::ToggleVocalSolo { track } => {
                let lane = self.vocal_mut(track)?;
                lane.solo = !lane.solo;
            }
            TimelineAction::BeatVolumeChanged { volume } => {
                self.beat_mut()?.set_volume(volume);
            }
            TimelineAction::VocalVolumeChanged { track, volume } => {
                self.vocal_mut(track)?.set_volume(volume);
            }
            TimelineAction::ToggleLoopRegion => {
                self.looping.toggle();
            }
            TimelineAction::LoopSetStart { time_sec } => self.looping.set_start(time_sec),
            TimelineAction::LoopSetEnd { time_sec } => self.looping.set_end(time_sec),
            TimelineAction::SetLoopFromClip {
                start_sec,
                duration_sec,
            } => self.looping.set_from_clip(start_sec, duration_sec),
            TimelineAction::SelectBeatTrack => {
                self.beat_mut()?;
                self.beat_selected = true;
                self.selected_vocal = None;
            }
            TimelineAction::SelectVocalTrack { track } => {
                self.vocal_mut(track)?;
                self.selected_vocal = Some(track);
                self.beat_selected = false;
            }
            TimelineAction::DeleteVocalClip { track, clip } => {
                let lane = self.vocal_mut(track)?;
                if lane.clip.as_ref().map(|candidate| candidate.id) != Some(clip) {
                    return Err(SessionError::UnknownClip(clip));
                }
                lane.clip = None;
                self.live_waveforms.remove(&clip);
            }
            TimelineAction::DeleteVocalTrack { track } => {
                let index = self
                    .vocals
                    .iter()
                    .position(|lane| lane.id == track)
                    .ok_or(SessionError::UnknownTrack(track))?;
                let removed = self.vocals.remove(index);
                if let Some(clip) = removed.clip {
                    self.live_waveforms.remove(&clip.id);
                }
                if self.selected_vocal == Some(track) {
                    self.selected_vocal = None;
                }
                debug!(?track, "vocal track deleted");
            }
        }
        Ok(())
    }

    pub fn any_solo(&self) -> bool {
        self.props().any_solo()
    }

    /// Per-lane gain after mute and solo.
    pub fn lane_gains(&self) -> Vec<LaneGain> {
        let any_solo = self.any_solo();
        self.props()
            .lanes()
            .map(|(lane, track)| LaneGain {
                lane,
                gain: track.effective_gain(any_solo),
            })
            .collect()
    }

    /// End of the last clip on any lane.
    pub fn arrangement_end(&self) -> f64 {
        self.props()
            .lanes()
            .filter_map(|(_, track)| track.clip.as_ref().map(Clip::end_sec))
            .fold(0.0, f64::max)
    }

    /// Moves the playhead by `delta_sec` of playback, folding back at the
    /// active loop end and stopping at the end of the arrangement.
    pub fn advance(&mut self, delta_sec: f64) -> f64 {
        if !self.playing || !(delta_sec > 0.0) {
            return self.current_time;
        }
        let previous = self.current_time;
        let next = self.looping.region().wrap(previous, previous + delta_sec);
        let end = self.arrangement_end();
        if self.looping.region().active_range().is_none() && next >= end {
            self.current_time = end;
            self.playing = false;
            debug!(end, "playback reached arrangement end");
        } else {
            self.current_time = next;
        }
        self.current_time
    }
}
