use serde::{Deserialize, Serialize};

/// Shortest length a clip can be resized to, in seconds.
pub const MIN_CLIP_SEC: f64 = 0.1;

/// Upper bound for a lane's volume. Unity gain is `1.0`.
pub const MAX_TRACK_VOLUME: f32 = 1.5;

/// Identifier for a timeline lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u32);

/// Identifier for a clip placed on a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub u64);

/// What a lane carries. There is at most one beat lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Beat,
    Vocal,
}

/// Which clip a gesture or menu action refers to, as the host addresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipRef {
    Beat,
    Vocal { track: TrackId, clip: ClipId },
}

impl ClipRef {
    pub fn kind(&self) -> TrackKind {
        match self {
            ClipRef::Beat => TrackKind::Beat,
            ClipRef::Vocal { .. } => TrackKind::Vocal,
        }
    }
}

/// A lane as the host addresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneRef {
    Beat,
    Vocal(TrackId),
}

impl LaneRef {
    pub fn kind(&self) -> TrackKind {
        match self {
            LaneRef::Beat => TrackKind::Beat,
            LaneRef::Vocal(_) => TrackKind::Vocal,
        }
    }
}

/// Audio region positioned on a lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub track_id: TrackId,
    pub start_sec: f64,
    pub duration_sec: f64,
    /// `None` while the take is still being recorded.
    #[serde(default)]
    pub audio_url: Option<String>,
    pub kind: TrackKind,
}

impl Clip {
    pub fn new(
        id: ClipId,
        track_id: TrackId,
        kind: TrackKind,
        start_sec: f64,
        duration_sec: f64,
    ) -> Self {
        Self {
            id,
            track_id,
            start_sec: start_sec.max(0.0),
            duration_sec: duration_sec.max(MIN_CLIP_SEC),
            audio_url: None,
            kind,
        }
    }

    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec
    }

    pub fn is_live(&self) -> bool {
        self.audio_url.is_none()
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_sec && time < self.end_sec()
    }

    /// Moves the clip, keeping its length.
    pub fn set_start(&mut self, start_sec: f64) {
        self.start_sec = start_sec.max(0.0);
    }

    /// Sets both bounds, enforcing the non-negative start and minimum length.
    pub fn set_bounds(&mut self, start_sec: f64, duration_sec: f64) {
        self.start_sec = start_sec.max(0.0);
        self.duration_sec = duration_sec.max(MIN_CLIP_SEC);
    }
}

/// Lane within the recording timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
    pub name: String,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub solo: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub clip: Option<Clip>,
}

fn default_volume() -> f32 {
    1.0
}

impl Track {
    pub fn new(id: TrackId, kind: TrackKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            muted: false,
            solo: false,
            volume: default_volume(),
            clip: None,
        }
    }

    pub fn with_clip(mut self, clip: Clip) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    /// Whether the lane is heard given the solo state of the whole session.
    pub fn is_audible(&self, any_solo: bool) -> bool {
        !self.muted && (!any_solo || self.solo)
    }

    /// Gain actually applied to the lane; zero when muted or soloed out.
    pub fn effective_gain(&self, any_solo: bool) -> f32 {
        if self.is_audible(any_solo) {
            self.volume
        } else {
            0.0
        }
    }
}

pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, MAX_TRACK_VOLUME)
    } else {
        0.0
    }
}
