use serde::{Deserialize, Serialize};

use crate::model::{ClipId, TrackId};

/// Edge of a clip being resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeEdge {
    Start,
    End,
}

/// Requests the timeline sends to the host that owns the arrangement.
///
/// Move and resize actions are emitted on every pointer move; only the last
/// one before the pointer is released reflects the final position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TimelineAction {
    BeatClipMoved {
        start_sec: f64,
    },
    VocalClipMoved {
        clip: ClipId,
        start_sec: f64,
    },
    BeatClipResized {
        edge: ResizeEdge,
        start_sec: f64,
        duration_sec: f64,
    },
    VocalClipResized {
        track: TrackId,
        edge: ResizeEdge,
        start_sec: f64,
        duration_sec: f64,
        clip: ClipId,
    },
    AddVocalTrack,
    Seek {
        time_sec: f64,
    },
    PlayFromCursor,
    StopPlayback,
    ToggleBeatMute,
    ToggleVocalMute {
        track: TrackId,
    },
    ToggleBeatSolo,
    ToggleVocalSolo {
        track: TrackId,
    },
    BeatVolumeChanged {
        volume: f32,
    },
    VocalVolumeChanged {
        track: TrackId,
        volume: f32,
    },
    ToggleLoopRegion,
    LoopSetStart {
        time_sec: f64,
    },
    LoopSetEnd {
        time_sec: f64,
    },
    SelectBeatTrack,
    SelectVocalTrack {
        track: TrackId,
    },
    DeleteVocalClip {
        track: TrackId,
        clip: ClipId,
    },
    DeleteVocalTrack {
        track: TrackId,
    },
    SetLoopFromClip {
        start_sec: f64,
        duration_sec: f64,
    },
}
