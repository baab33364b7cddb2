use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::TimelineAction;
use crate::model::{ClipRef, LaneRef};

/// What a right-click landed on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum MenuTarget {
    Clip {
        clip: ClipRef,
        start_sec: f64,
        duration_sec: f64,
    },
    Lane {
        lane: LaneRef,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuItem {
    PlayFrom,
    SetLoop,
    DeleteClip,
    MuteTrack,
    SoloTrack,
    DeleteTrack,
}

impl MenuItem {
    pub fn label(self) -> &'static str {
        match self {
            MenuItem::PlayFrom => "Play from here",
            MenuItem::SetLoop => "Set loop to clip",
            MenuItem::DeleteClip => "Delete clip",
            MenuItem::MuteTrack => "Mute track",
            MenuItem::SoloTrack => "Solo track",
            MenuItem::DeleteTrack => "Delete track",
        }
    }
}

/// Screen position the menu was opened at.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MenuAnchor {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenMenu {
    pub target: MenuTarget,
    pub anchor: MenuAnchor,
}

impl OpenMenu {
    pub fn items(&self) -> Vec<MenuItem> {
        items_for(&self.target)
    }
}

/// Items offered for `target`. Delete entries only exist for vocal clips and lanes.
pub fn items_for(target: &MenuTarget) -> Vec<MenuItem> {
    match target {
        MenuTarget::Clip { clip, .. } => {
            let mut items = vec![MenuItem::PlayFrom, MenuItem::SetLoop];
            if matches!(clip, ClipRef::Vocal { .. }) {
                items.push(MenuItem::DeleteClip);
            }
            items
        }
        MenuTarget::Lane { lane } => {
            let mut items = vec![MenuItem::MuteTrack, MenuItem::SoloTrack];
            if matches!(lane, LaneRef::Vocal(_)) {
                items.push(MenuItem::DeleteTrack);
            }
            items
        }
    }
}

/// Keeps at most one context menu open.
#[derive(Debug, Default, Clone)]
pub struct ContextMenuController {
    open: Option<OpenMenu>,
}

impl ContextMenuController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_for_clip(
        &mut self,
        clip: ClipRef,
        start_sec: f64,
        duration_sec: f64,
        anchor: MenuAnchor,
    ) {
        self.open(
            MenuTarget::Clip {
                clip,
                start_sec,
                duration_sec,
            },
            anchor,
        );
    }

    pub fn open_for_lane(&mut self, lane: LaneRef, anchor: MenuAnchor) {
        self.open(MenuTarget::Lane { lane }, anchor);
    }

    /// Opens a menu for `target`, replacing any menu already open.
    pub fn open(&mut self, target: MenuTarget, anchor: MenuAnchor) {
        debug!(?target, "context menu opened");
        self.open = Some(OpenMenu { target, anchor });
    }

    pub fn current(&self) -> Option<&OpenMenu> {
        self.open.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn items(&self) -> Vec<MenuItem> {
        self.open.as_ref().map(OpenMenu::items).unwrap_or_default()
    }

    pub fn dismiss(&mut self) {
        if self.open.take().is_some() {
            debug!("context menu dismissed");
        }
    }

    /// Runs `item` against the open menu and closes it.
    pub fn dispatch(&mut self, item: MenuItem) -> Vec<TimelineAction> {
        let Some(menu) = self.open.take() else {
            return Vec::new();
        };
        if !menu.items().contains(&item) {
            debug!(?item, "menu item not offered; closing");
            return Vec::new();
        }
        debug!(?item, target = ?menu.target, "menu item dispatched");
        actions_for(item, &menu.target)
    }
}

fn actions_for(item: MenuItem, target: &MenuTarget) -> Vec<TimelineAction> {
    match (item, *target) {
        (MenuItem::PlayFrom, MenuTarget::Clip { start_sec, .. }) => vec![
            TimelineAction::Seek { time_sec: start_sec },
            TimelineAction::PlayFromCursor,
        ],
        (
            MenuItem::SetLoop,
            MenuTarget::Clip {
                start_sec,
                duration_sec,
                ..
            },
        ) => vec![TimelineAction::SetLoopFromClip {
            start_sec,
            duration_sec,
        }],
        (
            MenuItem::DeleteClip,
            MenuTarget::Clip {
                clip: ClipRef::Vocal { track, clip },
                ..
            },
        ) => vec![TimelineAction::DeleteVocalClip { track, clip }],
        (MenuItem::MuteTrack, MenuTarget::Lane { lane }) => vec![match lane {
            LaneRef::Beat => TimelineAction::ToggleBeatMute,
            LaneRef::Vocal(track) => TimelineAction::ToggleVocalMute { track },
        }],
        (MenuItem::SoloTrack, MenuTarget::Lane { lane }) => vec![match lane {
            LaneRef::Beat => TimelineAction::ToggleBeatSolo,
            LaneRef::Vocal(track) => TimelineAction::ToggleVocalSolo { track },
        }],
        (
            MenuItem::DeleteTrack,
            MenuTarget::Lane {
                lane: LaneRef::Vocal(track),
            },
        ) => vec![TimelineAction::DeleteVocalTrack { track }],
        _ => Vec::new(),
    }
}
