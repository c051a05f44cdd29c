//! Control-message vocabulary exchanged with UI surfaces.
//!
//! Inbound messages arrive wrapped in an [`Envelope`] carrying the opaque id
//! of the originating surface. Request/response messages embed a oneshot
//! reply sender; everything else is fire-and-forget.

use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::host::{SurfaceId, WindowControl};

/// Presence status fanned out to every surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserActivity {
    Active,
    Idle,
    Away,
}

/// Modal dialogs the main surface is asked to present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalRequest {
    NewServer,
    EditServer { server: String },
    RemoveServer { server: String },
}

#[derive(Debug)]
pub enum ControlMessage {
    SwitchServer {
        server: String,
    },
    SwitchTab {
        server: String,
        tab: String,
    },
    CloseTab {
        server: String,
        tab: String,
    },
    OpenTab {
        server: String,
        tab: String,
    },
    Quit {
        reason: Option<String>,
    },
    ShowNewServerModal,
    ShowEditServerModal {
        server: String,
    },
    ShowRemoveServerModal {
        server: String,
    },
    NotifyMention {
        server: String,
        payload: serde_json::Value,
    },
    UserActivityUpdate {
        status: UserActivity,
    },
    UpdateLastActive {
        server: String,
        tab: String,
    },
    GetAppVersion {
        reply: oneshot::Sender<String>,
    },
    GetDownloadLocation {
        reply: oneshot::Sender<PathBuf>,
    },
    GetAvailableSpellCheckerLanguages {
        reply: oneshot::Sender<Vec<String>>,
    },
    ReloadConfiguration,
    UpdateShortcutMenu,
    Window(WindowControl),
    FocusBrowserView,
    DoubleClickOnWindow,
    ShowSettingsWindow,
}

/// An inbound message plus the surface it came from.
#[derive(Debug)]
pub struct Envelope {
    pub origin: SurfaceId,
    pub message: ControlMessage,
}

impl Envelope {
    pub fn new(origin: SurfaceId, message: ControlMessage) -> Self {
        Envelope { origin, message }
    }
}

/// Messages the router emits back to surfaces.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    SelectionChanged {
        selection: Option<(String, String)>,
    },
    MentionReceived {
        payload: serde_json::Value,
    },
    ActivityBroadcast {
        status: UserActivity,
    },
    ShortcutMenuChanged,
    ShowModal(ModalRequest),
}
