//! Seams to the host runtime.
//!
//! Everything the coordination core delegates to the surrounding desktop
//! runtime lives behind these traits: window/surface management, user
//! notifications, tray, spellcheck dictionaries, auto-launch registration,
//! quit confirmation, and the single-instance lock. The [`local`] module
//! provides tracing-backed implementations used by the dev binary and tests.

pub mod local;
pub mod lock;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::permissions::PermissionHandler;

/// Opaque identifier for a UI surface. The router only ever compares these
/// and maps them back to servers through the view binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowControl {
    Close,
    Maximize,
    Minimize,
    Restore,
}

/// Creates, focuses, and destroys the UI surfaces for (server, tab) pairs.
/// The binding receives read-only snapshots of the selection; it never owns
/// session-store entities.
pub trait ViewBinding: Send + Sync {
    /// Reflect the given selection: show and focus its surface, hide the
    /// rest. `None` means nothing is selected.
    fn show(&self, selection: Option<(&str, &str)>);

    /// Create and focus the main surface.
    fn create_main_surface(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn focus_main(&self);

    fn window_control(&self, control: WindowControl);

    fn show_settings(&self);

    fn install_permission_handler(&self, handler: PermissionHandler);

    /// Which server the given surface is bound to, if any.
    fn server_for_surface(&self, surface: SurfaceId) -> Option<String>;

    fn is_main_surface(&self, surface: SurfaceId) -> bool;

    /// Destroy all surfaces during shutdown.
    fn teardown(&self);
}

/// User-facing notification sink.
pub trait Notifier: Send + Sync {
    fn download_complete(&self, filename: &str, path: &Path, server_display_name: &str);
}

/// Host-side decisions that need user interaction.
#[async_trait]
pub trait HostHooks: Send + Sync {
    /// Ask whether shutting down is acceptable right now (for example with
    /// downloads still pending). `false` cancels the quit.
    async fn confirm_quit(&self, reason: Option<&str>) -> bool;
}

pub trait TrayController: Send + Sync {
    fn setup(&self, minimize_to_tray: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait]
pub trait SpellcheckService: Send + Sync {
    /// Download or verify dictionaries for the configured languages.
    async fn ensure_dictionaries(
        &self,
        languages: &[String],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn available_languages(&self) -> Vec<String>;
}

pub trait AutoLaunch: Send + Sync {
    fn register(&self, enabled: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Losing the single-instance race. Not an error condition: it is how a
/// second launch defers to the running instance.
#[derive(Debug)]
pub struct AlreadyRunning;

impl fmt::Display for AlreadyRunning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "another instance already holds the lock")
    }
}

impl std::error::Error for AlreadyRunning {}

pub trait InstanceLock: Send {
    fn acquire(&mut self) -> Result<(), AlreadyRunning>;
}
