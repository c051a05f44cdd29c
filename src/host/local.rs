//! In-process host implementations backed by tracing.
//!
//! These stand in for the real desktop runtime when running the binary
//! headless and when exercising the router and orchestrator in tests. They
//! record enough state to be observable without rendering anything.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::host::{
    AutoLaunch, HostHooks, Notifier, SpellcheckService, SurfaceId, TrayController, ViewBinding,
    WindowControl,
};
use crate::permissions::PermissionHandler;

#[derive(Default)]
pub struct LocalViewBinding {
    surfaces: Mutex<HashMap<SurfaceId, String>>,
    shown: Mutex<Option<(String, String)>>,
    permission_handler: Mutex<Option<PermissionHandler>>,
    main_created: AtomicBool,
    torn_down: AtomicBool,
}

impl LocalViewBinding {
    pub fn new() -> Self {
        LocalViewBinding::default()
    }

    /// Register which server a surface renders. Surface 0 is the main
    /// surface and carries no server binding.
    pub fn bind_surface(&self, surface: SurfaceId, server: impl Into<String>) {
        self.surfaces
            .lock()
            .expect("surface map poisoned")
            .insert(surface, server.into());
    }

    pub fn shown(&self) -> Option<(String, String)> {
        self.shown.lock().expect("shown state poisoned").clone()
    }

    pub fn permission_handler(&self) -> Option<PermissionHandler> {
        self.permission_handler
            .lock()
            .expect("handler slot poisoned")
            .clone()
    }

    pub fn main_surface_created(&self) -> bool {
        self.main_created.load(Ordering::SeqCst)
    }

    pub fn torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

impl ViewBinding for LocalViewBinding {
    fn show(&self, selection: Option<(&str, &str)>) {
        debug!(?selection, "view binding: show");
        *self.shown.lock().expect("shown state poisoned") =
            selection.map(|(s, t)| (s.to_string(), t.to_string()));
    }

    fn create_main_surface(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("view binding: main surface created");
        self.main_created.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn focus_main(&self) {
        debug!("view binding: focus main");
    }

    fn window_control(&self, control: WindowControl) {
        debug!(?control, "view binding: window control");
    }

    fn show_settings(&self) {
        debug!("view binding: show settings");
    }

    fn install_permission_handler(&self, handler: PermissionHandler) {
        *self.permission_handler.lock().expect("handler slot poisoned") = Some(handler);
    }

    fn server_for_surface(&self, surface: SurfaceId) -> Option<String> {
        self.surfaces
            .lock()
            .expect("surface map poisoned")
            .get(&surface)
            .cloned()
    }

    fn is_main_surface(&self, surface: SurfaceId) -> bool {
        surface == SurfaceId(0)
    }

    fn teardown(&self) {
        info!("view binding: teardown");
        self.torn_down.store(true, Ordering::SeqCst);
    }
}

/// Records notifications instead of displaying them.
#[derive(Default)]
pub struct LocalNotifier {
    downloads: Mutex<Vec<(String, PathBuf, String)>>,
}

impl LocalNotifier {
    pub fn new() -> Self {
        LocalNotifier::default()
    }

    pub fn downloads(&self) -> Vec<(String, PathBuf, String)> {
        self.downloads.lock().expect("notifier poisoned").clone()
    }
}

impl Notifier for LocalNotifier {
    fn download_complete(&self, filename: &str, path: &Path, server_display_name: &str) {
        info!(filename, ?path, server = server_display_name, "download complete");
        self.downloads.lock().expect("notifier poisoned").push((
            filename.to_string(),
            path.to_path_buf(),
            server_display_name.to_string(),
        ));
    }
}

/// Answers quit confirmations with a fixed decision.
pub struct FixedQuitAnswer {
    accept: bool,
}

impl FixedQuitAnswer {
    pub fn accepting() -> Self {
        FixedQuitAnswer { accept: true }
    }

    pub fn declining() -> Self {
        FixedQuitAnswer { accept: false }
    }
}

#[async_trait]
impl HostHooks for FixedQuitAnswer {
    async fn confirm_quit(&self, reason: Option<&str>) -> bool {
        debug!(?reason, accept = self.accept, "quit confirmation");
        self.accept
    }
}

pub struct LocalTray;

impl TrayController for LocalTray {
    fn setup(&self, minimize_to_tray: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(minimize_to_tray, "tray initialized");
        Ok(())
    }
}

/// Serves the configured language list without downloading anything.
pub struct LocalSpellcheck {
    languages: Vec<String>,
}

impl LocalSpellcheck {
    pub fn new(languages: Vec<String>) -> Self {
        LocalSpellcheck { languages }
    }
}

#[async_trait]
impl SpellcheckService for LocalSpellcheck {
    async fn ensure_dictionaries(
        &self,
        languages: &[String],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(?languages, "spellcheck dictionaries verified");
        Ok(())
    }

    fn available_languages(&self) -> Vec<String> {
        self.languages.clone()
    }
}

pub struct LocalAutoLaunch;

impl AutoLaunch for LocalAutoLaunch {
    fn register(&self, enabled: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(enabled, "auto-launch registration");
        Ok(())
    }
}
