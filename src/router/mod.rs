//! Control router: the single dispatch point between UI surfaces and the
//! session store.
//!
//! The router owns the [`SessionStore`] outright and runs as one task
//! draining an unbounded channel, so every mutation is serialized by
//! construction; no locking happens around store state. Handlers are
//! idempotent with respect to redelivery, and a store error drops the
//! offending message with a log line rather than surfacing a failure to the
//! user.

pub mod messages;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::config::Config;
use crate::core::session::{Server, SessionStore};
use crate::core::state::AppState;
use crate::host::{HostHooks, SpellcheckService, SurfaceId, ViewBinding, WindowControl};

pub use messages::{ControlMessage, Envelope, ModalRequest, OutboundMessage, UserActivity};

struct SurfaceRegistration {
    id: SurfaceId,
    /// Server this surface renders; `None` marks the main surface.
    server: Option<String>,
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

pub struct ControlRouter {
    store: SessionStore,
    state: Arc<AppState>,
    binding: Arc<dyn ViewBinding>,
    hooks: Arc<dyn HostHooks>,
    spellcheck: Arc<dyn SpellcheckService>,
    surfaces: Vec<SurfaceRegistration>,
    config_path: PathBuf,
    download_dir: PathBuf,
    version: String,
}

impl ControlRouter {
    pub fn new(
        store: SessionStore,
        state: Arc<AppState>,
        binding: Arc<dyn ViewBinding>,
        hooks: Arc<dyn HostHooks>,
        spellcheck: Arc<dyn SpellcheckService>,
        config: &Config,
        config_path: PathBuf,
    ) -> Self {
        ControlRouter {
            store,
            state,
            binding,
            hooks,
            spellcheck,
            surfaces: Vec::new(),
            config_path,
            download_dir: config.download_dir(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Register a surface's outbound channel. The main surface registers
    /// with no server binding.
    pub fn register_surface(
        &mut self,
        id: SurfaceId,
        server: Option<String>,
        tx: mpsc::UnboundedSender<OutboundMessage>,
    ) {
        self.surfaces.retain(|s| s.id != id);
        self.surfaces.push(SurfaceRegistration { id, server, tx });
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Drain the inbound channel until it closes. This loop is the single
    /// writer of the session store.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        while let Some(envelope) = rx.recv().await {
            self.handle(envelope).await;
        }
        debug!("control channel closed, router stopping");
    }

    pub async fn handle(&mut self, envelope: Envelope) {
        if self.state.is_quitting() {
            debug!(message = ?envelope.message, "quitting, control message dropped");
            return;
        }
        match envelope.message {
            ControlMessage::SwitchServer { server } => {
                let tab = self
                    .store
                    .server(&server)
                    .and_then(Server::current_tab)
                    .map(|t| t.name.clone());
                match tab {
                    Some(tab) => self.apply_selection(&server, &tab),
                    None => warn!(server = %server, "switch-server dropped: no open tab"),
                }
            }
            ControlMessage::SwitchTab { server, tab } => {
                self.apply_selection(&server, &tab);
            }
            ControlMessage::CloseTab { server, tab } => {
                match self.store.close_tab(&server, &tab) {
                    Ok(()) => self.reflect_selection(),
                    Err(e) => warn!(error = %e, "close-tab dropped"),
                }
            }
            ControlMessage::OpenTab { server, tab } => {
                match self.store.open_tab(&server, &tab) {
                    Ok(()) => self.reflect_selection(),
                    Err(e) => warn!(error = %e, "open-tab dropped"),
                }
            }
            ControlMessage::Quit { reason } => {
                if !self.hooks.confirm_quit(reason.as_deref()).await {
                    debug!("quit declined by host");
                    return;
                }
                if self.state.request_quit() {
                    info!("quit confirmed, tearing down surfaces");
                    self.binding.teardown();
                }
            }
            ControlMessage::ShowNewServerModal => {
                self.send_to_main(OutboundMessage::ShowModal(ModalRequest::NewServer));
            }
            ControlMessage::ShowEditServerModal { server } => {
                self.send_to_main(OutboundMessage::ShowModal(ModalRequest::EditServer {
                    server,
                }));
            }
            ControlMessage::ShowRemoveServerModal { server } => {
                self.send_to_main(OutboundMessage::ShowModal(ModalRequest::RemoveServer {
                    server,
                }));
            }
            ControlMessage::NotifyMention { server, payload } => {
                let mut delivered = false;
                for surface in &self.surfaces {
                    if surface.server.as_deref() == Some(server.as_str()) {
                        let _ = surface.tx.send(OutboundMessage::MentionReceived {
                            payload: payload.clone(),
                        });
                        delivered = true;
                    }
                }
                if !delivered {
                    // The surface may simply not exist yet; not an error.
                    debug!(server = %server, "mention had no registered surface");
                }
            }
            ControlMessage::UserActivityUpdate { status } => {
                self.broadcast(OutboundMessage::ActivityBroadcast { status });
            }
            ControlMessage::UpdateLastActive { server, tab } => {
                if let Err(e) = self.store.touch(&server, &tab) {
                    warn!(error = %e, "update-last-active dropped");
                }
            }
            ControlMessage::GetAppVersion { reply } => {
                let _ = reply.send(self.version.clone());
            }
            ControlMessage::GetDownloadLocation { reply } => {
                let _ = reply.send(self.download_dir.clone());
            }
            ControlMessage::GetAvailableSpellCheckerLanguages { reply } => {
                let _ = reply.send(self.spellcheck.available_languages());
            }
            ControlMessage::ReloadConfiguration => match Config::load_from_path(&self.config_path)
            {
                Ok(config) => {
                    self.store.reconcile(&config);
                    self.download_dir = config.download_dir();
                    self.broadcast(OutboundMessage::ShortcutMenuChanged);
                    self.reflect_selection();
                }
                Err(e) => warn!(error = %e, "configuration reload failed"),
            },
            ControlMessage::UpdateShortcutMenu => {
                self.broadcast(OutboundMessage::ShortcutMenuChanged);
            }
            ControlMessage::Window(control) => {
                self.binding.window_control(control);
            }
            ControlMessage::FocusBrowserView => {
                self.binding.show(self.store.active());
            }
            ControlMessage::DoubleClickOnWindow => {
                // The binding owns the maximize/restore toggle state.
                self.binding.window_control(WindowControl::Maximize);
            }
            ControlMessage::ShowSettingsWindow => {
                self.binding.show_settings();
            }
        }
    }

    fn apply_selection(&mut self, server: &str, tab: &str) {
        match self.store.set_active(server, tab) {
            Ok(()) => self.reflect_selection(),
            Err(e) => warn!(error = %e, "switch dropped"),
        }
    }

    /// Push the current selection to the view binding and every surface.
    fn reflect_selection(&self) {
        self.binding.show(self.store.active());
        let selection = self
            .store
            .active()
            .map(|(s, t)| (s.to_string(), t.to_string()));
        self.broadcast(OutboundMessage::SelectionChanged { selection });
    }

    fn broadcast(&self, message: OutboundMessage) {
        for surface in &self.surfaces {
            let _ = surface.tx.send(message.clone());
        }
    }

    fn send_to_main(&self, message: OutboundMessage) {
        match self.surfaces.iter().find(|s| s.server.is_none()) {
            Some(main) => {
                let _ = main.tx.send(message);
            }
            None => debug!("no main surface registered for outbound message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ServerDescriptor;
    use crate::core::session::DEFAULT_TAB;
    use crate::host::local::{FixedQuitAnswer, LocalSpellcheck, LocalViewBinding};
    use tokio::sync::oneshot;

    struct Fixture {
        router: ControlRouter,
        binding: Arc<LocalViewBinding>,
        state: Arc<AppState>,
    }

    fn fixture_with(accept_quit: bool, servers: &[&str]) -> Fixture {
        let mut config = Config::default();
        for name in servers {
            config.add_server(ServerDescriptor::new(
                *name,
                format!("https://{}.example", name.to_lowercase()),
            ));
        }
        let store = SessionStore::from_config(&config);
        let state = Arc::new(AppState::new(false));
        let binding = Arc::new(LocalViewBinding::new());
        let hooks: Arc<dyn HostHooks> = if accept_quit {
            Arc::new(FixedQuitAnswer::accepting())
        } else {
            Arc::new(FixedQuitAnswer::declining())
        };
        let spellcheck = Arc::new(LocalSpellcheck::new(vec![
            "en-US".to_string(),
            "de-DE".to_string(),
        ]));
        let router = ControlRouter::new(
            store,
            state.clone(),
            binding.clone(),
            hooks,
            spellcheck,
            &config,
            PathBuf::from("/nonexistent/config.toml"),
        );
        Fixture {
            router,
            binding,
            state,
        }
    }

    fn envelope(message: ControlMessage) -> Envelope {
        Envelope::new(SurfaceId(1), message)
    }

    #[tokio::test]
    async fn switch_tab_updates_selection_and_view() {
        let mut fx = fixture_with(true, &["A", "B"]);
        fx.router
            .handle(envelope(ControlMessage::OpenTab {
                server: "B".to_string(),
                tab: "team".to_string(),
            }))
            .await;
        fx.router
            .handle(envelope(ControlMessage::SwitchTab {
                server: "B".to_string(),
                tab: "team".to_string(),
            }))
            .await;

        assert_eq!(fx.router.store().active(), Some(("B", "team")));
        assert_eq!(
            fx.binding.shown(),
            Some(("B".to_string(), "team".to_string()))
        );
    }

    #[tokio::test]
    async fn switch_server_lands_on_current_tab() {
        let mut fx = fixture_with(true, &["A", "B"]);
        fx.router
            .handle(envelope(ControlMessage::SwitchServer {
                server: "B".to_string(),
            }))
            .await;
        assert_eq!(fx.router.store().active(), Some(("B", DEFAULT_TAB)));
    }

    #[tokio::test]
    async fn unknown_targets_are_dropped_without_state_change() {
        let mut fx = fixture_with(true, &["A"]);
        let before = fx
            .router
            .store()
            .active()
            .map(|(s, t)| (s.to_string(), t.to_string()));

        fx.router
            .handle(envelope(ControlMessage::SwitchTab {
                server: "Nope".to_string(),
                tab: "home".to_string(),
            }))
            .await;
        fx.router
            .handle(envelope(ControlMessage::CloseTab {
                server: "A".to_string(),
                tab: "ghost".to_string(),
            }))
            .await;

        let after = fx
            .router
            .store()
            .active()
            .map(|(s, t)| (s.to_string(), t.to_string()));
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn redelivered_switch_is_idempotent() {
        let mut fx = fixture_with(true, &["A", "B"]);
        for _ in 0..2 {
            fx.router
                .handle(envelope(ControlMessage::SwitchTab {
                    server: "B".to_string(),
                    tab: DEFAULT_TAB.to_string(),
                }))
                .await;
        }
        assert_eq!(fx.router.store().active(), Some(("B", DEFAULT_TAB)));
    }

    #[tokio::test]
    async fn declined_quit_changes_nothing() {
        let mut fx = fixture_with(false, &["A"]);
        fx.router
            .handle(envelope(ControlMessage::Quit {
                reason: Some("download pending".to_string()),
            }))
            .await;

        assert!(!fx.state.is_quitting());
        assert!(!fx.binding.torn_down());
    }

    #[tokio::test]
    async fn confirmed_quit_tears_down_once_and_silences_the_router() {
        let mut fx = fixture_with(true, &["A"]);
        fx.router
            .handle(envelope(ControlMessage::Quit { reason: None }))
            .await;
        assert!(fx.state.is_quitting());
        assert!(fx.binding.torn_down());

        // Every later message is a no-op, including another quit.
        fx.router
            .handle(envelope(ControlMessage::SwitchTab {
                server: "A".to_string(),
                tab: DEFAULT_TAB.to_string(),
            }))
            .await;
        fx.router
            .handle(envelope(ControlMessage::Quit { reason: None }))
            .await;
        assert_eq!(fx.binding.shown(), None);
    }

    #[tokio::test]
    async fn mention_reaches_only_the_targeted_server_surface() {
        let mut fx = fixture_with(true, &["A", "B"]);
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        fx.router
            .register_surface(SurfaceId(1), Some("A".to_string()), tx_a);
        fx.router
            .register_surface(SurfaceId(2), Some("B".to_string()), tx_b);

        fx.router
            .handle(envelope(ControlMessage::NotifyMention {
                server: "B".to_string(),
                payload: serde_json::json!({ "channel": "town-square" }),
            }))
            .await;

        assert!(matches!(
            rx_b.try_recv(),
            Ok(OutboundMessage::MentionReceived { .. })
        ));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn activity_updates_broadcast_to_every_surface() {
        let mut fx = fixture_with(true, &["A", "B"]);
        let (tx_main, mut rx_main) = mpsc::unbounded_channel();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        fx.router.register_surface(SurfaceId(0), None, tx_main);
        fx.router
            .register_surface(SurfaceId(1), Some("A".to_string()), tx_a);

        fx.router
            .handle(envelope(ControlMessage::UserActivityUpdate {
                status: UserActivity::Away,
            }))
            .await;

        for rx in [&mut rx_main, &mut rx_a] {
            assert!(matches!(
                rx.try_recv(),
                Ok(OutboundMessage::ActivityBroadcast {
                    status: UserActivity::Away
                })
            ));
        }
    }

    #[tokio::test]
    async fn modal_requests_go_to_the_main_surface() {
        let mut fx = fixture_with(true, &["A"]);
        let (tx_main, mut rx_main) = mpsc::unbounded_channel();
        fx.router.register_surface(SurfaceId(0), None, tx_main);

        fx.router
            .handle(envelope(ControlMessage::ShowRemoveServerModal {
                server: "A".to_string(),
            }))
            .await;

        match rx_main.try_recv() {
            Ok(OutboundMessage::ShowModal(ModalRequest::RemoveServer { server })) => {
                assert_eq!(server, "A");
            }
            other => panic!("unexpected outbound message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_response_messages_answer_once() {
        let mut fx = fixture_with(true, &["A"]);

        let (tx, rx) = oneshot::channel();
        fx.router
            .handle(envelope(ControlMessage::GetAppVersion { reply: tx }))
            .await;
        assert_eq!(rx.await.expect("no version reply"), env!("CARGO_PKG_VERSION"));

        let (tx, rx) = oneshot::channel();
        fx.router
            .handle(envelope(ControlMessage::GetAvailableSpellCheckerLanguages { reply: tx }))
            .await;
        assert_eq!(
            rx.await.expect("no language reply"),
            vec!["en-US".to_string(), "de-DE".to_string()]
        );

        let (tx, rx) = oneshot::channel();
        fx.router
            .handle(envelope(ControlMessage::GetDownloadLocation { reply: tx }))
            .await;
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn reload_reconciles_the_store_from_disk() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.add_server(ServerDescriptor::new("A", "https://a.example"));
        config.save_to_path(&config_path).expect("save failed");

        let store = SessionStore::from_config(&config);
        let state = Arc::new(AppState::new(false));
        let binding = Arc::new(LocalViewBinding::new());
        let mut router = ControlRouter::new(
            store,
            state,
            binding,
            Arc::new(FixedQuitAnswer::accepting()),
            Arc::new(LocalSpellcheck::new(vec![])),
            &config,
            config_path.clone(),
        );

        // Externally rewrite the config: A disappears, C appears.
        let mut rewritten = Config::default();
        rewritten.add_server(ServerDescriptor::new("C", "https://c.example"));
        rewritten.save_to_path(&config_path).expect("save failed");

        router
            .handle(envelope(ControlMessage::ReloadConfiguration))
            .await;

        assert!(router.store().server("A").is_none());
        assert!(router.store().server("C").is_some());
        assert_eq!(router.store().active(), Some(("C", DEFAULT_TAB)));
    }
}
