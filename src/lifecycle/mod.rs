//! Phased startup orchestrator.
//!
//! Initialization runs through an explicit ordered list of phases
//! ([`Phase::ORDER`]), each phase relying only on what earlier phases
//! established: configuration is loaded before anything reads it, the
//! single-instance lock is held before any surface exists, the router is
//! armed before surfaces are created, and the main surface exists before
//! activity events are wired to it.
//!
//! Two conditions end initialization early. A configuration that fails to
//! load is fatal: no handlers are armed and no surfaces are created. Losing
//! the single-instance race is not an error at all; the process defers to
//! the running instance ([`InitOutcome::Deferred`]). Every other failure is
//! logged and the sequence continues.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::config::Config;
use crate::core::session::SessionStore;
use crate::core::state::AppState;
use crate::downloads::DownloadTracker;
use crate::host::{
    AutoLaunch, HostHooks, InstanceLock, SpellcheckService, SurfaceId, TrayController, ViewBinding,
};
use crate::permissions;
use crate::router::{ControlMessage, ControlRouter, Envelope, OutboundMessage, UserActivity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoadConfig,
    AwaitHostReady,
    AcquireInstanceLock,
    ArmRouter,
    CreateMainSurface,
    SetupTray,
    SetupSpellcheck,
    RegisterAutoLaunch,
    InstallPermissionHandler,
    WireActivityEvents,
}

impl Phase {
    /// The complete startup sequence, in execution order.
    pub const ORDER: &'static [Phase] = &[
        Phase::LoadConfig,
        Phase::AwaitHostReady,
        Phase::AcquireInstanceLock,
        Phase::ArmRouter,
        Phase::CreateMainSurface,
        Phase::SetupTray,
        Phase::SetupSpellcheck,
        Phase::RegisterAutoLaunch,
        Phase::InstallPermissionHandler,
        Phase::WireActivityEvents,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::LoadConfig => "load-config",
            Phase::AwaitHostReady => "await-host-ready",
            Phase::AcquireInstanceLock => "acquire-instance-lock",
            Phase::ArmRouter => "arm-router",
            Phase::CreateMainSurface => "create-main-surface",
            Phase::SetupTray => "setup-tray",
            Phase::SetupSpellcheck => "setup-spellcheck",
            Phase::RegisterAutoLaunch => "register-auto-launch",
            Phase::InstallPermissionHandler => "install-permission-handler",
            Phase::WireActivityEvents => "wire-activity-events",
        }
    }
}

/// The single fatal startup error.
#[derive(Debug)]
pub enum InitError {
    ConfigLoad(String),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::ConfigLoad(e) => write!(f, "configuration failed to load: {e}"),
        }
    }
}

impl std::error::Error for InitError {}

/// Host collaborators the orchestrator wires together.
pub struct HostServices {
    pub binding: Arc<dyn ViewBinding>,
    pub hooks: Arc<dyn HostHooks>,
    pub spellcheck: Arc<dyn SpellcheckService>,
    pub tray: Arc<dyn TrayController>,
    pub auto_launch: Arc<dyn AutoLaunch>,
    pub lock: Box<dyn InstanceLock>,
}

/// Handles produced by a completed initialization.
pub struct Initialized {
    pub config: Config,
    pub control_tx: mpsc::UnboundedSender<Envelope>,
    pub router_task: JoinHandle<()>,
    pub main_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    pub server_rx: Vec<(String, mpsc::UnboundedReceiver<OutboundMessage>)>,
    pub downloads: DownloadTracker,
}

pub enum InitOutcome {
    Running(Box<Initialized>),
    /// Another instance holds the lock, or quitting was requested before
    /// startup finished.
    Deferred,
}

enum Flow {
    Continue,
    Defer,
}

pub struct Orchestrator {
    state: Arc<AppState>,
    data_dir: Option<PathBuf>,
    services: HostServices,
    ready: watch::Receiver<bool>,
    config: Option<Config>,
    armed: Option<Armed>,
}

struct Armed {
    control_tx: mpsc::UnboundedSender<Envelope>,
    router_task: JoinHandle<()>,
    main_rx: Option<mpsc::UnboundedReceiver<OutboundMessage>>,
    server_rx: Vec<(String, mpsc::UnboundedReceiver<OutboundMessage>)>,
}

impl Orchestrator {
    pub fn new(
        state: Arc<AppState>,
        data_dir: Option<PathBuf>,
        services: HostServices,
        ready: watch::Receiver<bool>,
    ) -> Self {
        Orchestrator {
            state,
            data_dir,
            services,
            ready,
            config: None,
            armed: None,
        }
    }

    /// Run the startup sequence. Consumes the orchestrator, so it runs at
    /// most once per process.
    pub async fn initialize(mut self) -> Result<InitOutcome, InitError> {
        for phase in Phase::ORDER {
            if self.state.is_quitting() {
                info!(phase = phase.name(), "quitting, initialization stopped");
                return Ok(InitOutcome::Deferred);
            }
            debug!(phase = phase.name(), "startup phase");
            match self.run_phase(*phase).await? {
                Flow::Continue => {}
                Flow::Defer => return Ok(InitOutcome::Deferred),
            }
        }

        let config = self.config.take().expect("config set by load-config");
        let armed = self.armed.take().expect("router set by arm-router");
        let downloads = DownloadTracker::new(config.download_dir());
        info!("initialization complete");
        Ok(InitOutcome::Running(Box::new(Initialized {
            config,
            control_tx: armed.control_tx,
            router_task: armed.router_task,
            main_rx: armed.main_rx.expect("main channel set by arm-router"),
            server_rx: armed.server_rx,
            downloads,
        })))
    }

    async fn run_phase(&mut self, phase: Phase) -> Result<Flow, InitError> {
        match phase {
            Phase::LoadConfig => {
                let config = Config::load(self.data_dir.as_deref()).map_err(|e| {
                    error!(error = %e, "configuration failed to load, aborting startup");
                    InitError::ConfigLoad(e.to_string())
                })?;
                self.config = Some(config);
                Ok(Flow::Continue)
            }
            Phase::AwaitHostReady => {
                loop {
                    if self.state.is_quitting() {
                        return Ok(Flow::Defer);
                    }
                    if *self.ready.borrow() {
                        break;
                    }
                    if self.ready.changed().await.is_err() {
                        // Host went away before signalling readiness.
                        return Ok(Flow::Defer);
                    }
                }
                if self.state.is_quitting() {
                    return Ok(Flow::Defer);
                }
                Ok(Flow::Continue)
            }
            Phase::AcquireInstanceLock => match self.services.lock.acquire() {
                Ok(()) => Ok(Flow::Continue),
                Err(_) => {
                    info!("another instance is running, deferring to it");
                    self.state.request_quit();
                    Ok(Flow::Defer)
                }
            },
            Phase::ArmRouter => {
                let config = self.config.as_ref().expect("config loaded");
                let store = SessionStore::from_config(config);
                let mut router = ControlRouter::new(
                    store,
                    self.state.clone(),
                    self.services.binding.clone(),
                    self.services.hooks.clone(),
                    self.services.spellcheck.clone(),
                    config,
                    Config::config_path(self.data_dir.as_deref()),
                );

                let (main_tx, main_rx) = mpsc::unbounded_channel();
                router.register_surface(SurfaceId(0), None, main_tx);
                let server_names: Vec<String> = router
                    .store()
                    .list_servers()
                    .iter()
                    .map(|s| s.name.clone())
                    .collect();
                let mut server_rx = Vec::new();
                for (index, name) in server_names.into_iter().enumerate() {
                    let (tx, rx) = mpsc::unbounded_channel();
                    server_rx.push((name.clone(), rx));
                    // Surface ids start at 1; 0 is the main surface.
                    router.register_surface(SurfaceId(index as u64 + 1), Some(name), tx);
                }

                let (control_tx, control_rx) = mpsc::unbounded_channel();
                let router_task = tokio::spawn(router.run(control_rx));
                self.armed = Some(Armed {
                    control_tx,
                    router_task,
                    main_rx: Some(main_rx),
                    server_rx,
                });
                Ok(Flow::Continue)
            }
            Phase::CreateMainSurface => {
                if let Err(e) = self.services.binding.create_main_surface() {
                    warn!(error = %e, "main surface creation failed, continuing");
                } else {
                    self.services.binding.focus_main();
                }
                Ok(Flow::Continue)
            }
            Phase::SetupTray => {
                let minimize = self
                    .config
                    .as_ref()
                    .map(|c| c.minimize_to_tray)
                    .unwrap_or(false);
                if let Err(e) = self.services.tray.setup(minimize) {
                    warn!(error = %e, "tray setup failed, continuing");
                }
                Ok(Flow::Continue)
            }
            Phase::SetupSpellcheck => {
                let spellcheck = self.services.spellcheck.clone();
                let languages = self
                    .config
                    .as_ref()
                    .map(|c| c.spellcheck_languages.clone())
                    .unwrap_or_default();
                // Fire and forget; a dictionary download must not stall startup.
                tokio::spawn(async move {
                    if let Err(e) = spellcheck.ensure_dictionaries(&languages).await {
                        warn!(error = %e, "spellcheck dictionary setup failed");
                    }
                });
                Ok(Flow::Continue)
            }
            Phase::RegisterAutoLaunch => {
                let enabled = self
                    .config
                    .as_ref()
                    .map(|c| c.auto_launch)
                    .unwrap_or(false);
                if let Err(e) = self.services.auto_launch.register(enabled) {
                    warn!(error = %e, "auto-launch registration failed, continuing");
                }
                Ok(Flow::Continue)
            }
            Phase::InstallPermissionHandler => {
                let trusted = self
                    .config
                    .as_ref()
                    .map(|c| c.trusted_urls())
                    .unwrap_or_default();
                self.services
                    .binding
                    .install_permission_handler(permissions::handler_for(trusted));
                Ok(Flow::Continue)
            }
            Phase::WireActivityEvents => {
                let armed = self.armed.as_ref().expect("router armed");
                let _ = armed.control_tx.send(Envelope::new(
                    SurfaceId(0),
                    ControlMessage::UserActivityUpdate {
                        status: UserActivity::Active,
                    },
                ));
                Ok(Flow::Continue)
            }
        }
    }
}
