//! Session store: configured servers, their tabs, and the active selection.
//!
//! Pure in-memory state with no I/O. The store is owned exclusively by the
//! control router, which is the single writer; every operation either fully
//! applies or leaves the store untouched.
//!
//! Tab recency uses a monotonic activation counter owned by the store.
//! Stamps are unique, so "next-most-recently-active" is deterministic; tabs
//! that were never activated (stamp 0) fall back to insertion order.

use std::fmt;

use crate::core::config::{Config, ServerDescriptor};

/// Name of the tab every server starts with.
pub const DEFAULT_TAB: &str = "home";

#[derive(Debug)]
pub enum SessionError {
    /// An equivalent server (same name or normalized URL) already exists.
    DuplicateServer { name: String },
    /// The named server is not configured.
    UnknownServer { server: String },
    /// The named tab does not exist on the server.
    UnknownTab { server: String, tab: String },
    /// The tab exists but is closed and cannot be activated.
    TabClosed { server: String, tab: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::DuplicateServer { name } => {
                write!(f, "a server equivalent to '{name}' already exists")
            }
            SessionError::UnknownServer { server } => {
                write!(f, "unknown server '{server}'")
            }
            SessionError::UnknownTab { server, tab } => {
                write!(f, "unknown tab '{tab}' on server '{server}'")
            }
            SessionError::TabClosed { server, tab } => {
                write!(f, "tab '{tab}' on server '{server}' is closed")
            }
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug, Clone)]
pub struct Tab {
    pub name: String,
    pub open: bool,
    last_activated: u64,
}

impl Tab {
    fn new(name: impl Into<String>, open: bool) -> Self {
        Tab {
            name: name.into(),
            open,
            last_activated: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Server {
    pub name: String,
    pub url: String,
    tabs: Vec<Tab>,
}

impl Server {
    fn new(descriptor: &ServerDescriptor) -> Self {
        Server {
            name: descriptor.name.clone(),
            url: descriptor.url.clone(),
            tabs: vec![Tab::new(DEFAULT_TAB, true)],
        }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab(&self, name: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.name == name)
    }

    fn tab_mut(&mut self, name: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.name == name)
    }

    /// The server's current tab: the open tab with the highest activation
    /// stamp. A strictly-greater comparison keeps insertion order as the
    /// tie-break for never-activated tabs.
    pub fn current_tab(&self) -> Option<&Tab> {
        self.tabs
            .iter()
            .filter(|t| t.open)
            .fold(None, |best: Option<&Tab>, tab| match best {
                Some(b) if tab.last_activated > b.last_activated => Some(tab),
                None => Some(tab),
                keep => keep,
            })
    }

    fn descriptor(&self) -> ServerDescriptor {
        ServerDescriptor::new(self.name.clone(), self.url.clone())
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    servers: Vec<Server>,
    active: Option<(String, String)>,
    clock: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore::default()
    }

    /// Materialize the store from persisted configuration: one server per
    /// descriptor, each with its default tab open, the first server active.
    pub fn from_config(config: &Config) -> Self {
        let mut store = SessionStore::new();
        for descriptor in &config.servers {
            // Equivalent duplicates in a hand-edited config are collapsed.
            let _ = store.add_server(descriptor.clone());
        }
        store
    }

    pub fn list_servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn server(&self, name: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.name == name)
    }

    pub fn active(&self) -> Option<(&str, &str)> {
        self.active
            .as_ref()
            .map(|(s, t)| (s.as_str(), t.as_str()))
    }

    fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn add_server(&mut self, descriptor: ServerDescriptor) -> Result<(), SessionError> {
        if self
            .servers
            .iter()
            .any(|s| s.descriptor().is_equivalent(&descriptor))
        {
            return Err(SessionError::DuplicateServer {
                name: descriptor.name,
            });
        }
        let server = Server::new(&descriptor);
        let name = server.name.clone();
        self.servers.push(server);
        if self.active.is_none() {
            let stamp = self.next_stamp();
            if let Some(tab) = self
                .servers
                .iter_mut()
                .find(|s| s.name == name)
                .and_then(|s| s.tab_mut(DEFAULT_TAB))
            {
                tab.last_activated = stamp;
            }
            self.active = Some((name, DEFAULT_TAB.to_string()));
        }
        Ok(())
    }

    /// Destroy a server and all its tabs. Removing the active server empties
    /// the selection; the caller decides what becomes active next.
    pub fn remove_server(&mut self, name: &str) -> Result<(), SessionError> {
        if self.server(name).is_none() {
            return Err(SessionError::UnknownServer {
                server: name.to_string(),
            });
        }
        self.servers.retain(|s| s.name != name);
        if matches!(&self.active, Some((s, _)) if s == name) {
            self.active = None;
        }
        Ok(())
    }

    /// Mark a tab open, creating it if it does not exist yet. The active
    /// selection is unchanged.
    pub fn open_tab(&mut self, server: &str, tab: &str) -> Result<(), SessionError> {
        let srv = self
            .servers
            .iter_mut()
            .find(|s| s.name == server)
            .ok_or_else(|| SessionError::UnknownServer {
                server: server.to_string(),
            })?;
        match srv.tab_mut(tab) {
            Some(existing) => existing.open = true,
            None => srv.tabs.push(Tab::new(tab, true)),
        }
        Ok(())
    }

    /// Mark a tab closed, retaining its state. Closing the active tab moves
    /// the selection to the server's next-most-recently-activated open tab,
    /// or empties it when none remain open.
    pub fn close_tab(&mut self, server: &str, tab: &str) -> Result<(), SessionError> {
        let srv = self
            .servers
            .iter_mut()
            .find(|s| s.name == server)
            .ok_or_else(|| SessionError::UnknownServer {
                server: server.to_string(),
            })?;
        let target = srv.tab_mut(tab).ok_or_else(|| SessionError::UnknownTab {
            server: server.to_string(),
            tab: tab.to_string(),
        })?;
        target.open = false;

        if matches!(&self.active, Some((s, t)) if s == server && t == tab) {
            let fallback = self
                .server(server)
                .and_then(Server::current_tab)
                .map(|t| t.name.clone());
            self.active = fallback.map(|t| (server.to_string(), t));
        }
        Ok(())
    }

    /// Make (server, tab) the active selection and record the tab as the
    /// server's last active.
    pub fn set_active(&mut self, server: &str, tab: &str) -> Result<(), SessionError> {
        self.check_open(server, tab)?;
        let stamp = self.next_stamp();
        if let Some(t) = self
            .servers
            .iter_mut()
            .find(|s| s.name == server)
            .and_then(|s| s.tab_mut(tab))
        {
            t.last_activated = stamp;
        }
        self.active = Some((server.to_string(), tab.to_string()));
        Ok(())
    }

    /// Record activation recency for a tab without moving the selection.
    pub fn touch(&mut self, server: &str, tab: &str) -> Result<(), SessionError> {
        self.check_open(server, tab)?;
        let stamp = self.next_stamp();
        if let Some(t) = self
            .servers
            .iter_mut()
            .find(|s| s.name == server)
            .and_then(|s| s.tab_mut(tab))
        {
            t.last_activated = stamp;
        }
        Ok(())
    }

    fn check_open(&self, server: &str, tab: &str) -> Result<(), SessionError> {
        let srv = self.server(server).ok_or_else(|| SessionError::UnknownServer {
            server: server.to_string(),
        })?;
        let t = srv.tab(tab).ok_or_else(|| SessionError::UnknownTab {
            server: server.to_string(),
            tab: tab.to_string(),
        })?;
        if !t.open {
            return Err(SessionError::TabClosed {
                server: server.to_string(),
                tab: tab.to_string(),
            });
        }
        Ok(())
    }

    /// Bring the store in line with a freshly reloaded configuration:
    /// configured servers not yet in the store are added, servers that
    /// disappeared are removed, and an invalidated selection is repaired to
    /// the first server's current tab.
    pub fn reconcile(&mut self, config: &Config) {
        self.servers
            .retain(|s| config.servers.iter().any(|d| d.name == s.name));
        for descriptor in &config.servers {
            if self.server(&descriptor.name).is_none() {
                let _ = self.add_server(descriptor.clone());
            }
        }
        let valid = match &self.active {
            Some((s, t)) => self
                .server(s)
                .and_then(|srv| srv.tab(t))
                .map(|tab| tab.open)
                .unwrap_or(false),
            None => false,
        };
        if !valid {
            self.active = self.servers.first().and_then(|s| {
                s.current_tab()
                    .map(|t| (s.name.clone(), t.name.clone()))
            });
        }
    }
}
