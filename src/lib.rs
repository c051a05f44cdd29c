//! Muster is the coordination core of a multi-server desktop chat client.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the persisted configuration, the session store (servers,
//!   tabs, and the active selection), and the shared application state.
//! - [`router`] defines the control-message vocabulary and the single
//!   dispatch point that routes messages between the privileged process and
//!   UI surfaces.
//! - [`lifecycle`] runs the phased startup sequence gated on host readiness
//!   and arms the router.
//! - [`host`] is the seam to the surrounding desktop runtime: surfaces,
//!   notifications, tray, spellcheck, auto-launch, and the single-instance
//!   lock.
//! - [`downloads`] and [`permissions`] cover the download side channel and
//!   the surface permission gate.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which parses arguments and dispatches into
//! [`lifecycle::Orchestrator`].

pub mod cli;
pub mod core;
pub mod downloads;
pub mod host;
pub mod lifecycle;
pub mod permissions;
pub mod router;
pub mod utils;
