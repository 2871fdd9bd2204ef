//! Bridges `org.freedesktop.ScreenSaver` inhibit requests to systemd-logind.
//!
//! Clients on the session bus call `Inhibit`/`UnInhibit`. Each inhibit is
//! turned into a logind idle inhibitor whose file descriptor is kept until the
//! client releases the cookie or leaves the bus.
//!
//! ```text
//! session bus client
//!     │  Inhibit(app_name, reason) -> cookie
//!     ▼
//! dbus::ScreenSaver ──► service::Bridge ──► backend::Logind ──► login1.Manager.Inhibit
//!     ▲                     │
//!     │                     └── sdib_core::PeerRegistry (per-peer InhibitorSet)
//! NameOwnerChanged ─────────┘  (peer left: drop its inhibitors)
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod dbus;
pub mod error;
pub mod service;

pub use backend::{InhibitBackend, Logind};
pub use config::BridgeConfig;
pub use error::{BackendError, BridgeError, ServeError};
pub use service::Bridge;
