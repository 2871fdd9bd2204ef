//! Source of inhibitor handles.
//!
//! [`Logind`] asks systemd-logind on the system bus for an inhibitor lock and
//! keeps the returned file descriptor as the handle. Closing the descriptor
//! releases the lock, so dropping the handle is the release.
//!
//! Tests substitute their own [`InhibitBackend`] to count acquisitions and
//! releases without a bus.

use std::future::Future;
use std::os::fd::OwnedFd;
use std::pin::Pin;

use crate::config::BridgeConfig;
use crate::error::BackendError;

pub(crate) const LOGIND_DESTINATION: &str = "org.freedesktop.login1";
pub(crate) const LOGIND_PATH: &str = "/org/freedesktop/login1";
pub(crate) const LOGIND_MANAGER: &str = "org.freedesktop.login1.Manager";

/// Boxed future returned by [`InhibitBackend`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Acquires inhibitor locks on behalf of bus clients.
pub trait InhibitBackend: Send + Sync + 'static {
	/// Resource held while the lock is active. Dropping it releases the lock.
	type Handle: Send + 'static;

	/// Acquires a lock for application `who` with human-readable `why`.
	fn inhibit<'a>(&'a self, who: &'a str, why: &'a str) -> BoxFuture<'a, Result<Self::Handle, BackendError>>;
}

/// systemd-logind inhibitor backend.
#[derive(Debug, Clone)]
pub struct Logind {
	conn: zbus::Connection,
	what: String,
	mode: String,
}

impl Logind {
	/// Uses `conn` (a system bus connection) with lock parameters from `config`.
	pub fn new(conn: zbus::Connection, config: &BridgeConfig) -> Self {
		Self {
			conn,
			what: config.what.clone(),
			mode: config.mode.clone(),
		}
	}
}

impl InhibitBackend for Logind {
	type Handle = OwnedFd;

	fn inhibit<'a>(&'a self, who: &'a str, why: &'a str) -> BoxFuture<'a, Result<OwnedFd, BackendError>> {
		Box::pin(async move {
			let reply = self
				.conn
				.call_method(
					Some(LOGIND_DESTINATION),
					LOGIND_PATH,
					Some(LOGIND_MANAGER),
					"Inhibit",
					&(self.what.as_str(), who, why, self.mode.as_str()),
				)
				.await
				.map_err(BackendError::Call)?;

			let fd: zbus::zvariant::OwnedFd = reply.body().deserialize().map_err(BackendError::Reply)?;
			Ok(OwnedFd::from(fd))
		})
	}
}
