//! Error types for the bridge.

use sdib_core::{InhibitError, RegistryError};
use thiserror::Error;

/// Failures talking to the backing inhibitor service.
#[derive(Debug, Error)]
pub enum BackendError {
	/// The method call failed or was rejected.
	#[error("inhibit call failed: {0}")]
	Call(#[source] zbus::Error),
	/// The reply did not carry a file descriptor.
	#[error("malformed inhibit reply: {0}")]
	Reply(#[source] zbus::Error),
}

/// Failures of bridge operations, as seen by bus clients.
#[derive(Debug, Error)]
pub enum BridgeError {
	/// The backing service refused or failed.
	#[error(transparent)]
	Backend(#[from] BackendError),
	/// The peer index could not grow.
	#[error(transparent)]
	Registry(#[from] RegistryError),
	/// The peer's inhibitor set could not take another entry.
	#[error(transparent)]
	Inhibit(#[from] InhibitError),
	/// The cookie does not name a live inhibitor of the caller.
	#[error("invalid cookie {0}")]
	InvalidCookie(u64),
	/// The method call carried no sender.
	#[error("message has no sender")]
	NoSender,
	/// The caller left the bus before its request completed.
	#[error("peer {0} left the bus")]
	PeerGone(String),
}

impl From<BridgeError> for zbus::fdo::Error {
	fn from(err: BridgeError) -> Self {
		match err {
			BridgeError::Registry(RegistryError::OutOfMemory)
			| BridgeError::Inhibit(InhibitError::OutOfMemory) => {
				Self::NoMemory(format!("failed to add inhibitor: {err}"))
			}
			BridgeError::Inhibit(InhibitError::Overflow) => {
				Self::LimitsExceeded(format!("failed to add inhibitor: {err}"))
			}
			BridgeError::InvalidCookie(_) => Self::InvalidArgs("invalid cookie".to_string()),
			BridgeError::Backend(_) => Self::Failed(format!("failed to add inhibitor: {err}")),
			BridgeError::NoSender | BridgeError::PeerGone(_) => Self::Failed(err.to_string()),
		}
	}
}

/// Failures while setting up or running the bus service.
#[derive(Debug, Error)]
pub enum ServeError {
	/// Connecting to the system bus failed.
	#[error("failed to connect to system bus: {0}")]
	SystemBus(#[source] zbus::Error),
	/// Connecting to the session bus or exporting the interface failed.
	#[error("failed to connect to session bus: {0}")]
	SessionBus(#[source] zbus::Error),
	/// The well-known name could not be acquired.
	#[error("failed to acquire name {name}: {source}")]
	RequestName {
		/// Name that was requested.
		name: String,
		/// Underlying bus error.
		#[source]
		source: zbus::Error,
	},
	/// Subscribing to or reading `NameOwnerChanged` failed.
	#[error("failed to watch bus peers: {0}")]
	Watch(#[source] zbus::Error),
}
