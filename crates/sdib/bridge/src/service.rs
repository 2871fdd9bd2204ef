//! Request handling independent of the bus transport.
//!
//! [`Bridge`] owns the backend and the peer registry. The D-Bus layer calls
//! into it with the sender's unique name; tests call it directly with a fake
//! backend.
//!
//! # Invariants
//!
//! - A failed [`Bridge::request_inhibit`] leaves the registry as it was: no
//!   new peer and no new inhibitor. Any handle already acquired is dropped.
//! - Cookies are scoped to the peer that received them.
//!
//! The cookie type defaults to `u32`, the type used on the bus. Narrower types
//! let tests reach cookie exhaustion.

use std::fmt;

use sdib_core::{Cookie, PeerRegistry};

use crate::backend::InhibitBackend;
use crate::error::BridgeError;

/// Inhibit broker state for one bus connection.
pub struct Bridge<B: InhibitBackend, C = u32> {
	backend: B,
	registry: PeerRegistry<B::Handle, C>,
}

impl<B: InhibitBackend, C: Cookie> fmt::Debug for Bridge<B, C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Bridge")
			.field("backend", &"<backend>")
			.field("peers", &self.registry.len())
			.field("active", &self.registry.active_inhibitors())
			.finish()
	}
}

impl<B, C> Bridge<B, C>
where
	B: InhibitBackend,
	C: Cookie + Into<u64>,
{
	/// Creates a bridge with no known peers.
	pub fn new(backend: B) -> Self {
		Self {
			backend,
			registry: PeerRegistry::new(),
		}
	}

	/// Read access to the peer registry.
	pub fn registry(&self) -> &PeerRegistry<B::Handle, C> {
		&self.registry
	}

	/// Acquires an inhibitor for `peer` and returns its cookie.
	///
	/// A peer created by this call is removed again if the inhibitor cannot be
	/// stored. The first cookie of a fresh set always fits, so that only
	/// happens when the set fails to allocate.
	pub async fn request_inhibit(&mut self, peer: &str, app_name: &str, reason: &str) -> Result<C, BridgeError> {
		let handle = match self.backend.inhibit(app_name, reason).await {
			Ok(handle) => handle,
			Err(err) => {
				tracing::error!(%peer, app = app_name, error = %err, "failed to acquire inhibitor");
				return Err(err.into());
			}
		};

		let created = !self.registry.contains(peer);
		let entry = self.registry.get_or_create(peer)?;
		match entry.inhibitors_mut().add(app_name, reason, handle) {
			Ok(cookie) => {
				tracing::debug!(%peer, app = app_name, reason, %cookie, "inhibitor added");
				Ok(cookie)
			}
			Err(err) => {
				tracing::error!(%peer, app = app_name, error = %err, "failed to add inhibitor");
				if created {
					self.registry.remove(peer);
				}
				Err(err.into())
			}
		}
	}

	/// Releases the inhibitor `cookie` held by `peer`.
	pub fn request_release(&mut self, peer: &str, cookie: C) -> Result<(), BridgeError> {
		let released = self
			.registry
			.get_mut(peer)
			.is_some_and(|entry| entry.inhibitors_mut().remove(cookie));

		if !released {
			tracing::warn!(%peer, %cookie, "invalid cookie");
			return Err(BridgeError::InvalidCookie(cookie.into()));
		}
		tracing::debug!(%peer, %cookie, "inhibitor released");
		Ok(())
	}

	/// Forgets `peer` and releases everything it still holds.
	///
	/// Returns whether the peer was known.
	pub fn notify_peer_gone(&mut self, peer: &str) -> bool {
		self.registry.remove(peer)
	}
}
