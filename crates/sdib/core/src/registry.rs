//! Peer lifecycle: lazy creation on first request, teardown on disconnect.

use thiserror::Error;

use crate::inhibitor::{Cookie, InhibitorSet};
use crate::table::{HashTable, TableError};

/// Errors raised by [`PeerRegistry::get_or_create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// The peer index could not be grown.
	#[error("out of memory")]
	OutOfMemory,
}

impl From<TableError> for RegistryError {
	fn from(err: TableError) -> Self {
		match err {
			TableError::OutOfMemory => Self::OutOfMemory,
		}
	}
}

/// One connected client and the inhibitors it holds.
#[derive(Debug)]
pub struct Peer<H, C = u32> {
	name: Box<str>,
	inhibitors: InhibitorSet<H, C>,
}

impl<H, C: Cookie> Peer<H, C> {
	fn new(name: &str) -> Self {
		Self {
			name: name.into(),
			inhibitors: InhibitorSet::new(),
		}
	}

	/// Bus name identifying this peer.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Inhibitors currently held by this peer.
	pub fn inhibitors(&self) -> &InhibitorSet<H, C> {
		&self.inhibitors
	}

	/// Mutable access to the peer's inhibitors.
	pub fn inhibitors_mut(&mut self) -> &mut InhibitorSet<H, C> {
		&mut self.inhibitors
	}
}

/// Index of known peers keyed by bus name.
///
/// A peer enters the registry on its first inhibit request and stays until
/// [`PeerRegistry::remove`] is called for it, even while it holds nothing.
/// Dropping the registry drops every peer and releases every inhibitor.
#[derive(Debug)]
pub struct PeerRegistry<H, C = u32> {
	peers: HashTable<String, Peer<H, C>>,
}

impl<H, C: Cookie> Default for PeerRegistry<H, C> {
	fn default() -> Self {
		Self::new()
	}
}

impl<H, C: Cookie> PeerRegistry<H, C> {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self {
			peers: HashTable::new(),
		}
	}

	/// Returns the peer called `name`, creating an empty one if unknown.
	///
	/// Nothing is inserted when the index cannot grow.
	pub fn get_or_create(&mut self, name: &str) -> Result<&mut Peer<H, C>, RegistryError> {
		Ok(self.peers.get_or_insert_with(name, || Peer::new(name))?)
	}

	/// Returns the peer called `name` without creating it.
	pub fn get(&self, name: &str) -> Option<&Peer<H, C>> {
		self.peers.get(name)
	}

	/// Mutable counterpart of [`PeerRegistry::get`].
	pub fn get_mut(&mut self, name: &str) -> Option<&mut Peer<H, C>> {
		self.peers.get_mut(name)
	}

	/// Returns true if a peer called `name` is known.
	pub fn contains(&self, name: &str) -> bool {
		self.peers.contains_key(name)
	}

	/// Drops the peer called `name` along with all of its inhibitors.
	///
	/// Returns whether the peer was known.
	pub fn remove(&mut self, name: &str) -> bool {
		let Some(peer) = self.peers.remove(name) else {
			return false;
		};

		if peer.inhibitors.has_any_active() {
			tracing::debug!(
				peer = %peer.name,
				lingering = peer.inhibitors.active_count(),
				"cleaning up lingering inhibitors"
			);
		}
		tracing::trace!(peer = %peer.name, "destroying peer");
		true
	}

	/// Number of known peers.
	pub fn len(&self) -> usize {
		self.peers.len()
	}

	/// Returns true if no peer is known.
	pub fn is_empty(&self) -> bool {
		self.peers.is_empty()
	}

	/// Iterates over known peers in unspecified order.
	pub fn iter(&self) -> impl Iterator<Item = &Peer<H, C>> {
		self.peers.iter().map(|(_, peer)| peer)
	}

	/// Total number of live inhibitors across all peers.
	pub fn active_inhibitors(&self) -> usize {
		self.iter().map(|peer| peer.inhibitors.active_count()).sum()
	}
}

#[cfg(test)]
mod tests;
