use std::cell::Cell;
use std::rc::Rc;

use super::*;

/// Resource handle that bumps a shared counter when released.
#[derive(Debug)]
struct Handle(Rc<Cell<usize>>);

impl Drop for Handle {
	fn drop(&mut self) {
		self.0.set(self.0.get() + 1);
	}
}

#[derive(Debug, Default)]
struct Ledger {
	acquired: Cell<usize>,
	released: Rc<Cell<usize>>,
}

impl Ledger {
	fn acquire(&self) -> Handle {
		self.acquired.set(self.acquired.get() + 1);
		Handle(self.released.clone())
	}

	fn released(&self) -> usize {
		self.released.get()
	}
}

fn inhibit(registry: &mut PeerRegistry<Handle>, ledger: &Ledger, peer: &str, app: &str) -> u32 {
	registry
		.get_or_create(peer)
		.unwrap()
		.inhibitors_mut()
		.add(app, "idle", ledger.acquire())
		.unwrap()
}

#[test]
fn get_or_create_returns_same_peer() {
	let ledger = Ledger::default();
	let mut registry: PeerRegistry<Handle> = PeerRegistry::new();

	assert!(registry.get("A").is_none());
	inhibit(&mut registry, &ledger, "A", "appX");
	let peer = registry.get_or_create("A").unwrap();
	assert_eq!(peer.name(), "A");
	assert_eq!(peer.inhibitors().active_count(), 1);
	assert_eq!(registry.len(), 1);
}

#[test]
fn lookup_does_not_create() {
	let mut registry: PeerRegistry<Handle> = PeerRegistry::new();
	assert!(registry.get("ghost").is_none());
	assert!(registry.get_mut("ghost").is_none());
	assert!(!registry.contains("ghost"));
	assert!(registry.is_empty());
}

#[test]
fn remove_unknown_peer_is_false() {
	let mut registry: PeerRegistry<Handle> = PeerRegistry::new();
	assert!(!registry.remove("ghost"));
}

#[test]
fn disconnect_releases_everything_the_peer_held() {
	let ledger = Ledger::default();
	let mut registry: PeerRegistry<Handle> = PeerRegistry::new();

	assert_eq!(inhibit(&mut registry, &ledger, "A", "appX"), 1);
	assert_eq!(inhibit(&mut registry, &ledger, "A", "appY"), 2);

	assert!(registry.remove("A"));
	assert_eq!(ledger.released(), 2);
	assert!(!registry.contains("A"));

	// A returning peer starts over with an empty set.
	let peer = registry.get_or_create("A").unwrap();
	assert!(!peer.inhibitors().has_any_active());
	assert_eq!(inhibit(&mut registry, &ledger, "A", "appZ"), 1);
}

#[test]
fn explicit_release_then_disconnect_releases_rest() {
	let ledger = Ledger::default();
	let mut registry: PeerRegistry<Handle> = PeerRegistry::new();

	assert_eq!(inhibit(&mut registry, &ledger, "B", "app"), 1);
	assert_eq!(inhibit(&mut registry, &ledger, "B", "app"), 2);

	assert!(registry.get_mut("B").unwrap().inhibitors_mut().remove(1));
	assert_eq!(ledger.released(), 1);

	assert!(registry.remove("B"));
	assert_eq!(ledger.released(), 2);
	assert_eq!(ledger.released(), ledger.acquired.get());
}

#[test]
fn idle_peer_stays_registered() {
	let ledger = Ledger::default();
	let mut registry: PeerRegistry<Handle> = PeerRegistry::new();

	inhibit(&mut registry, &ledger, "C", "app");
	registry.get_mut("C").unwrap().inhibitors_mut().remove(1);

	assert!(registry.contains("C"));
	assert!(registry.remove("C"));
}

#[test]
fn peers_are_isolated() {
	let ledger = Ledger::default();
	let mut registry: PeerRegistry<Handle> = PeerRegistry::new();

	assert_eq!(inhibit(&mut registry, &ledger, ":1.10", "a"), 1);
	assert_eq!(inhibit(&mut registry, &ledger, ":1.11", "b"), 1);
	assert_eq!(registry.active_inhibitors(), 2);

	assert!(registry.remove(":1.10"));
	assert_eq!(ledger.released(), 1);
	assert_eq!(registry.get(":1.11").unwrap().inhibitors().active_count(), 1);
}

#[test]
fn many_peers_survive_index_growth() {
	let ledger = Ledger::default();
	let mut registry: PeerRegistry<Handle> = PeerRegistry::new();

	for n in 0..100 {
		inhibit(&mut registry, &ledger, &format!(":1.{n}"), "app");
	}
	assert_eq!(registry.len(), 100);
	assert_eq!(registry.iter().count(), 100);

	for n in 0..100 {
		assert!(registry.contains(&format!(":1.{n}")));
	}
}

#[test]
fn dropping_registry_releases_all() {
	let ledger = Ledger::default();
	let mut registry: PeerRegistry<Handle> = PeerRegistry::new();
	for n in 0..5 {
		let peer = format!(":1.{n}");
		inhibit(&mut registry, &ledger, &peer, "a");
		inhibit(&mut registry, &ledger, &peer, "b");
	}

	drop(registry);
	assert_eq!(ledger.released(), 10);
	assert_eq!(ledger.acquired.get(), 10);
}

#[test]
fn debug_shows_peers_and_their_inhibitors() {
	let ledger = Ledger::default();
	let mut registry: PeerRegistry<Handle> = PeerRegistry::new();
	inhibit(&mut registry, &ledger, ":1.7", "player");

	let rendered = format!("{registry:?}");
	assert!(rendered.contains(":1.7"));
	assert!(rendered.contains("player"));
}
