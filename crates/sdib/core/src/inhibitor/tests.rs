use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;

use super::*;

/// Resource handle that records how often it has been released.
#[derive(Debug)]
struct Handle {
	id: usize,
	releases: Rc<Cell<usize>>,
}

impl Drop for Handle {
	fn drop(&mut self) {
		self.releases.set(self.releases.get() + 1);
	}
}

#[derive(Debug, Default)]
struct Pool {
	issued: Cell<usize>,
	releases: Rc<Cell<usize>>,
}

impl Pool {
	fn handle(&self) -> Handle {
		let id = self.issued.get();
		self.issued.set(id + 1);
		Handle {
			id,
			releases: self.releases.clone(),
		}
	}

	fn released(&self) -> usize {
		self.releases.get()
	}
}

#[test]
fn cookies_start_at_one_and_count_up() {
	let pool = Pool::default();
	let mut set: InhibitorSet<Handle> = InhibitorSet::new();

	assert_eq!(set.add("appX", "idle", pool.handle()), Ok(1));
	assert_eq!(set.add("appY", "idle", pool.handle()), Ok(2));
	assert_eq!(set.add("appZ", "video", pool.handle()), Ok(3));

	let inhibitor = set.get(2).unwrap();
	assert_eq!(inhibitor.app_name(), "appY");
	assert_eq!(inhibitor.reason(), "idle");
	assert_eq!(inhibitor.handle().id, 1);
}

#[test]
fn freed_slot_is_reused() {
	let pool = Pool::default();
	let mut set: InhibitorSet<Handle> = InhibitorSet::new();

	assert_eq!(set.add("a", "r", pool.handle()), Ok(1));
	assert_eq!(set.add("b", "r", pool.handle()), Ok(2));
	assert!(set.remove(1));
	assert_eq!(pool.released(), 1);

	assert_eq!(set.add("c", "r", pool.handle()), Ok(1));
	assert_eq!(set.get(1).unwrap().app_name(), "c");
	assert_eq!(set.get(2).unwrap().app_name(), "b");
}

#[test]
fn lowest_free_slot_wins() {
	let pool = Pool::default();
	let mut set: InhibitorSet<Handle> = InhibitorSet::new();
	for _ in 0..5 {
		set.add("a", "r", pool.handle()).unwrap();
	}
	assert!(set.remove(4));
	assert!(set.remove(2));

	assert_eq!(set.add("b", "r", pool.handle()), Ok(2));
	assert_eq!(set.add("c", "r", pool.handle()), Ok(4));
	assert_eq!(set.add("d", "r", pool.handle()), Ok(6));
}

#[test]
fn invalid_cookies_are_rejected_without_side_effects() {
	let pool = Pool::default();
	let mut set: InhibitorSet<Handle> = InhibitorSet::new();
	set.add("a", "r", pool.handle()).unwrap();
	set.add("b", "r", pool.handle()).unwrap();

	assert!(!set.remove(0));
	assert!(!set.remove(3));
	assert!(!set.remove(u32::MAX));
	assert_eq!(pool.released(), 0);
	assert_eq!(set.active_count(), 2);

	assert!(set.remove(1));
	assert!(!set.remove(1), "second removal of the same cookie");
	assert_eq!(pool.released(), 1);
}

#[test]
fn growth_keeps_existing_cookies() {
	let pool = Pool::default();
	let mut set: InhibitorSet<Handle> = InhibitorSet::new();
	assert!(set.capacity() >= DEFAULT_CAPACITY);

	for expected in 1..=40u32 {
		assert_eq!(set.add("a", "r", pool.handle()), Ok(expected));
	}
	assert!(set.capacity() >= 40);

	for (cookie, inhibitor) in set.iter() {
		assert_eq!(inhibitor.handle().id, cookie as usize - 1);
	}
}

#[test]
fn overflow_rolls_back_and_releases() {
	let pool = Pool::default();
	let mut set: InhibitorSet<Handle, u8> = InhibitorSet::new();

	for expected in 1..=u8::MAX {
		assert_eq!(set.add("a", "r", pool.handle()), Ok(expected));
	}
	assert_eq!(set.add("late", "r", pool.handle()), Err(InhibitError::Overflow));

	assert_eq!(pool.released(), 1, "rejected handle is released");
	assert_eq!(set.len(), usize::from(u8::MAX));
	assert_eq!(set.active_count(), usize::from(u8::MAX));

	// A freed slot below the limit is still usable.
	assert!(set.remove(10));
	assert_eq!(set.add("again", "r", pool.handle()), Ok(10));
}

#[test]
fn drop_releases_each_live_handle_once() {
	let pool = Pool::default();
	let mut set: InhibitorSet<Handle> = InhibitorSet::new();
	for _ in 0..6 {
		set.add("a", "r", pool.handle()).unwrap();
	}
	set.remove(2);
	set.remove(5);
	assert_eq!(pool.released(), 2);

	drop(set);
	assert_eq!(pool.released(), 6);
}

#[test]
fn take_moves_release_duty_to_caller() {
	let pool = Pool::default();
	let mut set: InhibitorSet<Handle> = InhibitorSet::new();
	set.add("a", "r", pool.handle()).unwrap();

	let inhibitor = set.take(1).unwrap();
	assert_eq!(pool.released(), 0);
	assert!(!set.has_any_active());

	let handle = inhibitor.into_handle();
	assert_eq!(pool.released(), 0);
	drop(handle);
	assert_eq!(pool.released(), 1);
}

#[test]
fn has_any_active_tracks_live_slots() {
	let pool = Pool::default();
	let mut set: InhibitorSet<Handle> = InhibitorSet::new();
	assert!(!set.has_any_active());
	assert!(set.is_empty());

	set.add("a", "r", pool.handle()).unwrap();
	assert!(set.has_any_active());

	set.remove(1);
	assert!(!set.has_any_active());
	assert!(!set.is_empty(), "slot stays allocated after removal");
}

#[test]
fn cookie_index_mapping() {
	assert_eq!(u32::from_index(0), Some(1));
	assert_eq!(u32::from_index(u32::MAX as usize - 1), Some(u32::MAX));
	assert_eq!(u8::from_index(255), None);
	assert_eq!(0u32.to_index(), None);
	assert_eq!(1u32.to_index(), Some(0));
	assert_eq!(u16::MAX.to_index(), Some(usize::from(u16::MAX) - 1));
}

proptest! {
	/// The n-th add into a fresh set returns cookie n.
	#[test]
	fn prop_sequential_adds(count in 1usize..200) {
		let pool = Pool::default();
		let mut set: InhibitorSet<Handle> = InhibitorSet::new();
		for n in 1..=count {
			prop_assert_eq!(set.add("a", "r", pool.handle()), Ok(n as u32));
		}
	}

	/// Releases always equal acquisitions once the set is gone, and live
	/// cookies are unique at every step.
	#[test]
	fn prop_every_handle_released_once(ops in prop::collection::vec((any::<bool>(), 0u32..40), 0..300)) {
		let pool = Pool::default();
		let mut set: InhibitorSet<Handle> = InhibitorSet::new();
		let mut live = std::collections::BTreeSet::new();

		for (add, cookie) in ops {
			if add {
				let issued = set.add("a", "r", pool.handle()).unwrap();
				prop_assert!(live.insert(issued), "cookie {} issued twice", issued);
			} else {
				prop_assert_eq!(set.remove(cookie), live.remove(&cookie));
			}
			prop_assert_eq!(set.active_count(), live.len());
		}

		let issued = pool.issued.get();
		drop(set);
		prop_assert_eq!(pool.released(), issued);
	}
}
