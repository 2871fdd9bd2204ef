//! Separately chained hash table.
//!
//! Entries live in per-bucket chains. Inserting never replaces an existing
//! entry: a duplicate key shadows the older entry until it is removed, at which
//! point the older one becomes visible again.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use rustc_hash::FxBuildHasher;
use thiserror::Error;

/// Number of buckets a new table starts with.
pub const DEFAULT_CAPACITY: usize = 16;

/// Load factor above which the next insert doubles the bucket count.
pub const LOAD_FACTOR_THRESHOLD: f64 = 0.75;

/// Errors raised while growing a [`HashTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
	/// The bucket array or a chain could not be grown.
	#[error("out of memory")]
	OutOfMemory,
}

struct Entry<K, V> {
	key: K,
	value: V,
}

/// Hash table with caller-chosen hashing and owned entries.
///
/// Hashing comes from `S`, equality from `K: Eq`. Keys and values are moved in
/// on insert and dropped on removal or when the table is dropped, so owning
/// types (`String`, `Box<T>`, handles with `Drop`) are released exactly once.
///
/// Within a chain the newest entry is kept last and lookups scan from the
/// back, which gives last-in-first-found semantics for duplicate keys.
pub struct HashTable<K, V, S = FxBuildHasher> {
	buckets: Vec<Vec<Entry<K, V>>>,
	count: usize,
	hasher: S,
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HashTable<K, V, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

impl<K, V, S: Default> HashTable<K, V, S> {
	/// Creates an empty table with [`DEFAULT_CAPACITY`] buckets.
	pub fn new() -> Self {
		Self::with_hasher(S::default())
	}
}

impl<K, V, S: Default> Default for HashTable<K, V, S> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K, V, S> HashTable<K, V, S> {
	/// Creates an empty table that hashes keys with `hasher`.
	pub fn with_hasher(hasher: S) -> Self {
		Self {
			buckets: std::iter::repeat_with(Vec::new).take(DEFAULT_CAPACITY).collect(),
			count: 0,
			hasher,
		}
	}

	/// Number of live entries, duplicates included.
	pub fn len(&self) -> usize {
		self.count
	}

	/// Returns true when the table holds no entries.
	pub fn is_empty(&self) -> bool {
		self.count == 0
	}

	/// Number of buckets.
	pub fn capacity(&self) -> usize {
		self.buckets.len()
	}

	/// Current `len / capacity` ratio.
	pub fn load_factor(&self) -> f64 {
		self.count as f64 / self.buckets.len() as f64
	}

	/// Iterates over all entries in unspecified order.
	///
	/// Within one chain the newest entry is yielded first.
	pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
		self.buckets
			.iter()
			.flat_map(|chain| chain.iter().rev())
			.map(|entry| (&entry.key, &entry.value))
	}

	/// Iterates over all values mutably in unspecified order.
	pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
		self.buckets
			.iter_mut()
			.flat_map(|chain| chain.iter_mut().rev())
			.map(|entry| &mut entry.value)
	}
}

impl<K, V, S> HashTable<K, V, S>
where
	K: Hash + Eq,
	S: BuildHasher,
{
	/// Inserts `key` with `value` and returns a reference to the stored value.
	///
	/// An existing entry for an equal key is not replaced; it stays behind the
	/// new one. If the table has to grow and the allocation fails, the table is
	/// left untouched, `key` and `value` are dropped and
	/// [`TableError::OutOfMemory`] is returned.
	pub fn insert(&mut self, key: K, value: V) -> Result<&mut V, TableError> {
		if self.load_factor() > LOAD_FACTOR_THRESHOLD {
			self.grow()?;
		}

		let index = bucket_index(&self.hasher, &key, self.buckets.len());
		let chain = &mut self.buckets[index];
		chain
			.try_reserve(1)
			.map_err(|_| TableError::OutOfMemory)?;
		chain.push(Entry { key, value });
		self.count += 1;

		let last = chain.len() - 1;
		Ok(&mut chain[last].value)
	}

	/// Returns the newest value stored under `key`.
	pub fn get<Q>(&self, key: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let index = bucket_index(&self.hasher, key, self.buckets.len());
		self.buckets[index]
			.iter()
			.rev()
			.find(|entry| entry.key.borrow() == key)
			.map(|entry| &entry.value)
	}

	/// Mutable counterpart of [`HashTable::get`].
	pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let index = bucket_index(&self.hasher, key, self.buckets.len());
		self.buckets[index]
			.iter_mut()
			.rev()
			.find(|entry| entry.key.borrow() == key)
			.map(|entry| &mut entry.value)
	}

	/// Returns true if any entry is stored under `key`.
	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.get(key).is_some()
	}

	/// Returns the newest value under `key`, inserting `make()` on a miss.
	///
	/// The stored key is an owned copy of `key`.
	pub fn get_or_insert_with<Q, F>(&mut self, key: &Q, make: F) -> Result<&mut V, TableError>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
		F: FnOnce() -> V,
	{
		let index = bucket_index(&self.hasher, key, self.buckets.len());
		if let Some(pos) = self.buckets[index]
			.iter()
			.rposition(|entry| entry.key.borrow() == key)
		{
			return Ok(&mut self.buckets[index][pos].value);
		}

		self.insert(key.to_owned(), make())
	}

	/// Removes the newest entry under `key` and hands its value to the caller.
	///
	/// The stored key is dropped. Older entries under the same key stay.
	pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let index = bucket_index(&self.hasher, key, self.buckets.len());
		let chain = &mut self.buckets[index];
		let pos = chain.iter().rposition(|entry| entry.key.borrow() == key)?;
		let entry = chain.remove(pos);
		self.count -= 1;
		Some(entry.value)
	}

	/// Doubles the bucket count and rehashes every entry.
	///
	/// All memory is reserved before the first entry moves, so a failed
	/// allocation leaves the table as it was.
	fn grow(&mut self) -> Result<(), TableError> {
		let new_capacity = self
			.buckets
			.len()
			.checked_mul(2)
			.ok_or(TableError::OutOfMemory)?;

		let mut sizes: Vec<usize> = Vec::new();
		sizes
			.try_reserve_exact(new_capacity)
			.map_err(|_| TableError::OutOfMemory)?;
		sizes.resize(new_capacity, 0);
		for entry in self.buckets.iter().flatten() {
			sizes[bucket_index(&self.hasher, &entry.key, new_capacity)] += 1;
		}

		let mut buckets: Vec<Vec<Entry<K, V>>> = Vec::new();
		buckets
			.try_reserve_exact(new_capacity)
			.map_err(|_| TableError::OutOfMemory)?;
		for size in sizes {
			let mut chain = Vec::new();
			chain
				.try_reserve_exact(size)
				.map_err(|_| TableError::OutOfMemory)?;
			buckets.push(chain);
		}

		// Chains are walked front to back so duplicates keep their relative order.
		for entry in std::mem::take(&mut self.buckets).into_iter().flatten() {
			let index = bucket_index(&self.hasher, &entry.key, new_capacity);
			buckets[index].push(entry);
		}
		self.buckets = buckets;
		Ok(())
	}
}

fn bucket_index<Q, S>(hasher: &S, key: &Q, capacity: usize) -> usize
where
	Q: Hash + ?Sized,
	S: BuildHasher,
{
	(hasher.hash_one(key) % capacity as u64) as usize
}
