//! Per-peer inhibitor slots and cookie allocation.

use std::fmt;
use std::marker::PhantomData;

use thiserror::Error;

/// Number of slots reserved by a new [`InhibitorSet`].
pub const DEFAULT_CAPACITY: usize = 16;

/// Errors raised by [`InhibitorSet::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InhibitError {
	/// The slot array could not be grown.
	#[error("out of memory")]
	OutOfMemory,
	/// The next cookie does not fit the cookie type.
	#[error("cookie space exhausted")]
	Overflow,
}

/// Public handle type handed out for inhibitors.
///
/// Cookie `n` addresses slot `n - 1`. Zero never addresses a slot.
pub trait Cookie: Copy + Eq + fmt::Debug + fmt::Display {
	/// Cookie for slot `index`, or `None` if `index + 1` does not fit.
	fn from_index(index: usize) -> Option<Self>;

	/// Slot index addressed by this cookie, or `None` for zero.
	fn to_index(self) -> Option<usize>;
}

macro_rules! impl_cookie {
	($($ty:ty),* $(,)?) => {
		$(
			impl Cookie for $ty {
				fn from_index(index: usize) -> Option<Self> {
					index.checked_add(1).and_then(|cookie| Self::try_from(cookie).ok())
				}

				fn to_index(self) -> Option<usize> {
					usize::try_from(self).ok()?.checked_sub(1)
				}
			}
		)*
	};
}

impl_cookie!(u8, u16, u32, u64);

/// One outstanding inhibition.
///
/// Owns the resource handle returned by the backing service. Dropping the
/// inhibitor drops the handle, which is what releases the inhibition.
#[derive(Debug)]
pub struct Inhibitor<H> {
	handle: H,
	app_name: Box<str>,
	reason: Box<str>,
}

impl<H> Inhibitor<H> {
	/// Application that asked for the inhibition.
	pub fn app_name(&self) -> &str {
		&self.app_name
	}

	/// Reason given for the inhibition.
	pub fn reason(&self) -> &str {
		&self.reason
	}

	/// Resource handle held by this inhibitor.
	pub fn handle(&self) -> &H {
		&self.handle
	}

	/// Unwraps the resource handle, moving release duty to the caller.
	pub fn into_handle(self) -> H {
		self.handle
	}
}

/// Sparse, indexed collection of live inhibitors.
///
/// Slots are never moved: removing an inhibitor empties its slot and leaves
/// every other cookie valid. The lowest empty slot is reused first, so a
/// cookie value can come back after its inhibitor has been released.
///
/// `C` is the cookie type. The D-Bus surface uses `u32`.
#[derive(Debug)]
pub struct InhibitorSet<H, C = u32> {
	slots: Vec<Option<Inhibitor<H>>>,
	_cookie: PhantomData<fn() -> C>,
}

impl<H, C: Cookie> Default for InhibitorSet<H, C> {
	fn default() -> Self {
		Self::new()
	}
}

impl<H, C: Cookie> InhibitorSet<H, C> {
	/// Creates an empty set with room for [`DEFAULT_CAPACITY`] inhibitors.
	pub fn new() -> Self {
		Self {
			slots: Vec::with_capacity(DEFAULT_CAPACITY),
			_cookie: PhantomData,
		}
	}

	/// Stores a new inhibitor and returns its cookie.
	///
	/// Copies of `app_name` and `reason` are kept alongside `handle`. On
	/// failure the set is left as it was and `handle` is dropped.
	pub fn add(&mut self, app_name: &str, reason: &str, handle: H) -> Result<C, InhibitError> {
		let inhibitor = Inhibitor {
			handle,
			app_name: app_name.into(),
			reason: reason.into(),
		};

		let free = self.slots.iter().position(Option::is_none);
		let (index, appended) = match free {
			Some(index) => {
				self.slots[index] = Some(inhibitor);
				(index, false)
			}
			None => {
				if self.slots.len() == self.slots.capacity() {
					let additional = self.slots.capacity().max(1);
					self.slots
						.try_reserve_exact(additional)
						.map_err(|_| InhibitError::OutOfMemory)?;
				}
				self.slots.push(Some(inhibitor));
				(self.slots.len() - 1, true)
			}
		};

		match C::from_index(index) {
			Some(cookie) => Ok(cookie),
			None => {
				if appended {
					self.slots.pop();
				} else {
					self.slots[index] = None;
				}
				Err(InhibitError::Overflow)
			}
		}
	}

	/// Releases the inhibitor behind `cookie`.
	///
	/// Returns false for zero, for cookies past the last used slot and for
	/// slots that are already empty. Nothing changes in those cases.
	pub fn remove(&mut self, cookie: C) -> bool {
		self.take(cookie).is_some()
	}

	/// Removes the inhibitor behind `cookie` and hands it to the caller.
	pub fn take(&mut self, cookie: C) -> Option<Inhibitor<H>> {
		let index = cookie.to_index()?;
		self.slots.get_mut(index)?.take()
	}

	/// Returns the inhibitor behind `cookie`.
	pub fn get(&self, cookie: C) -> Option<&Inhibitor<H>> {
		let index = cookie.to_index()?;
		self.slots.get(index)?.as_ref()
	}

	/// Returns true if at least one inhibitor is live.
	pub fn has_any_active(&self) -> bool {
		self.slots.iter().any(Option::is_some)
	}

	/// Number of live inhibitors.
	pub fn active_count(&self) -> usize {
		self.slots.iter().filter(|slot| slot.is_some()).count()
	}

	/// Number of slots in use or previously used.
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	/// Returns true if no slot has ever been used.
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	/// Number of slots available before the next growth.
	pub fn capacity(&self) -> usize {
		self.slots.capacity()
	}

	/// Iterates over live inhibitors with their cookies, lowest cookie first.
	pub fn iter(&self) -> impl Iterator<Item = (C, &Inhibitor<H>)> {
		self.slots
			.iter()
			.enumerate()
			.filter_map(|(index, slot)| Some((C::from_index(index)?, slot.as_ref()?)))
	}
}

#[cfg(test)]
mod tests;
