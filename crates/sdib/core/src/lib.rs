//! Peer registry and inhibitor bookkeeping for the inhibit bridge.
//!
//! # Purpose
//!
//! - Track, per bus peer, which idle inhibitors it currently holds.
//! - Hand out small numeric cookies that stay valid until released.
//! - Release every resource a peer still holds once the peer is gone.
//! - Exclude the bus transport and the backing service; see `sdib-bridge`.
//!
//! # Key types
//!
//! | Type | Meaning | Constraints |
//! |---|---|---|
//! | [`HashTable`] | Chained hash table with pluggable hashing | MUST keep `len / capacity` at or below 0.75 before each insert |
//! | [`InhibitorSet`] | Slot arena of live inhibitors for one peer | MUST map cookie `n` to slot `n - 1`; MUST never relocate live slots |
//! | [`Inhibitor`] | One outstanding inhibition | MUST be the sole owner of its resource handle |
//! | [`PeerRegistry`] | Peer name to [`Peer`] index | MUST hold at most one [`Peer`] per name |
//!
//! # Invariants
//!
//! 1. Cookie 0 is never issued and never resolves to an inhibitor.
//! 2. A resource handle placed in an [`InhibitorSet`] is released exactly once,
//!    either by [`InhibitorSet::remove`] or when the set is dropped.
//! 3. A failed [`InhibitorSet::add`] leaves the set exactly as it was and
//!    releases the handle it was given.
//! 4. [`PeerRegistry::remove`] drops the peer together with every inhibitor it
//!    still holds.

pub mod inhibitor;
pub mod registry;
pub mod table;

pub use inhibitor::{Cookie, InhibitError, Inhibitor, InhibitorSet};
pub use registry::{Peer, PeerRegistry, RegistryError};
pub use table::{HashTable, TableError};
