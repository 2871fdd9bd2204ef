//! Session bus surface: the `org.freedesktop.ScreenSaver` object and the
//! peer watcher.
//!
//! # Purpose
//!
//! - Export `Inhibit`/`UnInhibit` and forward them to [`Bridge`] keyed by the
//!   caller's unique name.
//! - Follow `NameOwnerChanged` and drop a peer's inhibitors once its unique
//!   name loses its owner.
//!
//! # Invariants
//!
//! - The watcher subscribes before the well-known name is requested, so no
//!   client can disconnect unobserved.
//! - Method calls and the watcher run in different tasks, so a departure can be
//!   handled before an `Inhibit` from the same peer finishes. `Inhibit` checks
//!   that its caller still owns its name before handing out the cookie, while
//!   still holding the object lock.
//! - All bridge state lives inside the exported object and is only touched
//!   through the object server's lock.

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use zbus::message::Header;
use zbus::names::BusName;

use crate::backend::Logind;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, ServeError};
use crate::service::Bridge;

/// Exported `org.freedesktop.ScreenSaver` object.
#[derive(Debug)]
pub struct ScreenSaver {
	bridge: Bridge<Logind>,
}

impl ScreenSaver {
	/// Wraps `bridge` for export on the bus.
	pub fn new(bridge: Bridge<Logind>) -> Self {
		Self { bridge }
	}

	/// The bridge state behind this object.
	pub fn bridge(&self) -> &Bridge<Logind> {
		&self.bridge
	}
}

fn sender(header: &Header<'_>) -> Result<String, BridgeError> {
	header.sender().map(|name| name.to_string()).ok_or(BridgeError::NoSender)
}

async fn name_has_owner(conn: &zbus::Connection, peer: &str) -> zbus::fdo::Result<bool> {
	let name = BusName::try_from(peer).map_err(zbus::Error::from)?;
	let proxy = zbus::fdo::DBusProxy::new(conn).await?;
	proxy.name_has_owner(name).await
}

/// Asks the bus whether `peer` is still connected.
///
/// A failed query counts as connected; the watcher still sees the departure.
async fn still_connected(conn: &zbus::Connection, peer: &str) -> bool {
	match name_has_owner(conn, peer).await {
		Ok(owned) => owned,
		Err(err) => {
			tracing::warn!(%peer, error = %err, "NameHasOwner failed");
			true
		}
	}
}

#[zbus::interface(name = "org.freedesktop.ScreenSaver", spawn = false)]
impl ScreenSaver {
	/// Blocks idle until the returned cookie is released or the caller leaves.
	async fn inhibit(
		&mut self,
		#[zbus(header)] header: Header<'_>,
		#[zbus(connection)] conn: &zbus::Connection,
		application_name: String,
		reason_for_inhibit: String,
	) -> zbus::fdo::Result<u32> {
		let peer = sender(&header)?;
		let cookie = self
			.bridge
			.request_inhibit(&peer, &application_name, &reason_for_inhibit)
			.await?;

		if !still_connected(conn, &peer).await {
			self.bridge.notify_peer_gone(&peer);
			tracing::debug!(%peer, cookie, "peer left during inhibit");
			return Err(BridgeError::PeerGone(peer).into());
		}
		Ok(cookie)
	}

	/// Releases an inhibitor previously returned to the caller.
	#[zbus(name = "UnInhibit")]
	async fn un_inhibit(
		&mut self,
		#[zbus(header)] header: Header<'_>,
		cookie: u32,
	) -> zbus::fdo::Result<()> {
		let peer = sender(&header)?;
		self.bridge.request_release(&peer, cookie)?;
		Ok(())
	}
}

/// Returns true when a `NameOwnerChanged` signal reports that the unique name
/// `name` has left the bus.
///
/// Well-known name transfers are ignored: only a unique name losing itself as
/// owner with no successor counts.
pub fn peer_left(name: &str, old_owner: Option<&str>, new_owner: Option<&str>) -> bool {
	old_owner == Some(name) && new_owner.is_none_or(str::is_empty)
}

/// Subscribes to `NameOwnerChanged` on `conn`.
async fn subscribe(conn: &zbus::Connection) -> Result<zbus::fdo::NameOwnerChangedStream, ServeError> {
	let proxy = zbus::fdo::DBusProxy::new(conn).await.map_err(ServeError::Watch)?;
	proxy.receive_name_owner_changed().await.map_err(ServeError::Watch)
}

/// Drops peers as they leave the bus until `shutdown` fires.
async fn watch_peers(
	conn: &zbus::Connection,
	path: &str,
	mut changes: zbus::fdo::NameOwnerChangedStream,
	shutdown: CancellationToken,
) -> Result<(), ServeError> {
	let iface = conn
		.object_server()
		.interface::<_, ScreenSaver>(path)
		.await
		.map_err(ServeError::Watch)?;

	loop {
		let signal = tokio::select! {
			_ = shutdown.cancelled() => return Ok(()),
			signal = changes.next() => signal,
		};
		let Some(signal) = signal else {
			tracing::warn!("NameOwnerChanged stream ended");
			return Ok(());
		};
		let args = match signal.args() {
			Ok(args) => args,
			Err(err) => {
				tracing::warn!(error = %err, "malformed NameOwnerChanged");
				continue;
			}
		};

		let name = args.name.as_str();
		let old_owner = Option::as_ref(&args.old_owner).map(|owner| owner.as_str());
		let new_owner = Option::as_ref(&args.new_owner).map(|owner| owner.as_str());
		if !peer_left(name, old_owner, new_owner) {
			continue;
		}

		if iface.get_mut().await.bridge.notify_peer_gone(name) {
			tracing::debug!(peer = name, "peer left the bus");
		}
	}
}

/// Runs the bridge until `shutdown` fires.
///
/// Connects to the system bus for logind and to the session bus for clients,
/// exports the ScreenSaver object, starts watching peers and then claims
/// `config.service_name`. Every inhibitor still held is released when this
/// returns.
pub async fn serve(config: BridgeConfig, shutdown: CancellationToken) -> Result<(), ServeError> {
	let system = zbus::Connection::system().await.map_err(ServeError::SystemBus)?;
	let bridge = Bridge::new(Logind::new(system, &config));

	let conn = zbus::connection::Builder::session()
		.and_then(|builder| builder.serve_at(config.object_path.as_str(), ScreenSaver::new(bridge)))
		.map_err(ServeError::SessionBus)?
		.build()
		.await
		.map_err(ServeError::SessionBus)?;

	let changes = subscribe(&conn).await?;

	conn.request_name(config.service_name.as_str())
		.await
		.map_err(|source| ServeError::RequestName {
			name: config.service_name.clone(),
			source,
		})?;
	tracing::info!(name = %config.service_name, path = %config.object_path, "serving");

	let result = watch_peers(&conn, &config.object_path, changes, shutdown).await;

	if let Ok(iface) = conn.object_server().interface::<_, ScreenSaver>(config.object_path.as_str()).await {
		let guard = iface.get().await;
		let registry = guard.bridge().registry();
		tracing::info!(
			peers = registry.len(),
			active = registry.active_inhibitors(),
			"shutting down, releasing inhibitors"
		);
	}
	result
}
