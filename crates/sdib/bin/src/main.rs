//! sd-inhibit-bridge binary.
//!
//! Session daemon that owns `org.freedesktop.ScreenSaver` and turns its
//! inhibit requests into systemd-logind idle inhibitors. Runs until SIGINT or
//! SIGTERM, then releases everything it still holds.

use std::path::PathBuf;

use clap::Parser;
use sdib_bridge::BridgeConfig;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Bridge command line arguments.
#[derive(Parser, Debug)]
#[command(name = "sd-inhibit-bridge", version)]
#[command(about = "Bridge org.freedesktop.ScreenSaver inhibits to systemd-logind")]
struct Args {}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let _args = Args::parse();

	setup_tracing(std::env::var_os("SDIB_DEBUG").is_some());

	info!(version = env!("CARGO_PKG_VERSION"), "starting sd-inhibit-bridge");

	let shutdown = CancellationToken::new();
	let mut terminate = signal(SignalKind::terminate())?;
	let mut interrupt = signal(SignalKind::interrupt())?;
	let on_signal = shutdown.clone();
	tokio::spawn(async move {
		tokio::select! {
			_ = terminate.recv() => info!("received SIGTERM"),
			_ = interrupt.recv() => info!("received SIGINT"),
		}
		on_signal.cancel();
	});

	sdib_bridge::dbus::serve(BridgeConfig::default(), shutdown).await?;

	info!("exiting");
	Ok(())
}

fn setup_tracing(debug: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if debug {
				EnvFilter::new("sdib_core=debug,sdib_bridge=debug,sd_inhibit_bridge=debug,info")
			} else {
				EnvFilter::new("info")
			}
		})
	};

	if let Some(log_dir) = std::env::var_os("SDIB_LOG_DIR").map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("sd-inhibit-bridge.{}.log", std::process::id()));

		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_target(true);

			tracing_subscriber::registry().with(filter()).with(file_layer).init();

			info!(path = ?log_path, "tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt()
		.with_env_filter(filter())
		.with_writer(std::io::stderr)
		.init();
}
