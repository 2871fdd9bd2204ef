//! Bus names, paths and inhibitor parameters.

/// Well-known name claimed on the session bus.
pub const SCREENSAVER_NAME: &str = "org.freedesktop.ScreenSaver";

/// Object path the ScreenSaver interface is served at.
pub const SCREENSAVER_PATH: &str = "/org/freedesktop/ScreenSaver";

/// Settings for one bridge instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
	/// Well-known name requested on the session bus.
	pub service_name: String,
	/// Object path of the ScreenSaver interface.
	pub object_path: String,
	/// Lock types passed to logind (`what`).
	pub what: String,
	/// Inhibitor mode passed to logind (`block` or `delay`).
	pub mode: String,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			service_name: SCREENSAVER_NAME.to_string(),
			object_path: SCREENSAVER_PATH.to_string(),
			what: "idle".to_string(),
			mode: "block".to_string(),
		}
	}
}
