use std::{collections::HashMap, fs, time::Duration};

use serde::Deserialize;
use shared::domain::WorkspaceId;
use tracing::warn;

use crate::geometry::DEFAULT_SLOT_MINUTES;

pub const DEFAULT_UNDO_WINDOW_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    pub server_url: String,
    pub workspace_id: WorkspaceId,
    /// How long success messages keep their undo button.
    pub undo_window_secs: u64,
    pub slot_minutes: i64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8443".into(),
            workspace_id: WorkspaceId(1),
            undo_window_secs: DEFAULT_UNDO_WINDOW_SECS,
            slot_minutes: DEFAULT_SLOT_MINUTES,
        }
    }
}

impl ClientSettings {
    pub fn undo_window(&self) -> Duration {
        Duration::from_secs(self.undo_window_secs)
    }
}

pub fn load_client_settings() -> ClientSettings {
    let file = fs::read_to_string("client.toml").ok();
    load_client_settings_from(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then `client.toml`, then `APP__*` environment variables. Unparseable numbers
/// are logged and skipped.
pub fn load_client_settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    let mut values: HashMap<String, String> = HashMap::new();
    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => {
                for (key, value) in file_cfg {
                    let value = match value {
                        toml::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    values.insert(key, value);
                }
            }
            Err(error) => warn!(%error, "ignoring malformed client.toml"),
        }
    }
    for (key, env_key) in [
        ("server_url", "APP__SERVER_URL"),
        ("workspace_id", "APP__WORKSPACE_ID"),
        ("undo_window_secs", "APP__UNDO_WINDOW_SECS"),
        ("slot_minutes", "APP__SLOT_MINUTES"),
    ] {
        if let Some(v) = env(env_key) {
            values.insert(key.to_string(), v);
        }
    }

    if let Some(v) = values.remove("server_url") {
        settings.server_url = v;
    }
    if let Some(v) = values.remove("workspace_id") {
        match v.trim().parse::<i64>() {
            Ok(id) => settings.workspace_id = WorkspaceId(id),
            Err(error) => warn!(value = %v, %error, "invalid workspace_id"),
        }
    }
    if let Some(v) = values.remove("undo_window_secs") {
        match v.trim().parse::<u64>() {
            Ok(secs) => settings.undo_window_secs = secs,
            Err(error) => warn!(value = %v, %error, "invalid undo_window_secs"),
        }
    }
    if let Some(v) = values.remove("slot_minutes") {
        match v.trim().parse::<i64>() {
            Ok(minutes) if minutes > 0 => settings.slot_minutes = minutes,
            _ => warn!(value = %v, "invalid slot_minutes"),
        }
    }

    settings
}
