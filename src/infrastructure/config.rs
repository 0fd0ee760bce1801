use crate::application::session::SessionOptions;
use crate::domain::dashboard::Zoom;
use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard_builder";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub canvas: CanvasConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Origin used in share links and embed snippets.
    #[serde(default = "default_origin")]
    pub public_origin: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_origin: default_origin(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    Rest,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: Backend,
    pub rest_url: Option<String>,
    pub api_key: Option<String>,
}

impl StorageSettings {
    /// URL and key for the rest backend; both are required there.
    pub fn rest_credentials(&self) -> anyhow::Result<(String, String)> {
        let url = self
            .rest_url
            .clone()
            .context("storage.rest_url must be set when storage.backend = \"rest\"")?;
        let key = self
            .api_key
            .clone()
            .context("storage.api_key must be set when storage.backend = \"rest\"")?;
        Ok((url, key))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CanvasConfig {
    /// Drag snapping grid in pixels. Off when unset or zero.
    #[serde(default)]
    pub grid_size: Option<u32>,
    #[serde(default = "default_zoom")]
    pub default_zoom: u16,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            grid_size: None,
            default_zoom: default_zoom(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_origin() -> String {
    "http://localhost:8080".to_string()
}

fn default_zoom() -> u16 {
    100
}

impl Settings {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            origin: self.server.public_origin.clone(),
            snap: self.canvas.grid_size.filter(|grid| *grid > 0),
            zoom: Zoom::new(self.canvas.default_zoom),
        }
    }
}

/// Optional config file (any format the config crate detects) overlaid with
/// `APP__SECTION__KEY` environment variables.
pub fn load_settings(path: &str) -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()
        .with_context(|| format!("Failed to read configuration from {}", path))?;

    let settings: Settings = settings.try_deserialize()?;
    tracing::debug!(backend = ?settings.storage.backend, bind = %settings.server.bind, "loaded settings");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = load_settings("config/does-not-exist").unwrap();
        assert_eq!(settings.server.bind, "0.0.0.0:8080");
        assert_eq!(settings.storage.backend, Backend::Memory);
        assert_eq!(settings.canvas.default_zoom, 100);
        assert!(settings.storage.rest_credentials().is_err());
    }

    #[test]
    fn test_file_values() {
        let path = std::env::temp_dir().join(format!("dashboard-builder-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
[server]
public_origin = "https://bi.example.com"

[storage]
backend = "rest"
rest_url = "https://db.example.com"
api_key = "anon"

[canvas]
grid_size = 10
default_zoom = 130
"#,
        )
        .unwrap();

        let settings = load_settings(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.storage.backend, Backend::Rest);
        assert_eq!(
            settings.storage.rest_credentials().unwrap(),
            ("https://db.example.com".to_string(), "anon".to_string())
        );
        let options = settings.session_options();
        assert_eq!(options.origin, "https://bi.example.com");
        assert_eq!(options.snap, Some(10));
        assert_eq!(options.zoom.percent(), 125);
    }
}
