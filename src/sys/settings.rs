use std::path::{Path, PathBuf};

use super::error::{Error, Result};

pub const SETTINGS_FILE_NAME: &str = "api.key";

pub const DEFAULT_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TEMPERATURE: f64 = 0.8;

pub const KNOWN_MODELS: [&str; 2] = ["deepseek-chat", "deepseek-reasoner"];

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl Settings {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// A call needs a non-empty credential; nothing else is range checked.
    pub fn require_api_key(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config(
                "no API key configured, open the settings and enter one".to_string(),
            ));
        }
        Ok(())
    }

    /// Credential with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let n = self.api_key.chars().count();
        if n <= 4 {
            return "*".repeat(n);
        }
        let tail: String = self.api_key.chars().skip(n - 4).collect();
        format!("{}{tail}", "*".repeat(n - 4))
    }
}

/// The two shapes the settings file has had over time.
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum StoredSettings {
    Structured(Settings),
    Legacy(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Found(Settings),
    Missing,
    /// The file exists but could not be decoded. Treated as absent.
    Invalid { reason: String },
}

impl Loaded {
    pub fn settings(self) -> Option<Settings> {
        match self {
            Loaded::Found(settings) => Some(settings),
            _ => None,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Loaded::Invalid { reason } => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `api.key` next to the running executable, falling back to the
    /// working directory when the executable path is unknown.
    pub fn beside_executable() -> Self {
        let dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir.join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file fresh on every call.
    pub fn load(&self) -> Loaded {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Loaded::Missing,
            Err(e) => return self.invalid(format!("read failed: {e}")),
        };

        let content = match String::from_utf8(raw) {
            Ok(content) => content,
            Err(_) => return self.invalid("file is not valid UTF-8".to_string()),
        };

        match decode(content.trim()) {
            Ok(settings) => Loaded::Found(settings),
            Err(reason) => self.invalid(reason),
        }
    }

    /// Refuses anything `load` could not read back.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if !settings.temperature.is_finite() {
            return Err(Error::Config(format!(
                "temperature must be a finite number, got {}",
                settings.temperature
            )));
        }

        let data = serde_json::to_string(settings)
            .map_err(|e| Error::io(&self.path, std::io::Error::other(e)))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, data).map_err(|e| Error::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| Error::io(&self.path, e))?;

        log::info!("settings saved to {}", self.path.display());
        Ok(())
    }

    fn invalid(&self, reason: String) -> Loaded {
        let reason = format!("failed to load settings from {}: {reason}", self.path.display());
        log::warn!("{reason}");
        Loaded::Invalid { reason }
    }
}

fn decode(content: &str) -> std::result::Result<Settings, String> {
    if content.is_empty() {
        return Err("file is empty".to_string());
    }

    // an object that does not decode is a broken structured file, not a credential
    if content.starts_with('{') {
        return serde_json::from_str::<Settings>(content).map_err(|e| e.to_string());
    }

    match serde_json::from_str::<StoredSettings>(content) {
        Ok(StoredSettings::Structured(settings)) => Ok(settings),
        Ok(StoredSettings::Legacy(api_key)) => Ok(Settings::with_api_key(api_key.trim())),
        Err(_) if serde_json::from_str::<serde_json::Value>(content).is_ok() => {
            Err("expected an object or a credential string".to_string())
        }
        Err(_) => Ok(Settings::with_api_key(content)),
    }
}
