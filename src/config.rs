//! Settings for voicesync.
//!
//! Settings file discovery (highest priority first):
//! 1. Explicit path (`--config` flag or VOICESYNC_CONFIG)
//! 2. Project file (.voicesync/config.yaml in the current directory or a parent)
//! 3. Home file ($VOICESYNC_HOME/config.yaml, default ~/.voicesync/config.yaml)
//!
//! Keys missing from the file take their defaults, so older files keep
//! working as settings are added.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Directory name used for project-local settings
pub const PROJECT_DIR: &str = ".voicesync";

/// Settings file name
pub const CONFIG_FILE: &str = "config.yaml";

/// Allowed auto-sync interval, in minutes
pub const MIN_SYNC_INTERVAL: u32 = 1;
pub const MAX_SYNC_INTERVAL: u32 = 60;

/// Persisted settings record.
///
/// Field names on disk match the keys used by the Jarvis Bot tooling
/// (`jarvisBotUrl`, `apiKey`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Base URL of the Jarvis Bot instance
    pub jarvis_bot_url: String,

    /// Bearer credential for the Jarvis Bot API
    pub api_key: String,

    /// Vault folder that receives the notes (empty = vault root)
    pub sync_folder: String,

    /// Run the scheduler
    pub auto_sync: bool,

    /// Minutes between automatic syncs
    pub sync_interval: u32,

    /// Write the metadata header into each note
    pub include_timestamp: bool,

    /// Date template using YYYY, MM, DD, HH and mm
    pub date_format: String,

    /// Vault root directory (empty = project root or current directory)
    pub vault_path: String,

    /// Per-request HTTP timeout in seconds (0 = none)
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jarvis_bot_url: String::new(),
            api_key: String::new(),
            sync_folder: "WhatsApp Voice Notes".to_string(),
            auto_sync: false,
            sync_interval: 5,
            include_timestamp: true,
            date_format: "YYYY-MM-DD HH:mm".to_string(),
            vault_path: String::new(),
            request_timeout_secs: 60,
        }
    }
}

/// Keys accepted by `Settings::set`
pub const SETTING_KEYS: &[&str] = &[
    "jarvisBotUrl",
    "apiKey",
    "syncFolder",
    "autoSync",
    "syncInterval",
    "includeTimestamp",
    "dateFormat",
    "vaultPath",
    "requestTimeoutSecs",
];

impl Settings {
    /// Both the endpoint and the credential are present
    pub fn can_sync(&self) -> bool {
        !self.jarvis_bot_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Interval between scheduler ticks
    pub fn sync_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.sync_interval) * 60)
    }

    /// HTTP timeout, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// API key with everything but the last 4 characters hidden
    pub fn masked_api_key(&self) -> String {
        let count = self.api_key.chars().count();
        if count == 0 {
            return "(not set)".to_string();
        }
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = self.api_key.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), tail)
    }

    /// Clamp values that came from a hand-edited file into range
    pub fn normalized(mut self) -> Self {
        let clamped = self.sync_interval.clamp(MIN_SYNC_INTERVAL, MAX_SYNC_INTERVAL);
        if clamped != self.sync_interval {
            tracing::warn!(
                "syncInterval {} out of range, using {}",
                self.sync_interval,
                clamped
            );
            self.sync_interval = clamped;
        }
        self
    }

    /// Update one setting from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "jarvisBotUrl" => self.jarvis_bot_url = value.trim().to_string(),
            "apiKey" => self.api_key = value.trim().to_string(),
            "syncFolder" => self.sync_folder = value.trim().trim_matches('/').to_string(),
            "autoSync" => self.auto_sync = parse_bool(value)?,
            "syncInterval" => {
                let minutes: u32 = value
                    .trim()
                    .parse()
                    .with_context(|| format!("syncInterval must be a number, got '{}'", value))?;
                if !(MIN_SYNC_INTERVAL..=MAX_SYNC_INTERVAL).contains(&minutes) {
                    anyhow::bail!(
                        "syncInterval must be between {} and {} minutes",
                        MIN_SYNC_INTERVAL,
                        MAX_SYNC_INTERVAL
                    );
                }
                self.sync_interval = minutes;
            }
            "includeTimestamp" => self.include_timestamp = parse_bool(value)?,
            "dateFormat" => self.date_format = value.to_string(),
            "vaultPath" => self.vault_path = value.trim().to_string(),
            "requestTimeoutSecs" => {
                self.request_timeout_secs = value.trim().parse().with_context(|| {
                    format!("requestTimeoutSecs must be a number, got '{}'", value)
                })?;
            }
            _ => anyhow::bail!(
                "Unknown setting '{}'. Known settings: {}",
                key,
                SETTING_KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => anyhow::bail!("Expected true or false, got '{}'", other),
    }
}

/// Loads and saves the settings file
#[derive(Debug, Clone)]
pub struct SettingsStore {
    /// Path to the YAML settings file
    path: PathBuf,

    /// Directory containing `.voicesync/` when the file is project-local
    project_root: Option<PathBuf>,
}

impl SettingsStore {
    /// Use a specific settings file
    pub fn new(path: PathBuf) -> Self {
        let project_root = project_root_of(&path);
        Self { path, project_root }
    }

    /// Resolve the settings file from all sources
    pub fn discover(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }

        if let Ok(path) = std::env::var("VOICESYNC_CONFIG") {
            return Ok(Self::new(PathBuf::from(path)));
        }

        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        if let Some(path) = find_config_file(&cwd) {
            return Ok(Self::new(path));
        }

        Ok(Self::new(default_home()?.join(CONFIG_FILE)))
    }

    /// Path to the settings file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings merged over the defaults (missing file = defaults)
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            tracing::debug!("No settings file at {}, using defaults", self.path.display());
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings file: {}", self.path.display()))?;

        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", self.path.display()))?;

        Ok(settings.normalized())
    }

    /// Save settings, replacing the file atomically
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create settings directory: {}", dir.display()))?;

        let yaml = serde_yaml::to_string(settings).context("Failed to serialize settings")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(yaml.as_bytes())
            .context("Failed to write settings")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to save settings file: {}", self.path.display()))?;

        tracing::debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Vault root for these settings.
    ///
    /// A relative `vaultPath` is resolved against the project root (or the
    /// current directory for non-project settings).
    pub fn vault_root(&self, settings: &Settings) -> Result<PathBuf> {
        let base = match &self.project_root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };

        if settings.vault_path.is_empty() {
            return Ok(base);
        }

        let path = PathBuf::from(&settings.vault_path);
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(base.join(path))
        }
    }
}

/// Default settings directory ($VOICESYNC_HOME or ~/.voicesync)
pub fn default_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("VOICESYNC_HOME") {
        return Ok(PathBuf::from(home));
    }
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(PROJECT_DIR))
}

/// Search `start` and its parents for .voicesync/config.yaml
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(PROJECT_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// The directory holding `.voicesync/`, if the file sits in one
fn project_root_of(path: &Path) -> Option<PathBuf> {
    let dir = path.parent()?;
    if dir.file_name()? != PROJECT_DIR {
        return None;
    }
    dir.parent().map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.sync_folder, "WhatsApp Voice Notes");
        assert_eq!(settings.sync_interval, 5);
        assert_eq!(settings.date_format, "YYYY-MM-DD HH:mm");
        assert!(settings.include_timestamp);
        assert!(!settings.auto_sync);
        assert!(!settings.can_sync());
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let yaml = r#"
jarvisBotUrl: https://bot.example.dev
apiKey: secret
autoSync: true
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.jarvis_bot_url, "https://bot.example.dev");
        assert!(settings.auto_sync);
        assert_eq!(settings.sync_interval, 5);
        assert_eq!(settings.sync_folder, "WhatsApp Voice Notes");
        assert!(settings.can_sync());
    }

    #[test]
    fn test_can_sync_requires_both_fields() {
        let mut settings = Settings {
            jarvis_bot_url: "https://bot.example.dev".to_string(),
            ..Default::default()
        };
        assert!(!settings.can_sync());

        settings.api_key = "   ".to_string();
        assert!(!settings.can_sync());

        settings.api_key = "key".to_string();
        assert!(settings.can_sync());
    }

    #[test]
    fn test_interval_clamped_on_load() {
        let settings: Settings = serde_yaml::from_str("syncInterval: 500").unwrap();
        assert_eq!(settings.normalized().sync_interval, MAX_SYNC_INTERVAL);

        let settings: Settings = serde_yaml::from_str("syncInterval: 0").unwrap();
        assert_eq!(settings.normalized().sync_interval, MIN_SYNC_INTERVAL);
    }

    #[test]
    fn test_set_validates_values() {
        let mut settings = Settings::default();

        settings.set("autoSync", "yes").unwrap();
        assert!(settings.auto_sync);

        settings.set("syncInterval", "15").unwrap();
        assert_eq!(settings.sync_interval, 15);
        assert_eq!(settings.sync_period(), Duration::from_secs(900));

        assert!(settings.set("syncInterval", "61").is_err());
        assert!(settings.set("syncInterval", "soon").is_err());
        assert!(settings.set("autoSync", "maybe").is_err());
        assert!(settings.set("colour", "blue").is_err());

        settings.set("syncFolder", "/Inbox/Voice/").unwrap();
        assert_eq!(settings.sync_folder, "Inbox/Voice");

        settings.set("requestTimeoutSecs", "0").unwrap();
        assert_eq!(settings.request_timeout(), None);
    }

    #[test]
    fn test_masked_api_key() {
        let mut settings = Settings::default();
        assert_eq!(settings.masked_api_key(), "(not set)");

        settings.api_key = "abc".to_string();
        assert_eq!(settings.masked_api_key(), "***");

        settings.api_key = "sk-12345678".to_string();
        assert_eq!(settings.masked_api_key(), "*******5678");
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::new(temp.path().join("nested").join(CONFIG_FILE));

        // Missing file loads defaults
        assert_eq!(store.load().unwrap(), Settings::default());

        let settings = Settings {
            jarvis_bot_url: "https://bot.example.dev".to_string(),
            api_key: "key".to_string(),
            sync_interval: 10,
            ..Default::default()
        };
        store.save(&settings).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("jarvisBotUrl: https://bot.example.dev"));
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn test_find_config_file_in_parent() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join(PROJECT_DIR);
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join(CONFIG_FILE), "autoSync: true\n").unwrap();

        let nested = temp.path().join("notes").join("daily");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, project_dir.join(CONFIG_FILE));
    }

    #[test]
    fn test_vault_root_resolution() {
        let store = SettingsStore::new(PathBuf::from("/home/user/vault/.voicesync/config.yaml"));
        let mut settings = Settings::default();

        assert_eq!(
            store.vault_root(&settings).unwrap(),
            PathBuf::from("/home/user/vault")
        );

        settings.vault_path = "sub".to_string();
        assert_eq!(
            store.vault_root(&settings).unwrap(),
            PathBuf::from("/home/user/vault/sub")
        );

        settings.vault_path = "/elsewhere".to_string();
        assert_eq!(
            store.vault_root(&settings).unwrap(),
            PathBuf::from("/elsewhere")
        );
    }
}
