use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const DATA_DIR_ENV: &str = "JUNKYARD_DATA_DIR";
/// Ten years, in the unit of each setting.
const MAX_PENDING_AGE_HOURS: i64 = 24 * 365 * 10;
const MAX_SHARE_TTL_DAYS: i64 = 365 * 10;

/// User settings read from `config.json` in the data directory. Missing keys
/// take their defaults. A missing file is created with the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) currency_symbol: String,
    /// Extraction program and its leading arguments. The receipt path is
    /// appended. Plain-text parsing is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) receipt_parser: Option<String>,
    /// Pending receipts older than this are removed at start-up.
    pub(crate) pending_max_age_hours: i64,
    /// Lifetime of new share links. Zero means they never expire.
    pub(crate) share_ttl_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency_symbol: "$".into(),
            receipt_parser: None,
            pending_max_age_hours: 24,
            share_ttl_days: 30,
        }
    }
}

impl Config {
    pub(crate) fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            let config = Self::default();
            if let Err(e) = config.save(data_dir) {
                tracing::warn!(error = %e, "could not write default config");
            }
            return Ok(config);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config.sanitized())
    }

    /// Write the config, replacing the file atomically.
    pub(crate) fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(CONFIG_FILE);
        let tmp = data_dir.join(format!("{CONFIG_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    pub(crate) fn pending_max_age(&self) -> chrono::TimeDelta {
        let hours = self.pending_max_age_hours.clamp(1, MAX_PENDING_AGE_HOURS);
        chrono::TimeDelta::try_hours(hours).unwrap_or(chrono::TimeDelta::MAX)
    }

    pub(crate) fn share_ttl(&self) -> Option<i64> {
        (self.share_ttl_days > 0).then_some(self.share_ttl_days)
    }

    fn sanitized(mut self) -> Self {
        let hours = self.pending_max_age_hours.clamp(1, MAX_PENDING_AGE_HOURS);
        if hours != self.pending_max_age_hours {
            tracing::warn!(value = self.pending_max_age_hours, using = hours, "pending_max_age_hours out of range");
            self.pending_max_age_hours = hours;
        }
        let days = self.share_ttl_days.clamp(0, MAX_SHARE_TTL_DAYS);
        if days != self.share_ttl_days {
            tracing::warn!(value = self.share_ttl_days, using = days, "share_ttl_days out of range");
            self.share_ttl_days = days;
        }
        self.receipt_parser = self
            .receipt_parser
            .take()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }
}

/// Data directory: `JUNKYARD_DATA_DIR` when set, the platform data dir otherwise.
pub(crate) fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => directories::ProjectDirs::from("com", "junkyard", "theJunkyard")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
            .data_dir()
            .to_path_buf(),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "currency_symbol": "€", "receipt_parser": "  extract-receipt --json " }"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.currency_symbol, "€");
        assert_eq!(config.receipt_parser.as_deref(), Some("extract-receipt --json"));
        assert_eq!(config.pending_max_age_hours, 24);
        assert_eq!(config.share_ttl(), Some(30));
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "pending_max_age_hours": -5, "share_ttl_days": -1, "receipt_parser": "" }"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.pending_max_age_hours, 1);
        assert_eq!(config.share_ttl(), None);
        assert!(config.receipt_parser.is_none());
    }

    #[test]
    fn test_huge_durations_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "pending_max_age_hours": 9000000000000, "share_ttl_days": 100000000 }"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.pending_max_age_hours, MAX_PENDING_AGE_HOURS);
        assert_eq!(config.pending_max_age(), chrono::TimeDelta::hours(MAX_PENDING_AGE_HOURS));
        assert_eq!(config.share_ttl(), Some(MAX_SHARE_TTL_DAYS));

        let db = crate::db::Database::open_in_memory().unwrap();
        let link = crate::share::create(&db, "x", config.share_ttl()).unwrap();
        assert!(link.expires_at.is_some());
    }

    #[test]
    fn test_unsanitized_age_does_not_overflow() {
        let config = Config {
            pending_max_age_hours: i64::MAX,
            ..Config::default()
        };
        assert_eq!(config.pending_max_age(), chrono::TimeDelta::hours(MAX_PENDING_AGE_HOURS));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            share_ttl_days: 0,
            ..Config::default()
        };
        config.save(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), config);
        assert!(!dir.path().join("config.json.tmp").exists());
    }
}
