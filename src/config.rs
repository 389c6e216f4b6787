// Runtime settings: timeouts and polling cadence.
//
// Sources, later ones winning: built-in defaults, the optional
// `<config dir>/fdm-config/config.toml`, then `FDM_*` environment variables
// (nested keys separated by `__`, e.g. `FDM_IMPORT__TIMEOUT_SECS=900`).

use crate::error::{Error, Result};
use crate::jobs::PollSettings;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Default timeout applied to every API call.
    pub request_timeout_secs: u64,
    /// Timeout for uploads and downloads.
    pub transfer_timeout_secs: u64,
    /// Appliances ship with self-signed certificates, so verification is off
    /// unless explicitly enabled.
    pub accept_invalid_certs: bool,
    pub import: PollConfig,
    pub export: PollConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            transfer_timeout_secs: 60,
            accept_invalid_certs: true,
            import: PollConfig {
                interval_secs: 10,
                timeout_secs: 600,
            },
            export: PollConfig {
                interval_secs: 5,
                timeout_secs: 300,
            },
        }
    }
}

impl Settings {
    /// Load settings from defaults, the user config file and the environment.
    pub fn load() -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = Self::config_path() {
            debug!(path = %path.display(), "Reading settings file");
            figment = figment.merge(Toml::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed("FDM_").split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment.extract().map_err(|e| Error::from(Box::new(e)))
    }

    /// Location of the optional settings file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fdm-config").join("config.toml"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    pub fn import_poll(&self) -> PollSettings {
        self.import.to_poll_settings()
    }

    pub fn export_poll(&self) -> PollSettings {
        self.export.to_poll_settings()
    }
}

impl PollConfig {
    fn to_poll_settings(&self) -> PollSettings {
        PollSettings::new(
            Duration::from_secs(self.interval_secs),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_appliance_cadence() {
        let settings = Settings::from_figment(Figment::from(Serialized::defaults(Settings::default())))
            .unwrap();
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.transfer_timeout(), Duration::from_secs(60));
        assert_eq!(settings.import_poll().interval, Duration::from_secs(10));
        assert_eq!(settings.import_poll().timeout, Duration::from_secs(600));
        assert_eq!(settings.export_poll().interval, Duration::from_secs(5));
        assert_eq!(settings.export_poll().timeout, Duration::from_secs(300));
        assert!(settings.accept_invalid_certs);
    }

    #[test]
    fn toml_overrides_individual_keys() {
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(
            r#"
            request_timeout_secs = 45

            [export]
            timeout_secs = 120
            "#,
        ));
        let settings = Settings::from_figment(figment).unwrap();
        assert_eq!(settings.request_timeout_secs, 45);
        assert_eq!(settings.export.timeout_secs, 120);
        assert_eq!(settings.export.interval_secs, 5);
        assert_eq!(settings.import, Settings::default().import);
    }

    #[test]
    fn invalid_values_are_reported() {
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::string("request_timeout_secs = \"soon\""));
        assert!(Settings::from_figment(figment).is_err());
    }
}
