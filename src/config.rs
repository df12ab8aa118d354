// omadactl - SSID control for Omada controllers
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_SITE: &str = "Default";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub site: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Controller-side MAC group referenced when an SSID is blocked.
    pub mac_filter_id: Option<String>,
    /// SSID targeted by `ssid enable|disable` when `--ssid` is not given.
    pub default_ssid: Option<String>,
    /// The only SSID `wifi enable|disable` ever touches.
    pub original_ssid: Option<String>,
    /// Unset means off; an explicit `false` in the project file beats a
    /// user-scope `true`.
    pub verify_tls: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a writable config directory for the current user")]
    MissingConfigDir,
    #[error(
        "controller host/username/password are required; set them with `omadactl configure --host ... --username ... --password ...`"
    )]
    MissingControllerFields,
    #[error(
        "no SSID given; pass --ssid or set one with `omadactl configure --default-ssid <name>`"
    )]
    MissingDefaultSsid,
    #[error(
        "mac_filter_id is required to disable an SSID; set it with `omadactl configure --mac-filter-id <id>`"
    )]
    MissingMacFilterId,
    #[error(
        "original_ssid is required for `wifi`; set it with `omadactl configure --original-ssid <name>`"
    )]
    MissingOriginalSsid,
}

/// Per-invocation overrides coming from the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub site: Option<String>,
}

/// Merged configuration with the connection fields checked.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub host: String,
    pub port: u16,
    pub site: String,
    pub username: String,
    pub password: String,
    pub verify_tls: bool,
    pub mac_filter_id: Option<String>,
    pub default_ssid: Option<String>,
    pub original_ssid: Option<String>,
}

impl EffectiveConfig {
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }

    pub fn target_ssid(&self, explicit: Option<String>) -> Result<String, ConfigError> {
        explicit
            .or_else(|| self.default_ssid.clone())
            .ok_or(ConfigError::MissingDefaultSsid)
    }

    pub fn mac_filter_id(&self) -> Result<String, ConfigError> {
        self.mac_filter_id
            .clone()
            .ok_or(ConfigError::MissingMacFilterId)
    }

    pub fn original_ssid(&self) -> Result<String, ConfigError> {
        self.original_ssid
            .clone()
            .ok_or(ConfigError::MissingOriginalSsid)
    }
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(".omadactl.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var("OMADACTL_CONFIG_DIR") {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("omadactl").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn load_scope(scope: Scope, cwd: &Path) -> Result<Config> {
    Ok(read_if_exists(&config_path(scope, cwd)?)?.unwrap_or_default())
}

pub fn save(scope: Scope, config: &Config, cwd: &Path) -> Result<PathBuf> {
    let path = config_path(scope, cwd)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(path)
}

pub fn resolve(cwd: &Path, overrides: Overrides) -> Result<EffectiveConfig> {
    let merged = load(cwd)?;

    let host = overrides
        .host
        .or(merged.host)
        .ok_or(ConfigError::MissingControllerFields)?;
    let username = merged
        .username
        .ok_or(ConfigError::MissingControllerFields)?;
    let password = merged
        .password
        .ok_or(ConfigError::MissingControllerFields)?;

    Ok(EffectiveConfig {
        host,
        port: overrides.port.or(merged.port).unwrap_or(DEFAULT_PORT),
        site: overrides
            .site
            .or(merged.site)
            .unwrap_or_else(|| DEFAULT_SITE.to_string()),
        username,
        password,
        verify_tls: merged.verify_tls.unwrap_or(false),
        mac_filter_id: merged.mac_filter_id,
        default_ssid: merged.default_ssid,
        original_ssid: merged.original_ssid,
    })
}

/// Copy of `config` safe to print.
pub fn masked(config: &Config) -> Config {
    let mut masked = config.clone();
    if masked.password.is_some() {
        masked.password = Some("*****".into());
    }
    masked
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

/// Project-scope values win over user-scope ones.
pub fn merge(user: Config, local: Config) -> Config {
    Config {
        host: local.host.or(user.host),
        port: local.port.or(user.port),
        site: local.site.or(user.site),
        username: local.username.or(user.username),
        password: local.password.or(user.password),
        mac_filter_id: local.mac_filter_id.or(user.mac_filter_id),
        default_ssid: local.default_ssid.or(user.default_ssid),
        original_ssid: local.original_ssid.or(user.original_ssid),
        verify_tls: local.verify_tls.or(user.verify_tls),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;
    use std::{env, fs};
    use tempfile::tempdir;

    static ENV_LOCK: OnceLock<std::sync::Mutex<()>> = OnceLock::new();

    fn isolate(cwd: &Path) {
        unsafe {
            env::set_var("OMADACTL_CONFIG_DIR", cwd.join("config"));
            env::set_var("XDG_CONFIG_HOME", cwd.join("xdg"));
        }
        fs::create_dir_all(cwd.join("config")).unwrap();
        fs::create_dir_all(cwd.join("xdg")).unwrap();
    }

    #[test]
    fn merges_user_and_local_and_overrides() {
        let _guard = ENV_LOCK
            .get_or_init(|| std::sync::Mutex::new(()))
            .lock()
            .unwrap();
        let cwd = tempdir().unwrap();
        isolate(cwd.path());

        let user_cfg = Config {
            host: Some("omada.home".into()),
            port: Some(8043),
            site: Some("Default".into()),
            username: Some("admin".into()),
            password: Some("pass-user".into()),
            mac_filter_id: Some("mf-user".into()),
            default_ssid: Some("Guest".into()),
            original_ssid: Some("Maison".into()),
            verify_tls: None,
        };
        save(Scope::User, &user_cfg, cwd.path()).unwrap();

        let local_cfg = Config {
            host: Some("omada.lab".into()),
            password: Some("pass-local".into()),
            mac_filter_id: Some("mf-local".into()),
            ..Config::default()
        };
        save(Scope::Local, &local_cfg, cwd.path()).unwrap();

        let effective = resolve(cwd.path(), Overrides::default()).unwrap();
        assert_eq!(effective.host, "omada.lab");
        assert_eq!(effective.port, 8043);
        assert_eq!(effective.username, "admin");
        assert_eq!(effective.password, "pass-local");
        assert_eq!(effective.mac_filter_id().unwrap(), "mf-local");
        assert_eq!(effective.original_ssid().unwrap(), "Maison");
        assert_eq!(effective.base_url(), "https://omada.lab:8043");
        assert_eq!(effective.target_ssid(None).unwrap(), "Guest");
        assert_eq!(effective.target_ssid(Some("IoT".into())).unwrap(), "IoT");

        let overridden = resolve(
            cwd.path(),
            Overrides {
                host: Some("10.0.0.2".into()),
                port: Some(443),
                site: Some("Branch".into()),
            },
        )
        .unwrap();
        assert_eq!(overridden.base_url(), "https://10.0.0.2:443");
        assert_eq!(overridden.site, "Branch");
    }

    #[test]
    fn verify_tls_can_be_turned_off_again() {
        let _guard = ENV_LOCK
            .get_or_init(|| std::sync::Mutex::new(()))
            .lock()
            .unwrap();
        let cwd = tempdir().unwrap();
        isolate(cwd.path());

        let user_cfg = Config {
            host: Some("omada.home".into()),
            username: Some("admin".into()),
            password: Some("secret".into()),
            verify_tls: Some(true),
            ..Config::default()
        };
        save(Scope::User, &user_cfg, cwd.path()).unwrap();
        assert!(resolve(cwd.path(), Overrides::default()).unwrap().verify_tls);

        let local_cfg = Config {
            verify_tls: Some(false),
            ..Config::default()
        };
        save(Scope::Local, &local_cfg, cwd.path()).unwrap();
        assert!(!resolve(cwd.path(), Overrides::default()).unwrap().verify_tls);

        // a later update that leaves the flag out keeps the stored value
        let update = Config {
            site: Some("Lab".into()),
            ..Config::default()
        };
        let stored = merge(load_scope(Scope::Local, cwd.path()).unwrap(), update);
        assert_eq!(stored.verify_tls, Some(false));
        let enabled = Config {
            verify_tls: Some(true),
            ..Config::default()
        };
        assert_eq!(merge(stored, enabled).verify_tls, Some(true));
    }

    #[test]
    fn errors_when_missing_credentials() {
        let _guard = ENV_LOCK
            .get_or_init(|| std::sync::Mutex::new(()))
            .lock()
            .unwrap();
        let cwd = tempdir().unwrap();
        isolate(cwd.path());

        let err = resolve(cwd.path(), Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("host/username/password are required"));
    }

    #[test]
    fn optional_fields_error_only_when_needed() {
        let cfg = EffectiveConfig {
            host: "h".into(),
            port: DEFAULT_PORT,
            site: DEFAULT_SITE.into(),
            username: "u".into(),
            password: "p".into(),
            verify_tls: false,
            mac_filter_id: None,
            default_ssid: None,
            original_ssid: None,
        };
        assert!(matches!(
            cfg.mac_filter_id(),
            Err(ConfigError::MissingMacFilterId)
        ));
        assert!(matches!(
            cfg.original_ssid(),
            Err(ConfigError::MissingOriginalSsid)
        ));
        assert!(matches!(
            cfg.target_ssid(None),
            Err(ConfigError::MissingDefaultSsid)
        ));
    }

    #[test]
    fn masks_password() {
        let cfg = Config {
            password: Some("secret".into()),
            ..Config::default()
        };
        assert_eq!(masked(&cfg).password.as_deref(), Some("*****"));
        assert_eq!(masked(&Config::default()).password, None);
    }
}
