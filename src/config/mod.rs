use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::upload::FtpConfig;

const APP_DIR: &str = "shotlift";
const APP_CONFIG_FILE: &str = "config.json";

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AppConfig {
    /// Directory used when a capture request carries no path.
    #[serde(default)]
    pub(crate) save_dir: Option<PathBuf>,
    /// Upload target; interactive captures offer FTP upload only when set.
    #[serde(default)]
    pub(crate) ftp: Option<FtpConfig>,
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads the user's config, falling back to defaults when it is absent or
/// unusable.
pub(crate) fn load_app_config() -> AppConfig {
    let xdg_config_home = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from);
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let Some(path) = app_config_path(xdg_config_home.as_deref(), home.as_deref()) else {
        tracing::warn!("neither XDG_CONFIG_HOME nor HOME is set; using default config");
        return AppConfig::default();
    };

    match read_app_config(&path) {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            AppConfig::default()
        }
        Err(err) => {
            tracing::warn!(%err, "ignoring config file");
            AppConfig::default()
        }
    }
}

/// `Ok(None)` when no file exists at `path`.
pub(crate) fn read_app_config(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let config: AppConfig =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if let Some(ftp) = &config.ftp {
        tracing::info!(host = %ftp.host, port = ftp.port, "loaded ftp upload target");
    }
    Ok(Some(config))
}

/// `$XDG_CONFIG_HOME/shotlift/config.json`, else `~/.config/shotlift/config.json`.
pub(crate) fn app_config_path(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Option<PathBuf> {
    let root = match xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        Some(xdg) => xdg.to_path_buf(),
        None => home?.join(".config"),
    };
    Some(root.join(APP_DIR).join(APP_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(test_name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("shotlift-config-{test_name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(APP_CONFIG_FILE);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn config_path_resolution_order() {
        let xdg = Path::new("/tmp/config-root");
        let home = Path::new("/tmp/home");
        assert_eq!(
            app_config_path(Some(xdg), Some(home)),
            Some(PathBuf::from("/tmp/config-root/shotlift/config.json"))
        );
        assert_eq!(
            app_config_path(Some(Path::new("")), Some(home)),
            Some(PathBuf::from("/tmp/home/.config/shotlift/config.json"))
        );
        assert_eq!(app_config_path(None, None), None);
    }

    #[test]
    fn ftp_section_fills_defaults() {
        let path = write_config(
            "ftp-defaults",
            r#"{ "ftp": { "host": "ftp.example.org", "site": "https://img.example.org/" } }"#,
        );
        let config = read_app_config(&path).unwrap().expect("config present");

        let ftp = config.ftp.expect("ftp section");
        assert_eq!(ftp.host, "ftp.example.org");
        assert_eq!(ftp.port, 21);
        assert!(ftp.login.is_empty());
        assert!(ftp.remote_dir.is_empty());
        assert!(!ftp.auto_upload);
        assert!(config.save_dir.is_none());
    }

    #[test]
    fn ftp_section_without_host_keeps_rest_of_config() {
        let path = write_config(
            "ftp-no-host",
            r#"{ "save_dir": "/srv/shots", "ftp": { "site": "https://img.example.org/" } }"#,
        );
        let config = read_app_config(&path).unwrap().expect("config present");

        assert_eq!(config.save_dir, Some(PathBuf::from("/srv/shots")));
        assert!(config.ftp.expect("ftp section").host.is_empty());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = std::env::temp_dir().join("shotlift-config-absent/config.json");
        assert!(read_app_config(&path).unwrap().is_none());
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let path = write_config("malformed", "{ not json");
        let err = read_app_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
