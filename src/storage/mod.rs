use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

const CAPTURE_PREFIX: &str = "shotlift-";
const PICTURES_SUBDIR: &str = "Pictures";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("target directory does not exist: {0}")]
    MissingDirectory(PathBuf),
    #[error("system time before unix epoch")]
    ClockBeforeEpoch,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Writes encoded captures either to a requested directory or to the default
/// save directory.
#[derive(Debug, Clone)]
pub struct StorageService {
    default_dir: PathBuf,
}

impl StorageService {
    pub const fn with_default_dir(default_dir: PathBuf) -> Self {
        Self { default_dir }
    }

    /// Uses `save_dir` when configured, `$HOME/Pictures` otherwise.
    pub fn from_config(save_dir: Option<PathBuf>) -> StorageResult<Self> {
        let default_dir = match save_dir {
            Some(dir) => dir,
            None => {
                let home = std::env::var("HOME").map_err(|_| StorageError::MissingHomeDirectory)?;
                PathBuf::from(home).join(PICTURES_SUBDIR)
            }
        };
        Ok(Self::with_default_dir(default_dir))
    }

    pub fn default_dir(&self) -> &Path {
        &self.default_dir
    }

    pub fn allocate_target_path(&self, dir: &Path) -> StorageResult<PathBuf> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| StorageError::ClockBeforeEpoch)?;
        Ok(dir.join(format!("{CAPTURE_PREFIX}{}.png", now.as_millis())))
    }

    pub fn save_png(&self, requested_dir: Option<&Path>, png: &[u8]) -> StorageResult<PathBuf> {
        let dir = match requested_dir {
            Some(dir) => {
                if !dir.is_dir() {
                    return Err(StorageError::MissingDirectory(dir.to_path_buf()));
                }
                dir.to_path_buf()
            }
            None => {
                fs::create_dir_all(&self.default_dir)?;
                self.default_dir.clone()
            }
        };

        let target = self.allocate_target_path(&dir)?;
        fs::write(&target, png)?;
        tracing::info!(path = %target.display(), bytes = png.len(), "saved capture");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_target_path_uses_prefix_and_png_extension() {
        let service = StorageService::with_default_dir(PathBuf::from("/tmp"));
        let path = service.allocate_target_path(Path::new("/home/test/Pictures")).unwrap();
        assert!(path.starts_with("/home/test/Pictures"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(CAPTURE_PREFIX));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn save_png_writes_into_requested_directory() {
        let dir = std::env::temp_dir().join("shotlift-storage-requested-test");
        fs::create_dir_all(&dir).unwrap();
        let service = StorageService::with_default_dir(PathBuf::from("/nonexistent-default"));

        let path = service.save_png(Some(&dir), b"png").unwrap();
        assert_eq!(path.parent(), Some(dir.as_path()));
        assert_eq!(fs::read(&path).unwrap(), b"png");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn save_png_creates_default_directory() {
        let dir = std::env::temp_dir().join("shotlift-storage-default-test/nested");
        let _ = fs::remove_dir_all(&dir);
        let service = StorageService::with_default_dir(dir.clone());

        let path = service.save_png(None, b"png").unwrap();
        assert!(path.starts_with(&dir));
        assert!(path.exists());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn save_png_rejects_missing_requested_directory() {
        let service = StorageService::with_default_dir(std::env::temp_dir());
        let err = service
            .save_png(Some(Path::new("/nonexistent/shotlift")), b"png")
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingDirectory(_)));
    }

    #[test]
    fn from_config_prefers_configured_directory() {
        let service = StorageService::from_config(Some(PathBuf::from("/srv/shots"))).unwrap();
        assert_eq!(service.default_dir(), Path::new("/srv/shots"));
    }
}
