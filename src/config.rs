use std::path::PathBuf;

use crate::error::AppError;

pub const DATA_DIR_ENV: &str = "AOP_HOME";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_DIR_NAME: &str = ".aop";

/// Runtime settings resolved once per invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl Settings {
    /// Explicit values win; otherwise the data directory is `$HOME/.aop`.
    pub fn resolve(
        data_dir: Option<PathBuf>,
        max_upload_bytes: Option<u64>,
    ) -> Result<Self, AppError> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        if data_dir.as_os_str().is_empty() {
            return Err(AppError::InvalidInput("data directory is empty".to_string()));
        }
        Ok(Self {
            data_dir,
            max_upload_bytes: max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("aopplan.db")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.db_path().with_extension("lock")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

fn default_data_dir() -> Result<PathBuf, AppError> {
    match std::env::var("HOME") {
        Ok(home) if !home.trim().is_empty() => Ok(PathBuf::from(home).join(DEFAULT_DIR_NAME)),
        _ => Err(AppError::InvalidInput(format!(
            "unable to resolve data directory; set {DATA_DIR_ENV} or pass --data-dir"
        ))),
    }
}
