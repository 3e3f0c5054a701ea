use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Overrides the database location (tests, multiple profiles).
pub const DB_PATH_ENV: &str = "STREAK_DB";

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(DB_PATH_ENV).filter(|p| !p.is_empty()) {
            let db_path = PathBuf::from(path);
            if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory: {}", parent.display())
                })?;
            }
            return Ok(Config { db_path });
        }

        let proj_dirs =
            ProjectDirs::from("", "", "streak").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("streak.db");

        Ok(Config { db_path })
    }
}
