//! Represents the directories the crate reads from and writes to: the user cache and the current directory.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "spot_detect";

#[derive(Debug)]
pub enum FsAccess {
    Cache,
    Current,
}

impl FsAccess {
    /// Default location for overlay artifacts: `./output`, created when missing.
    pub fn output_dir() -> anyhow::Result<PathBuf> {
        Self::Current.raw_path_with_subs(&["output"])
    }

    /// Retrieves the base path for the specified directory type, optionally appending the `spot_detect` subdirectory.
    ///
    /// # Arguments
    /// * `raw` - If `true`, returns the base path without adding the `spot_detect` subdirectory.
    ///
    /// # Returns
    /// * `Result<PathBuf>` - The base path for the directory.
    fn get_path(&self, raw: bool) -> anyhow::Result<PathBuf> {
        let base_path = match self {
            FsAccess::Cache => dirs::cache_dir(),
            FsAccess::Current => std::env::current_dir().ok(),
        };

        let mut path = base_path.ok_or_else(|| {
            anyhow::anyhow!("Unsupported operating system. Supported OS: Linux, MacOS, Windows.")
        })?;

        if !raw {
            path.push(APP_DIR);
        }
        Ok(path)
    }

    /// Path of `file` inside the `spot_detect` directory, without touching the filesystem.
    ///
    /// Falls back to a relative path when the platform directory cannot be determined.
    pub fn file_path(&self, file: &str) -> PathBuf {
        match self.get_path(false) {
            Ok(dir) => dir.join(file),
            Err(_) => PathBuf::from(file),
        }
    }

    /// Constructs a path to a specified directory with the provided subdirectories, creating it automatically.
    ///
    /// Examples:
    /// `~/.cache/sub1/sub2`, `./output`.
    pub fn raw_path_with_subs(&self, subs: &[&str]) -> anyhow::Result<PathBuf> {
        let mut d = self.get_path(true)?;
        for sub in subs {
            d.push(sub);
        }
        create_directory(&d)?;
        Ok(d)
    }
}

/// Creates the specified directory if it does not exist.
fn create_directory(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
