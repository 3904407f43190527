//! XDG Base Directory support.

use std::path::PathBuf;

/// XDG directory paths for Dream Job Search.
pub struct XdgDirs {
    /// Config directory (~/.config/dreamjob or XDG_CONFIG_HOME/dreamjob)
    pub config: PathBuf,
    /// Data directory (~/.local/share/dreamjob or XDG_DATA_HOME/dreamjob)
    pub data: PathBuf,
    /// State directory (~/.local/state/dreamjob or XDG_STATE_HOME/dreamjob)
    pub state: PathBuf,
}

impl XdgDirs {
    /// Get XDG directories, respecting environment variables.
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            config: std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(".config"))
                .join("dreamjob"),
            data: std::env::var("XDG_DATA_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(".local/share"))
                .join("dreamjob"),
            state: std::env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(".local/state"))
                .join("dreamjob"),
        }
    }

    /// Ensure all directories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.config, &self.data, &self.state] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}
