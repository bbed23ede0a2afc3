use std::{
    env, io,
    path::{Path, PathBuf},
};

use anyhow::Result;

const APPLICATION_DIR: &str = "punchclock";

pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        #[cfg(windows)]
        {
            let mut path =
                PathBuf::from(env::var("APPDATA").expect("APPDATA should be present on Windows"));
            path.push(APPLICATION_DIR);
            path
        }
        #[cfg(not(windows))]
        {
            let mut path = env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("HOME").map(|home| {
                        let mut path = PathBuf::from(home);
                        path.push(".local/state");
                        path
                    })
                })
                .expect("Couldn't find neither XDG_STATE_HOME nor HOME");
            path.push(APPLICATION_DIR);
            path
        }
    };

    ensure_dir(path)
}

/// Creates the directory if needed and returns it back.
pub fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

/// Every file punchclock touches lives inside one application directory.
#[derive(Debug, Clone)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot of every timer, rewritten on each tick.
    pub fn backup(&self) -> PathBuf {
        self.root.join("timer_backup.json")
    }

    /// Previously used project name -> project id pairs.
    pub fn registry(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn summary(&self) -> PathBuf {
        self.root.join("summary.csv")
    }

    pub fn logs(&self) -> PathBuf {
        self.root.join("logs")
    }
}
