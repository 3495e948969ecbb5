use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Browser user-data directory for a watch session
pub struct ProfileManager {
    path: PathBuf,
    is_temporary: bool,
}

impl ProfileManager {
    /// A fresh profile, deleted on drop
    pub fn temporary() -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("vaultfill-profile-")
            .tempdir()?
            .keep();

        Ok(Self {
            path,
            is_temporary: true,
        })
    }

    /// A profile at `path`, created if missing and kept after use
    pub fn persistent(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            path,
            is_temporary: false,
        })
    }

    /// A persistent profile stored under the user's data directory
    pub fn named(name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(Error::Browser(format!("Invalid profile name: {:?}", name)));
        }
        Self::persistent(Self::profiles_dir()?.join(name))
    }

    /// `<data dir>/vaultfill/profiles`
    pub fn profiles_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|d| d.join("vaultfill").join("profiles"))
            .ok_or_else(|| Error::Browser("No data directory on this system".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }
}

impl Drop for ProfileManager {
    fn drop(&mut self) {
        if self.is_temporary && self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                tracing::debug!("Could not remove profile {}: {}", self.path.display(), e);
            }
        }
    }
}
