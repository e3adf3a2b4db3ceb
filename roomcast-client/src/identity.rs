use crate::error::IdentityError;
use roomcast_core::Identity;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Keeps a client's identity on disk so the id survives restarts.
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Identity>, IdentityError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the stored identity, or generates and stores a new one.
    pub fn load_or_create(&self, display_name: &str) -> Result<Identity, IdentityError> {
        if let Some(identity) = self.load()? {
            return Ok(identity);
        }

        let identity = Identity::generate(display_name);
        self.save(&identity)?;
        info!("Generated new identity {} at {:?}", identity.id, self.path);
        Ok(identity)
    }

    pub fn rename(&self, display_name: &str) -> Result<Identity, IdentityError> {
        let identity = match self.load()? {
            Some(current) => current.renamed(display_name),
            None => Identity::generate(display_name),
        };
        self.save(&identity)?;
        Ok(identity)
    }

    fn save(&self, identity: &Identity) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(identity)?)?;
        Ok(())
    }
}
