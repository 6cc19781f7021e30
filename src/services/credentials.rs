//! Credential providers.

use std::path::PathBuf;

use crate::error::Result;
use crate::models::Credentials;

/// Source of the cookie/token bundle. Acquisition (e.g. a browser session)
/// happens out of process; the pipeline only sees this interface.
pub trait CredentialProvider {
    fn fetch_credentials(&self) -> Result<Credentials>;
}

/// Reads the bundle from a JSON file written by an external tool.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for FileCredentials {
    fn fetch_credentials(&self) -> Result<Credentials> {
        log::debug!("Loading credentials from {}", self.path.display());
        Credentials::load(&self.path)
    }
}
