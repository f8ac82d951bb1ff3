use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SESSION_FILE: &str = ".heartline.json";
const SESSION_PATH_ENV: &str = "HEARTLINE_SESSION";

/// The signed-in session, persisted so separate invocations share it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub sessid: String,
    pub signed_in_at: DateTime<Utc>,
}

impl Session {
    pub fn new(username: impl Into<String>, sessid: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            sessid: sessid.into(),
            signed_in_at: Utc::now(),
        }
    }

    fn path() -> PathBuf {
        if let Some(path) = std::env::var_os(SESSION_PATH_ENV) {
            return PathBuf::from(path);
        }
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(SESSION_FILE)
    }

    /// Missing or unreadable session files just mean "not signed in".
    pub fn load() -> Option<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn clear() -> Result<()> {
        let path = Self::path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".heartline.json");

        let session = Session::new("jane", "tok-42");
        session.save_to(&path).unwrap();

        let loaded = Session::load_from(&path).unwrap();
        assert_eq!(loaded.username, "jane");
        assert_eq!(loaded.sessid, "tok-42");
    }

    #[test]
    fn missing_or_corrupt_file_is_not_signed_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".heartline.json");
        assert!(Session::load_from(&path).is_none());

        std::fs::write(&path, "not json").unwrap();
        assert!(Session::load_from(&path).is_none());
    }
}
