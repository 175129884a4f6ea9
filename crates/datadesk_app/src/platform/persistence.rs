use std::path::{Path, PathBuf};

use datadesk_engine::{AtomicFileWriter, AuthFailureHandler};
use desk_logging::{desk_error, desk_info, desk_warn, mask_secret};
use serde::{Deserialize, Serialize};

const SESSION_FILENAME: &str = "session.ron";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedSession {
    token: Option<String>,
}

/// Token saved by the last `login`, if any and readable.
pub(crate) fn load_token(state_dir: &Path) -> Option<String> {
    let writer = AtomicFileWriter::new(state_dir.to_path_buf());
    let content = match writer.read(SESSION_FILENAME) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(err) => {
            desk_warn!("Failed to read session from {:?}: {}", state_dir, err);
            return None;
        }
    };

    match ron::from_str::<PersistedSession>(&content) {
        Ok(session) => session.token.filter(|token| !token.is_empty()),
        Err(err) => {
            desk_warn!("Ignoring unreadable session file in {:?}: {}", state_dir, err);
            None
        }
    }
}

pub(crate) fn save_token(state_dir: &Path, token: &str) -> anyhow::Result<PathBuf> {
    let session = PersistedSession {
        token: Some(token.to_string()),
    };
    let content = ron::ser::to_string_pretty(&session, ron::ser::PrettyConfig::new())?;
    let path = AtomicFileWriter::new(state_dir.to_path_buf()).write(SESSION_FILENAME, &content)?;
    desk_info!("Saved session {} to {:?}", mask_secret(token), path);
    Ok(path)
}

/// Remove the saved session. Returns whether there was one.
pub(crate) fn clear_token(state_dir: &Path) -> bool {
    match AtomicFileWriter::new(state_dir.to_path_buf()).remove(SESSION_FILENAME) {
        Ok(removed) => removed,
        Err(err) => {
            desk_error!("Failed to remove session from {:?}: {}", state_dir, err);
            false
        }
    }
}

/// Drops the saved session when the server rejects the token.
pub(crate) struct SessionFileReset {
    state_dir: PathBuf,
}

impl SessionFileReset {
    pub(crate) fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }
}

impl AuthFailureHandler for SessionFileReset {
    fn on_auth_failure(&self, status: u16) {
        desk_warn!("Server answered {}; removing saved session", status);
        clear_token(&self.state_dir);
        eprintln!("Session expired or not authorized. Run `datadesk login` again.");
    }
}
