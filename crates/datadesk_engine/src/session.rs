use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
}

/// Called when the server rejects the session (401/403), after it has been
/// cleared.
pub trait AuthFailureHandler: Send + Sync {
    fn on_auth_failure(&self, status: u16);
}

/// Shared, explicitly passed session state. The only mutable state shared
/// between controllers.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(Session {
            token: Some(token.into()),
            user: None,
        })
    }

    pub fn token(&self) -> Option<String> {
        self.read().token
    }

    pub fn user(&self) -> Option<User> {
        self.read().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().token.is_some()
    }

    pub fn snapshot(&self) -> Session {
        self.read()
    }

    pub fn set_token(&self, token: Option<String>) {
        self.write(|session| session.token = token);
    }

    pub fn set_user(&self, user: Option<User>) {
        self.write(|session| session.user = user);
    }

    pub fn clear(&self) {
        self.write(|session| *session = Session::default());
    }

    fn read(&self) -> Session {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write(&self, apply: impl FnOnce(&mut Session)) {
        match self.inner.write() {
            Ok(mut guard) => apply(&mut guard),
            Err(poisoned) => apply(&mut poisoned.into_inner()),
        }
    }
}
