//! Identity of the signed-in user.
//!
//! Screens read the current user synchronously on every load. No user is a
//! normal state (signed out, or session still restoring), not an error.

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

/// Source of the current user.
pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<CurrentUser>;
}

/// A session fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user: Option<CurrentUser>,
}

impl StaticSession {
    pub fn signed_in(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user: Some(CurrentUser {
                id: id.into(),
                username: username.into(),
            }),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

impl SessionProvider for StaticSession {
    fn current_user(&self) -> Option<CurrentUser> {
        self.user.clone()
    }
}
