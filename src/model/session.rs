use super::User;

pub type Token = String;

/// In-memory authentication state for the current client session.
///
/// Owned by [`AppState`](super::AppState) and handed out by reference. The
/// token stays inside the gateway; responses to the client only ever carry
/// the user record and the logged-in flag.
#[derive(Clone, Debug, Default)]
pub struct Session {
    token: Option<Token>,
    user: Option<User>,
}

impl Session {
    pub fn new() -> Session {
        Session::default()
    }

    /// Replaces the stored token unconditionally.
    pub fn set_token(&mut self, token: Token) {
        self.token = Some(token);
    }

    /// Replaces the stored user record unconditionally.
    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
    }

    /// Clears the token and the user record together.
    pub fn logout(&mut self) {
        self.token = None;
        self.user = None;
    }

    /// True iff the stored token is present and non-empty.
    pub fn is_logged_in(&self) -> bool {
        self.token.as_deref().map_or(false, |token| !token.is_empty())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}
