//! Session cookie encoding

use std::fmt;

/// `SessionId` cookie carrying a session id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    session_id: String,
    max_age_secs: u64,
}

impl SessionCookie {
    /// Cookie name
    pub const NAME: &'static str = "SessionId";

    /// Default lifetime, one day
    pub const DEFAULT_MAX_AGE_SECS: u64 = 86_400;

    /// Cookie for `session_id` with the default lifetime
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::with_max_age(session_id, Self::DEFAULT_MAX_AGE_SECS)
    }

    /// Cookie for `session_id` living `max_age_secs`
    pub fn with_max_age(session_id: impl Into<String>, max_age_secs: u64) -> Self {
        Self {
            session_id: session_id.into(),
            max_age_secs,
        }
    }

    /// The carried session id
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Extract the session id from an inbound `Cookie` header value
    pub fn from_cookie_header(header: &str) -> Option<String> {
        header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let value = value.trim();
            (name.trim() == Self::NAME && !value.is_empty()).then(|| value.to_string())
        })
    }
}

impl fmt::Display for SessionCookie {
    /// `Set-Cookie` header value
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}; Max-Age={}; HttpOnly",
            Self::NAME,
            self.session_id,
            self.max_age_secs
        )
    }
}
