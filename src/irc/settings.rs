use serde::Deserialize;
use std::fmt;

/// Credentials and target channel for one client. Values are passed to the
/// wire exactly as given.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub nick: String,
    pub token: String,
    pub channel: String,
}

impl Settings {
    pub fn new(
        nick: impl Into<String>,
        token: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            nick: nick.into(),
            token: token.into(),
            channel: channel.into(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("nick", &self.nick)
            .field("token", &"<redacted>")
            .field("channel", &self.channel)
            .finish()
    }
}
