use super::types::ChatMessage;
use chrono::Utc;

pub const CMD_PASS: &str = "PASS";
pub const CMD_NICK: &str = "NICK";
pub const CMD_JOIN: &str = "JOIN";
pub const CMD_PING: &str = "PING";
pub const CMD_PONG: &str = "PONG";
pub const CMD_PRIVMSG: &str = "PRIVMSG";
pub const RPL_WELCOME: &str = "001";
pub const TWITCH_CAPABILITIES: &str = "CAP REQ :twitch.tv/tags";

/// Borrowed view of one IRC line: `[@tags] [:prefix] COMMAND [params] [:trailing]`.
#[derive(Debug, Default)]
pub struct IrcMessage<'a> {
    raw: &'a str,
    tags: Option<&'a str>,
    prefix: Option<&'a str>,
    command: Option<&'a str>,
    params: Vec<&'a str>,
}

impl<'a> IrcMessage<'a> {
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn command(&self) -> Option<&'a str> {
        self.command
    }

    pub fn prefix(&self) -> Option<&'a str> {
        self.prefix
    }

    pub fn params(&self) -> &[&'a str] {
        &self.params
    }

    pub fn parse(line: &'a str) -> Self {
        let mut message = IrcMessage {
            raw: line,
            ..Default::default()
        };
        let mut remainder = line.trim_end_matches(['\r', '\n']);

        if let Some(tagged) = remainder.strip_prefix('@') {
            match tagged.split_once(' ') {
                Some((tags, rest)) => {
                    message.tags = Some(tags);
                    remainder = rest;
                }
                None => {
                    message.tags = Some(tagged);
                    return message;
                }
            }
        }
        if let Some(prefixed) = remainder.strip_prefix(':') {
            match prefixed.split_once(' ') {
                Some((prefix, rest)) => {
                    message.prefix = Some(prefix);
                    remainder = rest;
                }
                None => {
                    message.prefix = Some(prefixed);
                    return message;
                }
            }
        }

        let (middle, trailing) = match remainder.find(" :") {
            Some(idx) => (&remainder[..idx], Some(&remainder[idx + 2..])),
            None => (remainder, None),
        };
        let mut parts = middle.split(' ').filter(|s| !s.is_empty());
        message.command = parts.next();
        message.params.extend(parts);
        if let Some(trailing) = trailing {
            message.params.push(trailing);
        }
        message
    }

    pub fn tag_value(&self, key_to_find: &str) -> Option<&'a str> {
        self.tags.and_then(|tags_str| {
            tags_str.split(';').find_map(|component| {
                let mut parts = component.splitn(2, '=');
                let key = parts.next()?;
                if key == key_to_find {
                    parts.next().or(Some(""))
                } else {
                    None
                }
            })
        })
    }

    pub fn display_name(&self) -> Option<&'a str> {
        self.tag_value("display-name").filter(|name| !name.is_empty())
    }

    pub fn prefix_nick(&self) -> Option<&'a str> {
        self.prefix.and_then(|p| p.split('!').next())
    }

    pub fn privmsg_text(&self) -> Option<&'a str> {
        if self.command == Some(CMD_PRIVMSG) && self.params.len() > 1 {
            self.params.last().copied()
        } else {
            None
        }
    }

    /// Converts the line into what the application keeps. Chat messages get
    /// their channel, sender and text split out; every other line is kept
    /// verbatim.
    pub fn to_chat_message(&self) -> ChatMessage {
        let timestamp = Utc::now();
        match self.privmsg_text() {
            Some(text) => ChatMessage {
                channel: self
                    .params
                    .first()
                    .map(|target| target.trim_start_matches('#').to_string()),
                sender: Some(
                    self.display_name()
                        .or_else(|| self.prefix_nick())
                        .unwrap_or("unknown_user")
                        .to_string(),
                ),
                text: text.trim_end().to_string(),
                raw: self.raw.to_string(),
                timestamp,
            },
            None => ChatMessage {
                channel: None,
                sender: None,
                text: self.raw.to_string(),
                raw: self.raw.to_string(),
                timestamp,
            },
        }
    }
}
