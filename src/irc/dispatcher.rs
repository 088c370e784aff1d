use std::collections::HashMap;

use super::irc_parser::IrcMessage;

/// Receives the full raw line; further parsing is up to the handler.
pub type MessageHandler = Box<dyn FnMut(&str) + Send>;

/// Every line sent by the Twitch gateway carries its host name, and the
/// message type is the token right after it.
pub const HOST_SUFFIX_MARKER: &str = ".tv";

/// Returns the message type (dispatch key) of `line`.
///
/// The type is the token between the first and second space following the
/// first `.tv` in the line. Lines without the marker, or where that token is
/// empty (e.g. `PING :tmi.twitch.tv`, where the marker is the last thing on
/// the line), fall back to the command of the regular IRC grammar.
pub fn extract_message_type(line: &str) -> &str {
    marker_type(line)
        .filter(|message_type| !message_type.is_empty())
        .or_else(|| IrcMessage::parse(line).command())
        .unwrap_or("")
}

fn marker_type(line: &str) -> Option<&str> {
    let idx = line.find(HOST_SUFFIX_MARKER)?;
    let (_, after_space) = line[idx..].split_once(' ')?;
    after_space.split(' ').next()
}

/// Routes lines to the handlers registered for their message type, then to
/// the completion handler.
pub struct MessageDispatcher {
    handlers: HashMap<String, Vec<MessageHandler>>,
    completion: MessageHandler,
}

impl MessageDispatcher {
    pub fn new(completion: MessageHandler) -> Self {
        Self {
            handlers: HashMap::new(),
            completion,
        }
    }

    /// Adds `handler` after any handler already registered for
    /// `message_type`. Keys are matched exactly, case included.
    pub fn register(&mut self, message_type: impl Into<String>, handler: MessageHandler) {
        self.handlers
            .entry(message_type.into())
            .or_default()
            .push(handler);
    }

    pub fn handler_count(&self, message_type: &str) -> usize {
        self.handlers.get(message_type).map_or(0, Vec::len)
    }

    /// Runs every handler for the line's type in registration order, then the
    /// completion handler. A panicking handler is not caught.
    pub fn dispatch(&mut self, line: &str) {
        let message_type = extract_message_type(line);
        tracing::debug!(message.kind = %message_type, line = %line, "Dispatching line");

        if let Some(handlers) = self.handlers.get_mut(message_type) {
            for handler in handlers.iter_mut() {
                handler(line);
            }
        }
        (self.completion)(line);
    }
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(key, handlers)| (key.as_str(), handlers.len()))
            .collect();
        f.debug_struct("MessageDispatcher")
            .field("handlers", &counts)
            .finish_non_exhaustive()
    }
}
