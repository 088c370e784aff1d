use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result as AppResult;
use crate::irc::error::Result as IrcResult;
use crate::irc::irc_parser::IrcMessage;
use crate::irc::{ChatMessage, Connector, IrcClient, IrcClientHandle, IrcError, Settings};

/// Owns a running client and keeps every line it completes.
pub struct Chat {
    settings: Settings,
    messages: Vec<ChatMessage>,
    handle: IrcClientHandle,
    lines: mpsc::UnboundedReceiver<String>,
    client_task: JoinHandle<IrcResult<()>>,
}

impl Chat {
    /// Starts a client against Twitch. Must be called within a Tokio runtime.
    pub fn new(settings: Settings) -> Self {
        let (line_tx, lines) = mpsc::unbounded_channel();
        let client = IrcClient::new(settings.clone(), completion(line_tx));
        Self::start(settings, client, lines)
    }

    pub fn with_connector<C: Connector>(settings: Settings, connector: C) -> Self {
        let (line_tx, lines) = mpsc::unbounded_channel();
        let client = IrcClient::with_connector(settings.clone(), completion(line_tx), connector);
        Self::start(settings, client, lines)
    }

    fn start<C: Connector>(
        settings: Settings,
        client: IrcClient<C>,
        lines: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        let (handle, client_task) = client.spawn();
        tracing::info!(
            client.id = %handle.client_id(),
            channel = %settings.channel,
            "Chat started"
        );
        Self {
            settings,
            messages: Vec::new(),
            handle,
            lines,
            client_task,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Every line received so far. Nothing is ever evicted, so this grows
    /// for as long as the chat runs.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Sends a chat message to the configured channel.
    pub fn say(&self, message: &str) -> AppResult<()> {
        self.handle
            .say(&format!("#{}", self.settings.channel), message)
            .map_err(Into::into)
    }

    /// Waits for the next completed line and stores it. Returns `None` once
    /// the client has stopped.
    pub async fn next_message(&mut self) -> Option<&ChatMessage> {
        let line = self.lines.recv().await?;
        self.messages.push(IrcMessage::parse(&line).to_chat_message());
        self.messages.last()
    }

    /// Receives lines until the client stops, logging chat messages as they
    /// arrive. Only returns on a fatal client error.
    pub async fn run(&mut self) -> AppResult<()> {
        while let Some(message) = self.next_message().await {
            match (&message.sender, &message.channel) {
                (Some(sender), Some(channel)) => tracing::info!(
                    channel = %channel,
                    sender = %sender,
                    "{}",
                    message.text
                ),
                _ => tracing::debug!(line = %message.raw, "Server line"),
            }
        }

        match (&mut self.client_task).await {
            Ok(result) => result.map_err(Into::into),
            Err(e) => Err(IrcError::ActorComm(format!("Client task failed: {}", e)).into()),
        }
    }
}

fn completion(line_tx: mpsc::UnboundedSender<String>) -> impl FnMut(&str) + Send + 'static {
    move |line: &str| {
        if line_tx.send(line.to_string()).is_err() {
            tracing::trace!("Chat dropped. Discarding line");
        }
    }
}
