use std::fmt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::connection::{ConnectionManager, Connector, TcpConnector};
use super::dispatcher::{MessageDispatcher, MessageHandler};
use super::error::{IrcError, Result as IrcResult};
use super::irc_parser::{CMD_JOIN, CMD_PING, CMD_PONG, CMD_PRIVMSG, RPL_WELCOME};
use super::settings::Settings;
use super::types::ConnectionStatus;

pub type ConnectHandler = Box<dyn FnMut() + Send>;

pub(crate) enum ClientCommand {
    SendLine(String),
    RegisterHandler {
        message_type: String,
        handler: MessageHandler,
    },
    RegisterOnConnect(ConnectHandler),
}

impl fmt::Debug for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendLine(line) => f.debug_tuple("SendLine").field(line).finish(),
            Self::RegisterHandler { message_type, .. } => f
                .debug_struct("RegisterHandler")
                .field("message_type", message_type)
                .finish_non_exhaustive(),
            Self::RegisterOnConnect(_) => f.write_str("RegisterOnConnect"),
        }
    }
}

/// Cloneable front-end to a running [`IrcClient`]. Every call is queued to
/// the client's task and applied in call order, so it is safe to use from
/// inside handlers.
#[derive(Clone, Debug)]
pub struct IrcClientHandle {
    sender: mpsc::UnboundedSender<ClientCommand>,
    client_id: Uuid,
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl IrcClientHandle {
    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    /// Queues a raw protocol line; CRLF is appended by the client.
    pub fn send_line(&self, data: impl Into<String>) -> IrcResult<()> {
        self.send(ClientCommand::SendLine(data.into()))
    }

    pub fn join(&self, channel: &str) -> IrcResult<()> {
        self.send_line(format!("{} #{}", CMD_JOIN, channel))
    }

    pub fn say(&self, receiver: &str, message: &str) -> IrcResult<()> {
        self.send_line(format!("{} {} :{}", CMD_PRIVMSG, receiver, message))
    }

    pub fn register_handler(
        &self,
        message_type: impl Into<String>,
        handler: impl FnMut(&str) + Send + 'static,
    ) -> IrcResult<()> {
        self.send(ClientCommand::RegisterHandler {
            message_type: message_type.into(),
            handler: Box::new(handler),
        })
    }

    pub fn register_on_connect(&self, handler: impl FnMut() + Send + 'static) -> IrcResult<()> {
        self.send(ClientCommand::RegisterOnConnect(Box::new(handler)))
    }

    pub fn status_receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    fn send(&self, command: ClientCommand) -> IrcResult<()> {
        self.sender
            .send(command)
            .map_err(|e| IrcError::ActorComm(format!("Client task is gone: {}", e)))
    }
}

/// Twitch chat client: connects, authenticates, answers `PING`, joins the
/// configured channel once registration succeeds and hands every received
/// line to the completion handler.
pub struct IrcClient<C: Connector = TcpConnector> {
    manager: ConnectionManager<C>,
    handle: IrcClientHandle,
}

impl IrcClient<TcpConnector> {
    pub fn new(settings: Settings, completion: impl FnMut(&str) + Send + 'static) -> Self {
        Self::with_connector(settings, completion, TcpConnector)
    }
}

impl<C: Connector> IrcClient<C> {
    pub fn with_connector(
        settings: Settings,
        completion: impl FnMut(&str) + Send + 'static,
        connector: C,
    ) -> Self {
        let client_id = Uuid::new_v4();
        let (sender, commands) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Initializing);

        let manager = ConnectionManager::new(
            client_id,
            settings,
            connector,
            MessageDispatcher::new(Box::new(completion)),
            commands,
            status_tx,
        );
        let mut client = Self {
            manager,
            handle: IrcClientHandle {
                sender,
                client_id,
                status_rx,
            },
        };
        client.register_builtin_handlers();
        client
    }

    fn register_builtin_handlers(&mut self) {
        let handle = self.handle.clone();
        self.register_handler(CMD_PING, move |line| {
            if let Err(e) = handle.send_line(format!("{} :{}", CMD_PONG, ping_payload(line))) {
                tracing::error!(error = %e, "Failed to queue PONG");
            }
        });

        let handle = self.handle.clone();
        let channel = self.manager.settings().channel.clone();
        self.register_handler(RPL_WELCOME, move |_line| {
            tracing::info!(channel = %channel, "Registered with server. Joining channel");
            if let Err(e) = handle.join(&channel) {
                tracing::error!(error = %e, "Failed to queue JOIN");
            }
        });
    }

    pub fn settings(&self) -> &Settings {
        self.manager.settings()
    }

    pub fn handle(&self) -> IrcClientHandle {
        self.handle.clone()
    }

    pub fn register_handler(
        &mut self,
        message_type: impl Into<String>,
        handler: impl FnMut(&str) + Send + 'static,
    ) {
        self.manager
            .dispatcher_mut()
            .register(message_type, Box::new(handler));
    }

    pub fn register_on_connect(&mut self, handler: impl FnMut() + Send + 'static) {
        self.manager.add_on_connect(Box::new(handler));
    }

    /// Connects and keeps the connection alive until resolution yields no
    /// addresses, which is the only error returned.
    pub async fn run(self) -> IrcResult<()> {
        self.manager.run().await
    }

    pub fn spawn(self) -> (IrcClientHandle, JoinHandle<IrcResult<()>>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }
}

/// Everything after `PING `, without the leading `:` of a trailing parameter.
fn ping_payload(line: &str) -> &str {
    let payload = line
        .split_once(&format!("{} ", CMD_PING))
        .map_or(line, |(_, rest)| rest);
    payload.strip_prefix(':').unwrap_or(payload)
}
