use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::client::{ClientCommand, ConnectHandler};
use super::dispatcher::MessageDispatcher;
use super::error::{IrcError, Result as IrcResult};
use super::framer::LineFramer;
use super::irc_parser::{CMD_NICK, CMD_PASS, TWITCH_CAPABILITIES};
use super::settings::Settings;
use super::types::ConnectionStatus;
use super::write_queue::WriteQueue;

pub const TWITCH_IRC_HOST: &str = "irc.chat.twitch.tv";
pub const TWITCH_IRC_PORT: u16 = 6667;

const READ_CHUNK_SIZE: usize = 4096;

/// Name resolution and stream establishment. The only seam between the
/// connection state machine and the network.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;

    async fn connect(&self, addr: SocketAddr) -> io::Result<Self::Stream>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok(tokio::net::lookup_host((host, port)).await?.collect())
    }

    async fn connect(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        TcpStream::connect(addr).await
    }
}

/// Lifecycle of one connection. Any I/O failure leads back to `Resolving`,
/// dropping the stream of the failed connection.
#[derive(Debug)]
pub enum ConnectionState<S> {
    Resolving,
    Connecting(SocketAddr),
    Identifying(S),
    Reading(S),
}

/// Owns everything the client touches after start: the registries, the write
/// queue and the socket. Runs on a single task, so handlers, commands and
/// socket completions never overlap.
pub(crate) struct ConnectionManager<C: Connector> {
    client_id: Uuid,
    settings: Settings,
    connector: C,
    queue: WriteQueue,
    dispatcher: MessageDispatcher,
    on_connect: Vec<ConnectHandler>,
    commands: mpsc::UnboundedReceiver<ClientCommand>,
    commands_open: bool,
    status: watch::Sender<ConnectionStatus>,
    attempt: u32,
}

impl<C: Connector> ConnectionManager<C> {
    pub(crate) fn new(
        client_id: Uuid,
        settings: Settings,
        connector: C,
        dispatcher: MessageDispatcher,
        commands: mpsc::UnboundedReceiver<ClientCommand>,
        status: watch::Sender<ConnectionStatus>,
    ) -> Self {
        Self {
            client_id,
            settings,
            connector,
            queue: WriteQueue::new(),
            dispatcher,
            on_connect: Vec::new(),
            commands,
            commands_open: true,
            status,
            attempt: 0,
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn dispatcher_mut(&mut self) -> &mut MessageDispatcher {
        &mut self.dispatcher
    }

    pub(crate) fn add_on_connect(&mut self, handler: ConnectHandler) {
        self.on_connect.push(handler);
    }

    /// Drives the state machine. Transient failures restart from
    /// `Resolving` immediately and without limit; the only way out is a
    /// resolution that returns no addresses.
    pub(crate) async fn run(mut self) -> IrcResult<()> {
        tracing::info!(
            client.id = %self.client_id,
            nick = %self.settings.nick,
            channel = %self.settings.channel,
            "IRC client started"
        );
        let mut state = ConnectionState::Resolving;
        loop {
            state = match state {
                ConnectionState::Resolving => self.resolve().await?,
                ConnectionState::Connecting(addr) => self.connect(addr).await,
                ConnectionState::Identifying(stream) => self.identify(stream),
                ConnectionState::Reading(stream) => self.read_until_failure(stream).await,
            };
        }
    }

    async fn resolve(&mut self) -> IrcResult<ConnectionState<C::Stream>> {
        self.attempt += 1;
        self.set_status(ConnectionStatus::Resolving {
            attempt: self.attempt,
        });
        tracing::info!(
            client.id = %self.client_id,
            host = TWITCH_IRC_HOST,
            port = TWITCH_IRC_PORT,
            attempt = self.attempt,
            "Resolving IRC host"
        );
        // No backoff between attempts, but let other tasks run.
        tokio::task::yield_now().await;

        match self.connector.resolve(TWITCH_IRC_HOST, TWITCH_IRC_PORT).await {
            Ok(addrs) => match addrs.first() {
                Some(addr) => Ok(ConnectionState::Connecting(*addr)),
                None => {
                    tracing::error!(
                        client.id = %self.client_id,
                        host = TWITCH_IRC_HOST,
                        "Host resolved to no addresses. Giving up"
                    );
                    Err(IrcError::NoAddresses {
                        host: TWITCH_IRC_HOST.to_string(),
                        port: TWITCH_IRC_PORT,
                    })
                }
            },
            Err(e) => {
                tracing::warn!(
                    client.id = %self.client_id,
                    error = %e,
                    "Resolution failed. Retrying"
                );
                self.set_status(ConnectionStatus::Disconnected {
                    reason: format!("Resolution failed: {}", e),
                });
                Ok(ConnectionState::Resolving)
            }
        }
    }

    async fn connect(&mut self, addr: SocketAddr) -> ConnectionState<C::Stream> {
        self.set_status(ConnectionStatus::Connecting {
            attempt: self.attempt,
            addr,
        });
        tracing::info!(client.id = %self.client_id, %addr, "Connecting");

        match self.connector.connect(addr).await {
            Ok(stream) => ConnectionState::Identifying(stream),
            Err(e) => {
                tracing::warn!(
                    client.id = %self.client_id,
                    %addr,
                    error = %e,
                    "TCP connection failed. Restarting from resolve"
                );
                self.set_status(ConnectionStatus::Disconnected {
                    reason: format!("Connect failed: {}", e),
                });
                ConnectionState::Resolving
            }
        }
    }

    fn identify(&mut self, stream: C::Stream) -> ConnectionState<C::Stream> {
        self.set_status(ConnectionStatus::Identifying);
        // Registrations and sends issued while disconnected take effect now.
        self.drain_commands();

        tracing::info!(
            client.id = %self.client_id,
            queued = self.queue.len(),
            "TCP connected. Authenticating"
        );
        self.send_line(&format!("{} oauth:{}", CMD_PASS, self.settings.token));
        self.send_line(&format!("{} {}", CMD_NICK, self.settings.nick));
        self.send_line(TWITCH_CAPABILITIES);

        for handler in self.on_connect.iter_mut() {
            handler();
        }
        ConnectionState::Reading(stream)
    }

    async fn read_until_failure(&mut self, stream: C::Stream) -> ConnectionState<C::Stream> {
        self.set_status(ConnectionStatus::Connected);

        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut framer = LineFramer::new();
        let mut read_buf = vec![0u8; READ_CHUNK_SIZE];
        let mut write_stalled = false;

        let reason = loop {
            tokio::select! {
                biased;
                command = self.commands.recv(), if self.commands_open => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::debug!(client.id = %self.client_id, "All client handles dropped");
                        self.commands_open = false;
                    }
                },
                written = write_front(&mut writer, &self.queue), if !write_stalled => match written {
                    Ok(0) => {
                        tracing::error!(client.id = %self.client_id, "Socket accepted no bytes. Pausing writes");
                        write_stalled = true;
                    }
                    Ok(n) => {
                        let more = self.queue.on_write_complete(n);
                        tracing::trace!(client.id = %self.client_id, bytes = n, more, "Write completed");
                    }
                    Err(e) => {
                        // The read side notices a dead socket and triggers the reconnect.
                        tracing::error!(
                            client.id = %self.client_id,
                            error = %e,
                            queued = self.queue.len(),
                            "Write failed. Pausing writes until reconnect"
                        );
                        write_stalled = true;
                    }
                },
                read = reader.read(&mut read_buf) => match read {
                    Ok(0) => break "Connection closed by server (EOF)".to_string(),
                    Ok(n) => {
                        for line in framer.feed(&read_buf[..n]) {
                            self.dispatcher.dispatch(&line);
                        }
                    }
                    Err(e) => break format!("Read error: {}", e),
                },
            }
        };

        tracing::warn!(
            client.id = %self.client_id,
            reason = %reason,
            unsent = self.queue.len(),
            "Connection lost. Restarting from resolve"
        );
        self.set_status(ConnectionStatus::Disconnected { reason });
        ConnectionState::Resolving
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::SendLine(line) => self.send_line(&line),
            ClientCommand::RegisterHandler {
                message_type,
                handler,
            } => self.dispatcher.register(message_type, handler),
            ClientCommand::RegisterOnConnect(handler) => self.on_connect.push(handler),
        }
    }

    fn send_line(&mut self, line: &str) {
        tracing::debug!(client.id = %self.client_id, line = %redact(line), "Sending");
        if self.queue.enqueue(line) {
            tracing::trace!(client.id = %self.client_id, "Write queue was idle. Starting send");
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status.send_replace(status);
    }
}

/// Writes as much of the queue front as the socket accepts. Never completes
/// while the queue is empty.
async fn write_front<W>(writer: &mut W, queue: &WriteQueue) -> io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    match queue.front() {
        Some(bytes) => writer.write(bytes).await,
        None => std::future::pending().await,
    }
}

fn redact(line: &str) -> &str {
    if line.starts_with(CMD_PASS) {
        "PASS oauth:<redacted>"
    } else {
        line
    }
}
