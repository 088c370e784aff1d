pub mod client;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod framer;
pub mod irc_parser;
pub mod settings;
pub mod types;
pub mod write_queue;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ConnectHandler, IrcClient, IrcClientHandle};
pub use connection::{Connector, TcpConnector};
pub use dispatcher::MessageHandler;
pub use error::IrcError;
pub use settings::Settings;
pub use types::{ChatMessage, ConnectionStatus};
