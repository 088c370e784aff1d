//! In-memory connector and server side used by the client tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, ReadBuf,
};
use tokio::sync::mpsc;

use super::connection::Connector;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum ResolveOutcome {
    Fail,
    Empty,
}

/// How writes behave on a broken connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteFailure {
    Error,
    Zero,
}

#[derive(Default)]
struct MockState {
    resolve_script: Mutex<VecDeque<ResolveOutcome>>,
    write_failures: Mutex<VecDeque<WriteFailure>>,
    refusals_left: AtomicU32,
    resolve_calls: AtomicU32,
    connect_calls: AtomicU32,
}

/// Resolves to a loopback address and hands the server end of every
/// accepted connection to the test through a channel.
#[derive(Clone)]
pub(crate) struct MockConnector {
    state: Arc<MockState>,
    servers: mpsc::UnboundedSender<DuplexStream>,
}

impl MockConnector {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<DuplexStream>) {
        let (servers, server_rx) = mpsc::unbounded_channel();
        (
            Self {
                state: Arc::default(),
                servers,
            },
            server_rx,
        )
    }

    pub(crate) fn fail_resolves(&self, count: usize) {
        self.push_resolve(count, || ResolveOutcome::Fail);
    }

    pub(crate) fn resolve_empty(&self) {
        self.push_resolve(1, || ResolveOutcome::Empty);
    }

    pub(crate) fn refuse_connects(&self, count: u32) {
        self.state.refusals_left.store(count, Ordering::SeqCst);
    }

    /// The next successful connection fails every write the given way while
    /// its read side keeps working.
    pub(crate) fn break_next_writes(&self, failure: WriteFailure) {
        self.state
            .write_failures
            .lock()
            .expect("failure lock")
            .push_back(failure);
    }

    pub(crate) fn resolve_calls(&self) -> u32 {
        self.state.resolve_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn connect_calls(&self) -> u32 {
        self.state.connect_calls.load(Ordering::SeqCst)
    }

    fn push_resolve(&self, count: usize, outcome: impl Fn() -> ResolveOutcome) {
        let mut script = self.state.resolve_script.lock().expect("script lock");
        script.extend((0..count).map(|_| outcome()));
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Stream = MockStream;

    async fn resolve(&self, _host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        self.state.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .state
            .resolve_script
            .lock()
            .expect("script lock")
            .pop_front();
        match outcome {
            Some(ResolveOutcome::Fail) => Err(io::Error::other("lookup failed")),
            Some(ResolveOutcome::Empty) => Ok(Vec::new()),
            None => Ok(vec![SocketAddr::from((Ipv4Addr::LOCALHOST, port))]),
        }
    }

    async fn connect(&self, _addr: SocketAddr) -> io::Result<MockStream> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .state
            .refusals_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        let write_failure = self
            .state
            .write_failures
            .lock()
            .expect("failure lock")
            .pop_front();
        let (client, server) = tokio::io::duplex(4096);
        self.servers
            .send(server)
            .map_err(|_| io::Error::other("test dropped the server receiver"))?;
        Ok(MockStream {
            inner: client,
            write_failure,
        })
    }
}

/// Client end of one mock connection.
pub(crate) struct MockStream {
    inner: DuplexStream,
    write_failure: Option<WriteFailure>,
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.write_failure {
            Some(WriteFailure::Error) => {
                Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
            }
            Some(WriteFailure::Zero) => Poll::Ready(Ok(0)),
            None => Pin::new(&mut self.inner).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Server end of one mock connection.
pub(crate) struct MockServer {
    stream: BufReader<DuplexStream>,
}

impl MockServer {
    pub(crate) async fn accept(servers: &mut mpsc::UnboundedReceiver<DuplexStream>) -> Self {
        let stream = tokio::time::timeout(TIMEOUT, servers.recv())
            .await
            .expect("client did not connect in time")
            .expect("connector dropped");
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Next line written by the client, without its CRLF.
    pub(crate) async fn read_line(&mut self) -> String {
        self.try_read_line(TIMEOUT)
            .await
            .expect("client did not send a line in time")
    }

    pub(crate) async fn try_read_line(&mut self, timeout: Duration) -> Option<String> {
        let mut line = String::new();
        match tokio::time::timeout(timeout, self.stream.read_line(&mut line)).await {
            Ok(Ok(n)) if n > 0 => {
                assert!(line.ends_with("\r\n"), "line not CRLF-terminated: {:?}", line);
                Some(line.trim_end_matches("\r\n").to_string())
            }
            Ok(Ok(_)) => None,
            Ok(Err(e)) => panic!("read from client failed: {}", e),
            Err(_) => None,
        }
    }

    pub(crate) async fn send(&mut self, line: &str) {
        self.send_raw(format!("{}\r\n", line).as_bytes()).await;
    }

    pub(crate) async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream
            .get_mut()
            .write_all(bytes)
            .await
            .expect("write to client");
    }
}
