use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};
#[cfg(unix)]
use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(test)]
use mock_io::tokio::{MockListener, MockStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tokio::{
    io::{AsyncRead as Read, AsyncWrite as Write},
    net::{TcpListener, TcpStream},
    spawn,
    sync::mpsc::{channel, Receiver, Sender},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument};

use super::{ServerConfig, Service};
use crate::{
    adapter::AppMutex,
    address::Address,
    application::Application,
    proto::abci::{Request, Response},
    stream_split::StreamSplit,
    utils::{get_stream_pair, lock, StreamReader, StreamWriter},
    Error, Result,
};

/// ABCI server speaking length-delimited protobuf frames over TCP or UDS
///
/// Every connection gets its own reader and writer task. Requests from all connections are dispatched to the same
/// application through one [`AppMutex`], and responses are written back in the order their requests arrived.
pub struct SocketServer<A: Application> {
    inner: Arc<Inner<A>>,
}

struct Inner<A: Application> {
    address: Mutex<Option<Address>>,
    app: AppMutex<A>,
    config: ServerConfig,
    running: AtomicBool,
    next_connection_id: AtomicU64,
    connections: Mutex<HashMap<u64, JoinHandle<()>>>,
    acceptor: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
    #[cfg(unix)]
    socket_path: Mutex<Option<PathBuf>>,
}

impl<A: Application> SocketServer<A> {
    /// Creates a new instance of [`SocketServer`](self::SocketServer)
    pub fn new<T>(addr: T, app: A) -> Self
    where
        T: Into<Address>,
    {
        Self::with_app(addr.into(), AppMutex::new(app), Default::default())
    }

    /// Creates a server sharing an existing [`AppMutex`]
    pub fn with_app(addr: Address, app: AppMutex<A>, config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                address: Mutex::new(Some(addr)),
                app,
                config,
                running: AtomicBool::new(false),
                next_connection_id: AtomicU64::new(0),
                connections: Default::default(),
                acceptor: Default::default(),
                local_addr: Default::default(),
                #[cfg(unix)]
                socket_path: Default::default(),
            }),
        }
    }

    /// Returns the bound TCP address once the server is started (useful when binding port `0`)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.inner.local_addr)
    }

    /// Returns the number of open connections
    pub fn connection_count(&self) -> usize {
        lock(&self.inner.connections).len()
    }

    /// Returns the shared application handle
    pub fn app(&self) -> &AppMutex<A> {
        &self.inner.app
    }
}

#[async_trait]
impl<A: Application> Service for SocketServer<A> {
    async fn start(&self) -> Result<()> {
        let address = lock(&self.inner.address)
            .take()
            .ok_or(Error::AlreadyStarted)?;

        let acceptor = match address {
            Address::Tcp(addr) => {
                let listener = TcpListener::bind(addr).await?;
                let local_addr = listener.local_addr()?;
                *lock(&self.inner.local_addr) = Some(local_addr);

                info!(message = "Started ABCI socket server", addr = %local_addr);
                spawn(accept_connections(self.inner.clone(), listener))
            }
            #[cfg(unix)]
            Address::Uds(path) => {
                let listener = UnixListener::bind(&path)?;
                *lock(&self.inner.socket_path) = Some(path.clone());

                info!(message = "Started ABCI socket server", path = %path.display());
                spawn(accept_connections(self.inner.clone(), listener))
            }
            #[cfg(test)]
            Address::Mock(listener) => {
                info!(message = "Started ABCI socket server on mock listener");
                spawn(accept_connections(self.inner.clone(), listener))
            }
        };

        *lock(&self.inner.acceptor) = Some(acceptor);
        self.inner.running.store(true, Ordering::SeqCst);

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return Err(Error::NotStarted);
        }

        if let Some(acceptor) = lock(&self.inner.acceptor).take() {
            acceptor.abort();
        }

        for (id, connection) in lock(&self.inner.connections).drain() {
            debug!(message = "Closing connection", id);
            connection.abort();
        }

        #[cfg(unix)]
        if let Some(path) = lock(&self.inner.socket_path).take() {
            if let Err(err) = std::fs::remove_file(&path) {
                debug!(message = "Unable to remove socket file", path = %path.display(), %err);
            }
        }

        info!(message = "Stopped ABCI socket server");

        Ok(())
    }

    fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }
}

impl<A: Application> Inner<A> {
    fn spawn_connection<S>(self: &Arc<Self>, stream: S, peer_addr: String)
    where
        S: StreamSplit,
    {
        let id = self.next_connection_id.fetch_add(1, Ordering::SeqCst);
        info!(message = "New peer connection", id, %peer_addr);

        let inner = self.clone();

        // Insert under the table lock; the task removes its own entry when it finishes
        let mut connections = lock(&self.connections);
        let handle = spawn(async move {
            inner.handle_connection(id, stream, peer_addr).await;
            lock(&inner.connections).remove(&id);
        });
        connections.insert(id, handle);
    }

    #[instrument(skip(self, stream))]
    async fn handle_connection<S>(&self, id: u64, stream: S, peer_addr: String)
    where
        S: StreamSplit,
    {
        let (stream_reader, stream_writer) = get_stream_pair(stream);
        let (response_sender, response_receiver) = channel(self.config.response_queue_capacity);

        let mut writer = spawn(write_responses(stream_writer, response_receiver));

        let (read_result, write_result) = tokio::select! {
            result = self.read_requests(stream_reader, response_sender) => (result, None),
            result = &mut writer => (Ok(()), Some(result)),
        };

        // The reader dropped its sender, so the writer drains queued responses and exits
        let write_result = match write_result {
            Some(result) => result,
            None => writer.await,
        };

        let write_result = write_result.map_err(Error::from).and_then(|result| result);

        match (read_result, write_result) {
            (Ok(()), Ok(())) => info!(message = "Connection was closed by client"),
            (Err(err), _) | (_, Err(err)) => error!(message = "Connection error", %err),
        }
    }

    async fn read_requests<R>(
        &self,
        mut stream_reader: StreamReader<R>,
        response_sender: Sender<Response>,
    ) -> Result<()>
    where
        R: Read + Unpin,
    {
        while let Some(request) = stream_reader.read::<Request>().await? {
            debug!(message = "Received request", kind = %crate::proto::kind_name(request.kind()));

            let (response, close) = match self.app.handle(request).await {
                Ok(response) => (response, None),
                Err(err @ Error::AppPanic(_)) => (Response::exception(err.to_string()), Some(err)),
                Err(err) => {
                    debug!(message = "Responding with exception", %err);
                    (Response::exception(err.to_string()), None)
                }
            };

            if response_sender.send(response).await.is_err() {
                return Err(Error::ConnectionClosed);
            }

            if let Some(err) = close {
                return Err(err);
            }
        }

        Ok(())
    }
}

async fn write_responses<W>(
    mut stream_writer: StreamWriter<W>,
    mut response_receiver: Receiver<Response>,
) -> Result<()>
where
    W: Write + Unpin,
{
    while let Some(response) = response_receiver.recv().await {
        stream_writer.write(&response).await?;

        if response.is_flush() {
            stream_writer.flush().await?;
        }
    }

    stream_writer.shutdown().await
}

#[instrument(skip(inner, listener))]
async fn accept_connections<A, L>(inner: Arc<Inner<A>>, mut listener: L)
where
    A: Application,
    L: Listener,
{
    loop {
        match listener.accept_stream().await {
            Ok(Some((stream, peer_addr))) => inner.spawn_connection(stream, peer_addr),
            Ok(None) => break,
            Err(err) => error!(message = "Error while accepting connection", %err),
        }
    }

    debug!(message = "Listener closed");
}

/// Source of incoming streams
#[async_trait]
trait Listener: Send + 'static {
    type Stream: StreamSplit;

    /// Accepts the next stream, or `None` once the listener can no longer produce any
    async fn accept_stream(&mut self) -> Result<Option<(Self::Stream, String)>>;
}

#[async_trait]
impl Listener for TcpListener {
    type Stream = TcpStream;

    async fn accept_stream(&mut self) -> Result<Option<(Self::Stream, String)>> {
        let (stream, peer_addr) = self.accept().await?;
        Ok(Some((stream, peer_addr.to_string())))
    }
}

#[cfg(unix)]
#[async_trait]
impl Listener for UnixListener {
    type Stream = UnixStream;

    async fn accept_stream(&mut self) -> Result<Option<(Self::Stream, String)>> {
        let (stream, peer_addr) = self.accept().await?;
        Ok(Some((stream, format!("{:?}", peer_addr))))
    }
}

#[cfg(test)]
#[async_trait]
impl Listener for MockListener {
    type Stream = MockStream;

    async fn accept_stream(&mut self) -> Result<Option<(Self::Stream, String)>> {
        match self.accept().await {
            Ok(stream) => Ok(Some((stream, "test_peer".to_string()))),
            Err(_) => Ok(None),
        }
    }
}
