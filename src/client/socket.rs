use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::{
    io::{AsyncRead as Read, AsyncWrite as Write},
    net::TcpStream,
    spawn,
    sync::{
        mpsc::{channel, Receiver, Sender},
        watch, Mutex as AsyncMutex, OwnedSemaphorePermit, Semaphore,
    },
    time::sleep,
};
use tracing::{debug, error, info, instrument, warn};

use super::{
    unexpected_response, Client, ResponseCallback, DEFAULT_CALL_TIMEOUT, DEFAULT_PENDING_CAPACITY,
    DIAL_RETRY_INTERVAL, ECHO_RETRY_INTERVAL, HANDSHAKE_MESSAGE,
};
use crate::{
    address::Address,
    proto::{
        abci::{response::Value as ResponseValue, Request, Response},
        kind_name, MessageKind,
    },
    reqres::ReqRes,
    server::Service,
    stream_split::StreamSplit,
    utils::{get_stream_pair, lock, StreamReader, StreamWriter},
    Error, Result,
};

/// Default capacity of the queue between callers and the writer task
pub const DEFAULT_REQUEST_QUEUE_CAPACITY: usize = 256;

/// Socket client configuration
#[derive(Debug, Clone)]
pub struct SocketClientConfig {
    /// Fail [`Service::start`] on the first dial error instead of retrying
    pub must_connect: bool,
    /// Interval between two dial attempts
    pub dial_retry_interval: Duration,
    /// Interval between two `Echo` handshake attempts
    pub echo_retry_interval: Duration,
    /// Time a call waits for its response
    pub call_timeout: Duration,
    /// Maximum number of requests in flight
    pub pending_capacity: usize,
    /// Capacity of the queue feeding the writer task
    pub request_queue_capacity: usize,
}

impl Default for SocketClientConfig {
    fn default() -> Self {
        Self {
            must_connect: false,
            dial_retry_interval: DIAL_RETRY_INTERVAL,
            echo_retry_interval: ECHO_RETRY_INTERVAL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            request_queue_capacity: DEFAULT_REQUEST_QUEUE_CAPACITY,
        }
    }
}

/// ABCI client speaking length-delimited protobuf frames over TCP or UDS
///
/// Responses are paired with requests by position: the client keeps a FIFO of in-flight requests and the next
/// response on the wire always answers the oldest one. Any transport or protocol error stops the client for good;
/// [`Client::error`] then returns that error and every pending and future request completes with it.
pub struct SocketClient {
    address: Address,
    config: SocketClientConfig,
    started: AtomicBool,
    running: AtomicBool,
    callback: Arc<Mutex<Option<ResponseCallback>>>,
    connection: Mutex<Option<Arc<Connection>>>,
}

impl SocketClient {
    /// Creates a new instance of [`SocketClient`](self::SocketClient)
    pub fn new<T>(address: T, config: SocketClientConfig) -> Self
    where
        T: Into<Address>,
    {
        Self {
            address: address.into(),
            config,
            started: AtomicBool::new(false),
            running: AtomicBool::new(false),
            callback: Default::default(),
            connection: Default::default(),
        }
    }

    fn connection(&self) -> Option<Arc<Connection>> {
        lock(&self.connection).clone()
    }

    async fn dial(&self) -> Result<Arc<Connection>> {
        match self.address {
            Address::Tcp(addr) => {
                let stream = TcpStream::connect(addr).await?;
                stream.set_nodelay(true)?;
                Ok(Connection::spawn(stream, self.callback.clone(), &self.config))
            }
            #[cfg(unix)]
            Address::Uds(ref path) => {
                let stream = UnixStream::connect(path).await?;
                Ok(Connection::spawn(stream, self.callback.clone(), &self.config))
            }
            #[cfg(test)]
            Address::Mock(_) => Err(Error::InvalidAddress(self.address.to_string())),
        }
    }

    async fn handshake(&self, connection: &Connection) -> Result<()> {
        let reqres = connection.queue(Request::echo(HANDSHAKE_MESSAGE)).await;
        connection.queue(Request::flush()).await;

        match reqres.wait_timeout(self.config.call_timeout).await?.value {
            Some(ResponseValue::Echo(echo)) if echo.message == HANDSHAKE_MESSAGE => Ok(()),
            other => Err(unexpected_response(MessageKind::Echo, other)),
        }
    }

    #[instrument(skip(self), fields(addr = %self.address))]
    async fn connect(&self) -> Result<Arc<Connection>> {
        loop {
            let connection = match self.dial().await {
                Ok(connection) => connection,
                Err(err) if self.config.must_connect => {
                    error!(message = "Unable to dial ABCI server", %err);
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        message = "Unable to dial ABCI server, retrying",
                        %err,
                        retry_in = ?self.config.dial_retry_interval
                    );
                    sleep(self.config.dial_retry_interval).await;
                    continue;
                }
            };

            loop {
                match self.handshake(&connection).await {
                    Ok(()) => return Ok(connection),
                    Err(err) => match connection.error() {
                        Some(err) => {
                            warn!(message = "Connection lost during handshake, redialing", %err);
                            break;
                        }
                        None => {
                            warn!(
                                message = "Echo handshake failed, retrying",
                                %err,
                                retry_in = ?self.config.echo_retry_interval
                            );
                            sleep(self.config.echo_retry_interval).await;
                        }
                    },
                }
            }
        }
    }
}

#[async_trait]
impl Service for SocketClient {
    async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        let connection = match self.connect().await {
            Ok(connection) => connection,
            Err(err) => {
                self.started.store(false, Ordering::SeqCst);
                return Err(err);
            }
        };

        *lock(&self.connection) = Some(connection);
        self.running.store(true, Ordering::SeqCst);

        info!(message = "Started ABCI socket client", addr = %self.address);

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(Error::NotStarted);
        }

        if let Some(connection) = self.connection() {
            connection.stop_for_error(Error::Stopped);
        }

        info!(message = "Stopped ABCI socket client", addr = %self.address);

        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Client for SocketClient {
    fn error(&self) -> Option<Error> {
        self.connection().and_then(|connection| connection.error())
    }

    fn set_response_callback(&self, callback: ResponseCallback) {
        *lock(&self.callback) = Some(callback);
    }

    fn call_timeout(&self) -> Duration {
        self.config.call_timeout
    }

    async fn queue_request(&self, request: Request) -> ReqRes {
        match self.connection() {
            Some(connection) => connection.queue(request).await,
            None => {
                let reqres = ReqRes::new(request);
                reqres.complete(Err(Error::NotStarted));
                reqres
            }
        }
    }
}

/// A request waiting for its response
///
/// Automatic flushes are tracked without a slot, so they never wait for capacity.
struct Pending {
    reqres: ReqRes,
    _slot: Option<OwnedSemaphorePermit>,
}

/// One dialed stream with its reader and writer tasks
struct Connection {
    requests: AsyncMutex<Sender<ReqRes>>,
    slots: Arc<Semaphore>,
    pending: Mutex<VecDeque<Pending>>,
    error: Mutex<Option<Error>>,
    shutdown: watch::Sender<bool>,
    callback: Arc<Mutex<Option<ResponseCallback>>>,
}

impl Connection {
    fn spawn<S>(
        stream: S,
        callback: Arc<Mutex<Option<ResponseCallback>>>,
        config: &SocketClientConfig,
    ) -> Arc<Self>
    where
        S: StreamSplit,
    {
        let (stream_reader, stream_writer) = get_stream_pair(stream);
        // Every queued request holds a slot, so sends into this channel never wait
        let (request_sender, request_receiver) =
            channel(config.request_queue_capacity.max(config.pending_capacity));
        let (shutdown, _) = watch::channel(false);

        let connection = Arc::new(Self {
            requests: AsyncMutex::new(request_sender),
            slots: Arc::new(Semaphore::new(config.pending_capacity)),
            pending: Default::default(),
            error: Default::default(),
            shutdown,
            callback,
        });

        spawn(write_requests(
            connection.clone(),
            stream_writer,
            request_receiver,
            connection.shutdown.subscribe(),
        ));
        spawn(read_responses(
            connection.clone(),
            stream_reader,
            connection.shutdown.subscribe(),
        ));

        connection
    }

    fn error(&self) -> Option<Error> {
        lock(&self.error).clone()
    }

    async fn queue(&self, request: Request) -> ReqRes {
        let reqres = ReqRes::new(request);

        if let Some(err) = self.error() {
            reqres.complete(Err(err));
            return reqres;
        }

        let slot = match self.slots.clone().acquire_owned().await {
            Ok(slot) => slot,
            Err(_) => {
                reqres.complete(Err(self.error().unwrap_or(Error::Stopped)));
                return reqres;
            }
        };

        // FIFO order must match wire order, so both happen under the outbound lock
        let requests = self.requests.lock().await;

        let latched = {
            let mut pending = lock(&self.pending);

            match self.error() {
                Some(err) => Some(err),
                None => {
                    pending.push_back(Pending {
                        reqres: reqres.clone(),
                        _slot: Some(slot),
                    });
                    None
                }
            }
        };

        if let Some(err) = latched {
            reqres.complete(Err(err));
            return reqres;
        }

        if requests.send(reqres.clone()).await.is_err() {
            self.stop_for_error(Error::ConnectionClosed);
        }

        reqres
    }

    /// Appends a `Flush` to the FIFO; the caller must hold the outbound lock and write it right away
    fn push_auto_flush(&self) -> Option<ReqRes> {
        let mut pending = lock(&self.pending);

        if self.error().is_some() {
            return None;
        }

        let reqres = ReqRes::new(Request::flush());
        pending.push_back(Pending {
            reqres: reqres.clone(),
            _slot: None,
        });

        Some(reqres)
    }

    fn receive(&self, response: Response) -> Result<()> {
        if let Some(ResponseValue::Exception(ref exception)) = response.value {
            return Err(Error::Exception(exception.error.clone()));
        }

        let pending = {
            let mut pending = lock(&self.pending);

            let head = pending
                .front()
                .ok_or_else(|| Error::UnsolicitedResponse(kind_name(response.kind())))?;

            match head.reqres.request().kind() {
                Some(expected) if response.kind() == Some(expected) => {}
                Some(expected) => {
                    return Err(Error::UnexpectedResponse {
                        expected,
                        got: kind_name(response.kind()),
                    })
                }
                None => return Err(Error::UnsolicitedResponse(kind_name(response.kind()))),
            }

            pending.pop_front()
        };

        if let Some(pending) = pending {
            let callback = lock(&self.callback).clone();

            if let Some(callback) = callback {
                callback(pending.reqres.request(), &response);
            }

            pending.reqres.complete(Ok(response));
        }

        Ok(())
    }

    /// Latches `err`, completes every pending request with it and shuts both tasks down
    fn stop_for_error(&self, err: Error) {
        let drained: Vec<Pending> = {
            let mut pending = lock(&self.pending);
            let mut error = lock(&self.error);

            if error.is_some() {
                return;
            }

            *error = Some(err.clone());
            pending.drain(..).collect()
        };

        match err {
            Error::Stopped => debug!(message = "Closing ABCI client connection"),
            ref err => error!(message = "Stopping ABCI client for error", %err),
        }

        self.slots.close();
        self.shutdown.send_replace(true);

        for pending in drained {
            pending.reqres.complete(Err(err.clone()));
        }
    }
}

async fn write_requests<W>(
    connection: Arc<Connection>,
    mut stream_writer: StreamWriter<W>,
    mut request_receiver: Receiver<ReqRes>,
    mut shutdown: watch::Receiver<bool>,
) where
    W: Write + Unpin,
{
    loop {
        let reqres = tokio::select! {
            reqres = request_receiver.recv() => match reqres {
                Some(reqres) => reqres,
                None => break,
            },
            _ = shutdown.changed() => break,
        };

        if let Err(err) =
            write_batch(&connection, &mut stream_writer, &mut request_receiver, reqres).await
        {
            connection.stop_for_error(err);
            break;
        }
    }

    if let Err(err) = stream_writer.shutdown().await {
        debug!(message = "Error while shutting down stream", %err);
    }
}

/// Writes `first` and everything already queued behind it, then flushes
///
/// The server only flushes its own buffer when it answers a `Flush`, so a batch not ending with one gets an
/// automatic `Flush` appended. It is pushed under the outbound lock, after draining whatever callers queued in the
/// meantime, which keeps the FIFO in wire order.
async fn write_batch<W>(
    connection: &Connection,
    stream_writer: &mut StreamWriter<W>,
    request_receiver: &mut Receiver<ReqRes>,
    first: ReqRes,
) -> Result<()>
where
    W: Write + Unpin,
{
    let mut needs_flush = !first.request().is_flush();
    stream_writer.write(first.request()).await?;

    while let Ok(reqres) = request_receiver.try_recv() {
        needs_flush = !reqres.request().is_flush();
        stream_writer.write(reqres.request()).await?;
    }

    if needs_flush {
        let _outbound = connection.requests.lock().await;

        while let Ok(reqres) = request_receiver.try_recv() {
            stream_writer.write(reqres.request()).await?;
        }

        if let Some(flush) = connection.push_auto_flush() {
            stream_writer.write(flush.request()).await?;
        }
    }

    stream_writer.flush().await
}

async fn read_responses<R>(
    connection: Arc<Connection>,
    mut stream_reader: StreamReader<R>,
    mut shutdown: watch::Receiver<bool>,
) where
    R: Read + Unpin,
{
    loop {
        let result = tokio::select! {
            result = stream_reader.read::<Response>() => result,
            _ = shutdown.changed() => break,
        };

        let err = match result {
            Ok(Some(response)) => match connection.receive(response) {
                Ok(()) => continue,
                Err(err) => err,
            },
            Ok(None) => Error::ConnectionClosed,
            Err(err) => err,
        };

        connection.stop_for_error(err);
        break;
    }
}
