use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    spawn,
    sync::{
        mpsc::{channel, Receiver, Sender},
        watch, Mutex as AsyncMutex, OwnedSemaphorePermit, Semaphore,
    },
    task::JoinHandle,
    time::{sleep, timeout},
};
use tracing::{debug, error, info, instrument, warn};

use super::{
    Client, ResponseCallback, DEFAULT_CALL_TIMEOUT, DEFAULT_PENDING_CAPACITY, DIAL_RETRY_INTERVAL,
    ECHO_RETRY_INTERVAL, HANDSHAKE_MESSAGE,
};
use crate::{
    address::Address,
    grpc::AbciClient,
    proto::abci::{Request, RequestEcho, Response},
    reqres::ReqRes,
    server::Service,
    utils::lock,
    Error, Result,
};

/// gRPC client configuration
#[derive(Debug, Clone)]
pub struct GrpcClientConfig {
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
}

impl Default for GrpcClientConfig {
    fn default() -> Self {
        Self {
            must_connect: false,
            dial_retry_interval: DIAL_RETRY_INTERVAL,
            echo_retry_interval: ECHO_RETRY_INTERVAL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            pending_capacity: DEFAULT_PENDING_CAPACITY,
        }
    }
}

/// ABCI client calling one unary RPC per request
///
/// Queued requests are sent concurrently but complete (and reach the response callback) in the order they were
/// queued. The application may receive them in any order, so callers relying on arrival order (nonce ordered
/// `CheckTx`, for example) must wait for each call before queueing the next. A failed queued request stops the client; a failed call made through [`Client::call`] only fails that
/// call.
pub struct GrpcClient {
    addr: SocketAddr,
    config: GrpcClientConfig,
    started: AtomicBool,
    running: AtomicBool,
    callback: Arc<Mutex<Option<ResponseCallback>>>,
    connection: Mutex<Option<Arc<Connection>>>,
}

impl GrpcClient {
    /// Creates a new instance of [`GrpcClient`](self::GrpcClient)
    ///
    /// gRPC only runs over TCP, any other address is rejected.
    pub fn new<T>(address: T, config: GrpcClientConfig) -> Result<Self>
    where
        T: Into<Address>,
    {
        let address = address.into();
        let addr = address
            .as_tcp()
            .ok_or_else(|| Error::InvalidAddress(address.to_string()))?;

        Ok(Self {
            addr,
            config,
            started: AtomicBool::new(false),
            running: AtomicBool::new(false),
            callback: Default::default(),
            connection: Default::default(),
        })
    }

    fn connection(&self) -> Option<Arc<Connection>> {
        lock(&self.connection).clone()
    }

    async fn handshake(&self, client: &mut AbciClient) -> Result<()> {
        let request = RequestEcho {
            message: HANDSHAKE_MESSAGE.to_string(),
        };

        let response = timeout(self.config.call_timeout, client.echo(request))
            .await
            .map_err(|_| Error::Timeout(self.config.call_timeout))??;

        if response.message == HANDSHAKE_MESSAGE {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "Echo handshake returned {:?}",
                response.message
            )))
        }
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn connect(&self) -> Result<AbciClient> {
        let mut client = loop {
            match AbciClient::connect(self.addr).await {
                Ok(client) => break client,
                Err(err) if self.config.must_connect => {
                    error!(message = "Unable to dial ABCI gRPC server", %err);
                    return Err(err.into());
                }
                Err(err) => {
                    warn!(
                        message = "Unable to dial ABCI gRPC server, retrying",
                        %err,
                        retry_in = ?self.config.dial_retry_interval
                    );
                    sleep(self.config.dial_retry_interval).await;
                }
            }
        };

        loop {
            match self.handshake(&mut client).await {
                Ok(()) => return Ok(client),
                Err(err) => {
                    warn!(
                        message = "Echo handshake failed, retrying",
                        %err,
                        retry_in = ?self.config.echo_retry_interval
                    );
                    sleep(self.config.echo_retry_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl Service for GrpcClient {
    async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        let client = match self.connect().await {
            Ok(client) => client,
            Err(err) => {
                self.started.store(false, Ordering::SeqCst);
                return Err(err);
            }
        };

        *lock(&self.connection) = Some(Connection::spawn(
            client,
            self.callback.clone(),
            &self.config,
        ));
        self.running.store(true, Ordering::SeqCst);

        info!(message = "Started ABCI gRPC client", addr = %self.addr);

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(Error::NotStarted);
        }

        if let Some(connection) = self.connection() {
            connection.stop_for_error(Error::Stopped);
        }

        info!(message = "Stopped ABCI gRPC client", addr = %self.addr);

        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Client for GrpcClient {
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

    async fn round_trip(&self, request: Request) -> Result<Response> {
        let connection = self.connection().ok_or(Error::NotStarted)?;

        if let Some(err) = connection.error() {
            return Err(err);
        }

        let mut client = connection.client.clone();
        let response = timeout(self.config.call_timeout, client.call(request.clone()))
            .await
            .map_err(|_| Error::Timeout(self.config.call_timeout))??;

        let callback = lock(&self.callback).clone();

        if let Some(callback) = callback {
            callback(&request, &response);
        }

        Ok(response)
    }
}

struct InFlight {
    reqres: ReqRes,
    call: JoinHandle<Result<Response>>,
    _slot: OwnedSemaphorePermit,
}

struct Connection {
    client: AbciClient,
    requests: AsyncMutex<Sender<InFlight>>,
    slots: Arc<Semaphore>,
    error: Mutex<Option<Error>>,
    shutdown: watch::Sender<bool>,
}

impl Connection {
    fn spawn(
        client: AbciClient,
        callback: Arc<Mutex<Option<ResponseCallback>>>,
        config: &GrpcClientConfig,
    ) -> Arc<Self> {
        let (request_sender, request_receiver) = channel(config.pending_capacity);
        let (shutdown, _) = watch::channel(false);

        let connection = Arc::new(Self {
            client,
            requests: AsyncMutex::new(request_sender),
            slots: Arc::new(Semaphore::new(config.pending_capacity)),
            error: Default::default(),
            shutdown,
        });

        spawn(complete_requests(
            connection.clone(),
            callback,
            request_receiver,
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

        // Completion order follows the order of the in-flight queue
        let requests = self.requests.lock().await;

        let mut client = self.client.clone();
        let request = reqres.request().clone();
        let call = spawn(async move { client.call(request).await.map_err(Error::from) });

        let in_flight = InFlight {
            reqres: reqres.clone(),
            call,
            _slot: slot,
        };

        if let Err(rejected) = requests.send(in_flight).await {
            rejected.0.call.abort();
            reqres.complete(Err(self.error().unwrap_or(Error::Stopped)));
        }

        reqres
    }

    /// Latches `err` and closes the in-flight slots
    fn stop_for_error(&self, err: Error) {
        {
            let mut error = lock(&self.error);

            if error.is_some() {
                return;
            }

            *error = Some(err.clone());
        }

        match err {
            Error::Stopped => debug!(message = "Closing ABCI gRPC client"),
            ref err => error!(message = "Stopping ABCI gRPC client for error", %err),
        }

        self.slots.close();
        self.shutdown.send_replace(true);
    }
}

async fn complete_requests(
    connection: Arc<Connection>,
    callback: Arc<Mutex<Option<ResponseCallback>>>,
    mut request_receiver: Receiver<InFlight>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let InFlight {
            reqres, mut call, ..
        } = tokio::select! {
            in_flight = request_receiver.recv() => match in_flight {
                Some(in_flight) => in_flight,
                None => break,
            },
            _ = stopped(&mut shutdown) => break,
        };

        let result = tokio::select! {
            result = &mut call => result.map_err(Error::from).and_then(|result| result),
            _ = stopped(&mut shutdown) => {
                call.abort();
                Err(connection.error().unwrap_or(Error::Stopped))
            }
        };

        match result {
            Ok(response) => {
                let callback = lock(&callback).clone();

                if let Some(callback) = callback {
                    callback(reqres.request(), &response);
                }

                reqres.complete(Ok(response));
            }
            Err(err) => {
                connection.stop_for_error(err.clone());
                reqres.complete(Err(connection.error().unwrap_or(err)));
            }
        }
    }

    request_receiver.close();

    let err = connection.error().unwrap_or(Error::Stopped);

    while let Ok(in_flight) = request_receiver.try_recv() {
        in_flight.call.abort();
        in_flight.reqres.complete(Err(err.clone()));
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stopped = *shutdown.borrow();

        if stopped || shutdown.changed().await.is_err() {
            return;
        }
    }
}
