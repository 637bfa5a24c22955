use std::{
    net::SocketAddr,
    time::Duration,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use tokio::{
    net::TcpListener,
    spawn,
    sync::oneshot::{self, Sender},
    task::JoinHandle,
    time::timeout,
};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{transport::Server, Status};
use tracing::{debug, error, info};

use super::Service;
use crate::{
    adapter::AppMutex,
    application::Application,
    grpc::{AbciHandler, AbciServer},
    proto::abci::{Request, Response},
    utils::lock,
    Error, Result,
};

/// Time given to open gRPC connections to wind down on [`Service::stop`]
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// ABCI server exposing the application through one unary gRPC call per request variant
pub struct GrpcServer<A: Application> {
    addr: SocketAddr,
    app: AppMutex<A>,
    started: AtomicBool,
    running: AtomicBool,
    shutdown: Mutex<Option<Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl<A: Application> GrpcServer<A> {
    /// Creates a new instance of [`GrpcServer`](self::GrpcServer)
    pub fn new(addr: SocketAddr, app: A) -> Self {
        Self::with_app(addr, AppMutex::new(app))
    }

    /// Creates a server sharing an existing [`AppMutex`]
    pub fn with_app(addr: SocketAddr, app: AppMutex<A>) -> Self {
        Self {
            addr,
            app,
            started: AtomicBool::new(false),
            running: AtomicBool::new(false),
            shutdown: Default::default(),
            task: Default::default(),
            local_addr: Default::default(),
        }
    }

    /// Returns the bound address once the server is started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.local_addr)
    }
}

#[async_trait]
impl<A: Application> Service for GrpcServer<A> {
    async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        *lock(&self.local_addr) = Some(local_addr);

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let service = AbciServer::new(AppHandler {
            app: self.app.clone(),
        });

        let task = spawn(async move {
            let result = Server::builder()
                .add_service(service)
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                    let _ = shutdown_receiver.await;
                })
                .await;

            if let Err(err) = result {
                error!(message = "gRPC server failed", %err);
            }
        });

        *lock(&self.shutdown) = Some(shutdown_sender);
        *lock(&self.task) = Some(task);
        self.running.store(true, Ordering::SeqCst);

        info!(message = "Started ABCI gRPC server", addr = %local_addr);

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(Error::NotStarted);
        }

        if let Some(shutdown) = lock(&self.shutdown).take() {
            let _ = shutdown.send(());
        }

        let task = lock(&self.task).take();

        if let Some(mut task) = task {
            match timeout(SHUTDOWN_GRACE_PERIOD, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => debug!(message = "gRPC server task did not finish cleanly", %err),
                Err(_) => {
                    debug!(message = "gRPC connections still open after grace period, aborting");
                    task.abort();
                }
            }
        }

        info!(message = "Stopped ABCI gRPC server");

        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

struct AppHandler<A: Application> {
    app: AppMutex<A>,
}

#[async_trait]
impl<A: Application> AbciHandler for AppHandler<A> {
    async fn handle(&self, request: Request) -> Result<Response, Status> {
        self.app.handle(request).await.map_err(|err| match err {
            Error::UnknownRequest | Error::Conversion(_) => Status::invalid_argument(err.to_string()),
            err => Status::unknown(err.to_string()),
        })
    }
}
