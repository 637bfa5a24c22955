use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use tokio::{
    spawn,
    sync::mpsc::{channel, Receiver, Sender},
};
use tracing::{debug, info};

use super::{Client, ResponseCallback, DEFAULT_PENDING_CAPACITY};
use crate::{
    adapter::AppMutex,
    application::Application,
    proto::abci::{Request, Response},
    reqres::ReqRes,
    server::Service,
    utils::lock,
    Error, Result,
};

/// ABCI client calling an in-process application
///
/// Requests are handed to a single worker task, so they reach the application (and complete) in the order they
/// were queued. The application is shared through an [`AppMutex`], which also serializes calls made by other local
/// clients or servers built on the same instance.
pub struct LocalClient<A: Application> {
    app: AppMutex<A>,
    started: AtomicBool,
    running: AtomicBool,
    callback: Arc<Mutex<Option<ResponseCallback>>>,
    requests: Mutex<Option<Sender<ReqRes>>>,
}

impl<A: Application> LocalClient<A> {
    /// Creates a new instance of [`LocalClient`](self::LocalClient)
    pub fn new(app: A) -> Self {
        Self::with_app(AppMutex::new(app))
    }

    /// Creates a client sharing an existing [`AppMutex`]
    pub fn with_app(app: AppMutex<A>) -> Self {
        Self {
            app,
            started: AtomicBool::new(false),
            running: AtomicBool::new(false),
            callback: Default::default(),
            requests: Default::default(),
        }
    }

    /// Returns the shared application handle
    pub fn app(&self) -> &AppMutex<A> {
        &self.app
    }
}

#[async_trait]
impl<A: Application> Service for LocalClient<A> {
    async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        let (request_sender, request_receiver) = channel(DEFAULT_PENDING_CAPACITY);

        spawn(handle_requests(
            self.app.clone(),
            self.callback.clone(),
            request_receiver,
        ));

        *lock(&self.requests) = Some(request_sender);
        self.running.store(true, Ordering::SeqCst);

        info!(message = "Started local ABCI client");

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(Error::NotStarted);
        }

        // Dropping the sender lets the worker drain what is already queued and exit
        lock(&self.requests).take();

        info!(message = "Stopped local ABCI client");

        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<A: Application> Client for LocalClient<A> {
    fn error(&self) -> Option<Error> {
        None
    }

    fn set_response_callback(&self, callback: ResponseCallback) {
        *lock(&self.callback) = Some(callback);
    }

    async fn queue_request(&self, request: Request) -> ReqRes {
        let reqres = ReqRes::new(request);
        let request_sender = lock(&self.requests).clone();

        match request_sender {
            None if self.started.load(Ordering::SeqCst) => {
                reqres.complete(Err(Error::Stopped));
            }
            None => {
                reqres.complete(Err(Error::NotStarted));
            }
            Some(request_sender) => {
                if request_sender.send(reqres.clone()).await.is_err() {
                    reqres.complete(Err(Error::Stopped));
                }
            }
        }

        reqres
    }
}

async fn handle_requests<A: Application>(
    app: AppMutex<A>,
    callback: Arc<Mutex<Option<ResponseCallback>>>,
    mut request_receiver: Receiver<ReqRes>,
) {
    while let Some(reqres) = request_receiver.recv().await {
        let result = if reqres.request().is_flush() {
            Ok(Response::flush())
        } else {
            app.handle(reqres.request().clone()).await
        };

        if let Ok(ref response) = result {
            let callback = lock(&callback).clone();

            if let Some(callback) = callback {
                callback(reqres.request(), response);
            }
        }

        reqres.complete(result);
    }

    debug!(message = "Local ABCI client worker finished");
}
