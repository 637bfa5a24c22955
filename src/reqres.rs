//! In-flight request handles.
use std::{
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{sync::watch, time::timeout};

use crate::{
    proto::abci::{Request, Response},
    utils::lock,
    Error, Result,
};

/// Callback invoked once with the outcome of a request
pub type ReqResCallback = Box<dyn FnOnce(&Request, &Result<Response>) + Send>;

/// Handle to a request that was queued on a client
///
/// A `ReqRes` is completed exactly once, either with the matching response or with the error that prevented it from
/// being answered. Clones share the same state.
#[derive(Clone)]
pub struct ReqRes {
    inner: Arc<Inner>,
}

struct Inner {
    request: Request,
    state: Mutex<State>,
    done: watch::Sender<bool>,
}

#[derive(Default)]
struct State {
    outcome: Option<Result<Response>>,
    callback: Option<ReqResCallback>,
    callback_set: bool,
}

impl ReqRes {
    /// Creates a pending handle for `request`
    pub fn new(request: Request) -> Self {
        let (done, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                request,
                state: Default::default(),
                done,
            }),
        }
    }

    /// Returns the request this handle was created for
    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    /// Returns `true` once an outcome has been recorded
    pub fn is_done(&self) -> bool {
        *self.inner.done.borrow()
    }

    /// Returns the recorded outcome, if any
    pub fn outcome(&self) -> Option<Result<Response>> {
        lock(&self.inner.state).outcome.clone()
    }

    /// Records the outcome of the request
    ///
    /// Only the first call has an effect; returns `false` if an outcome was already recorded. The callback, if set,
    /// runs on the calling task after the outcome is visible to waiters.
    pub fn complete(&self, outcome: Result<Response>) -> bool {
        let callback = {
            let mut state = lock(&self.inner.state);

            if state.outcome.is_some() {
                return false;
            }

            state.outcome = Some(outcome.clone());
            state.callback.take()
        };

        self.inner.done.send_replace(true);

        if let Some(callback) = callback {
            callback(&self.inner.request, &outcome);
        }

        true
    }

    /// Registers a callback to run once the request completes
    ///
    /// If the request already completed, the callback runs immediately. A second registration is ignored; returns
    /// `false` in that case.
    pub fn set_callback<F>(&self, callback: F) -> bool
    where
        F: FnOnce(&Request, &Result<Response>) + Send + 'static,
    {
        let outcome = {
            let mut state = lock(&self.inner.state);

            if state.callback_set {
                return false;
            }

            state.callback_set = true;

            match state.outcome {
                Some(ref outcome) => outcome.clone(),
                None => {
                    state.callback = Some(Box::new(callback));
                    return true;
                }
            }
        };

        callback(&self.inner.request, &outcome);
        true
    }

    /// Waits until the request completes and returns its outcome
    pub async fn wait(&self) -> Result<Response> {
        let mut done = self.inner.done.subscribe();

        loop {
            if let Some(outcome) = self.outcome() {
                return outcome;
            }

            if done.changed().await.is_err() {
                return self.outcome().unwrap_or(Err(Error::ConnectionClosed));
            }
        }
    }

    /// Waits at most `duration` for the request to complete
    pub async fn wait_timeout(&self, duration: Duration) -> Result<Response> {
        match timeout(duration, self.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Timeout(duration)),
        }
    }
}

impl fmt::Debug for ReqRes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqRes")
            .field("request", &self.inner.request)
            .field("done", &self.is_done())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn check_complete_is_write_once() {
        let reqres = ReqRes::new(Request::echo("hello"));
        assert!(!reqres.is_done());

        assert!(reqres.complete(Ok(Response::flush())));
        assert!(!reqres.complete(Err(Error::ConnectionClosed)));

        assert!(reqres.is_done());
        assert!(reqres.wait().await.unwrap().is_flush());
    }

    #[tokio::test]
    async fn check_callback_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reqres = ReqRes::new(Request::echo("hello"));

        let counter = calls.clone();
        assert!(reqres.set_callback(move |request, outcome| {
            assert_eq!(request, &Request::echo("hello"));
            assert!(outcome.is_ok());
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let counter = calls.clone();
        assert!(!reqres.set_callback(move |_, _| {
            counter.fetch_add(10, Ordering::SeqCst);
        }));

        reqres.complete(Ok(Response::flush()));
        reqres.complete(Ok(Response::flush()));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn check_late_callback_runs_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reqres = ReqRes::new(Request::flush());
        reqres.complete(Err(Error::Stopped));

        let counter = calls.clone();
        reqres.set_callback(move |_, outcome| {
            assert!(matches!(outcome, Err(Error::Stopped)));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn check_wait_wakes_on_completion() {
        let reqres = ReqRes::new(Request::echo("hello"));

        let waiter = {
            let reqres = reqres.clone();
            tokio::spawn(async move { reqres.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        reqres.complete(Ok(Response::exception("boom")));

        let response = waiter.await.unwrap().unwrap();
        assert_eq!(response, Response::exception("boom"));
    }

    #[tokio::test]
    async fn check_wait_timeout() {
        let reqres = ReqRes::new(Request::echo("hello"));

        assert!(matches!(
            reqres.wait_timeout(Duration::from_millis(20)).await,
            Err(Error::Timeout(_))
        ));
    }
}
