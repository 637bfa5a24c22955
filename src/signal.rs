//! Opt-in shutdown on Ctrl-C.
use std::sync::Arc;

use tokio::{signal::ctrl_c, spawn, task::JoinHandle};
use tracing::{error, info};

use crate::server::Service;

/// Spawns a task that stops `service` once the process receives Ctrl-C (`SIGINT`)
///
/// Nothing is installed unless this function is called. The returned handle can be aborted to remove the handler.
pub fn install_signal_handler(service: Arc<dyn Service>) -> JoinHandle<()> {
    spawn(async move {
        if let Err(err) = ctrl_c().await {
            error!(message = "Unable to listen for shutdown signal", %err);
            return;
        }

        info!(message = "Received shutdown signal, stopping service");

        if let Err(err) = service.stop().await {
            error!(message = "Error while stopping service", %err);
        }
    })
}
