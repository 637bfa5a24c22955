#![deny(missing_docs, unsafe_code, unstable_features)]
//! A Rust runtime for ABCI 2.0 applications and the consensus engines driving them.
//!
//! ## ABCI Overview
//!
//! ABCI is the interface between a consensus engine (a state-machine replication engine such as CometBFT) and your
//! application (the actual state machine). It consists of a set of methods, where each method has a corresponding
//! `Request` and `Response` message type. The engine calls the ABCI methods on the ABCI application by sending the
//! `Request` messages and receiving the `Response` messages in return.
//!
//! ABCI methods are split across 4 separate connections (see [`proxy`]):
//!
//! - `Consensus` connection: `InitChain`, `PrepareProposal`, `ProcessProposal`, `ExtendVote`, `VerifyVoteExtension`,
//!   `FinalizeBlock`, `Commit`
//! - `Mempool` connection: `CheckTx`
//! - `Query` connection: `Info`, `Query`
//! - `Snapshot` connection: `ListSnapshots`, `OfferSnapshot`, `LoadSnapshotChunk`, `ApplySnapshotChunk`
//!
//! Additionally, there is a `Flush` method that is called on every connection, and an `Echo` method that is just for
//! debugging.
//!
//! ## Usage
//!
//! ### Application side
//!
//! Implement [`Application`] (every method has a default, see [`BaseApplication`]) and serve it with
//! [`new_server`]:
//!
//! ```no_run
//! use abci::{new_server, Application};
//!
//! struct MyApp;
//!
//! impl Application for MyApp {}
//!
//! #[tokio::main]
//! async fn main() -> abci::Result<()> {
//!     let server = new_server("tcp://127.0.0.1:26658", "socket", MyApp)?;
//!     server.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await
//! }
//! ```
//!
//! Application methods are synchronous. Every call runs on the blocking thread pool while holding the application
//! lock ([`AppMutex`]), so no two methods ever run concurrently, whatever the number of open connections.
//!
//! ### Engine side
//!
//! [`new_client`] returns a [`Client`](client::Client) over the socket or gRPC transport, and
//! [`LocalClient`](client::LocalClient) drives an in-process application. Every request variant can be called
//! synchronously (`check_tx`) or queued (`check_tx_async`, returning a [`ReqRes`]); queued requests complete in the
//! order they were queued.
//!
//! ### Transports
//!
//! - `socket`: length-delimited protobuf frames over TCP (`tcp://host:port` or `host:port`) or Unix domain sockets
//!   (`unix:///path/to/socket`, Unix only).
//! - `grpc`: one unary RPC per request variant of the `tendermint.abci.ABCI` service, TCP only.
//!
//! ## Supported Versions
//!
//! - ABCI 2.0 (CometBFT v0.38)
mod address;
mod application;
mod error;
mod reqres;
mod signal;
mod stream_split;
mod utils;

pub mod adapter;
pub mod client;
pub mod codec;
pub mod grpc;
pub mod proto;
pub mod proxy;
pub mod server;
pub mod types;

#[cfg(test)]
mod tests;

/// Utility macro for implementing async traits of this crate
pub use async_trait::async_trait;

pub use self::adapter::AppMutex;
pub use self::address::Address;
pub use self::application::{Application, BaseApplication};
pub use self::client::new_client;
pub use self::error::{Error, Result};
pub use self::reqres::{ReqRes, ReqResCallback};
pub use self::server::{new_server, Service, Transport};
pub use self::signal::install_signal_handler;
