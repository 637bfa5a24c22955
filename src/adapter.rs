//! Bridge between the wire vocabulary and [`Application`]s.
use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Mutex},
};

use tokio::task::spawn_blocking;
use tracing::error;

use crate::{
    application::Application,
    proto::abci::{Request as ProtoRequest, Response as ProtoResponse},
    types::{FlushResponse, Request, Response},
    utils::lock,
    Error, Result,
};

/// Invokes the application method matching `request`
///
/// `Flush` never reaches the application. An error returned by the application is handed back as is; callers decide
/// whether it becomes an `Exception` response or a call error.
pub fn dispatch<A: Application + ?Sized>(app: &mut A, request: Request) -> Result<Response> {
    let response = match request {
        Request::Echo(request) => Response::Echo(app.echo(request)?),
        Request::Flush(_) => Response::Flush(FlushResponse),
        Request::Info(request) => Response::Info(app.info(request)?),
        Request::InitChain(request) => Response::InitChain(app.init_chain(request)?),
        Request::Query(request) => Response::Query(app.query(request)?),
        Request::CheckTx(request) => Response::CheckTx(app.check_tx(request)?),
        Request::PrepareProposal(request) => {
            Response::PrepareProposal(app.prepare_proposal(request)?)
        }
        Request::ProcessProposal(request) => {
            Response::ProcessProposal(app.process_proposal(request)?)
        }
        Request::ExtendVote(request) => Response::ExtendVote(app.extend_vote(request)?),
        Request::VerifyVoteExtension(request) => {
            Response::VerifyVoteExtension(app.verify_vote_extension(request)?)
        }
        Request::FinalizeBlock(request) => Response::FinalizeBlock(app.finalize_block(request)?),
        Request::Commit(request) => Response::Commit(app.commit(request)?),
        Request::ListSnapshots(request) => Response::ListSnapshots(app.list_snapshots(request)?),
        Request::OfferSnapshot(request) => Response::OfferSnapshot(app.offer_snapshot(request)?),
        Request::LoadSnapshotChunk(request) => {
            Response::LoadSnapshotChunk(app.load_snapshot_chunk(request)?)
        }
        Request::ApplySnapshotChunk(request) => {
            Response::ApplySnapshotChunk(app.apply_snapshot_chunk(request)?)
        }
    };

    Ok(response)
}

/// Converts a wire request, dispatches it and converts the response back to the wire
pub fn dispatch_wire<A: Application + ?Sized>(
    app: &mut A,
    request: ProtoRequest,
) -> Result<ProtoResponse> {
    let request = Request::try_from(request)?;
    dispatch(app, request).map(Into::into)
}

/// Shared handle to an application that serializes every call
///
/// All servers and local clients built from clones of the same `AppMutex` share a single application instance, and
/// no two of its methods ever run concurrently. A panicking method is caught while the lock is held, so the lock is
/// released and the panic is reported as [`Error::AppPanic`].
pub struct AppMutex<A> {
    app: Arc<Mutex<A>>,
}

impl<A> Clone for AppMutex<A> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
        }
    }
}

impl<A: Application> AppMutex<A> {
    /// Creates a new instance of [`AppMutex`](self::AppMutex)
    pub fn new(app: A) -> Self {
        Self {
            app: Arc::new(Mutex::new(app)),
        }
    }

    /// Handles a wire request on the current thread (blocks while another call holds the lock)
    pub fn handle_blocking(&self, request: ProtoRequest) -> Result<ProtoResponse> {
        let mut app = lock(&self.app);

        match catch_unwind(AssertUnwindSafe(|| dispatch_wire(&mut *app, request))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(message = "Recovered from application panic", panic = %message);
                Err(Error::AppPanic(message))
            }
        }
    }

    /// Handles a wire request on the blocking thread pool
    pub async fn handle(&self, request: ProtoRequest) -> Result<ProtoResponse> {
        let this = self.clone();
        spawn_blocking(move || this.handle_blocking(request)).await?
    }

    /// Runs `f` with exclusive access to the application
    pub fn with_app<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut A) -> T,
    {
        let mut app = lock(&self.app);
        f(&mut app)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
        time::Duration,
    };

    use super::*;
    use crate::{
        application::BaseApplication,
        proto::abci::{
            request::Value as RequestValue, response::Value as ResponseValue, ExtendedCommitInfo,
            ExtendedVoteInfo, Misbehavior, RequestCheckTx, RequestFinalizeBlock, RequestInitChain,
            RequestPrepareProposal, ResponseApplySnapshotChunk, ResponseFinalizeBlock,
            ResponseQuery, Validator, ValidatorUpdate, VoteInfo,
        },
        proto::crypto::{public_key::Sum, ProofOp, ProofOps, PublicKey},
        proto::types::{BlockParams, ConsensusParams, EvidenceParams},
        types::{self, CheckTxRequest, CheckTxType, EchoRequest},
    };

    fn timestamp() -> prost_types::Timestamp {
        prost_types::Timestamp {
            seconds: 1_700_000_000,
            nanos: 42,
        }
    }

    fn validator(address: u8) -> Validator {
        Validator {
            address: vec![address; 20],
            power: 10,
        }
    }

    fn host_round_trip(request: ProtoRequest) {
        let app = types::Request::try_from(request.clone()).unwrap();
        assert_eq!(ProtoRequest::from(app), request);
    }

    #[test]
    fn check_host_request_round_trip() {
        host_round_trip(ProtoRequest::finalize_block(RequestFinalizeBlock {
            txs: vec![b"k=v".to_vec(), b"a=b".to_vec()],
            decided_last_commit: Some(crate::proto::abci::CommitInfo {
                round: 2,
                votes: vec![
                    VoteInfo {
                        validator: Some(validator(1)),
                        block_id_flag: 2,
                    },
                    VoteInfo {
                        validator: Some(validator(2)),
                        block_id_flag: 1,
                    },
                ],
            }),
            misbehavior: vec![Misbehavior {
                r#type: 1,
                validator: Some(validator(3)),
                height: 4,
                time: Some(timestamp()),
                total_voting_power: 100,
            }],
            hash: vec![9; 32],
            height: 5,
            time: Some(timestamp()),
            next_validators_hash: vec![8; 32],
            proposer_address: vec![7; 20],
        }));

        host_round_trip(ProtoRequest::prepare_proposal(RequestPrepareProposal {
            max_tx_bytes: 1024,
            txs: vec![vec![1, 2, 3]],
            local_last_commit: Some(ExtendedCommitInfo {
                round: 1,
                votes: vec![ExtendedVoteInfo {
                    validator: Some(validator(1)),
                    vote_extension: b"ext".to_vec(),
                    extension_signature: b"sig".to_vec(),
                    block_id_flag: 3,
                }],
            }),
            height: 6,
            ..Default::default()
        }));

        host_round_trip(ProtoRequest::init_chain(RequestInitChain {
            time: Some(timestamp()),
            chain_id: "test-chain".to_string(),
            consensus_params: Some(ConsensusParams {
                block: Some(BlockParams {
                    max_bytes: 22020096,
                    max_gas: -1,
                }),
                evidence: Some(EvidenceParams {
                    max_age_num_blocks: 100000,
                    max_age_duration: Some(prost_types::Duration {
                        seconds: 172800,
                        nanos: 0,
                    }),
                    max_bytes: 1048576,
                }),
                ..Default::default()
            }),
            validators: vec![ValidatorUpdate {
                pub_key: Some(PublicKey {
                    sum: Some(Sum::Ed25519(vec![5; 32])),
                }),
                power: 10,
            }],
            app_state_bytes: b"{}".to_vec(),
            initial_height: 1,
        }));

        host_round_trip(ProtoRequest::check_tx(RequestCheckTx {
            tx: b"tx".to_vec(),
            r#type: 1,
        }));
        host_round_trip(ProtoRequest::flush());
        host_round_trip(ProtoRequest::commit());
    }

    #[test]
    fn check_host_response_round_trip() {
        let responses = vec![
            ProtoResponse::exception("boom"),
            ProtoResponse::query(ResponseQuery {
                code: 0,
                key: b"k".to_vec(),
                value: b"v".to_vec(),
                proof_ops: Some(ProofOps {
                    ops: vec![ProofOp {
                        r#type: "iavl:v".to_string(),
                        key: b"k".to_vec(),
                        data: vec![1, 2],
                    }],
                }),
                height: 1,
                codespace: "store".to_string(),
                ..Default::default()
            }),
            ProtoResponse::finalize_block(ResponseFinalizeBlock {
                events: vec![crate::proto::abci::Event {
                    r#type: "transfer".to_string(),
                    attributes: vec![crate::proto::abci::EventAttribute {
                        key: "sender".to_string(),
                        value: "alice".to_string(),
                        index: true,
                    }],
                }],
                tx_results: vec![crate::proto::abci::ExecTxResult {
                    code: 4,
                    gas_wanted: 10,
                    gas_used: 7,
                    codespace: "bank".to_string(),
                    ..Default::default()
                }],
                validator_updates: vec![ValidatorUpdate {
                    pub_key: Some(PublicKey {
                        sum: Some(Sum::Secp256k1(vec![2; 33])),
                    }),
                    power: 0,
                }],
                app_hash: vec![1; 32],
                ..Default::default()
            }),
            ProtoResponse::apply_snapshot_chunk(ResponseApplySnapshotChunk {
                result: 5,
                refetch_chunks: vec![1, 3],
                reject_senders: vec!["peer".to_string()],
            }),
            ProtoResponse::flush(),
        ];

        for response in responses {
            let app = types::Response::try_from(response.clone()).unwrap();
            assert_eq!(ProtoResponse::from(app), response);
        }
    }

    #[test]
    fn check_app_request_round_trip() {
        let request = types::Request::CheckTx(CheckTxRequest {
            tx: b"tx".to_vec(),
            kind: CheckTxType::Recheck,
        });

        let wire = ProtoRequest::from(request.clone());
        assert_eq!(types::Request::try_from(wire).unwrap(), request);
    }

    #[test]
    fn check_unknown_enum_value_is_rejected() {
        let request = ProtoRequest::check_tx(RequestCheckTx {
            tx: b"tx".to_vec(),
            r#type: 7,
        });

        assert!(matches!(
            types::Request::try_from(request),
            Err(Error::Conversion(_))
        ));
    }

    #[test]
    fn check_empty_public_key_is_rejected() {
        let request = ProtoRequest::init_chain(RequestInitChain {
            validators: vec![ValidatorUpdate {
                pub_key: Some(PublicKey { sum: None }),
                power: 1,
            }],
            ..Default::default()
        });

        assert!(matches!(
            types::Request::try_from(request),
            Err(Error::Conversion(_))
        ));
    }

    #[test]
    fn check_empty_request_is_unknown() {
        let app = AppMutex::new(BaseApplication);

        assert!(matches!(
            app.handle_blocking(ProtoRequest::default()),
            Err(Error::UnknownRequest)
        ));
    }

    #[test]
    fn check_flush_skips_application() {
        struct NoFlush;

        impl Application for NoFlush {
            fn echo(&mut self, _request: EchoRequest) -> Result<types::EchoResponse> {
                panic!("must not be called");
            }
        }

        let app = AppMutex::new(NoFlush);
        let response = app.handle_blocking(ProtoRequest::flush()).unwrap();
        assert!(response.is_flush());
    }

    struct Panicking;

    impl Application for Panicking {
        fn echo(&mut self, request: EchoRequest) -> Result<types::EchoResponse> {
            if request.message == "panic" {
                panic!("echo exploded");
            }

            Ok(types::EchoResponse {
                message: request.message,
            })
        }
    }

    #[test]
    fn check_panic_releases_lock() {
        let app = AppMutex::new(Panicking);

        let result = app.handle_blocking(ProtoRequest::echo("panic"));
        assert!(matches!(result, Err(Error::AppPanic(message)) if message == "echo exploded"));

        let response = app.handle_blocking(ProtoRequest::echo("hello")).unwrap();
        assert!(matches!(
            response.value,
            Some(ResponseValue::Echo(echo)) if echo.message == "hello"
        ));
    }

    #[test]
    fn check_application_error_is_returned() {
        struct Failing;

        impl Application for Failing {
            fn check_tx(&mut self, _request: CheckTxRequest) -> Result<types::CheckTxResponse> {
                Err(Error::application("database unavailable"))
            }
        }

        let app = AppMutex::new(Failing);
        let result = app.handle_blocking(ProtoRequest::check_tx(RequestCheckTx {
            tx: b"tx".to_vec(),
            r#type: 0,
        }));

        assert!(
            matches!(result, Err(Error::Application(message)) if message == "database unavailable")
        );
    }

    #[test]
    fn check_calls_never_overlap() {
        struct Counting {
            active: Arc<AtomicUsize>,
            max_active: Arc<AtomicUsize>,
        }

        impl Application for Counting {
            fn echo(&mut self, request: EchoRequest) -> Result<types::EchoResponse> {
                let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_active.fetch_max(active, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(2));
                self.active.fetch_sub(1, Ordering::SeqCst);

                Ok(types::EchoResponse {
                    message: request.message,
                })
            }
        }

        let max_active = Arc::new(AtomicUsize::new(0));
        let app = AppMutex::new(Counting {
            active: Arc::new(AtomicUsize::new(0)),
            max_active: max_active.clone(),
        });

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let app = app.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        app.handle_blocking(ProtoRequest::echo(format!("{}", i)))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn check_wire_dispatch_value() {
        let app = AppMutex::new(BaseApplication);
        let response = app
            .handle_blocking(ProtoRequest {
                value: Some(RequestValue::Echo(crate::proto::abci::RequestEcho {
                    message: "foobar".to_string(),
                })),
            })
            .unwrap();

        assert!(matches!(
            response.value,
            Some(ResponseValue::Echo(echo)) if echo.message == "foobar"
        ));
    }
}
