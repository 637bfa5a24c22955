mod apps;
mod kvstore;
mod request_generator;

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use mock_io::tokio::{MockListener, MockStream};
use tokio::{net::TcpListener, time::sleep};

use self::{
    apps::{FaultyApp, SlowApp},
    kvstore::KvStore,
};
use crate::{
    client::{Client, GrpcClient, GrpcClientConfig, LocalClient, SocketClient, SocketClientConfig},
    proto::{
        abci::{response::Value as ResponseValue, *},
        MessageKind,
    },
    server::{GrpcServer, SocketServer},
    utils::get_stream_pair,
    Application, Error, Service,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn loopback() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

async fn start_mock_server<A: Application>(app: A) -> (SocketServer<A>, MockStream, MockStream) {
    init_tracing();
    let (listener, handle) = MockListener::new();

    let server = SocketServer::new(listener, app);
    server.start().await.expect("Unable to start ABCI server");

    (
        server,
        MockStream::connect(&handle).unwrap(),
        MockStream::connect(&handle).unwrap(),
    )
}

async fn start_socket_pair<A: Application>(app: A) -> (SocketServer<A>, SocketClient) {
    start_socket_pair_with(app, SocketClientConfig::default()).await
}

async fn start_socket_pair_with<A: Application>(
    app: A,
    config: SocketClientConfig,
) -> (SocketServer<A>, SocketClient) {
    init_tracing();
    let server = SocketServer::new(loopback(), app);
    server.start().await.unwrap();

    let client = SocketClient::new(
        server.local_addr().unwrap(),
        SocketClientConfig {
            must_connect: true,
            ..config
        },
    );
    client.start().await.unwrap();

    (server, client)
}

async fn start_grpc_pair<A: Application>(app: A) -> (GrpcServer<A>, GrpcClient) {
    init_tracing();
    let server = GrpcServer::new(loopback(), app);
    server.start().await.unwrap();

    let client = GrpcClient::new(
        server.local_addr().unwrap(),
        GrpcClientConfig {
            must_connect: true,
            ..Default::default()
        },
    )
    .unwrap();
    client.start().await.unwrap();

    (server, client)
}

#[tokio::test]
async fn check_responses_follow_request_order() {
    let (_server, stream, _) = start_mock_server(KvStore::default()).await;
    let (mut reader, mut writer) = get_stream_pair(stream);

    let requests = vec![
        request_generator::info(),
        request_generator::check_tx(b"a=1"),
        request_generator::echo("ping"),
        Request::commit(),
        Request::flush(),
    ];

    for request in requests.iter() {
        writer.write(request).await.unwrap();
    }
    writer.flush().await.unwrap();

    for request in requests.iter() {
        let response: Response = reader.read().await.unwrap().unwrap();
        assert!(response.answers(request));
    }
}

#[tokio::test]
async fn check_responses_are_held_until_flush() {
    let (_server, stream, _) = start_mock_server(KvStore::default()).await;
    let (mut reader, mut writer) = get_stream_pair(stream);

    writer.write(&request_generator::echo("one")).await.unwrap();
    writer.flush().await.unwrap();

    let early = tokio::time::timeout(Duration::from_millis(100), reader.read::<Response>()).await;
    assert!(early.is_err());

    writer.write(&Request::flush()).await.unwrap();
    writer.flush().await.unwrap();

    let response: Response = reader.read().await.unwrap().unwrap();
    assert!(matches!(response.value, Some(ResponseValue::Echo(ResponseEcho { message })) if message == "one"));
    let response: Response = reader.read().await.unwrap().unwrap();
    assert!(response.is_flush());
}

#[tokio::test]
async fn check_connections_share_application() {
    let (_server, consensus_stream, query_stream) = start_mock_server(KvStore::default()).await;
    let (mut consensus_reader, mut consensus_writer) = get_stream_pair(consensus_stream);
    let (mut query_reader, mut query_writer) = get_stream_pair(query_stream);

    consensus_writer
        .write(&Request::finalize_block(request_generator::finalize_block(
            1,
            &[b"color=blue"],
        )))
        .await
        .unwrap();
    consensus_writer.write(&Request::commit()).await.unwrap();
    consensus_writer.write(&Request::flush()).await.unwrap();
    consensus_writer.flush().await.unwrap();

    for _ in 0..3 {
        let _: Response = consensus_reader.read().await.unwrap().unwrap();
    }

    query_writer
        .write(&Request::query(request_generator::query(b"color")))
        .await
        .unwrap();
    query_writer.write(&Request::flush()).await.unwrap();
    query_writer.flush().await.unwrap();

    let response: Response = query_reader.read().await.unwrap().unwrap();
    assert!(matches!(
        response.value,
        Some(ResponseValue::Query(ResponseQuery { value, height: 1, .. })) if value == b"blue".to_vec()
    ));
}

#[tokio::test]
async fn check_unknown_request_gets_exception() {
    let (_server, stream, _) = start_mock_server(KvStore::default()).await;
    let (mut reader, mut writer) = get_stream_pair(stream);

    writer.write(&Request::default()).await.unwrap();
    writer
        .write(&request_generator::check_tx_with_unknown_type())
        .await
        .unwrap();
    writer.write(&request_generator::echo("still here")).await.unwrap();
    writer.write(&Request::flush()).await.unwrap();
    writer.flush().await.unwrap();

    let response: Response = reader.read().await.unwrap().unwrap();
    assert!(matches!(
        response.value,
        Some(ResponseValue::Exception(ResponseException { error })) if error == "Unknown request"
    ));

    let response: Response = reader.read().await.unwrap().unwrap();
    assert!(matches!(response.value, Some(ResponseValue::Exception(_))));

    // The connection stays usable
    let response: Response = reader.read().await.unwrap().unwrap();
    assert!(matches!(response.value, Some(ResponseValue::Echo(_))));
    let response: Response = reader.read().await.unwrap().unwrap();
    assert!(response.is_flush());
}

#[tokio::test]
async fn check_application_error_keeps_connection() {
    let (_server, stream, _) = start_mock_server(FaultyApp).await;
    let (mut reader, mut writer) = get_stream_pair(stream);

    writer.write(&request_generator::check_tx(b"fail")).await.unwrap();
    writer.write(&request_generator::check_tx(b"ok")).await.unwrap();
    writer.write(&Request::flush()).await.unwrap();
    writer.flush().await.unwrap();

    let response: Response = reader.read().await.unwrap().unwrap();
    assert!(matches!(
        response.value,
        Some(ResponseValue::Exception(ResponseException { error })) if error.contains("check_tx failed")
    ));

    let response: Response = reader.read().await.unwrap().unwrap();
    assert!(matches!(response.value, Some(ResponseValue::CheckTx(ResponseCheckTx { code: 0, .. }))));
}

#[tokio::test]
async fn check_panic_closes_only_its_connection() {
    let (server, first_stream, second_stream) = start_mock_server(FaultyApp).await;
    let (mut first_reader, mut first_writer) = get_stream_pair(first_stream);

    first_writer
        .write(&request_generator::check_tx(b"panic"))
        .await
        .unwrap();
    first_writer.write(&Request::flush()).await.unwrap();
    first_writer.flush().await.unwrap();

    let response: Response = first_reader.read().await.unwrap().unwrap();
    assert!(matches!(
        response.value,
        Some(ResponseValue::Exception(ResponseException { error })) if error.contains("check_tx exploded")
    ));
    // The connection is closed after the exception, no further frame arrives
    assert!(!matches!(first_reader.read::<Response>().await, Ok(Some(_))));

    // The server and the application lock survive the panic
    let (mut second_reader, mut second_writer) = get_stream_pair(second_stream);
    second_writer
        .write(&request_generator::check_tx(b"ok"))
        .await
        .unwrap();
    second_writer.write(&Request::flush()).await.unwrap();
    second_writer.flush().await.unwrap();

    let response: Response = second_reader.read().await.unwrap().unwrap();
    assert!(matches!(response.value, Some(ResponseValue::CheckTx(_))));
    assert!(server.is_running());
}

#[tokio::test]
async fn check_async_echoes_complete_in_order() {
    let (_server, client) = start_socket_pair(KvStore::default()).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    client.set_response_callback(Arc::new(move |_request: &Request, response: &Response| {
        if let Some(ResponseValue::Echo(ref echo)) = response.value {
            recorder.lock().unwrap().push(echo.message.clone());
        }
    }));

    let mut handles = Vec::with_capacity(1000);

    for i in 0..1000 {
        handles.push(client.echo_async(&i.to_string()).await.unwrap());
    }

    client.flush().await.unwrap();

    for (i, reqres) in handles.iter().enumerate() {
        assert!(reqres.is_done());

        match reqres.wait().await.unwrap().value {
            Some(ResponseValue::Echo(echo)) => assert_eq!(i.to_string(), echo.message),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    let expected: Vec<String> = (0..1000).map(|i| i.to_string()).collect();
    assert_eq!(expected, *seen.lock().unwrap());
    assert!(client.error().is_none());
}

#[tokio::test]
async fn check_flush_waits_for_slow_finalize_block() {
    let app = SlowApp {
        delay: Duration::from_millis(200),
    };
    let (_server, client) = start_socket_pair(app).await;

    let finalize_block = client
        .finalize_block_async(request_generator::finalize_block(1, &[]))
        .await
        .unwrap();
    let flush = client.flush_async().await.unwrap();

    let completion_order = Arc::new(Mutex::new(Vec::new()));

    let order = completion_order.clone();
    finalize_block.set_callback(move |_, _| order.lock().unwrap().push(MessageKind::FinalizeBlock));
    let order = completion_order.clone();
    flush.set_callback(move |_, _| order.lock().unwrap().push(MessageKind::Flush));

    assert!(flush.wait().await.unwrap().is_flush());
    assert!(finalize_block.is_done());
    assert!(matches!(
        finalize_block.wait().await.unwrap().value,
        Some(ResponseValue::FinalizeBlock(ResponseFinalizeBlock { app_hash, .. })) if app_hash == 1i64.to_be_bytes().to_vec()
    ));

    assert_eq!(
        vec![MessageKind::FinalizeBlock, MessageKind::Flush],
        *completion_order.lock().unwrap()
    );
}

#[tokio::test]
async fn check_server_stop_fails_pending_requests() {
    let app = SlowApp {
        delay: Duration::from_millis(500),
    };
    let (server, client) = start_socket_pair(app).await;

    let finalize_block = client
        .finalize_block_async(request_generator::finalize_block(1, &[]))
        .await
        .unwrap();
    let flush = client.flush_async().await.unwrap();

    sleep(Duration::from_millis(20)).await;
    server.stop().await.unwrap();

    assert!(finalize_block.wait().await.is_err());
    assert!(flush.wait().await.is_err());
    assert!(client.error().is_some());

    // Every later call fails with the latched error
    assert!(client.echo("late").await.is_err());
    let late = client.echo_async("late").await.unwrap();
    assert!(late.is_done());
}

#[tokio::test]
async fn check_kv_store_round_trip() {
    let (_server, client) = start_socket_pair(KvStore::default()).await;

    let info = client.info(RequestInfo::default()).await.unwrap();
    assert_eq!(0, info.last_block_height);

    let check_tx = client
        .check_tx(RequestCheckTx {
            tx: b"no-separator".to_vec(),
            r#type: 0,
        })
        .await
        .unwrap();
    assert_eq!(1, check_tx.code);

    let finalize_block = client
        .finalize_block(request_generator::finalize_block(1, &[b"k=v", b"broken"]))
        .await
        .unwrap();
    assert_eq!(2, finalize_block.tx_results.len());
    assert_eq!(0, finalize_block.tx_results[0].code);
    assert_eq!(1, finalize_block.tx_results[1].code);

    client.commit().await.unwrap();

    let query = client.query(request_generator::query(b"k")).await.unwrap();
    assert_eq!(0, query.code);
    assert_eq!(b"v".to_vec(), query.value);
    assert_eq!(1, query.height);

    let info = client.info(RequestInfo::default()).await.unwrap();
    assert_eq!(1, info.last_block_height);
}

#[tokio::test]
async fn check_prepare_proposal_budget() {
    let (_server, client) = start_socket_pair(KvStore::default()).await;

    let response = client
        .prepare_proposal(request_generator::prepare_proposal(
            10,
            &[b"aaaa", b"bbbb", b"cccc"],
        ))
        .await
        .unwrap();

    assert_eq!(vec![b"aaaa".to_vec(), b"bbbb".to_vec()], response.txs);
}

#[tokio::test]
async fn check_default_snapshot_handling() {
    let (_server, client) = start_socket_pair(KvStore::default()).await;

    let response = client
        .offer_snapshot(request_generator::offer_snapshot(10))
        .await
        .unwrap();
    assert_eq!(response_offer_snapshot::Result::Reject as i32, response.result);

    let response = client
        .load_snapshot_chunk(RequestLoadSnapshotChunk {
            height: 10,
            format: 1,
            chunk: 0,
        })
        .await
        .unwrap();
    assert!(response.chunk.is_empty());

    let response = client
        .list_snapshots(RequestListSnapshots::default())
        .await
        .unwrap();
    assert!(response.snapshots.is_empty());
}

#[tokio::test]
async fn check_invalid_requests_never_leave_client() {
    let (_server, client) = start_socket_pair(KvStore::default()).await;

    assert!(matches!(
        client
            .check_tx(RequestCheckTx {
                tx: vec![],
                r#type: 0,
            })
            .await,
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        client
            .finalize_block(request_generator::finalize_block(0, &[]))
            .await,
        Err(Error::Validation(_))
    ));

    assert!(client.error().is_none());
    assert_eq!("alive", client.echo("alive").await.unwrap().message);
}

#[tokio::test]
async fn check_call_timeout() {
    let app = SlowApp {
        delay: Duration::from_millis(300),
    };
    let config = SocketClientConfig {
        call_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let (_server, client) = start_socket_pair_with(app, config).await;

    assert!(matches!(
        client
            .finalize_block(request_generator::finalize_block(1, &[]))
            .await,
        Err(Error::Timeout(_))
    ));
}

#[tokio::test]
async fn check_must_connect_fails_fast() {
    let listener = TcpListener::bind(loopback()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = SocketClient::new(
        addr,
        SocketClientConfig {
            must_connect: true,
            ..Default::default()
        },
    );

    assert!(matches!(client.start().await, Err(Error::Io(_))));
    assert!(!client.is_running());
}

#[tokio::test]
async fn check_client_lifecycle() {
    let (_server, client) = start_socket_pair(KvStore::default()).await;

    assert!(matches!(client.start().await, Err(Error::AlreadyStarted)));
    client.stop().await.unwrap();
    assert!(matches!(client.stop().await, Err(Error::NotStarted)));
    assert!(matches!(client.error(), Some(Error::Stopped)));
    assert!(matches!(client.echo("after stop").await, Err(Error::Stopped)));
}

#[tokio::test]
async fn check_client_dials_until_server_appears() {
    let listener = TcpListener::bind(loopback()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Arc::new(SocketClient::new(
        addr,
        SocketClientConfig {
            dial_retry_interval: Duration::from_millis(50),
            ..Default::default()
        },
    ));

    let starting = {
        let client = client.clone();
        tokio::spawn(async move { client.start().await })
    };

    sleep(Duration::from_millis(120)).await;
    assert!(!client.is_running());

    let server = SocketServer::new(addr, KvStore::default());
    server.start().await.unwrap();

    starting.await.unwrap().unwrap();
    assert_eq!("hi", client.echo("hi").await.unwrap().message);
}

#[cfg(unix)]
#[tokio::test]
async fn check_unix_socket_round_trip() {
    let path = std::env::temp_dir().join(format!("abci-test-{}.sock", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let server = SocketServer::new(path.clone(), KvStore::default());
    server.start().await.unwrap();

    let client = SocketClient::new(
        path.clone(),
        SocketClientConfig {
            must_connect: true,
            ..Default::default()
        },
    );
    client.start().await.unwrap();

    assert_eq!("uds", client.echo("uds").await.unwrap().message);

    client.stop().await.unwrap();
    server.stop().await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn check_local_client() {
    let client = LocalClient::new(KvStore::default());

    assert!(matches!(client.echo("early").await, Err(Error::NotStarted)));

    client.start().await.unwrap();

    let finalize_block = client
        .finalize_block_async(request_generator::finalize_block(1, &[b"x=1"]))
        .await
        .unwrap();
    let commit = client.commit_async().await.unwrap();
    let query = client
        .query_async(request_generator::query(b"x"))
        .await
        .unwrap();

    assert!(finalize_block.wait().await.is_ok());
    assert!(commit.wait().await.is_ok());
    assert!(matches!(
        query.wait().await.unwrap().value,
        Some(ResponseValue::Query(ResponseQuery { value, .. })) if value == b"1".to_vec()
    ));

    assert!(client.error().is_none());
    client.stop().await.unwrap();
}

#[tokio::test]
async fn check_local_flush_skips_application_lock() {
    let client = LocalClient::new(KvStore::default());
    client.start().await.unwrap();

    let (locked_sender, locked_receiver) = tokio::sync::oneshot::channel();
    let app = client.app().clone();
    let holder = tokio::task::spawn_blocking(move || {
        app.with_app(|_| {
            let _ = locked_sender.send(());
            std::thread::sleep(Duration::from_millis(500));
        })
    });
    locked_receiver.await.unwrap();

    let flush = tokio::time::timeout(Duration::from_millis(200), client.flush()).await;
    assert!(matches!(flush, Ok(Ok(()))));

    holder.await.unwrap();
    assert_eq!("after", client.echo("after").await.unwrap().message);

    client.stop().await.unwrap();
}

#[tokio::test]
async fn check_local_client_reports_panics() {
    let client = LocalClient::new(FaultyApp);
    client.start().await.unwrap();

    assert!(matches!(
        client
            .check_tx(RequestCheckTx {
                tx: b"panic".to_vec(),
                r#type: 0,
            })
            .await,
        Err(Error::AppPanic(_))
    ));

    // The lock was released
    assert!(client
        .check_tx(RequestCheckTx {
            tx: b"ok".to_vec(),
            r#type: 0,
        })
        .await
        .is_ok());
}

#[tokio::test]
async fn check_grpc_round_trip() {
    let (server, client) = start_grpc_pair(KvStore::default()).await;

    assert_eq!("grpc", client.echo("grpc").await.unwrap().message);

    client
        .finalize_block(request_generator::finalize_block(1, &[b"k=v"]))
        .await
        .unwrap();
    client.commit().await.unwrap();

    let query = client.query(request_generator::query(b"k")).await.unwrap();
    assert_eq!(b"v".to_vec(), query.value);

    let handles = vec![
        client.echo_async("a").await.unwrap(),
        client.echo_async("b").await.unwrap(),
        client.echo_async("c").await.unwrap(),
    ];

    for (reqres, expected) in handles.iter().zip(["a", "b", "c"]) {
        assert!(matches!(
            reqres.wait().await.unwrap().value,
            Some(ResponseValue::Echo(ResponseEcho { message })) if message == expected
        ));
    }

    client.stop().await.unwrap();
    server.stop().await.unwrap();
}

#[tokio::test]
async fn check_grpc_reports_application_errors() {
    let (server, client) = start_grpc_pair(FaultyApp).await;

    assert!(matches!(
        client
            .check_tx(RequestCheckTx {
                tx: b"fail".to_vec(),
                r#type: 0,
            })
            .await,
        Err(Error::Grpc { .. })
    ));

    // A failed call does not stop the client
    assert!(client.error().is_none());
    assert!(client
        .check_tx(RequestCheckTx {
            tx: b"ok".to_vec(),
            r#type: 0,
        })
        .await
        .is_ok());

    server.stop().await.unwrap();
}

#[cfg(unix)]
#[test]
fn check_grpc_needs_tcp() {
    let address: crate::Address = "unix:///tmp/abci.sock".parse().unwrap();

    assert!(matches!(
        GrpcClient::new(address, GrpcClientConfig::default()),
        Err(Error::InvalidAddress(_))
    ));
}
