//! End-to-end tests for the JSON dialect, UNIX-domain transport, and a
//! dispatcher shared across both dialects at once.

use std::sync::Arc;

use serde_json::json;
use tokio::net::TcpListener;

use duorpc::transport::connect_tcp;
use duorpc::{Client, Dispatcher, JsonCodec, MsgpackCodec, RpcError, Server};

async fn spawn_json_server(dispatcher: Arc<Dispatcher>) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut server: Server<JsonCodec, _> = Server::with_dispatcher(listener, dispatcher);
    tokio::spawn(async move { server.serve_forever().await });
    addr
}

#[tokio::test]
async fn test_echo_call_over_json() {
    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.add("echo", |(i,): (i64,)| i);
    let addr = spawn_json_server(dispatcher).await;

    let client: Client<JsonCodec> = Client::new(connect_tcp(addr).await.unwrap());
    assert_eq!(client.call("echo", vec![json!(42)]).await.unwrap(), json!(42));
}

#[tokio::test]
async fn test_json_error_values_match_the_packed_dialect() {
    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.add("add", |(a, b): (i64, i64)| a + b);
    let addr = spawn_json_server(dispatcher).await;

    let client: Client<JsonCodec> = Client::new(connect_tcp(addr).await.unwrap());

    match client.call("missing", vec![]).await {
        Err(RpcError::Call(value)) => assert_eq!(value, json!("Unknown function")),
        other => panic!("unexpected outcome: {:?}", other.map(|_| ())),
    }
    match client.call("add", vec![json!(1), json!("two")]).await {
        Err(RpcError::Call(value)) => assert_eq!(value, json!("Incompatible arguments")),
        other => panic!("unexpected outcome: {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_typed_results() {
    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.add("concat", |(a, b): (String, String)| format!("{}{}", a, b));
    let addr = spawn_json_server(dispatcher).await;

    let client: Client<JsonCodec> = Client::new(connect_tcp(addr).await.unwrap());
    let joined: String = client
        .call_as("concat", vec![json!("foo"), json!("bar")])
        .await
        .unwrap();
    assert_eq!(joined, "foobar");
}

#[tokio::test]
async fn test_one_dispatcher_serves_both_dialects() {
    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.add("double", |(x,): (i64,)| 2 * x);

    let json_addr = spawn_json_server(Arc::clone(&dispatcher)).await;

    let packed_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let packed_addr = packed_listener.local_addr().unwrap();
    let mut packed_server: Server<MsgpackCodec, _> =
        Server::with_dispatcher(packed_listener, Arc::clone(&dispatcher));
    tokio::spawn(async move { packed_server.serve_forever().await });

    let json_client: Client<JsonCodec> = Client::new(connect_tcp(json_addr).await.unwrap());
    let packed_client: Client<MsgpackCodec> =
        Client::new(connect_tcp(packed_addr).await.unwrap());

    assert_eq!(json_client.call("double", vec![json!(3)]).await.unwrap(), json!(6));
    assert_eq!(packed_client.call("double", vec![json!(4)]).await.unwrap(), json!(8));
}

#[tokio::test]
async fn test_registry_management_is_visible_to_live_sessions() {
    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.add("transient", |(): ()| 1);
    let addr = spawn_json_server(Arc::clone(&dispatcher)).await;

    let client: Client<JsonCodec> = Client::new(connect_tcp(addr).await.unwrap());
    assert_eq!(client.call("transient", vec![]).await.unwrap(), json!(1));

    assert!(dispatcher.remove("transient"));
    match client.call("transient", vec![]).await {
        Err(RpcError::Call(value)) => assert_eq!(value, json!("Unknown function")),
        other => panic!("unexpected outcome: {:?}", other.map(|_| ())),
    }

    assert!(!dispatcher.has("transient"));
    assert!(dispatcher.known().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_echo_over_unix_socket() {
    use duorpc::transport::connect_unix;
    use tokio::net::UnixListener;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("duorpc.sock");

    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.add("echo", |(s,): (String,)| s);

    let listener = UnixListener::bind(&path).unwrap();
    let mut server: Server<MsgpackCodec, _> = Server::with_dispatcher(listener, dispatcher);
    tokio::spawn(async move { server.serve_forever().await });

    let client: Client<MsgpackCodec> = Client::new(connect_unix(&path).await.unwrap());
    assert_eq!(
        client.call("echo", vec![json!("over unix")]).await.unwrap(),
        json!("over unix")
    );
}
