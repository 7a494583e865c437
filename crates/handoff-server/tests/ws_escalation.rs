//! Integration tests driving the escalation flow end to end: real HTTP
//! submits from the agent side, real WebSocket supervisors, and the
//! in-memory help-desk store observing status transitions.

use handoff_broker::{ConnectionRegistry, EscalationBroker, StatusSynchronizer};
use handoff_server::{app, AppState};
use handoff_store::{HelpDeskStore, MemoryHelpDeskStore};
use handoff_types::HelpStatus;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Binds a server with the given reply deadline on an ephemeral port.
async fn setup_server(reply_timeout: Duration) -> (SocketAddr, Arc<MemoryHelpDeskStore>) {
    let store = Arc::new(MemoryHelpDeskStore::new());
    let broker = EscalationBroker::new(
        ConnectionRegistry::new(),
        StatusSynchronizer::new(store.clone()),
        reply_timeout,
    );
    let state = AppState {
        broker: Arc::new(broker),
        store: store.clone(),
    };

    let app = app(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (addr, store)
}

async fn connect_supervisor(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("failed to connect");
    // Registration happens on the server's upgrade task; give it a beat
    // before submitting escalations.
    tokio::time::sleep(Duration::from_millis(100)).await;
    ws
}

async fn next_json(ws: &mut WsClient) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timeout waiting for frame")
        .expect("connection closed")
        .expect("frame error");
    match msg {
        Message::Text(text) => serde_json::from_str(&text).expect("invalid JSON frame"),
        other => panic!("expected text frame, got: {:?}", other),
    }
}

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("failed to send frame");
}

/// Creates a durable help request and returns its id.
async fn create_help_request(addr: SocketAddr, question: &str) -> String {
    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/help-requests", addr))
        .json(&json!({ "question": question }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    body["request_id"].as_str().unwrap().to_string()
}

/// Fires an escalation in the background and returns its response body.
fn spawn_submit(addr: SocketAddr, body: Value) -> tokio::task::JoinHandle<Value> {
    tokio::spawn(async move {
        reqwest::Client::new()
            .post(format!("http://{}/api/escalations", addr))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    })
}

/// The synchronizer writes from detached tasks; poll until visible.
async fn wait_for_status(store: &MemoryHelpDeskStore, request_id: &str, status: HelpStatus) {
    for _ in 0..100 {
        if let Some(record) = store.get_help_request(request_id).await.unwrap() {
            if record.status == status {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("record {} never reached {}", request_id, status);
}

#[tokio::test]
async fn supervisor_answer_round_trips_to_agent_and_fans_out() {
    let (addr, store) = setup_server(Duration::from_secs(5)).await;
    let mut supervisor = connect_supervisor(addr).await;

    let request_id = create_help_request(addr, "price?").await;
    let submit = spawn_submit(
        addr,
        json!({ "question": "price?", "request_id": request_id, "caller": "walk-in" }),
    );

    let envelope = next_json(&mut supervisor).await;
    assert_eq!(envelope["type"], "help_request");
    assert_eq!(envelope["question"], "price?");
    assert_eq!(envelope["request_id"], request_id.as_str());
    // Extra submission fields pass through to the supervisor console.
    assert_eq!(envelope["caller"], "walk-in");
    let query_id = envelope["query_id"].as_str().unwrap().to_string();

    send_json(
        &mut supervisor,
        json!({ "query_id": query_id, "request_id": request_id, "response": "It's $40" }),
    )
    .await;

    let body = submit.await.unwrap();
    assert_eq!(body["response"], "It's $40");
    assert_eq!(body["request_id"], request_id.as_str());

    // The answering supervisor also receives the resolution notice.
    let notice = next_json(&mut supervisor).await;
    assert_eq!(notice["type"], "help_resolved");
    assert_eq!(notice["query_id"], query_id.as_str());
    assert_eq!(notice["request_id"], request_id.as_str());
    assert_eq!(notice["response"], "It's $40");

    wait_for_status(&store, &request_id, HelpStatus::Resolved).await;
    let record = store.get_help_request(&request_id).await.unwrap().unwrap();
    assert_eq!(record.answer.as_deref(), Some("It's $40"));
    assert!(record.resolved_at.is_some());
}

#[tokio::test]
async fn submit_without_supervisors_returns_503_immediately() {
    let (addr, _store) = setup_server(Duration::from_secs(120)).await;

    let started = std::time::Instant::now();
    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/escalations", addr))
        .json(&json!({ "question": "anyone?", "request_id": "r1" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "no supervisor connected");
    // Must not have sat on the 120s reply deadline.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn unanswered_escalation_times_out_and_late_reply_is_dropped() {
    let (addr, store) = setup_server(Duration::from_millis(300)).await;
    let mut supervisor = connect_supervisor(addr).await;

    let request_id = create_help_request(addr, "still there?").await;
    let body = spawn_submit(
        addr,
        json!({ "question": "still there?", "request_id": request_id }),
    )
    .await
    .unwrap();
    assert_eq!(body["answer"], "No supervisor response within 120s.");

    // The timeout re-opens the record rather than failing it.
    wait_for_status(&store, &request_id, HelpStatus::Pending).await;

    // Answering after the agent gave up: silently dropped, and no
    // help_resolved notice goes out.
    let envelope = next_json(&mut supervisor).await;
    send_json(
        &mut supervisor,
        json!({
            "query_id": envelope["query_id"],
            "request_id": request_id,
            "response": "sorry, was away"
        }),
    )
    .await;

    let no_frame = tokio::time::timeout(Duration::from_millis(300), supervisor.next()).await;
    assert!(no_frame.is_err(), "late reply must not produce a broadcast");

    let record = store.get_help_request(&request_id).await.unwrap().unwrap();
    assert_eq!(record.status, HelpStatus::Pending);
    assert!(record.answer.is_none());
}

#[tokio::test]
async fn blank_reply_does_not_settle_but_a_real_one_does() {
    let (addr, _store) = setup_server(Duration::from_secs(5)).await;
    let mut supervisor = connect_supervisor(addr).await;

    let request_id = create_help_request(addr, "hours?").await;
    let submit = spawn_submit(addr, json!({ "question": "hours?", "request_id": request_id }));

    let envelope = next_json(&mut supervisor).await;
    let query_id = envelope["query_id"].as_str().unwrap().to_string();

    // A whitespace-only acknowledgment must not settle the query.
    send_json(
        &mut supervisor,
        json!({ "query_id": query_id, "request_id": request_id, "response": "  \n\t " }),
    )
    .await;
    send_json(
        &mut supervisor,
        json!({ "query_id": query_id, "request_id": request_id, "response": "We close at 8 PM" }),
    )
    .await;

    let body = submit.await.unwrap();
    assert_eq!(body["response"], "We close at 8 PM");

    // Exactly one resolution notice: the blank reply produced none.
    let notice = next_json(&mut supervisor).await;
    assert_eq!(notice["type"], "help_resolved");
    assert_eq!(notice["response"], "We close at 8 PM");
    let no_frame = tokio::time::timeout(Duration::from_millis(300), supervisor.next()).await;
    assert!(no_frame.is_err());
}

#[tokio::test]
async fn malformed_frame_does_not_kill_the_connection() {
    let (addr, _store) = setup_server(Duration::from_secs(5)).await;
    let mut supervisor = connect_supervisor(addr).await;

    supervisor
        .send(Message::Text("definitely not json".to_string().into()))
        .await
        .unwrap();

    // The connection is still alive and can complete a round trip.
    let request_id = create_help_request(addr, "price?").await;
    let submit = spawn_submit(addr, json!({ "question": "price?", "request_id": request_id }));

    let envelope = next_json(&mut supervisor).await;
    send_json(
        &mut supervisor,
        json!({
            "query_id": envelope["query_id"],
            "request_id": request_id,
            "response": "It's $40"
        }),
    )
    .await;

    let body = submit.await.unwrap();
    assert_eq!(body["response"], "It's $40");
}

#[tokio::test]
async fn duplicate_reply_after_settle_is_ignored() {
    let (addr, store) = setup_server(Duration::from_secs(5)).await;
    let mut sup_a = connect_supervisor(addr).await;
    let mut sup_b = connect_supervisor(addr).await;

    let request_id = create_help_request(addr, "price?").await;
    let submit = spawn_submit(addr, json!({ "question": "price?", "request_id": request_id }));

    // Both supervisors receive the same help request.
    let env_a = next_json(&mut sup_a).await;
    let env_b = next_json(&mut sup_b).await;
    assert_eq!(env_a["query_id"], env_b["query_id"]);

    send_json(
        &mut sup_a,
        json!({
            "query_id": env_a["query_id"],
            "request_id": request_id,
            "response": "It's $40"
        }),
    )
    .await;

    let body = submit.await.unwrap();
    assert_eq!(body["response"], "It's $40");

    // One resolution notice per supervisor.
    assert_eq!(next_json(&mut sup_a).await["type"], "help_resolved");
    assert_eq!(next_json(&mut sup_b).await["type"], "help_resolved");

    // The second supervisor answers an already-settled query: dropped,
    // no further broadcast, and the stored answer is untouched.
    send_json(
        &mut sup_b,
        json!({
            "query_id": env_b["query_id"],
            "request_id": request_id,
            "response": "Forty dollars"
        }),
    )
    .await;

    let no_frame_a = tokio::time::timeout(Duration::from_millis(300), sup_a.next()).await;
    assert!(no_frame_a.is_err());
    let no_frame_b = tokio::time::timeout(Duration::from_millis(300), sup_b.next()).await;
    assert!(no_frame_b.is_err());

    wait_for_status(&store, &request_id, HelpStatus::Resolved).await;
    let record = store.get_help_request(&request_id).await.unwrap().unwrap();
    assert_eq!(record.answer.as_deref(), Some("It's $40"));
}

#[tokio::test]
async fn supervisor_disconnect_does_not_cancel_pending_queries() {
    let (addr, _store) = setup_server(Duration::from_secs(5)).await;
    let mut sup_a = connect_supervisor(addr).await;
    let mut sup_b = connect_supervisor(addr).await;

    let request_id = create_help_request(addr, "availability?").await;
    let submit = spawn_submit(
        addr,
        json!({ "question": "availability?", "request_id": request_id }),
    );

    let _env_a = next_json(&mut sup_a).await;
    let env_b = next_json(&mut sup_b).await;

    // The first supervisor walks away mid-query.
    sup_a.close(None).await.unwrap();
    drop(sup_a);

    send_json(
        &mut sup_b,
        json!({
            "query_id": env_b["query_id"],
            "request_id": request_id,
            "response": "We have a 4 PM slot"
        }),
    )
    .await;

    let body = submit.await.unwrap();
    assert_eq!(body["response"], "We have a 4 PM slot");
}
