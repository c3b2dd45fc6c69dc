//! Integration tests driving the real router over HTTP and WebSocket.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use deai_server::{
    config::EngineConfig,
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryChatStore},
    ui::{AppState, Server},
};
use deai_shared::time::SystemClock;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// In-process server bound to an ephemeral port
struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    http: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let state = Arc::new(AppState::new(
            Arc::new(InMemoryChatStore::new()),
            Arc::new(WebSocketMessagePusher::new()),
            Arc::new(SystemClock),
            EngineConfig::default(),
        ));
        let router = Server::new(state).router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestServer {
            addr,
            handle,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn ws_url(&self, user_id: &str) -> String {
        format!("ws://{}/ws?userId={}", self.addr, user_id)
    }

    /// Register a user over HTTP and return the generated id
    async fn create_user(&self, name: &str) -> String {
        let response = self
            .http
            .post(self.url("/api/users/create"))
            .json(&json!({"userName": name}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["user"]["id"].as_str().unwrap().to_string()
    }

    async fn befriend(&self, user_id: &str, friend_id: &str) {
        let response = self
            .http
            .post(self.url("/api/users/add-friend"))
            .json(&json!({"userId": user_id, "friendId": friend_id}))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    async fn debug_state(&self) -> Value {
        self.http
            .get(self.url("/debug/state"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// WebSocket client bound to a user
struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    async fn connect(server: &TestServer, user_id: &str) -> Self {
        let (ws, _) = connect_async(server.ws_url(user_id)).await.unwrap();
        TestClient { ws }
    }

    async fn send(&mut self, event: Value) {
        self.ws.send(Message::text(event.to_string())).await.unwrap();
    }

    /// Next server event, failing after a timeout
    async fn next_event(&mut self) -> Value {
        let read = async {
            loop {
                match self.ws.next().await {
                    Some(Ok(msg)) if msg.is_text() => {
                        return serde_json::from_str::<Value>(msg.to_text().unwrap()).unwrap();
                    }
                    Some(Ok(_)) => continue,
                    other => panic!("connection ended: {:?}", other),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), read)
            .await
            .expect("timed out waiting for an event")
    }

    async fn expect_event(&mut self, event_type: &str) -> Value {
        let event = self.next_event().await;
        assert_eq!(event["type"], event_type, "unexpected event: {}", event);
        event
    }

    async fn expect_silence(&mut self, duration: Duration) {
        let result = tokio::time::timeout(duration, self.ws.next()).await;
        assert!(result.is_err(), "unexpected frame: {:?}", result);
    }
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェックが ok を返す
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let body: Value = server
        .http
        .get(server.url("/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_two_searchers_match_and_chat() {
    // テスト項目: 2 人が検索すると互いの ID で match_found を受け取り、メッセージをやり取りできる
    // given (前提条件):
    let server = TestServer::start().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let mut client_a = TestClient::connect(&server, &alice).await;
    let mut client_b = TestClient::connect(&server, &bob).await;

    // when (操作):
    client_a.send(json!({"type": "start_search", "userId": alice})).await;
    client_b.send(json!({"type": "start_search", "userId": bob})).await;

    // then (期待する結果):
    let found_a = client_a.expect_event("match_found").await;
    let found_b = client_b.expect_event("match_found").await;
    assert_eq!(found_a["partnerId"], bob.as_str());
    assert_eq!(found_b["partnerId"], alice.as_str());
    assert_eq!(found_a["partnerName"], "bob");
    assert_eq!(found_a["roomId"], found_b["roomId"]);
    client_a.expect_event("chat_ready").await;
    client_b.expect_event("chat_ready").await;

    let state = server.debug_state().await;
    assert_eq!(state["searching"], json!([]));
    assert_eq!(state["rooms"].as_array().unwrap().len(), 1);

    // when (操作): メッセージ送信
    client_a
        .send(json!({
            "type": "send_message",
            "fromUserId": alice,
            "toUserId": bob,
            "message": "hello",
            "timestamp": 1_700_000_000_000i64,
        }))
        .await;

    // then (期待する結果):
    let received = client_b.expect_event("receive_message").await;
    assert_eq!(received["message"], "hello");
    assert_eq!(received["fromUserId"], alice.as_str());
    client_a.expect_event("receive_message").await;
}

#[tokio::test]
async fn test_send_message_outside_room_is_rejected() {
    // テスト項目: Room 外からの send_message は送信者にだけ error が返り、相手には何も届かない
    // given (前提条件):
    let server = TestServer::start().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let mut client_a = TestClient::connect(&server, &alice).await;
    let mut client_b = TestClient::connect(&server, &bob).await;

    // when (操作):
    client_a
        .send(json!({
            "type": "send_message",
            "fromUserId": alice,
            "toUserId": bob,
            "message": "hello?",
            "timestamp": 1,
        }))
        .await;

    // then (期待する結果):
    let error = client_a.expect_event("error").await;
    assert_eq!(error["code"], "stale_room");
    client_b.expect_silence(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_friends_stay_in_queue() {
    // テスト項目: フレンド同士は検索してもマッチしない
    // given (前提条件):
    let server = TestServer::start().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    server.befriend(&alice, &bob).await;
    let mut client_a = TestClient::connect(&server, &alice).await;
    let mut client_b = TestClient::connect(&server, &bob).await;

    // when (操作):
    client_a.send(json!({"type": "start_search", "userId": alice})).await;
    client_b.send(json!({"type": "start_search", "userId": bob})).await;

    // then (期待する結果):
    client_a.expect_silence(Duration::from_millis(300)).await;
    let state = server.debug_state().await;
    assert_eq!(state["searching"].as_array().unwrap().len(), 2);
    assert_eq!(state["rooms"], json!([]));
}

#[tokio::test]
async fn test_malformed_event_gets_validation_error() {
    // テスト項目: 解析できないイベントには validation_error が返り、接続は維持される
    // given (前提条件):
    let server = TestServer::start().await;
    let alice = server.create_user("alice").await;
    let mut client = TestClient::connect(&server, &alice).await;

    // when (操作):
    client.send(json!({"type": "fly_to_the_moon"})).await;
    client.send(json!({"type": "start_search", "userId": "not-a-user"})).await;

    // then (期待する結果):
    assert_eq!(client.expect_event("error").await["code"], "validation_error");
    assert_eq!(client.expect_event("error").await["code"], "validation_error");
}

#[tokio::test]
async fn test_invalid_user_id_is_refused_at_handshake() {
    // テスト項目: 不正な userId での接続はハンドシェイクで拒否される
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let result = connect_async(server.ws_url("zzz")).await;

    // then (期待する結果):
    assert!(result.is_err());
}

#[tokio::test]
async fn test_friend_messages_over_http() {
    // テスト項目: フレンドへのメッセージは HTTP で保存され、履歴として取得・既読化できる
    // given (前提条件):
    let server = TestServer::start().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let carol = server.create_user("carol").await;
    server.befriend(&alice, &bob).await;

    // when (操作):
    let sent = server
        .http
        .post(server.url("/api/chats/send"))
        .json(&json!({"userId": alice, "friendId": bob, "message": "see you"}))
        .send()
        .await
        .unwrap();
    let stranger = server
        .http
        .post(server.url("/api/chats/send"))
        .json(&json!({"userId": carol, "friendId": bob, "message": "hi"}))
        .send()
        .await
        .unwrap();
    let history: Value = server
        .http
        .get(server.url(&format!("/api/chats/{}/{}", bob, alice)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert!(sent.status().is_success());
    assert_eq!(stranger.status(), reqwest::StatusCode::FORBIDDEN);
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "see you");
    assert_eq!(messages[0]["senderId"], alice.as_str());

    // when (操作): 既読化
    let seen = server
        .http
        .post(server.url("/api/chats/seen"))
        .json(&json!({"userId": bob, "friendId": alice, "timestamp": messages[0]["timestamp"]}))
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert!(seen.status().is_success());
}
