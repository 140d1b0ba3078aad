// Small WebSocket client helpers shared by the flow tests.
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn connect(base_url: &str, player_id: u64) -> WsClient {
    let ws_url = format!(
        "{}/ws?player_id={player_id}",
        base_url.replacen("http://", "ws://", 1)
    );
    let (client, _) = connect_async(ws_url).await.expect("ws connect");
    client
}

pub async fn send_json(client: &mut WsClient, value: Value) {
    client
        .send(Message::text(value.to_string()))
        .await
        .expect("ws send");
}

pub async fn send_join(client: &mut WsClient) {
    send_json(client, json!({"type": "Join"})).await;
}

// Read frames until a message of the wanted type arrives; snapshots stream
// continuously, so everything else is skipped.
pub async fn next_of_type(client: &mut WsClient, wanted: &str) -> Value {
    timeout(Duration::from_secs(10), async {
        loop {
            let frame = client
                .next()
                .await
                .expect("ws stream ended")
                .expect("ws recv");
            let Message::Text(text) = frame else { continue };
            let value: Value = serde_json::from_str(&text).expect("server sends valid json");
            if value["type"] == wanted {
                return value;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {wanted}"))
}
