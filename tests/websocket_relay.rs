//! WebSocket relay through the combined upgrade rule.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;

mod common;

async fn gateway_with_ws_api() -> (
    common::TestGateway,
    std::sync::Arc<std::sync::Mutex<Vec<common::Handshake>>>,
) {
    let (api, seen) = common::start_ws_upstream().await;
    let uc = common::start_echo_backend().await;
    let git = common::start_echo_backend().await;
    let gateway = common::start_gateway(common::gateway_config(api, uc, git)).await;
    (gateway, seen)
}

#[tokio::test]
async fn test_org_carried_in_query() {
    let (gateway, seen) = gateway_with_ws_api().await;

    let mut request = gateway
        .ws_url("/api/acme/websocket?topic=builds")
        .into_client_request()
        .unwrap();
    request.headers_mut().insert("cookie", "sid=42".parse().unwrap());
    request
        .headers_mut()
        .insert("sec-websocket-protocol", "pipeline-log".parse().unwrap());

    let (mut ws, response) = tokio_tungstenite::connect_async(request).await.unwrap();
    assert_eq!(
        response.headers().get("sec-websocket-protocol").unwrap(),
        "pipeline-log"
    );

    ws.send(Message::Text("hello".into())).await.unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    assert_eq!(reply.into_text().unwrap().as_str(), "hello");

    let handshake = seen.lock().unwrap()[0].clone();
    assert_eq!(handshake.uri, "/api/websocket?topic=builds&wsOrg=acme");
    assert_eq!(handshake.cookie.as_deref(), Some("sid=42"));
    assert_eq!(handshake.protocol.as_deref(), Some("pipeline-log"));
}

#[tokio::test]
async fn test_failed_session_is_isolated() {
    let (gateway, _) = gateway_with_ws_api().await;

    let (mut a, _) = tokio_tungstenite::connect_async(gateway.ws_url("/api/acme/terminal"))
        .await
        .unwrap();
    let (mut b, _) = tokio_tungstenite::connect_async(gateway.ws_url("/api/acme/fdp-websocket"))
        .await
        .unwrap();
    assert!(common::eventually(|| gateway.sessions.active_count() == 2).await);

    // Upstream drops session A mid-stream.
    a.send(Message::Text("boom".into())).await.unwrap();
    loop {
        match a.next().await {
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
            Some(Ok(_)) => continue,
        }
    }
    assert!(common::eventually(|| gateway.sessions.active_count() == 1).await);

    b.send(Message::Binary(vec![1u8, 2, 3].into())).await.unwrap();
    let reply = b.next().await.unwrap().unwrap();
    assert_eq!(reply.into_data().as_ref(), &[1u8, 2, 3]);

    let res = common::client().get(gateway.url("/dashboard")).send().await.unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_unreachable_ws_upstream_is_500() {
    let uc = common::start_echo_backend().await;
    let git = common::start_echo_backend().await;
    let api = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let gateway = common::start_gateway(common::gateway_config(api, uc, git)).await;

    let err = tokio_tungstenite::connect_async(gateway.ws_url("/api/acme/websocket"))
        .await
        .unwrap_err();

    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 500);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(gateway.sessions.active_count(), 0);
}

#[tokio::test]
async fn test_plain_get_on_websocket_path_is_not_upgraded() {
    let api = common::start_echo_backend().await;
    let uc = common::start_echo_backend().await;
    let git = common::start_echo_backend().await;
    let gateway = common::start_gateway(common::gateway_config(api, uc, git)).await;

    let echoed = common::client()
        .get(gateway.url("/api/acme/websocket"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    // Generic API rule: org moves to a header, not the query.
    assert!(echoed.starts_with("GET /api/websocket HTTP/1.1"));
    assert!(echoed.contains("\r\norg: acme"));
}
