//! reqwest-backed client against a local socket.

use ddx::{HttpClient, QueryError, ReqwestClient};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned HTTP response per connection.
async fn serve(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else { break };
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let resp = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn parses_json_body() {
    let base = serve("200 OK", r#"["14.1.1","13.24.1"]"#).await;
    let client = ReqwestClient::new(&base, Duration::from_secs(5)).unwrap();
    let v = client.get_json("/api/versions.json").await.unwrap();
    assert_eq!(v[0], "14.1.1");
}

#[tokio::test]
async fn non_success_status_is_typed() {
    let base = serve("503 Service Unavailable", "{}").await;
    let client = ReqwestClient::new(&base, Duration::from_secs(5)).unwrap();
    let err = client.get_json("/cdn/x/data/en_US/item.json").await.unwrap_err();
    assert_eq!(
        err,
        QueryError::HttpStatus { status: 503, path: "/cdn/x/data/en_US/item.json".into() }
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn invalid_json_is_decode_error() {
    let base = serve("200 OK", "<html>oops</html>").await;
    let client = ReqwestClient::new(&base, Duration::from_secs(5)).unwrap();
    let err = client.get_json("/api/versions.json").await.unwrap_err();
    assert!(matches!(err, QueryError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn silent_server_times_out_as_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and hold connections without ever answering.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });

    let client = ReqwestClient::new(&format!("http://{addr}"), Duration::from_millis(1000)).unwrap();
    let started = Instant::now();
    let err = client.get_json("/api/versions.json").await.unwrap_err();

    assert!(matches!(err, QueryError::Network(_)), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}
