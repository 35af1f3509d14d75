//! `HttpTracker` response handling against a one-shot local HTTP server

use igraph_core::LinkRequest;
use igraph_tracker::{HttpTracker, NewIssueLink, TrackerApi, TrackerError};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

/// Serve a single canned response; the handle yields the raw request
async fn serve_once(status_line: &str, headers: &[(&str, &str)], body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let mut response = format!("HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n", body.len());
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str("\r\n");
    response.push_str(body);

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        request
    });

    (base_url, handle)
}

fn local_tracker(base_url: &str) -> HttpTracker {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpTracker::with_client(client, base_url).unwrap()
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn read_with_error_status_becomes_status_error() {
    let (base_url, server) = serve_once("404 Not Found", &[], r#"{"errorMessages":["Issue does not exist"]}"#).await;
    let tracker = local_tracker(&base_url);

    let err = assert_err!(tracker.get_issue("P-404", &["subtasks"]).await);

    assert!(matches!(err, TrackerError::Status { status: 404, method: "GET", .. }));
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Issue does not exist"));
    let request = server.await.unwrap();
    assert!(request.starts_with("GET /rest/api/3/issue/P-404?fields=subtasks HTTP/1.1"));
}

#[tokio::test]
async fn read_with_unexpected_body_becomes_decode_error() {
    let (base_url, server) = serve_once("200 OK", &[("Content-Type", "application/json")], "[1,2]").await;
    let tracker = local_tracker(&base_url);

    let err = assert_err!(tracker.get_issue("P-1", &["subtasks"]).await);

    assert!(matches!(err, TrackerError::Decode { .. }));
    assert_eq!(err.status(), None);
    server.await.unwrap();
}

#[tokio::test]
async fn read_decodes_issue_and_sends_credentials() {
    let body = r#"{"key":"P-1","fields":{"subtasks":[{"key":"A"},{"key":"B"}]}}"#;
    let (base_url, server) = serve_once("200 OK", &[("Content-Type", "application/json")], body).await;
    let tracker = local_tracker(&base_url).with_bearer_token("t0ken");

    let issue = assert_ok!(tracker.get_issue("P-1", &["subtasks"]).await);

    let keys: Vec<_> = issue.fields.subtasks.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["A", "B"]);
    let request = server.await.unwrap().to_ascii_lowercase();
    assert!(request.contains("authorization: bearer t0ken"));
    assert!(request.contains("accept: application/json"));
}

#[tokio::test]
async fn create_keeps_status_and_location() {
    let (base_url, server) = serve_once(
        "201 Created",
        &[("Location", "https://tracker.test/rest/api/3/issueLink/10042")],
        "",
    )
    .await;
    let tracker = local_tracker(&base_url);
    let link = NewIssueLink::from(&LinkRequest::blocks("A", "B"));

    let response = assert_ok!(tracker.create_issue_link(&link).await);

    assert_eq!(response.status, 201);
    assert_eq!(response.body, None);
    assert_eq!(response.created_link_id().as_deref(), Some("10042"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /rest/api/3/issueLink HTTP/1.1"));
    let (_, sent) = request.split_once("\r\n\r\n").unwrap();
    let sent: serde_json::Value = serde_json::from_str(sent).unwrap();
    assert_eq!(
        sent,
        serde_json::json!({
            "inwardIssue": {"key": "A"},
            "outwardIssue": {"key": "B"},
            "type": {"name": "Blocks"}
        })
    );
}

#[tokio::test]
async fn rejected_mutation_is_returned_raw() {
    let (base_url, server) = serve_once("400 Bad Request", &[], r#"{"errors":{"issueLinkType":"No such type"}}"#).await;
    let tracker = local_tracker(&base_url);
    let link = NewIssueLink::from(&LinkRequest::new("A", "B", "Nope"));

    let response = assert_ok!(tracker.create_issue_link(&link).await);

    assert_eq!(response.status, 400);
    assert!(!response.is_success());
    assert_eq!(response.body.unwrap()["errors"]["issueLinkType"], "No such type");
    server.await.unwrap();
}

#[tokio::test]
async fn delete_passes_through_non_json_body() {
    let (base_url, server) = serve_once("404 Not Found", &[], "gone").await;
    let tracker = local_tracker(&base_url);

    let response = assert_ok!(tracker.delete_issue_link("100").await);

    assert_eq!(response.status, 404);
    assert_eq!(response.body, Some(serde_json::Value::String("gone".into())));
    let request = server.await.unwrap();
    assert!(request.starts_with("DELETE /rest/api/3/issueLink/100 HTTP/1.1"));
}
