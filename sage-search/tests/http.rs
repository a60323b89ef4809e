//! Client tests against a throwaway local HTTP server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sage_core::search::{SearchBackend, SearchQuery};
use sage_core::SageError;
use sage_search::{SearchClient, SearchError, SearchProvider};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve `responses` in order, one per connection, then stop. Returns the
/// base URL and a counter of requests seen.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = vec![0u8; 4096];
            let mut read = 0;
            while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf[read..]).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => read += n,
                }
            }
            counter.fetch_add(1, Ordering::SeqCst);

            let reply = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}"), seen)
}

fn query(text: &str) -> SearchQuery {
    SearchQuery {
        text: text.to_string(),
        limit: 5,
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn duckduckgo_abstract_becomes_top_hit() {
    let (base_url, seen) = serve(vec![(
        200,
        r#"{"Heading":"Tokio","AbstractText":"Tokio is an async runtime.","AbstractURL":"https://tokio.rs","RelatedTopics":[]}"#,
    )])
    .await;

    let client = SearchClient::new(SearchProvider::DuckDuckGo { base_url }, "sage-test", 0).expect("client");
    let hits = client.search(&query("tokio")).await.expect("hits");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].snippet, "Tokio is an async runtime.");
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn searxng_results_are_parsed() {
    let (base_url, _) = serve(vec![(
        200,
        r#"{"results":[{"title":"Serde","url":"https://serde.rs","content":"A serialization framework."}]}"#,
    )])
    .await;

    let client = SearchClient::new(SearchProvider::SearxNg { base_url }, "sage-test", 0).expect("client");
    let hits = client.query(&query("serde")).await.expect("hits");

    assert_eq!(hits[0].title, "Serde");
    assert_eq!(hits[0].url, "https://serde.rs");
}

#[tokio::test]
async fn server_error_is_retried() {
    let (base_url, seen) = serve(vec![
        (503, "{}"),
        (200, r#"{"results":[{"title":"T","url":"u","content":"second try"}]}"#),
    ])
    .await;

    let client = SearchClient::new(SearchProvider::SearxNg { base_url }, "sage-test", 1).expect("client");
    let hits = client.query(&query("retry")).await.expect("hits");

    assert_eq!(hits[0].snippet, "second try");
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let (base_url, seen) = serve(vec![(404, "{}"), (200, "{}")]).await;

    let client = SearchClient::new(SearchProvider::SearxNg { base_url }, "sage-test", 3).expect("client");
    let err = client.query(&query("missing")).await.expect_err("404");

    assert!(matches!(
        err,
        SearchError::RetriesExhausted { attempts: 1, ref last_error } if last_error.contains("404")
    ));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_body_is_search_unavailable() {
    let (base_url, _) = serve(vec![(200, "<html>not json</html>")]).await;

    let client = SearchClient::new(SearchProvider::DuckDuckGo { base_url }, "sage-test", 0).expect("client");
    let err = client.search(&query("html")).await.expect_err("parse");

    assert!(matches!(err, SageError::SearchUnavailable(_)));
}

#[tokio::test]
async fn refused_connection_exhausts_retries() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = SearchClient::new(
        SearchProvider::DuckDuckGo {
            base_url: format!("http://{addr}"),
        },
        "sage-test",
        1,
    )
    .expect("client");
    let err = client.query(&query("offline")).await.expect_err("refused");

    assert!(matches!(err, SearchError::RetriesExhausted { attempts: 2, .. }));
}
