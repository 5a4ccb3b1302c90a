//! Shared one-shot HTTP responders for integration tests.
//!
//! Real sockets, no mock framework: each helper binds an ephemeral
//! `TcpListener`, answers a fixed number of requests, and hands back
//! the base URL (plus captured request text or a hit counter where a
//! test needs to assert on them).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Read one HTTP request off the socket: headers plus a
/// `Content-Length` body when present.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            let body_received = buf.len().saturating_sub(header_end.saturating_add(4));
            if body_received >= content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn write_response(socket: &mut TcpStream, status_line: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
}

/// Serve exactly one request with the given status line and body.
/// Returns the base URL.
pub(crate) async fn serve_once(status_line: &str, body: &str) -> String {
    let (url, _, _) = serve_sequence(vec![(status_line.to_owned(), body.to_owned())]).await;
    url
}

/// Serve exactly one request, capturing its raw text for assertions.
pub(crate) async fn serve_once_capture(
    status_line: &str,
    body: &str,
) -> (String, Arc<Mutex<Vec<String>>>) {
    let (url, _, captured) =
        serve_sequence(vec![(status_line.to_owned(), body.to_owned())]).await;
    (url, captured)
}

/// Serve the given responses in order, one per connection. Returns the
/// base URL, a hit counter, and the captured request texts.
pub(crate) async fn serve_sequence(
    responses: Vec<(String, String)>,
) -> (String, Arc<AtomicUsize>, Arc<Mutex<Vec<String>>>) {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) => panic!("listener should bind: {err}"),
    };
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => panic!("listener should expose local addr: {err}"),
    };

    let hits = Arc::new(AtomicUsize::new(0));
    let captured = Arc::new(Mutex::new(Vec::new()));

    let hits_task = Arc::clone(&hits);
    let captured_task = Arc::clone(&captured);
    tokio::spawn(async move {
        for (status_line, body) in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            hits_task.fetch_add(1, Ordering::SeqCst);
            let request = read_request(&mut socket).await;
            if let Ok(mut guard) = captured_task.lock() {
                guard.push(request);
            }
            write_response(&mut socket, &status_line, &body).await;
        }
    });

    (format!("http://{addr}"), hits, captured)
}
