//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of files by path. Unknown paths get 404. Each path can
//! be told to answer 503 a number of times before succeeding, and every GET
//! is counted so tests can check what was (not) downloaded.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Default)]
struct State {
    files: HashMap<String, Vec<u8>>,
    failures: HashMap<String, u32>,
    hits: HashMap<String, u32>,
}

/// Handle to a running server; it lives until the process exits.
#[derive(Clone)]
pub struct FileServer {
    base_url: String,
    state: Arc<Mutex<State>>,
}

impl FileServer {
    /// Starts a server in a background thread. Files are served under `/repo/`.
    pub fn start(files: &[(&str, &[u8])]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State {
            files: files
                .iter()
                .map(|(name, body)| (format!("/repo/{name}"), body.to_vec()))
                .collect(),
            ..State::default()
        }));
        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base_url: format!("http://127.0.0.1:{port}/repo/"),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Answer the next `count` GETs of `name` with 503.
    pub fn fail_next(&self, name: &str, count: u32) {
        let mut state = self.state.lock().unwrap();
        state.failures.insert(format!("/repo/{name}"), count);
    }

    /// Replace the served body of `name`.
    pub fn set_body(&self, name: &str, body: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.files.insert(format!("/repo/{name}"), body.to_vec());
    }

    /// Number of GETs received for `name`.
    pub fn hits(&self, name: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state.hits.get(&format!("/repo/{name}")).copied().unwrap_or(0)
    }
}

fn handle(mut stream: TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("").to_string();

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    let (status, body) = {
        let mut guard = state.lock().unwrap();
        let state = &mut *guard;
        *state.hits.entry(path.clone()).or_insert(0) += 1;
        let failing = state.failures.get_mut(&path).filter(|n| **n > 0);
        if let Some(remaining) = failing {
            *remaining -= 1;
            ("503 Service Unavailable", b"busy".to_vec())
        } else if let Some(body) = state.files.get(&path) {
            ("200 OK", body.clone())
        } else {
            ("404 Not Found", b"not found".to_vec())
        }
    };

    let header = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
}
