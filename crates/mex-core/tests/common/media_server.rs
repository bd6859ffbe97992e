//! Minimal HTTP/1.1 server with per-path canned responses for integration
//! tests. Routes can fail a set number of times before succeeding, delay
//! their response, and report how often they were hit.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// One canned response.
#[derive(Debug, Clone)]
pub struct Route {
    pub status: u32,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Respond with `fail_status` this many times before serving `status`.
    pub fail_first: usize,
    pub fail_status: u32,
    /// Sleep this long before writing anything.
    pub delay: Duration,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: None,
            body: Vec::new(),
            fail_first: 0,
            fail_status: 503,
            delay: Duration::ZERO,
        }
    }
}

impl Route {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            body: body.to_vec(),
            ..Self::default()
        }
    }

    pub fn status(status: u32) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn content_type(mut self, ct: &str) -> Self {
        self.content_type = Some(ct.to_string());
        self
    }

    pub fn failing_first(mut self, n: usize, status: u32) -> Self {
        self.fail_first = n;
        self.fail_status = status;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct ServerState {
    routes: Mutex<HashMap<String, Route>>,
    hits: Mutex<HashMap<String, usize>>,
}

/// Handle to a running server. The listener thread runs until the process
/// exits.
#[derive(Clone)]
pub struct MediaServer {
    base: String,
    state: Arc<ServerState>,
}

impl MediaServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(ServerState {
            routes: Mutex::new(HashMap::new()),
            hits: Mutex::new(HashMap::new()),
        });
        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&accept_state);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    pub fn route(&self, path: &str, route: Route) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert(path.to_string(), route);
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// How many requests `path` has received so far.
    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    /// Requests across all routes.
    pub fn total_hits(&self) -> usize {
        self.state.hits.lock().unwrap().values().sum()
    }
}

fn handle(mut stream: std::net::TcpStream, state: &ServerState) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(10)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(10)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut first_line = request.lines().next().unwrap_or("").split_whitespace();
    let method = first_line.next().unwrap_or("");
    let path = first_line.next().unwrap_or("").to_string();
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    let hit = {
        let mut hits = state.hits.lock().unwrap();
        let count = hits.entry(path.clone()).or_insert(0);
        *count += 1;
        *count
    };
    let route = state.routes.lock().unwrap().get(&path).cloned();
    let route = match route {
        Some(route) => route,
        None => {
            let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
            return;
        }
    };

    if route.delay > Duration::ZERO {
        thread::sleep(route.delay);
    }

    let status = if hit <= route.fail_first {
        route.fail_status
    } else {
        route.status
    };
    let body: &[u8] = if status == route.status && status < 300 {
        &route.body
    } else {
        &[]
    };
    let content_type = match &route.content_type {
        Some(ct) if !body.is_empty() => format!("Content-Type: {}\r\n", ct),
        _ => String::new(),
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n{}\r\n",
        status,
        status_text(status),
        body.len(),
        content_type
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(body);
}

fn status_text(status: u32) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
