//! Canned-response HTTP server for exercising the GitHub client offline.
#![allow(dead_code)]

use repo_manager::prelude::*;
use reqwest::StatusCode;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};

pub const TEST_TOKEN: &str = "test_token";

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    /// Header names are lowercased; repeated headers appear once per line.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .filter(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

#[derive(Clone)]
struct Route {
    method: String,
    path: String,
    status: u16,
    body: String,
}

pub struct StubBuilder {
    routes: Vec<Route>,
}

impl StubBuilder {
    /// Answer `method path` with `status` and `body`. A path without `?`
    /// matches regardless of query string.
    pub fn route(mut self, method: &str, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.routes.push(Route {
            method: method.to_string(),
            path: path.to_string(),
            status,
            body: body.into(),
        });
        self
    }

    pub fn json(self, method: &str, path: &str, status: u16, value: &serde_json::Value) -> Self {
        self.route(method, path, status, value.to_string())
    }

    pub fn start(self) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(self.routes);

        let seen = Arc::clone(&requests);
        std::thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                let seen = Arc::clone(&seen);
                std::thread::spawn(move || serve(stream, &routes, &seen));
            }
        });

        StubServer { base_url, requests }
    }
}

pub struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    pub fn builder() -> StubBuilder {
        StubBuilder { routes: Vec::new() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A client pointed at this server.
    pub fn client(&self) -> GitHubClient {
        GitHubClient::with_enterprise(TEST_TOKEN, &self.base_url).unwrap()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && strip_query(&r.path) == path)
            .collect()
    }
}

fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(p, _)| p)
}

fn serve(stream: TcpStream, routes: &[Route], seen: &Mutex<Vec<Recorded>>) {
    let Some(request) = read_request(&stream) else {
        return;
    };

    let route = routes.iter().find(|route| {
        let path = if route.path.contains('?') {
            request.path.as_str()
        } else {
            strip_query(&request.path)
        };
        route.method == request.method && route.path == path
    });
    let (status, body) = match route {
        Some(route) => (route.status, route.body.clone()),
        None => (404, r#"{"message":"Not Found"}"#.to_string()),
    };

    seen.lock().unwrap().push(request);
    let _ = write_response(stream, status, &body);
}

fn read_request(stream: &TcpStream) -> Option<Recorded> {
    let mut reader = BufReader::new(stream);

    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;

    Some(Recorded {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn write_response(mut stream: TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Stub");

    let mut response = format!("HTTP/1.1 {} {}\r\nConnection: close\r\n", status, reason);
    if status == 204 {
        response.push_str("\r\n");
    } else {
        response.push_str(&format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ));
    }
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

/// GitHub's JSON for a repository owned by `owner`.
pub fn repo_json(owner: &str, name: &str, clone_url: &str, private: bool) -> serde_json::Value {
    serde_json::json!({
        "id": 1296269,
        "name": name,
        "full_name": format!("{}/{}", owner, name),
        "description": "Fixture repository",
        "html_url": format!("https://github.com/{}/{}", owner, name),
        "clone_url": clone_url,
        "ssh_url": format!("git@github.com:{}/{}.git", owner, name),
        "default_branch": "main",
        "private": private,
        "archived": false,
        "fork": false,
        "topics": [],
        "language": "Rust",
        "created_at": "2024-01-15T10:00:00Z",
        "updated_at": "2024-06-01T12:30:00Z"
    })
}

pub fn repo(owner: &str, name: &str, clone_url: &str, private: bool) -> GitHubRepo {
    serde_json::from_value(repo_json(owner, name, clone_url, private)).unwrap()
}
