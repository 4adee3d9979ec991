//! Minimal HTTP/1.1 server imitating the Bintray catalog for integration tests.
//!
//! API routes live under `/api/`, content under `/dl/`. Every response closes
//! the connection. Requests are recorded (path and Authorization header) so
//! tests can assert what the client asked for.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How a download request should misbehave before serving the real content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Respond with this status and a short text body.
    Status(u16),
    /// Respond 200 with bytes that do not match the published digest.
    Corrupt,
}

/// One page of `GET /repos/:subject/:repo/packages?start_pos=N`.
#[derive(Debug, Clone)]
pub struct PackagePage {
    pub names: Vec<String>,
    pub total: u64,
    pub end: u64,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    subject: String,
    repos: Vec<String>,
    /// (repo, start_pos) → page.
    package_pages: HashMap<(String, u64), PackagePage>,
    /// (repo, package) → [(path, sha1)].
    files: HashMap<(String, String), Vec<(String, String)>>,
    /// Download path below `/dl/` → body.
    content: HashMap<String, Vec<u8>>,
    /// Download path below `/dl/` → failures still to serve, in order.
    failures: HashMap<String, Vec<Failure>>,
    /// Request path → canned (status, body), checked before routing.
    api_errors: HashMap<String, (u16, String)>,
}

impl Catalog {
    pub fn new(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            ..Self::default()
        }
    }

    pub fn repo(mut self, name: &str) -> Self {
        self.repos.push(name.to_string());
        self
    }

    pub fn package_page(mut self, repo: &str, start: u64, names: &[&str], total: u64, end: u64) -> Self {
        self.package_pages.insert(
            (repo.to_string(), start),
            PackagePage {
                names: names.iter().map(|s| s.to_string()).collect(),
                total,
                end,
            },
        );
        self
    }

    /// Single-page package listing.
    pub fn packages(self, repo: &str, names: &[&str]) -> Self {
        let n = names.len() as u64;
        self.package_page(repo, 0, names, n, n)
    }

    /// Publishes `body` at `path` inside `repo/package`, with its real digest.
    pub fn file(mut self, repo: &str, package: &str, path: &str, body: &[u8]) -> Self {
        let sha1 = super::sha1_hex(body);
        let key = self.download_key(repo, path);
        self.files
            .entry((repo.to_string(), package.to_string()))
            .or_default()
            .push((path.to_string(), sha1));
        self.content.insert(key, body.to_vec());
        self
    }

    /// Queue failures served before the real content of `repo/path`.
    pub fn fail_download(mut self, repo: &str, path: &str, failures: &[Failure]) -> Self {
        let key = self.download_key(repo, path);
        self.failures.entry(key).or_default().extend_from_slice(failures);
        self
    }

    /// Answer the API request with this exact path (query included) with a canned response.
    pub fn respond_api(mut self, path_and_query: &str, status: u16, body: &str) -> Self {
        self.api_errors
            .insert(path_and_query.to_string(), (status, body.to_string()));
        self
    }

    fn download_key(&self, repo: &str, path: &str) -> String {
        format!("{}/{}/{}", self.subject, repo, path.trim_start_matches('/'))
    }
}

/// Handle on a running mock server. The server lives until the process exits.
#[derive(Clone)]
pub struct MockServer {
    base: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    /// e.g. `http://127.0.0.1:12345/api/`
    pub fn api_endpoint(&self) -> String {
        format!("{}api/", self.base)
    }

    pub fn downloads_endpoint(&self) -> String {
        format!("{}dl/", self.base)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Request paths in arrival order.
    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.paths().iter().filter(|p| p.starts_with(prefix)).count()
    }
}

pub fn start(catalog: Catalog) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let catalog = Arc::new(Mutex::new(catalog));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let catalog = Arc::clone(&catalog);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &catalog, &log));
        }
    });
    MockServer {
        base: format!("http://127.0.0.1:{}/", port),
        requests,
    }
}

struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    fn json(value: serde_json::Value) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: value.to_string().into_bytes(),
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".into(), "text/plain".into())],
            body: body.as_bytes().to_vec(),
        }
    }
}

fn handle(mut stream: TcpStream, catalog: &Mutex<Catalog>, log: &Mutex<Vec<RecordedRequest>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_head(&mut stream) else {
        return;
    };
    let Some((path, authorization)) = parse_request(&request) else {
        let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n");
        return;
    };
    log.lock().unwrap().push(RecordedRequest {
        path: path.clone(),
        authorization,
    });

    let response = route(&path, &mut catalog.lock().unwrap());
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason(response.status),
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
}

fn route(path_and_query: &str, catalog: &mut Catalog) -> Response {
    if let Some((status, body)) = catalog.api_errors.get(path_and_query) {
        return Response::text(*status, body);
    }
    let (path, query) = path_and_query
        .split_once('?')
        .unwrap_or((path_and_query, ""));
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match segments.as_slice() {
        ["api", "repos", subject] if *subject == catalog.subject => Response::json(
            serde_json::Value::Array(
                catalog
                    .repos
                    .iter()
                    .map(|name| serde_json::json!({ "name": name, "owner": subject }))
                    .collect(),
            ),
        ),
        ["api", "repos", subject, repo, "packages"] if *subject == catalog.subject => {
            let start = query_value(query, "start_pos")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            match catalog.package_pages.get(&(repo.to_string(), start)) {
                Some(page) => {
                    let mut response = Response::json(serde_json::Value::Array(
                        page.names
                            .iter()
                            .map(|name| serde_json::json!({ "name": name, "linked": false }))
                            .collect(),
                    ));
                    response
                        .headers
                        .push(("X-RangeLimit-Total".into(), page.total.to_string()));
                    response
                        .headers
                        .push(("X-RangeLimit-EndPos".into(), page.end.to_string()));
                    response
                }
                None => Response::text(404, "no such page"),
            }
        }
        ["api", "packages", subject, repo, package, "files"] if *subject == catalog.subject => {
            let files = catalog
                .files
                .get(&(repo.to_string(), package.to_string()))
                .cloned()
                .unwrap_or_default();
            Response::json(serde_json::Value::Array(
                files
                    .iter()
                    .map(|(path, sha1)| {
                        serde_json::json!({
                            "name": path.rsplit('/').next().unwrap_or(path),
                            "path": path,
                            "package": package,
                            "repo": repo,
                            "owner": subject,
                            "sha1": sha1,
                            "size": 0,
                        })
                    })
                    .collect(),
            ))
        }
        ["dl", rest @ ..] => {
            let key = rest.join("/");
            let failure = catalog
                .failures
                .get_mut(&key)
                .filter(|queue| !queue.is_empty())
                .map(|queue| queue.remove(0));
            match (failure, catalog.content.get(&key)) {
                (Some(Failure::Status(status)), _) => Response::text(status, "simulated failure"),
                (Some(Failure::Corrupt), Some(body)) => {
                    let mut corrupt = body.clone();
                    corrupt.extend_from_slice(b"garbage");
                    Response {
                        status: 200,
                        headers: Vec::new(),
                        body: corrupt,
                    }
                }
                (None, Some(body)) => Response {
                    status: 200,
                    headers: vec![("Content-Type".into(), "application/octet-stream".into())],
                    body: body.clone(),
                },
                (_, None) => Response::text(404, "no such file"),
            }
        }
        _ => Response::text(404, "not found"),
    }
}

/// Reads up to the blank line ending the request head.
fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return None,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
        if data.len() > 64 * 1024 {
            return None;
        }
    }
    String::from_utf8(data).ok()
}

/// Returns (path with query, Authorization value) of a GET request.
fn parse_request(request: &str) -> Option<(String, Option<String>)> {
    let mut lines = request.lines();
    let mut parts = lines.next()?.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    if !method.eq_ignore_ascii_case("GET") {
        return None;
    }
    let mut authorization = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("authorization") {
                authorization = Some(value.trim().to_string());
            }
        }
    }
    Some((target.to_string(), authorization))
}

fn query_value<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
