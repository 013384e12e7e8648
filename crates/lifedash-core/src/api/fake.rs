//! In-memory dashboard API for tests
//!
//! Behaves like the json-server style backend the client talks to: list,
//! create, patch and delete records under collection paths, plus the auth
//! endpoints. Individual calls can be scripted to return a fixed response,
//! fail at the transport level, or answer after a delay.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use super::{ApiClient, ClientOptions, RetryPolicy};

enum Script {
    Respond {
        status: u16,
        body: String,
        delay: Duration,
    },
    Fail(String),
}

#[derive(Default)]
struct State {
    collections: HashMap<String, Vec<Value>>,
    /// Collection path -> wrapper key used for list responses
    list_wrappers: HashMap<String, String>,
    scripts: HashMap<(Method, String), VecDeque<Script>>,
    /// email -> (password, token issued on login, user)
    accounts: HashMap<String, (String, String, Value)>,
    /// token -> user for tokens the server still accepts
    sessions: HashMap<String, Value>,
    /// Delay applied to every unscripted list response of a collection
    list_delays: HashMap<String, Duration>,
    next_id: i64,
    requests: Vec<HttpRequest>,
}

pub(crate) struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                next_id: 100,
                ..State::default()
            }),
        })
    }

    /// Client pointed at this backend: short timeout, no retries
    pub fn client(self: &Arc<Self>) -> Arc<ApiClient> {
        Arc::new(ApiClient::new(
            "http://fake.test",
            self.clone(),
            ClientOptions {
                timeout: Duration::from_millis(500),
                retry: RetryPolicy::none(),
            },
        ))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create (or replace) a collection
    pub fn seed(&self, path: &str, records: Vec<Value>) {
        self.lock().collections.insert(path.to_string(), records);
    }

    /// Answer list requests for `path` as `{ key: [...] }`
    pub fn wrap_list(&self, path: &str, key: &str) {
        self.lock()
            .list_wrappers
            .insert(path.to_string(), key.to_string());
    }

    /// Delay every unscripted list response for `path`
    pub fn delay_lists(&self, path: &str, delay: Duration) {
        self.lock().list_delays.insert(path.to_string(), delay);
    }

    pub fn records(&self, path: &str) -> Vec<Value> {
        self.lock()
            .collections
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    /// Queue a canned response for the next matching call
    pub fn respond(&self, method: Method, path: &str, status: u16, body: &str) {
        self.respond_after(method, path, status, body, Duration::ZERO);
    }

    pub fn respond_after(
        &self,
        method: Method,
        path: &str,
        status: u16,
        body: &str,
        delay: Duration,
    ) {
        self.push_script(
            method,
            path,
            Script::Respond {
                status,
                body: body.to_string(),
                delay,
            },
        );
    }

    /// Queue a transport failure for the next matching call
    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.push_script(method, path, Script::Fail(message.to_string()));
    }

    fn push_script(&self, method: Method, path: &str, script: Script) {
        self.lock()
            .scripts
            .entry((method, path.to_string()))
            .or_default()
            .push_back(script);
    }

    /// Register credentials; login issues `token`
    pub fn add_account(&self, email: &str, password: &str, token: &str, user: Value) {
        self.lock().accounts.insert(
            email.to_string(),
            (password.to_string(), token.to_string(), user),
        );
    }

    /// Make the server accept `token` as a live session
    pub fn accept_token(&self, token: &str, user: Value) {
        self.lock().sessions.insert(token.to_string(), user);
    }

    /// Every request seen so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    /// Requests whose path matches exactly
    pub fn requests_to(&self, method: Method, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && path_of(&r.url) == path)
            .count()
    }

    fn handle(&self, request: &HttpRequest) -> (HttpResponse, Duration) {
        let url = match reqwest::Url::parse(&request.url) {
            Ok(url) => url,
            Err(_) => return (reply(400, json!({"message": "bad url"})), Duration::ZERO),
        };
        let path = url.path().to_string();
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut state = self.lock();

        if path.starts_with("/auth/") {
            return (auth(&mut state, request, &path), Duration::ZERO);
        }

        if state.collections.contains_key(&path) {
            return match request.method {
                Method::Get => {
                    let delay = state.list_delays.get(&path).copied().unwrap_or_default();
                    (list(&state, &path, &query), delay)
                }
                Method::Post => (create(&mut state, &path, request.body.clone()), Duration::ZERO),
                _ => (reply(405, json!({"message": "method not allowed"})), Duration::ZERO),
            };
        }

        if let Some((parent, id)) = path.rsplit_once('/') {
            if state.collections.contains_key(parent) {
                let response = record(&mut state, request, parent, id);
                return (response, Duration::ZERO);
            }
        }

        (reply(404, json!({"message": "Not Found"})), Duration::ZERO)
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let script = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            state
                .scripts
                .get_mut(&(request.method, path_of(&request.url)))
                .and_then(VecDeque::pop_front)
        };

        match script {
            Some(Script::Fail(message)) => Err(TransportError(message)),
            Some(Script::Respond {
                status,
                body,
                delay,
            }) => {
                tokio::time::sleep(delay).await;
                Ok(HttpResponse { status, body })
            }
            None => {
                let (response, delay) = self.handle(&request);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(response)
            }
        }
    }
}

fn path_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default()
}

fn reply(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        body: body.to_string(),
    }
}

fn bearer(request: &HttpRequest) -> Option<String> {
    request
        .header("authorization")
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn auth(state: &mut State, request: &HttpRequest, path: &str) -> HttpResponse {
    let body = request.body.clone().unwrap_or(Value::Null);
    match path {
        "/auth/login" => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            match state.accounts.get(email) {
                Some((expected, token, user)) if expected == password => {
                    let (token, user) = (token.clone(), user.clone());
                    state.sessions.insert(token.clone(), user.clone());
                    reply(200, json!({"token": token, "user": user}))
                }
                _ => reply(401, json!({"message": "Invalid credentials"})),
            }
        }
        "/auth/verify-token" => {
            let token = bearer(request)
                .or_else(|| body["token"].as_str().map(str::to_string))
                .unwrap_or_default();
            match state.sessions.get(&token) {
                Some(user) => reply(200, json!({"valid": true, "user": user})),
                None => reply(401, json!({"message": "Token expired"})),
            }
        }
        "/auth/logout" => {
            if let Some(token) = bearer(request) {
                state.sessions.remove(&token);
            }
            reply(200, json!({}))
        }
        "/auth/password-reset" => reply(200, json!({"message": "Reset link sent"})),
        _ => reply(404, json!({"message": "Not Found"})),
    }
}

fn list(state: &State, path: &str, query: &[(String, String)]) -> HttpResponse {
    let records: Vec<Value> = state.collections[path]
        .iter()
        .filter(|record| matches(record, query))
        .cloned()
        .collect();

    match state.list_wrappers.get(path) {
        Some(key) => {
            let mut wrapper = Map::new();
            wrapper.insert(key.clone(), Value::Array(records));
            reply(200, Value::Object(wrapper))
        }
        None => reply(200, Value::Array(records)),
    }
}

fn matches(record: &Value, query: &[(String, String)]) -> bool {
    query.iter().all(|(key, expected)| match key.as_str() {
        "q" => {
            let needle = expected.to_lowercase();
            record
                .as_object()
                .map(|fields| {
                    fields.values().any(|v| {
                        v.as_str()
                            .map_or(false, |s| s.to_lowercase().contains(&needle))
                    })
                })
                .unwrap_or(false)
        }
        "tags_like" => record["tags"]
            .as_array()
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .any(|t| t.contains(expected.as_str()))
            })
            .unwrap_or(false),
        k if k.starts_with('_') => true,
        field => match &record[field] {
            Value::String(s) => s == expected,
            Value::Null => false,
            other => other.to_string() == *expected,
        },
    })
}

fn create(state: &mut State, path: &str, body: Option<Value>) -> HttpResponse {
    let mut record = match body {
        Some(Value::Object(map)) => map,
        _ => return reply(400, json!({"message": "expected an object"})),
    };
    if !record.contains_key("id") {
        state.next_id += 1;
        record.insert("id".to_string(), json!(state.next_id));
    }
    let record = Value::Object(record);
    if let Some(records) = state.collections.get_mut(path) {
        records.push(record.clone());
    }
    reply(201, record)
}

fn record(state: &mut State, request: &HttpRequest, parent: &str, id: &str) -> HttpResponse {
    let Some(records) = state.collections.get_mut(parent) else {
        return reply(404, json!({"message": "Not Found"}));
    };
    let position = records.iter().position(|r| match &r["id"] {
        Value::String(s) => s == id,
        other => other.to_string() == id,
    });
    let Some(position) = position else {
        return reply(404, json!({"message": "Not Found"}));
    };

    match request.method {
        Method::Get => reply(200, records[position].clone()),
        Method::Patch | Method::Put => {
            let patch = match &request.body {
                Some(Value::Object(map)) => map.clone(),
                _ => Map::new(),
            };
            if let Value::Object(existing) = &mut records[position] {
                for (k, v) in patch {
                    existing.insert(k, v);
                }
            }
            reply(200, records[position].clone())
        }
        Method::Delete => {
            records.remove(position);
            reply(200, json!({}))
        }
        Method::Post => reply(405, json!({"message": "method not allowed"})),
    }
}
