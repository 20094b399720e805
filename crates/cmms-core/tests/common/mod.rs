// Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cmms_api::{Error, Transport};
use serde_json::{Value, json};

/// A canned response.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16, Value),
    Delay(Duration, Box<Reply>),
}

impl Reply {
    pub fn ok(value: Value) -> Self {
        Self::Json(value)
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self::Status(status, body)
    }

    pub fn after(self, millis: u64) -> Self {
        Self::Delay(Duration::from_millis(millis), Box::new(self))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

/// Replies are queued per `(method, path)`. The last queued reply repeats.
/// Unknown routes answer 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(&'static str, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: &'static str, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    pub fn last_body(&self, method: &str, path: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.method == method && c.path == path)
            .and_then(|c| c.body.clone())
    }

    async fn respond(&self, method: &'static str, path: &str, body: Option<Value>) -> Result<Value, Error> {
        let reply = {
            self.calls.lock().unwrap().push(Call {
                method,
                path: path.to_owned(),
                body,
            });
            let mut routes = self.routes.lock().unwrap();
            routes.get_mut(&(method, path.to_owned())).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };

        let mut reply = reply.unwrap_or_else(|| Reply::status(404, json!({ "detail": "Not found." })));
        loop {
            match reply {
                Reply::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
                Reply::Json(value) => return Ok(value),
                Reply::Status(status, body) => {
                    let message = body
                        .get("detail")
                        .and_then(Value::as_str)
                        .unwrap_or("request failed")
                        .to_owned();
                    return Err(Error::Api {
                        status,
                        message,
                        body: Some(body),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, _query: &[(String, String)]) -> Result<Value, Error> {
        self.respond("GET", path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.respond("POST", path, Some(body.clone())).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.respond("PUT", path, Some(body.clone())).await
    }

    async fn delete(&self, path: &str) -> Result<Value, Error> {
        self.respond("DELETE", path, None).await
    }
}
