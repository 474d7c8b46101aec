//! Scripted in-memory transport for driver and discovery tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{BmcError, Result};
use crate::transport::{Method, Request, Response, Transport};

#[derive(Debug, Clone)]
enum Reply {
    Respond(Response),
    Fail(String),
}

#[derive(Debug)]
struct Route {
    method: Method,
    path: String,
    replies: VecDeque<Reply>,
}

/// Answers requests from per-route reply queues and records everything sent.
///
/// Routes match on method and the path without its query string. Queued
/// replies are consumed in order; the last one keeps answering. Unrouted
/// requests get a 404.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, method: Method, path: &str, reply: Reply) -> Self {
        let path = path.split('?').next().unwrap_or_default().to_string();
        {
            let mut routes = self.routes.lock().unwrap();
            match routes
                .iter_mut()
                .find(|r| r.method == method && r.path == path)
            {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    path,
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    /// Queue a response
    pub fn on(self, method: Method, path: &str, response: Response) -> Self {
        self.push(method, path, Reply::Respond(response))
    }

    /// Queue a 200 with the given body
    pub fn ok(self, method: Method, path: &str, body: &str) -> Self {
        self.on(method, path, Response::new(200, body))
    }

    /// Queue a transport failure
    pub fn fail(self, method: Method, path: &str, message: &str) -> Self {
        self.push(method, path, Reply::Fail(message.to_string()))
    }

    /// Every request sent so far, in order
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Paths (with query) of every request sent so far
    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    /// Number of requests sent to a route
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path_without_query() == path)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let reply = {
            let mut routes = self.routes.lock().unwrap();
            routes
                .iter_mut()
                .find(|r| r.method == request.method && r.path == request.path_without_query())
                .and_then(|route| {
                    if route.replies.len() > 1 {
                        route.replies.pop_front()
                    } else {
                        route.replies.front().cloned()
                    }
                })
        };
        self.requests.lock().unwrap().push(request);

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(BmcError::Transport(message)),
            None => Ok(Response::new(404, "")),
        }
    }
}
