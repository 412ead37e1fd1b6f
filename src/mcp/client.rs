// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Test client session.
//!
//! Wraps a loopback transport, assigns monotonically increasing request ids
//! starting at 1, and correlates every reply to its request through a map of
//! per-id completion handles. Replies with no waiting caller still reach the
//! observer registry; they are logged and otherwise dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::mcp::observers::{NotificationRouter, ObserverCategory};
use crate::mcp::transport::{LoopbackTransport, Transport};
use crate::protocol::schema::{
    methods, CallToolResult, GetPromptResult, ListPromptsResult, ListResourcesResult,
    ListToolsResult,
};
use crate::protocol::{
    JsonRpcErrorResponse, JsonRpcMessage, JsonRpcResponse, RequestId, RpcError,
};
use crate::server::McpServer;

/// A resolved reply: either a success response or an error response. An
/// error response resolves the request like any other reply; it is not a
/// transport failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerReply {
    Response(JsonRpcResponse),
    Error(JsonRpcErrorResponse),
}

impl ServerReply {
    pub fn id(&self) -> RequestId {
        match self {
            Self::Response(r) => r.id,
            Self::Error(e) => e.id,
        }
    }

    /// The `result` field, present only for success responses.
    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Response(r) => Some(&r.result),
            Self::Error(_) => None,
        }
    }

    /// The error object, present only for error responses.
    pub fn error(&self) -> Option<&RpcError> {
        match self {
            Self::Response(_) => None,
            Self::Error(e) => Some(&e.error),
        }
    }

    fn into_typed<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        match self {
            Self::Response(r) => Ok(serde_json::from_value(r.result)?),
            Self::Error(e) => Err(ClientError::Rpc(e.error)),
        }
    }
}

/// Completion handles for in-flight requests, keyed by request id and
/// removed upon the matching reply.
#[derive(Default)]
struct PendingRequests {
    inner: Mutex<HashMap<RequestId, oneshot::Sender<ServerReply>>>,
}

impl PendingRequests {
    fn register(&self, id: RequestId) -> oneshot::Receiver<ServerReply> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .lock()
            .expect("pending request map poisoned")
            .insert(id, tx);
        rx
    }

    fn resolve(&self, reply: ServerReply) {
        let id = reply.id();
        let waiter = self
            .inner
            .lock()
            .expect("pending request map poisoned")
            .remove(&id);
        match waiter {
            Some(tx) => {
                // The receiver may have been dropped by a cancelled caller.
                let _ = tx.send(reply);
            }
            None => {
                warn!(id, "reply with no waiting request; visible to observers only");
            }
        }
    }
}

/// A lightweight client wired directly to an [`McpServer`] through a
/// loopback transport.
///
/// Each request gets its own completion handle, so interleaved requests on
/// the same session resolve independently; the typical usage pattern is
/// still strictly sequential test calls.
pub struct ClientSession {
    transport: Arc<LoopbackTransport>,
    router: Arc<NotificationRouter>,
    pending: Arc<PendingRequests>,
    next_id: AtomicU64,
}

/// Wire a new client session to the server. The server installs its
/// dispatcher into the transport's `onmessage` slot; no real boundary is
/// crossed.
pub async fn connect(server: &McpServer) -> ClientSession {
    ClientSession::connect(server).await
}

/// Invoke the server's close hook, disconnecting it from its transport.
pub async fn close(server: &McpServer) {
    server.close().await;
}

impl ClientSession {
    pub async fn connect(server: &McpServer) -> Self {
        let router = Arc::new(NotificationRouter::new());
        let pending = Arc::new(PendingRequests::default());

        let receiver = {
            let router = Arc::clone(&router);
            let pending = Arc::clone(&pending);
            move |message: JsonRpcMessage| {
                // Observers see every inbound message before correlation.
                router.dispatch(&message);
                match message {
                    JsonRpcMessage::Response(r) => pending.resolve(ServerReply::Response(r)),
                    JsonRpcMessage::Error(e) => pending.resolve(ServerReply::Error(e)),
                    JsonRpcMessage::Notification(_) => {}
                    JsonRpcMessage::Request(r) => {
                        warn!(method = %r.method, "server-to-client request not supported; dropping");
                    }
                }
            }
        };

        let transport = Arc::new(LoopbackTransport::new(receiver));
        server.connect(Arc::clone(&transport)).await;
        debug!("client session connected");

        Self {
            transport,
            router,
            pending,
            next_id: AtomicU64::new(1),
        }
    }

    /// Issue a raw request and await the correlated reply. A progress token
    /// equal to the request id is merged into the params under `_meta`.
    pub async fn send_to_server(
        &self,
        method: &str,
        params: Value,
    ) -> Result<ServerReply, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let params = merge_progress_token(params, id);
        let rx = self.pending.register(id);

        debug!(id, method, "sending request");
        self.transport
            .onmessage(JsonRpcMessage::request(id, method, params))
            .await;

        rx.await.map_err(|_| ClientError::ConnectionClosed)
    }

    pub async fn list_tools(&self) -> Result<ListToolsResult, ClientError> {
        self.request(methods::LIST_TOOLS, json!({})).await
    }

    pub async fn list_resources(&self) -> Result<ListResourcesResult, ClientError> {
        self.request(methods::LIST_RESOURCES, Value::Null).await
    }

    pub async fn list_prompts(&self) -> Result<ListPromptsResult, ClientError> {
        self.request(methods::LIST_PROMPTS, Value::Null).await
    }

    pub async fn call_tool(
        &self,
        tool: &str,
        arguments: Value,
    ) -> Result<CallToolResult, ClientError> {
        self.request(
            methods::CALL_TOOL,
            json!({"name": tool, "arguments": arguments}),
        )
        .await
    }

    pub async fn get_prompt(
        &self,
        prompt: &str,
        arguments: Value,
    ) -> Result<GetPromptResult, ClientError> {
        self.request(
            methods::GET_PROMPT,
            json!({"name": prompt, "arguments": arguments}),
        )
        .await
    }

    /// Observe every inbound notification.
    pub fn on_notification(&self, observer: impl Fn(&JsonRpcMessage) + Send + Sync + 'static) {
        self.router.register(ObserverCategory::Notification, observer);
    }

    /// Observe every inbound error response.
    pub fn on_error(&self, observer: impl Fn(&JsonRpcMessage) + Send + Sync + 'static) {
        self.router.register(ObserverCategory::Error, observer);
    }

    /// Observe every inbound progress-shaped notification.
    pub fn on_progress(&self, observer: impl Fn(&JsonRpcMessage) + Send + Sync + 'static) {
        self.router.register(ObserverCategory::Progress, observer);
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ClientError> {
        self.send_to_server(method, params).await?.into_typed()
    }
}

/// Replace `params._meta` with a progress token equal to the request id,
/// leaving all other params untouched. Non-object params pass through
/// unchanged.
fn merge_progress_token(params: Value, id: RequestId) -> Value {
    let mut map = match params {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => return other,
    };
    map.insert("_meta".to_string(), json!({"progressToken": id}));
    Value::Object(map)
}
