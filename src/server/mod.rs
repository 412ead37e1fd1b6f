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

//! Minimal MCP server.
//!
//! Holds registries of prompt, tool, and resource handlers and dispatches
//! JSON-RPC requests to them. On `connect` the server installs its
//! dispatcher into the transport's `onmessage` slot; every outbound message
//! (responses and handler-emitted notifications) goes back through the
//! transport's `send`.

use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::mcp::transport::{LoopbackTransport, Transport};
use crate::protocol::messages::{INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};
use crate::protocol::schema::{
    methods, CallToolResult, GetPromptResult, InitializeResult, ListPromptsResult,
    ListResourcesResult, ListToolsResult, PromptArgument, PromptDescriptor, ReadResourceResult,
    ResourceDescriptor, ToolDescriptor, PROTOCOL_VERSION,
};
use crate::protocol::{JsonRpcMessage, JsonRpcRequest, RequestId};

pub use crate::protocol::schema::ServerInfo;

type ToolHandler =
    Arc<dyn Fn(Value, ToolContext) -> BoxFuture<'static, anyhow::Result<CallToolResult>> + Send + Sync>;
type PromptHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<GetPromptResult>> + Send + Sync>;
type ResourceHandler =
    Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<ReadResourceResult>> + Send + Sync>;

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
}

struct RegisteredPrompt {
    descriptor: PromptDescriptor,
    handler: PromptHandler,
}

struct RegisteredResource {
    descriptor: ResourceDescriptor,
    handler: ResourceHandler,
}

/// Per-call context handed to tool handlers: lets a running tool push
/// notifications back to the client, tagged with the request's progress
/// token where applicable.
#[derive(Clone)]
pub struct ToolContext {
    transport: Weak<LoopbackTransport>,
    progress_token: Option<RequestId>,
}

impl ToolContext {
    /// The progress token the client attached to this call, if any.
    pub fn progress_token(&self) -> Option<RequestId> {
        self.progress_token
    }

    /// Send a notification toward the client. Delivery failures are logged
    /// here and never abort the caller's remaining sends.
    pub async fn send_notification(&self, method: &str, params: Value) {
        let message = JsonRpcMessage::notification(method, params);
        match self.transport.upgrade() {
            Some(transport) => {
                if let Err(e) = transport.send(message).await {
                    error!(error = %e, method, "failed to deliver notification");
                }
            }
            None => {
                error!(method, "transport gone; dropping notification");
            }
        }
    }

    /// Send a progress update tagged with this call's progress token. A
    /// call without a token skips the update.
    pub async fn send_progress(&self, progress: u64, total: Option<u64>) {
        let Some(token) = self.progress_token else {
            debug!("call carries no progress token; skipping progress update");
            return;
        };
        let mut params = json!({"progressToken": token, "progress": progress});
        if let Some(total) = total {
            params["total"] = total.into();
        }
        self.send_notification(methods::PROGRESS, params).await;
    }
}

struct ServerInner {
    info: ServerInfo,
    tools: Mutex<Vec<RegisteredTool>>,
    prompts: Mutex<Vec<RegisteredPrompt>>,
    resources: Mutex<Vec<RegisteredResource>>,
    transport: Mutex<Option<Arc<LoopbackTransport>>>,
}

/// An MCP server with registries for tools, prompts, and resources.
pub struct McpServer {
    inner: Arc<ServerInner>,
}

impl McpServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                info: ServerInfo {
                    name: name.into(),
                    version: version.into(),
                },
                tools: Mutex::new(Vec::new()),
                prompts: Mutex::new(Vec::new()),
                resources: Mutex::new(Vec::new()),
                transport: Mutex::new(None),
            }),
        }
    }

    /// Register a tool. The handler receives the call's `arguments` object
    /// and a [`ToolContext`] for emitting notifications.
    pub fn tool<F, Fut>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> &Self
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<CallToolResult>> + Send + 'static,
    {
        self.inner.tools.lock().expect("tool registry poisoned").push(RegisteredTool {
            descriptor: ToolDescriptor {
                name: name.into(),
                description: description.into(),
                input_schema,
            },
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        });
        self
    }

    /// Register a prompt template. The handler receives the request's
    /// `arguments` object.
    pub fn prompt<F, Fut>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        arguments: Vec<PromptArgument>,
        handler: F,
    ) -> &Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<GetPromptResult>> + Send + 'static,
    {
        self.inner
            .prompts
            .lock()
            .expect("prompt registry poisoned")
            .push(RegisteredPrompt {
                descriptor: PromptDescriptor {
                    name: name.into(),
                    description: Some(description.into()),
                    arguments,
                },
                handler: Arc::new(move |args| Box::pin(handler(args))),
            });
        self
    }

    /// Register a resource at a fixed URI.
    pub fn resource<F, Fut>(
        &self,
        name: impl Into<String>,
        uri: impl Into<String>,
        mime_type: impl Into<String>,
        handler: F,
    ) -> &Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ReadResourceResult>> + Send + 'static,
    {
        self.inner
            .resources
            .lock()
            .expect("resource registry poisoned")
            .push(RegisteredResource {
                descriptor: ResourceDescriptor {
                    name: name.into(),
                    uri: uri.into(),
                    mime_type: Some(mime_type.into()),
                },
                handler: Arc::new(move || Box::pin(handler())),
            });
        self
    }

    /// Connection hook: start the transport, install the dispatcher into
    /// its `onmessage` slot, and keep the transport for outbound sends.
    pub async fn connect(&self, transport: Arc<LoopbackTransport>) {
        if let Err(e) = transport.start().await {
            error!(error = %e, "transport failed to start");
        }

        let inner = Arc::clone(&self.inner);
        let weak = Arc::downgrade(&transport);
        transport.set_onmessage(Arc::new(move |message| {
            let inner = Arc::clone(&inner);
            let transport = weak.clone();
            Box::pin(async move {
                inner.handle_message(&transport, message).await;
            })
        }));

        *self
            .inner
            .transport
            .lock()
            .expect("transport slot poisoned") = Some(transport);
        debug!(server = %self.inner.info.name, "server connected to loopback transport");
    }

    /// Close hook: detach from the transport, restoring its disconnected
    /// default `onmessage` behavior.
    pub async fn close(&self) {
        let transport = self
            .inner
            .transport
            .lock()
            .expect("transport slot poisoned")
            .take();
        if let Some(transport) = transport {
            transport.clear_onmessage();
            if let Err(e) = transport.close().await {
                error!(error = %e, "transport failed to close");
            }
            debug!(server = %self.inner.info.name, "server disconnected");
        }
    }
}

impl ServerInner {
    async fn handle_message(
        &self,
        transport: &Weak<LoopbackTransport>,
        message: JsonRpcMessage,
    ) {
        match message {
            JsonRpcMessage::Request(req) => {
                debug!(method = %req.method, id = req.id, "request received");
                let reply = self.dispatch_request(transport, req).await;
                match transport.upgrade() {
                    Some(t) => {
                        if let Err(e) = t.send(reply).await {
                            error!(error = %e, "failed to deliver reply");
                        }
                    }
                    None => error!("transport gone; dropping reply"),
                }
            }
            JsonRpcMessage::Notification(n) => {
                debug!(method = %n.method, "notification received; ignoring");
            }
            other => {
                warn!(?other, "unexpected message kind from client; ignoring");
            }
        }
    }

    async fn dispatch_request(
        &self,
        transport: &Weak<LoopbackTransport>,
        req: JsonRpcRequest,
    ) -> JsonRpcMessage {
        match req.method.as_str() {
            methods::INITIALIZE => result_response(
                req.id,
                InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    capabilities: json!({"tools": {}, "prompts": {}, "resources": {}, "logging": {}}),
                    server_info: self.info.clone(),
                },
            ),
            methods::LIST_TOOLS => {
                let tools = self
                    .tools
                    .lock()
                    .expect("tool registry poisoned")
                    .iter()
                    .map(|t| t.descriptor.clone())
                    .collect();
                result_response(req.id, ListToolsResult { tools })
            }
            methods::CALL_TOOL => self.call_tool(transport, req).await,
            methods::LIST_RESOURCES => {
                let resources = self
                    .resources
                    .lock()
                    .expect("resource registry poisoned")
                    .iter()
                    .map(|r| r.descriptor.clone())
                    .collect();
                result_response(req.id, ListResourcesResult { resources })
            }
            methods::READ_RESOURCE => self.read_resource(req).await,
            methods::LIST_PROMPTS => {
                let prompts = self
                    .prompts
                    .lock()
                    .expect("prompt registry poisoned")
                    .iter()
                    .map(|p| p.descriptor.clone())
                    .collect();
                result_response(req.id, ListPromptsResult { prompts })
            }
            methods::GET_PROMPT => self.get_prompt(req).await,
            other => {
                warn!(method = other, "method not found");
                JsonRpcMessage::error(req.id, METHOD_NOT_FOUND, format!("Method not found: {other}"))
            }
        }
    }

    async fn call_tool(
        &self,
        transport: &Weak<LoopbackTransport>,
        req: JsonRpcRequest,
    ) -> JsonRpcMessage {
        let Some(name) = req.params.get("name").and_then(Value::as_str) else {
            return JsonRpcMessage::error(req.id, INVALID_PARAMS, "missing tool name");
        };
        let arguments = req
            .params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));
        let progress_token = req
            .params
            .get("_meta")
            .and_then(|m| m.get("progressToken"))
            .and_then(Value::as_u64);

        // Clone the handler out of the registry guard before awaiting it.
        let handler = self
            .tools
            .lock()
            .expect("tool registry poisoned")
            .iter()
            .find(|t| t.descriptor.name == name)
            .map(|t| Arc::clone(&t.handler));
        let Some(handler) = handler else {
            return JsonRpcMessage::error(req.id, INVALID_PARAMS, format!("Unknown tool: {name}"));
        };

        let ctx = ToolContext {
            transport: transport.clone(),
            progress_token,
        };
        match handler(arguments, ctx).await {
            Ok(result) => result_response(req.id, result),
            Err(e) => {
                error!(tool = name, error = %e, "tool handler failed");
                JsonRpcMessage::error(req.id, INTERNAL_ERROR, e.to_string())
            }
        }
    }

    async fn get_prompt(&self, req: JsonRpcRequest) -> JsonRpcMessage {
        let Some(name) = req.params.get("name").and_then(Value::as_str) else {
            return JsonRpcMessage::error(req.id, INVALID_PARAMS, "missing prompt name");
        };
        let arguments = req
            .params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let handler = self
            .prompts
            .lock()
            .expect("prompt registry poisoned")
            .iter()
            .find(|p| p.descriptor.name == name)
            .map(|p| Arc::clone(&p.handler));
        let Some(handler) = handler else {
            return JsonRpcMessage::error(req.id, INVALID_PARAMS, format!("Unknown prompt: {name}"));
        };

        match handler(arguments).await {
            Ok(result) => result_response(req.id, result),
            Err(e) => {
                error!(prompt = name, error = %e, "prompt handler failed");
                JsonRpcMessage::error(req.id, INTERNAL_ERROR, e.to_string())
            }
        }
    }

    async fn read_resource(&self, req: JsonRpcRequest) -> JsonRpcMessage {
        let Some(uri) = req.params.get("uri").and_then(Value::as_str) else {
            return JsonRpcMessage::error(req.id, INVALID_PARAMS, "missing resource uri");
        };

        let handler = self
            .resources
            .lock()
            .expect("resource registry poisoned")
            .iter()
            .find(|r| r.descriptor.uri == uri)
            .map(|r| Arc::clone(&r.handler));
        let Some(handler) = handler else {
            return JsonRpcMessage::error(req.id, INVALID_PARAMS, format!("Unknown resource: {uri}"));
        };

        match handler().await {
            Ok(result) => result_response(req.id, result),
            Err(e) => {
                error!(resource = uri, error = %e, "resource handler failed");
                JsonRpcMessage::error(req.id, INTERNAL_ERROR, e.to_string())
            }
        }
    }
}

fn result_response(id: RequestId, result: impl Serialize) -> JsonRpcMessage {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcMessage::response(id, value),
        Err(e) => JsonRpcMessage::error(id, INTERNAL_ERROR, format!("failed to serialize result: {e}")),
    }
}
