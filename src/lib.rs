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

//! mcp-loopback: an in-process test harness for MCP servers.
//!
//! This library wires a test client and an MCP server together through a
//! loopback transport that exchanges JSON-RPC messages via direct in-process
//! calls instead of sockets or pipes. It provides the transport adapter, a
//! lightweight client session with per-request correlation, and an observer
//! registry for watching inbound notifications, errors, and progress updates.

pub mod error;
pub mod mcp;
pub mod protocol;
pub mod server;

pub use error::ClientError;
pub use mcp::client::{close, connect, ClientSession, ServerReply};
pub use mcp::observers::{NotificationRouter, ObserverCategory};
pub use mcp::transport::{LoopbackTransport, Transport};
pub use server::{McpServer, ServerInfo, ToolContext};
