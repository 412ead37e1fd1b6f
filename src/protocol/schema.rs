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

//! MCP method names and result shapes.
//!
//! The client and transport treat these as opaque constants and predicates;
//! only the server dispatcher and test assertions look inside the shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::messages::JsonRpcNotification;

/// MCP protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Fixed operation method names.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const LIST_TOOLS: &str = "tools/list";
    pub const CALL_TOOL: &str = "tools/call";
    pub const LIST_RESOURCES: &str = "resources/list";
    pub const READ_RESOURCE: &str = "resources/read";
    pub const LIST_PROMPTS: &str = "prompts/list";
    pub const GET_PROMPT: &str = "prompts/get";
    pub const LOG_MESSAGE: &str = "notifications/message";
    pub const PROGRESS: &str = "notifications/progress";
}

/// True when a notification matches the progress-update shape: the progress
/// method name plus a numeric `progressToken` and `progress`, with `total`
/// absent or numeric.
pub fn is_progress_notification(notification: &JsonRpcNotification) -> bool {
    if notification.method != methods::PROGRESS {
        return false;
    }
    let params = &notification.params;
    let token_ok = params.get("progressToken").is_some_and(Value::is_number);
    let progress_ok = params.get("progress").is_some_and(Value::is_number);
    let total_ok = match params.get("total") {
        None | Some(Value::Null) => true,
        Some(v) => v.is_number(),
    };
    token_ok && progress_ok && total_ok
}

/// Server identity reported by `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: Value,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Tool metadata (name, description, JSON schema for arguments).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDescriptor>,
}

/// A single content entry in a tool or prompt result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub name: String,
    pub uri: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResourcesResult {
    pub resources: Vec<ResourceDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceContents {
    pub uri: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPromptsResult {
    pub prompts: Vec<PromptDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Content,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::JsonRpcMessage;
    use serde_json::json;

    fn notification(method: &str, params: Value) -> JsonRpcNotification {
        match JsonRpcMessage::notification(method, params) {
            JsonRpcMessage::Notification(n) => n,
            _ => unreachable!(),
        }
    }

    #[test]
    fn progress_shape_accepted() {
        let n = notification(
            methods::PROGRESS,
            json!({"progressToken": 1, "progress": 3, "total": 10}),
        );
        assert!(is_progress_notification(&n));
    }

    #[test]
    fn progress_shape_total_optional() {
        let n = notification(methods::PROGRESS, json!({"progressToken": 1, "progress": 3}));
        assert!(is_progress_notification(&n));
    }

    #[test]
    fn progress_shape_rejects_wrong_method() {
        let n = notification(
            methods::LOG_MESSAGE,
            json!({"progressToken": 1, "progress": 3}),
        );
        assert!(!is_progress_notification(&n));
    }

    #[test]
    fn progress_shape_rejects_missing_token() {
        let n = notification(methods::PROGRESS, json!({"progress": 3}));
        assert!(!is_progress_notification(&n));
    }

    #[test]
    fn progress_shape_rejects_non_numeric_total() {
        let n = notification(
            methods::PROGRESS,
            json!({"progressToken": 1, "progress": 3, "total": "ten"}),
        );
        assert!(!is_progress_notification(&n));
    }

    #[test]
    fn content_uses_wire_type_tag() {
        let content = Content::Text {
            text: "hello".into(),
        };
        let val = serde_json::to_value(&content).unwrap();
        assert_eq!(val, json!({"type": "text", "text": "hello"}));
    }

    #[test]
    fn tool_descriptor_uses_camel_case_schema_field() {
        let tool = ToolDescriptor {
            name: "echo".into(),
            description: "Echoes".into(),
            input_schema: json!({"type": "object"}),
        };
        let val = serde_json::to_value(&tool).unwrap();
        assert!(val.get("inputSchema").is_some());
    }

    #[test]
    fn call_tool_result_omits_absent_error_flag() {
        let result = CallToolResult {
            content: vec![Content::Text { text: "ok".into() }],
            is_error: None,
        };
        let val = serde_json::to_value(&result).unwrap();
        assert!(val.get("isError").is_none());
    }
}
