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

//! Client-side error types.

use crate::protocol::RpcError;

/// Errors surfaced by the typed client operations.
///
/// A protocol-level error response does not fail the underlying
/// `send_to_server` call (it resolves it, carrying the error envelope); only
/// the typed helpers convert that envelope into `ClientError::Rpc` so callers
/// can branch on it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a JSON-RPC error response.
    #[error("server returned an error response: {0}")]
    Rpc(RpcError),

    /// The reply's `result` field did not decode into the expected shape.
    #[error("failed to decode result: {0}")]
    Decode(#[from] serde_json::Error),

    /// The session was torn down before a reply arrived.
    #[error("connection closed before a reply arrived")]
    ConnectionClosed,
}
