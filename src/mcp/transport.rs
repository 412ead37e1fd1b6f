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

//! Loopback transport.
//!
//! Implements the transport capability contract over direct in-process
//! calls: `send` forwards server-to-client messages straight into the
//! client's receiver callback, and `onmessage` is the single settable slot
//! the server installs its dispatcher into during connect.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, error, trace};

use crate::protocol::JsonRpcMessage;

/// Client-side callback receiving every message the server sends.
pub type ReceiverCallback = Box<dyn Fn(JsonRpcMessage) + Send + Sync>;

/// Server-side handler installed into the `onmessage` slot.
pub type MessageHandler = Arc<dyn Fn(JsonRpcMessage) -> BoxFuture<'static, ()> + Send + Sync>;

/// Transport capability contract: deliver outbound messages, lifecycle
/// hooks, and a single settable inbound-message slot.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a message from the owning server toward the client.
    async fn send(&self, message: JsonRpcMessage) -> Result<()>;

    async fn start(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// Install the inbound-message handler. The owning server must call
    /// this before the first `onmessage` invocation.
    fn set_onmessage(&self, handler: MessageHandler);

    /// Push a client-originated message into the installed handler. When no
    /// handler is installed the message is dropped with a diagnostic; this
    /// never fails and never panics.
    async fn onmessage(&self, message: JsonRpcMessage);
}

/// In-process transport connecting a test client and a server without any
/// real I/O boundary.
pub struct LoopbackTransport {
    receiver: ReceiverCallback,
    onmessage: Mutex<Option<MessageHandler>>,
}

impl LoopbackTransport {
    pub fn new(receiver: impl Fn(JsonRpcMessage) + Send + Sync + 'static) -> Self {
        Self {
            receiver: Box::new(receiver),
            onmessage: Mutex::new(None),
        }
    }

    /// Reset the `onmessage` slot to its disconnected default.
    pub fn clear_onmessage(&self) {
        *self.onmessage.lock().expect("onmessage slot poisoned") = None;
    }

    fn handler(&self) -> Option<MessageHandler> {
        self.onmessage.lock().expect("onmessage slot poisoned").clone()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&self, message: JsonRpcMessage) -> Result<()> {
        trace!(?message, "loopback send");
        (self.receiver)(message);
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        debug!("starting loopback transport");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        debug!("closing loopback transport");
        Ok(())
    }

    fn set_onmessage(&self, handler: MessageHandler) {
        *self.onmessage.lock().expect("onmessage slot poisoned") = Some(handler);
    }

    async fn onmessage(&self, message: JsonRpcMessage) {
        // Clone the handler out of the guard; it must not be held across
        // the await below.
        match self.handler() {
            Some(handler) => handler(message).await,
            None => {
                error!("onmessage invoked before a server connected; dropping message");
            }
        }
    }
}
