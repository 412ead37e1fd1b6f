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

//! Observer registry for inbound messages.
//!
//! Observers are registered under exactly one fixed category and fire for
//! every inbound message matching that category, in registration order,
//! independent of request/response correlation. There is no unregistration;
//! observers live as long as the session.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::trace;

use crate::protocol::schema::is_progress_notification;
use crate::protocol::JsonRpcMessage;

/// Fixed observer categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverCategory {
    /// Every inbound notification (responses and error responses excluded).
    Notification,
    /// Every inbound error response.
    Error,
    /// Every inbound notification matching the progress-update shape.
    Progress,
}

type ObserverFn = Box<dyn Fn(&JsonRpcMessage) + Send + Sync>;

/// Registry keyed by category, each slot holding an ordered sequence of
/// observer callbacks.
#[derive(Default)]
pub struct NotificationRouter {
    registry: Mutex<HashMap<ObserverCategory, Vec<ObserverFn>>>,
}

impl NotificationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer under the given category.
    pub fn register(
        &self,
        category: ObserverCategory,
        observer: impl Fn(&JsonRpcMessage) + Send + Sync + 'static,
    ) {
        self.registry
            .lock()
            .expect("observer registry poisoned")
            .entry(category)
            .or_default()
            .push(Box::new(observer));
    }

    /// Fan an inbound message out to every observer whose category matches.
    /// Dispatch is synchronous and happens for every message, whether or not
    /// it also resolves a pending request.
    pub fn dispatch(&self, message: &JsonRpcMessage) {
        for category in Self::categories_for(message) {
            let registry = self.registry.lock().expect("observer registry poisoned");
            if let Some(observers) = registry.get(&category) {
                trace!(?category, count = observers.len(), "dispatching to observers");
                for observer in observers {
                    observer(message);
                }
            }
        }
    }

    fn categories_for(message: &JsonRpcMessage) -> Vec<ObserverCategory> {
        match message {
            JsonRpcMessage::Notification(n) => {
                let mut matched = vec![ObserverCategory::Notification];
                if is_progress_notification(n) {
                    matched.push(ObserverCategory::Progress);
                }
                matched
            }
            JsonRpcMessage::Error(_) => vec![ObserverCategory::Error],
            JsonRpcMessage::Request(_) | JsonRpcMessage::Response(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::INTERNAL_ERROR;
    use crate::protocol::schema::methods;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_observer(counter: &Arc<AtomicUsize>) -> impl Fn(&JsonRpcMessage) + Send + Sync {
        let counter = counter.clone();
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn notification_reaches_notification_observers_only() {
        let router = NotificationRouter::new();
        let notif_count = Arc::new(AtomicUsize::new(0));
        let error_count = Arc::new(AtomicUsize::new(0));
        router.register(ObserverCategory::Notification, counter_observer(&notif_count));
        router.register(ObserverCategory::Error, counter_observer(&error_count));

        router.dispatch(&JsonRpcMessage::notification(
            methods::LOG_MESSAGE,
            json!({"level": "info"}),
        ));

        assert_eq!(notif_count.load(Ordering::SeqCst), 1);
        assert_eq!(error_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn error_response_reaches_error_observers() {
        let router = NotificationRouter::new();
        let error_count = Arc::new(AtomicUsize::new(0));
        router.register(ObserverCategory::Error, counter_observer(&error_count));

        router.dispatch(&JsonRpcMessage::error(1, INTERNAL_ERROR, "boom"));
        assert_eq!(error_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn progress_shaped_notification_reaches_both_categories() {
        let router = NotificationRouter::new();
        let notif_count = Arc::new(AtomicUsize::new(0));
        let progress_count = Arc::new(AtomicUsize::new(0));
        router.register(ObserverCategory::Notification, counter_observer(&notif_count));
        router.register(ObserverCategory::Progress, counter_observer(&progress_count));

        router.dispatch(&JsonRpcMessage::notification(
            methods::PROGRESS,
            json!({"progressToken": 1, "progress": 2, "total": 10}),
        ));

        assert_eq!(notif_count.load(Ordering::SeqCst), 1);
        assert_eq!(progress_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn progress_observer_ignores_non_progress_notifications() {
        let router = NotificationRouter::new();
        let progress_count = Arc::new(AtomicUsize::new(0));
        router.register(ObserverCategory::Progress, counter_observer(&progress_count));

        router.dispatch(&JsonRpcMessage::notification(
            methods::LOG_MESSAGE,
            json!({"level": "info"}),
        ));
        assert_eq!(progress_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn plain_response_reaches_no_observers() {
        let router = NotificationRouter::new();
        let count = Arc::new(AtomicUsize::new(0));
        router.register(ObserverCategory::Notification, counter_observer(&count));
        router.register(ObserverCategory::Error, counter_observer(&count));
        router.register(ObserverCategory::Progress, counter_observer(&count));

        router.dispatch(&JsonRpcMessage::response(1, json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn observers_fire_in_registration_order() {
        let router = NotificationRouter::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            router.register(ObserverCategory::Notification, move |_| {
                order.lock().unwrap().push(tag);
            });
        }

        router.dispatch(&JsonRpcMessage::notification(methods::LOG_MESSAGE, json!({})));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }
}
