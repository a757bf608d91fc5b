// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-class message handlers.
//!
//! A [`DispatchRegistry`] is assembled with [`DispatchRegistryBuilder`] before
//! the sync engine starts and cannot change afterwards. Classes without a
//! handler are dropped at trace level.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use subarchive_core::{ArchiveError, Channel, ClassifiedMessage, MessageClass};

/// Caller-supplied reaction to one class of message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(
        &self,
        channel: &Channel,
        message: &ClassifiedMessage,
    ) -> Result<(), ArchiveError>;
}

/// Accumulates handlers; registering a class twice keeps the last handler.
#[derive(Default)]
pub struct DispatchRegistryBuilder {
    handlers: HashMap<MessageClass, Arc<dyn MessageHandler>>,
}

impl DispatchRegistryBuilder {
    pub fn on(mut self, class: MessageClass, handler: Arc<dyn MessageHandler>) -> Self {
        self.handlers.insert(class, handler);
        self
    }

    pub fn build(self) -> DispatchRegistry {
        DispatchRegistry {
            handlers: self.handlers,
        }
    }
}

/// Immutable mapping from message class to handler.
pub struct DispatchRegistry {
    handlers: HashMap<MessageClass, Arc<dyn MessageHandler>>,
}

impl DispatchRegistry {
    pub fn builder() -> DispatchRegistryBuilder {
        DispatchRegistryBuilder::default()
    }

    /// Whether a handler is registered for `class`.
    pub fn handles(&self, class: MessageClass) -> bool {
        self.handlers.contains_key(&class)
    }

    /// Registered classes in declaration order.
    pub fn classes(&self) -> Vec<MessageClass> {
        MessageClass::ALL
            .into_iter()
            .filter(|class| self.handles(*class))
            .collect()
    }

    /// Hand `message` to its class handler.
    ///
    /// Returns `Ok(false)` when no handler is registered.
    pub async fn dispatch(
        &self,
        channel: &Channel,
        message: &ClassifiedMessage,
    ) -> Result<bool, ArchiveError> {
        let Some(handler) = self.handlers.get(&message.class) else {
            trace!(
                channel = %channel.name,
                msg_id = message.message.id,
                class = %message.class,
                "no handler registered, dropping"
            );
            return Ok(false);
        };
        handler.handle(channel, message).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subarchive_test_utils::fixtures;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, i32)>>,
    }

    #[async_trait]
    impl MessageHandler for Recorder {
        async fn handle(
            &self,
            channel: &Channel,
            message: &ClassifiedMessage,
        ) -> Result<(), ArchiveError> {
            self.seen
                .lock()
                .await
                .push((channel.name.clone(), message.message.id));
            Ok(())
        }
    }

    fn note(id: i32) -> ClassifiedMessage {
        ClassifiedMessage {
            class: MessageClass::Note,
            file_name: String::new(),
            file_size: 0,
            location: None,
            message: fixtures::note(1, id, 1_710_000_000, "hi"),
        }
    }

    #[tokio::test]
    async fn dispatch_reaches_registered_handler() {
        let recorder = Arc::new(Recorder::default());
        let registry = DispatchRegistry::builder()
            .on(MessageClass::Note, recorder.clone())
            .build();

        let handled = registry
            .dispatch(&fixtures::channel("foo", 1), &note(3))
            .await
            .unwrap();

        assert!(handled);
        assert_eq!(*recorder.seen.lock().await, vec![("foo".to_string(), 3)]);
    }

    #[tokio::test]
    async fn unregistered_class_is_dropped_without_error() {
        let registry = DispatchRegistry::builder().build();
        let handled = registry
            .dispatch(&fixtures::channel("foo", 1), &note(3))
            .await
            .unwrap();
        assert!(!handled);
    }

    #[test]
    fn classes_lists_registered_in_order() {
        let recorder = Arc::new(Recorder::default());
        let registry = DispatchRegistry::builder()
            .on(MessageClass::Video, recorder.clone())
            .on(MessageClass::Note, recorder)
            .build();
        assert_eq!(
            registry.classes(),
            vec![MessageClass::Note, MessageClass::Video]
        );
        assert!(!registry.handles(MessageClass::Photo));
    }
}
