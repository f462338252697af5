//! Event bus

use crate::event::{
    DynEventHandler, Event, EventHandler, EventHandlerError, FnEventHandler, TypedEventHandler,
};
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// In-process publish/subscribe bus.
///
/// Handlers for an event type run one after another in subscription order,
/// and `publish` returns only once all of them have finished. Cloning the
/// bus shares its subscriptions.
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<DashMap<TypeId, Vec<Arc<dyn DynEventHandler>>>>,
    config: Arc<EventBusConfig>,
}

/// Event bus configuration
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Run the remaining handlers after one fails and report success
    pub continue_on_error: bool,

    /// Emit debug records for subscriptions and publications
    pub enable_logging: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            enable_logging: true,
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            handlers: Arc::new(DashMap::new()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Subscribe a type-erased handler to events of type `E`
    pub fn subscribe<E, H>(&self, handler: H)
    where
        E: Event,
        H: DynEventHandler + 'static,
    {
        let type_id = TypeId::of::<E>();
        self.handlers
            .entry(type_id)
            .or_default()
            .push(Arc::new(handler));

        if self.config.enable_logging {
            debug!(event_type = std::any::type_name::<E>(), "Subscribed handler");
        }
    }

    /// Subscribe a typed [`EventHandler`]
    pub fn subscribe_handler<E, H>(&self, handler: H)
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        self.subscribe::<E, _>(TypedEventHandler::new(handler));
    }

    /// Subscribe a closure
    ///
    /// ```rust
    /// use envtenant_events::{EventBus, EventMetadata, impl_event};
    ///
    /// #[derive(Debug, Clone)]
    /// struct Provisioned { metadata: EventMetadata }
    /// impl_event!(Provisioned);
    ///
    /// let bus = EventBus::new();
    /// bus.on(|event: &Provisioned| {
    ///     println!("{}", event.metadata.name);
    ///     Ok(())
    /// });
    /// assert_eq!(bus.handler_count::<Provisioned>(), 1);
    /// ```
    pub fn on<E, F>(&self, f: F)
    where
        E: Event,
        F: Fn(&E) -> Result<(), EventHandlerError> + Send + Sync + 'static,
    {
        self.subscribe_handler::<E, _>(FnEventHandler::new(f));
    }

    /// Deliver `event` to every handler subscribed to its type.
    ///
    /// Fails with [`EventBusError::HandlerFailed`] on the first handler error
    /// unless `continue_on_error` is set, in which case errors are only logged.
    pub async fn publish<E: Event>(&self, event: E) -> Result<(), EventBusError> {
        let type_id = TypeId::of::<E>();

        // Snapshot so no map guard is held across an await.
        let handlers = match self.handlers.get(&type_id) {
            Some(handlers) => handlers.clone(),
            None => {
                if self.config.enable_logging {
                    trace!(event = event.event_name(), "No handlers registered");
                }
                return Ok(());
            }
        };

        if self.config.enable_logging {
            debug!(
                event = event.event_name(),
                event_id = %event.event_id(),
                handlers = handlers.len(),
                "Publishing event"
            );
        }

        for handler in handlers.iter() {
            if let Err(e) = handler.handle_dyn(&event).await {
                error!(event = event.event_name(), error = %e, "Event handler failed");
                if !self.config.continue_on_error {
                    return Err(EventBusError::HandlerFailed {
                        event: event.event_name().to_string(),
                        source: e,
                    });
                }
            }
        }

        Ok(())
    }

    /// Remove all handlers for an event type
    pub fn unsubscribe<E: Event>(&self) {
        self.handlers.remove(&TypeId::of::<E>());

        if self.config.enable_logging {
            debug!(event_type = std::any::type_name::<E>(), "Unsubscribed handlers");
        }
    }

    /// Remove every handler
    pub fn clear(&self) {
        self.handlers.clear();
    }

    pub fn handler_count<E: Event>(&self) -> usize {
        self.handlers
            .get(&TypeId::of::<E>())
            .map(|h| h.len())
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.handlers.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Event bus errors
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Handler for '{event}' failed: {source}")]
    HandlerFailed {
        event: String,
        #[source]
        source: EventHandlerError,
    },
}

/// Event bus builder
#[derive(Default)]
pub struct EventBusBuilder {
    config: EventBusConfig,
}

impl EventBusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.config.continue_on_error = enabled;
        self
    }

    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    pub fn build(self) -> EventBus {
        EventBus::with_config(self.config)
    }
}
