//! Event definitions and handler traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;
use std::marker::PhantomData;
use uuid::Uuid;

/// Something that can be published on an [`EventBus`](crate::EventBus).
///
/// Types carrying an [`EventMetadata`] field named `metadata` can use
/// [`impl_event!`](crate::impl_event) instead of writing this by hand.
pub trait Event: Send + Sync + Debug + 'static {
    fn event_name(&self) -> &str;

    fn event_id(&self) -> Uuid;

    fn timestamp(&self) -> DateTime<Utc>;

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;

    fn clone_event(&self) -> Box<dyn Event>;
}

/// Identity and timing shared by every event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub id: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    /// Ties together the events raised for one unit of work
    pub correlation_id: Option<Uuid>,
}

impl EventMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            timestamp: Utc::now(),
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }
}

/// Implement [`Event`] for a `Clone + Debug` struct with a `metadata: EventMetadata` field.
#[macro_export]
macro_rules! impl_event {
    ($ty:ty) => {
        impl $crate::Event for $ty {
            fn event_name(&self) -> &str {
                &self.metadata.name
            }

            fn event_id(&self) -> $crate::__private::Uuid {
                self.metadata.id
            }

            fn timestamp(&self) -> $crate::__private::DateTime<$crate::__private::Utc> {
                self.metadata.timestamp
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn clone_event(&self) -> ::std::boxed::Box<dyn $crate::Event> {
                ::std::boxed::Box::new(::std::clone::Clone::clone(self))
            }
        }
    };
}

/// Handler for one event type
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    async fn handle(&self, event: &E) -> Result<(), EventHandlerError>;
}

/// Error returned by a handler.
///
/// `Rejected` means the subscriber refuses the operation the event announces
/// and the publisher should abort it.
#[derive(Debug, thiserror::Error)]
pub enum EventHandlerError {
    #[error("Rejected by subscriber: {0}")]
    Rejected(String),

    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Handler received unexpected event type: {0}")]
    TypeMismatch(String),
}

/// Type-erased event handler
#[async_trait]
pub trait DynEventHandler: Send + Sync {
    async fn handle_dyn(&self, event: &dyn Event) -> Result<(), EventHandlerError>;
}

/// Adapts an [`EventHandler<E>`] into a [`DynEventHandler`]
pub struct TypedEventHandler<E: Event, H: EventHandler<E>> {
    handler: H,
    _phantom: PhantomData<fn(E)>,
}

impl<E: Event, H: EventHandler<E>> TypedEventHandler<E, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<E: Event, H: EventHandler<E> + 'static> DynEventHandler for TypedEventHandler<E, H> {
    async fn handle_dyn(&self, event: &dyn Event) -> Result<(), EventHandlerError> {
        match event.as_any().downcast_ref::<E>() {
            Some(typed_event) => self.handler.handle(typed_event).await,
            None => Err(EventHandlerError::TypeMismatch(
                event.event_name().to_string(),
            )),
        }
    }
}

/// Synchronous closure handler
pub struct FnEventHandler<E, F> {
    f: F,
    _phantom: PhantomData<fn(E)>,
}

impl<E, F> FnEventHandler<E, F>
where
    E: Event,
    F: Fn(&E) -> Result<(), EventHandlerError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<E, F> EventHandler<E> for FnEventHandler<E, F>
where
    E: Event,
    F: Fn(&E) -> Result<(), EventHandlerError> + Send + Sync,
{
    async fn handle(&self, event: &E) -> Result<(), EventHandlerError> {
        (self.f)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Provisioned {
        metadata: EventMetadata,
        tenant_id: u64,
    }

    crate::impl_event!(Provisioned);

    #[derive(Debug, Clone)]
    struct Archived {
        metadata: EventMetadata,
    }

    crate::impl_event!(Archived);

    #[test]
    fn test_event_metadata() {
        let correlation = Uuid::new_v4();
        let metadata = EventMetadata::new("tenant.provisioned").with_correlation_id(correlation);

        assert_eq!(metadata.name, "tenant.provisioned");
        assert_eq!(metadata.correlation_id, Some(correlation));
    }

    #[test]
    fn test_impl_event_macro() {
        let event = Provisioned {
            metadata: EventMetadata::new("tenant.provisioned"),
            tenant_id: 7,
        };

        assert_eq!(event.event_name(), "tenant.provisioned");
        assert_eq!(event.event_id(), event.metadata.id);

        let cloned = event.clone_event();
        let back = cloned.as_any().downcast_ref::<Provisioned>().unwrap();
        assert_eq!(back.tenant_id, 7);
    }

    #[tokio::test]
    async fn test_typed_handler_rejects_other_types() {
        let handler = TypedEventHandler::new(FnEventHandler::new(|_: &Provisioned| Ok(())));
        let other = Archived {
            metadata: EventMetadata::new("tenant.archived"),
        };

        let result = handler.handle_dyn(&other).await;
        assert!(matches!(result, Err(EventHandlerError::TypeMismatch(name)) if name == "tenant.archived"));
    }

    #[tokio::test]
    async fn test_fn_handler() {
        let handler = FnEventHandler::new(|event: &Provisioned| {
            if event.tenant_id == 0 {
                Err(EventHandlerError::Rejected("tenant 0 is reserved".into()))
            } else {
                Ok(())
            }
        });

        let ok = Provisioned {
            metadata: EventMetadata::new("tenant.provisioned"),
            tenant_id: 1,
        };
        let reserved = Provisioned {
            metadata: EventMetadata::new("tenant.provisioned"),
            tenant_id: 0,
        };

        assert!(handler.handle(&ok).await.is_ok());
        assert!(matches!(
            handler.handle(&reserved).await,
            Err(EventHandlerError::Rejected(_))
        ));
    }
}
