//! Notification bus for envtenant.
//!
//! Other subsystems learn about tenant resolution by subscribing to typed
//! events. Publication is sequential: `publish` awaits every handler in
//! subscription order before it returns, so a subscriber observes a fully
//! switched connection context, and a failing subscriber can abort the
//! operation that raised the event.
//!
//! ## Quick Start
//!
//! ```rust
//! use envtenant_events::*;
//! use async_trait::async_trait;
//!
//! #[derive(Debug, Clone)]
//! struct SchemaChecked {
//!     metadata: EventMetadata,
//!     connection: String,
//! }
//!
//! impl_event!(SchemaChecked);
//!
//! #[derive(Clone)]
//! struct Auditor;
//!
//! #[async_trait]
//! impl EventHandler<SchemaChecked> for Auditor {
//!     async fn handle(&self, event: &SchemaChecked) -> Result<(), EventHandlerError> {
//!         println!("schema checked on {}", event.connection);
//!         Ok(())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let bus = EventBus::new();
//! bus.subscribe_handler::<SchemaChecked, _>(Auditor);
//!
//! bus.publish(SchemaChecked {
//!     metadata: EventMetadata::new("schema.checked"),
//!     connection: "acme_db".to_string(),
//! })
//! .await
//! .unwrap();
//! # });
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use envtenant_events::*;
//!
//! # #[derive(Debug, Clone)]
//! # struct SchemaChecked { metadata: EventMetadata }
//! # impl_event!(SchemaChecked);
//! # tokio_test::block_on(async {
//! let bus = EventBusBuilder::new().continue_on_error(false).build();
//! bus.on(|_: &SchemaChecked| Err(EventHandlerError::Rejected("read-only".into())));
//!
//! let event = SchemaChecked { metadata: EventMetadata::new("schema.checked") };
//! match bus.publish(event).await {
//!     Ok(()) => println!("All handlers succeeded"),
//!     Err(EventBusError::HandlerFailed { event, source }) => {
//!         eprintln!("{} aborted: {}", event, source);
//!     }
//! }
//! # });
//! ```

pub mod bus;
pub mod event;

pub use bus::{EventBus, EventBusBuilder, EventBusConfig, EventBusError};
pub use event::{
    DynEventHandler, Event, EventHandler, EventHandlerError, EventMetadata, FnEventHandler,
    TypedEventHandler,
};

#[doc(hidden)]
pub mod __private {
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}
