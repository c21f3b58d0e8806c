//! AppBuilder - wiring and startup validation.
//!
//! # Fail-fast
//! - `expect_schemas()` lists the `type/version` pairs the deployment must
//!   understand
//! - `build()` checks "expected ⊆ registered" and refuses to start otherwise

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::app::consumer::{ConsumerError, ConsumerOptions, QueueConsumer};
use crate::app::processor::MessageProcessor;
use crate::domain::decision::Decider;
use crate::ports::{IdGenerator, QueueTransport, RecordStore};
use crate::schema::{EventPayload, SchemaRegistry};

/// ```ignore
/// let app = AppBuilder::new()
///     .with_builtin_schemas()
///     .expect_schemas(&["user.created/v1"])
///     .options(options)
///     .build(transport, store)?;
/// app.run(&cancel).await;
/// ```
pub struct AppBuilder {
    registry: SchemaRegistry,
    expected_schemas: Option<Vec<String>>,
    options: ConsumerOptions,
    decider: Option<Arc<dyn Decider>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing schemas: {0:?}. These schemas were expected but not registered.")]
    MissingSchemas(Vec<String>),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: SchemaRegistry::new(),
            expected_schemas: None,
            options: ConsumerOptions::default(),
            decider: None,
            ids: None,
        }
    }

    pub fn with_builtin_schemas(mut self) -> Self {
        self.registry = SchemaRegistry::builtin();
        self
    }

    pub fn register<T: EventPayload>(mut self) -> Self {
        self.registry.register::<T>();
        self
    }

    pub fn register_as<T: EventPayload>(mut self, event_type: &str, version: &str) -> Self {
        self.registry.register_as::<T>(event_type, version);
        self
    }

    /// Pairs written as `type/version`, e.g. `order.placed/v1`.
    pub fn expect_schemas(mut self, schemas: &[&str]) -> Self {
        self.expected_schemas = Some(schemas.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn options(mut self, options: ConsumerOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the default backoff decider.
    pub fn decider(mut self, decider: Arc<dyn Decider>) -> Self {
        self.decider = Some(decider);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(
        self,
        transport: Arc<dyn QueueTransport>,
        store: Arc<dyn RecordStore>,
    ) -> Result<App, BuildError> {
        if let Some(expected) = &self.expected_schemas {
            let registered = self.registry.registered_schemas();
            let missing: Vec<String> = expected
                .iter()
                .filter(|schema| !registered.contains(schema))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingSchemas(missing));
            }
        }

        let mut processor = MessageProcessor::new(Arc::new(self.registry), store);
        if let Some(ids) = self.ids {
            processor = processor.with_id_generator(ids);
        }

        let mut consumer = QueueConsumer::new(transport, self.options);
        if let Some(decider) = self.decider {
            consumer = consumer.with_decider(decider);
        }

        Ok(App {
            consumer,
            processor: Arc::new(processor),
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A wired consumer and processor.
pub struct App {
    consumer: QueueConsumer,
    processor: Arc<MessageProcessor>,
}

impl App {
    pub fn consumer(&self) -> &QueueConsumer {
        &self.consumer
    }

    pub fn processor(&self) -> &MessageProcessor {
        &self.processor
    }

    /// Consume until `cancel` fires.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), ConsumerError> {
        tracing::info!(
            schemas = ?self.processor.registry().registered_schemas(),
            "starting consumer"
        );
        self.consumer.read(cancel, Arc::clone(&self.processor)).await
    }
}
