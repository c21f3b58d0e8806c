//! MessageProcessor - envelope → validated event → outcome record.
//!
//! # Flow
//! 1. Decode the header from the envelope body (no record on failure)
//! 2. Build the record skeleton with a fresh id
//! 3. Check the header, then resolve and validate the body through the registry
//! 4. Save exactly one record: `failed` on a rejected message, `processed`
//!    otherwise
//!
//! Rejections are non-retriable. Storage failures are retriable: redelivery
//! is the only way to get the record written.

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::handler::{MessageContext, MessageHandler};
use crate::domain::envelope::Envelope;
use crate::domain::errors::{FailureCause, ProcessError};
use crate::domain::header::MessageHeader;
use crate::domain::record::OutcomeRecord;
use crate::ports::{IdGenerator, RecordStore, SystemClock, UlidGenerator};
use crate::schema::SchemaRegistry;

pub struct MessageProcessor {
    registry: Arc<SchemaRegistry>,
    store: Arc<dyn RecordStore>,
    ids: Arc<dyn IdGenerator>,
}

impl MessageProcessor {
    pub fn new(registry: Arc<SchemaRegistry>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            registry,
            store,
            ids: Arc::new(UlidGenerator::new(SystemClock)),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub async fn process(
        &self,
        ctx: &MessageContext,
        envelope: &Envelope,
    ) -> Result<(), ProcessError> {
        let header = match MessageHeader::from_slice(envelope.body()) {
            Ok(header) => header,
            Err(err) => {
                ctx.append(format!("header decode failed: {err}"));
                return Err(ProcessError::non_retriable(FailureCause::MalformedHeader(
                    err,
                )));
            }
        };
        ctx.append(format!(
            "event {} type {}/{} tenant {} client {}",
            header.event_id,
            header.event_type,
            header.schema_version,
            header.tenant_id,
            header.client_id
        ));

        let record = OutcomeRecord::from_header(self.ids.generate_record_id(), &header);

        if !header.is_valid() {
            return self.reject(ctx, record, FailureCause::InvalidHeader).await;
        }

        match self.registry.unmarshal(
            &header.event_type,
            &header.schema_version,
            header.body_text().as_bytes(),
        ) {
            Ok(event) => ctx.append(format!(
                "body valid as {}/{}",
                event.event_type(),
                event.schema_version()
            )),
            Err(err) => return self.reject(ctx, record, FailureCause::Schema(err)).await,
        }

        if let Err(err) = self.store.save(&record).await {
            ctx.append(format!("save failed: {err}"));
            return Err(ProcessError::retriable(FailureCause::Storage(err)));
        }
        ctx.append(format!("saved {} as {}", record.id, record.status.as_str()));

        Ok(())
    }

    /// Persist a `failed` record for a message that will not be retried.
    async fn reject(
        &self,
        ctx: &MessageContext,
        mut record: OutcomeRecord,
        cause: FailureCause,
    ) -> Result<(), ProcessError> {
        ctx.append(format!("rejected: {cause}"));
        record.mark_failed();

        match self.store.save(&record).await {
            Ok(()) => {
                ctx.append(format!("saved {} as {}", record.id, record.status.as_str()));
                Err(ProcessError::non_retriable(cause))
            }
            Err(source) => {
                ctx.append(format!("save failed: {source}"));
                Err(ProcessError::retriable(FailureCause::FailureRecordNotSaved {
                    source,
                    original: Box::new(cause),
                }))
            }
        }
    }
}

#[async_trait]
impl MessageHandler for MessageProcessor {
    async fn handle(&self, ctx: &MessageContext, envelope: &Envelope) -> Result<(), ProcessError> {
        self.process(ctx, envelope).await
    }
}
