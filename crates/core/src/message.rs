// SPDX-License-Identifier: MIT

//! Bus-transported envelope carrying a materialized process definition and
//! its idempotency key.

use crate::model::ProcessDefinition;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope published by the producer and consumed by the consumer.
///
/// `uuid` is the idempotency key: the consumer's processed-messages table
/// is keyed on it, so re-delivery of the same message is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub uuid: Uuid,
    #[serde(rename = "processDefinition")]
    pub definition: ProcessDefinition,
}

impl Message {
    pub fn new(definition: ProcessDefinition) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            definition,
        }
    }
}
