//! Software bus seam
//!
//! The engine never touches the bus directly; the host receives one
//! message at a time through this trait and feeds it to dispatch. The
//! only blocking point in the whole application is `receive`.
//!
//! [`MemoryBus`] is the in-memory double used by the integration tests:
//! a scripted inbound queue and a transcript of transmitted telemetry.

use std::collections::VecDeque;

use limitguard_core::MessageId;
use thiserror::Error;

/// Bus-level failures; any of these terminates the application loop
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus pipe was closed by the host
    #[error("bus pipe closed")]
    Closed,

    /// The receive call itself failed
    #[error("bus receive failed: {0}")]
    Receive(String),

    /// A message arrived without a decodable envelope
    #[error("malformed bus envelope")]
    Malformed,
}

/// One received bus message: identifier plus owned payload bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Envelope message identifier
    pub message_id: MessageId,
    /// Payload bytes, offsets as the watchpoint table sees them
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Convenience constructor
    pub fn new(message_id: MessageId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            message_id,
            payload: payload.into(),
        }
    }
}

/// The software bus as the application sees it
pub trait SoftwareBus {
    /// Block until the next message arrives
    fn receive(&mut self) -> Result<BusMessage, BusError>;

    /// Transmit one housekeeping payload
    fn transmit_hk(&mut self, payload: &[u8]) -> Result<(), BusError>;
}

/// Scripted in-memory bus for tests
#[derive(Debug, Default)]
pub struct MemoryBus {
    inbound: VecDeque<BusMessage>,
    /// Every housekeeping payload transmitted, in order
    pub transmitted: Vec<Vec<u8>>,
}

impl MemoryBus {
    /// An empty bus; `receive` reports closed immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for the application to receive
    pub fn push(&mut self, message: BusMessage) {
        self.inbound.push_back(message);
    }

    /// A bus pre-loaded with a message script
    pub fn from_messages(messages: impl IntoIterator<Item = BusMessage>) -> Self {
        Self {
            inbound: messages.into_iter().collect(),
            transmitted: Vec::new(),
        }
    }
}

impl SoftwareBus for MemoryBus {
    fn receive(&mut self) -> Result<BusMessage, BusError> {
        self.inbound.pop_front().ok_or(BusError::Closed)
    }

    fn transmit_hk(&mut self, payload: &[u8]) -> Result<(), BusError> {
        self.transmitted.push(payload.to_vec());
        Ok(())
    }
}
