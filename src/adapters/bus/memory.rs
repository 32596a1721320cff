//! In-process Message Bus - Role-addressed Mailboxes
//!
//! Backs each bus address with a bounded tokio mpsc channel. Registration
//! happens once during wiring, before the bus handle is shared; after
//! that the routing table is immutable and sends are lock-free.
//!
//! Delivery semantics match the port contract: at-most-once, no ordering
//! across senders, a full or closed mailbox fails the send and the
//! message is gone.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::message::{BusAddress, BusMessage};
use crate::ports::bus::{Mailbox, MessageBus};

/// In-process bus with one bounded mailbox per registered address.
pub struct MemoryBus {
    senders: HashMap<BusAddress, mpsc::Sender<BusMessage>>,
    capacity: usize,
}

impl MemoryBus {
    /// Create an empty bus with the given per-mailbox capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: HashMap::new(),
            capacity,
        }
    }

    /// Register an address and return its mailbox.
    ///
    /// Registering the same address twice replaces the previous mailbox;
    /// wiring code registers each address exactly once.
    pub fn register(&mut self, address: BusAddress) -> Mailbox {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.senders.insert(address, tx);
        rx
    }

    /// Addresses currently routable.
    pub fn addresses(&self) -> impl Iterator<Item = &BusAddress> {
        self.senders.keys()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn send(&self, to: BusAddress, msg: BusMessage) -> anyhow::Result<()> {
        let sender = self
            .senders
            .get(&to)
            .ok_or_else(|| anyhow::anyhow!("no mailbox registered for address '{to}'"))?;

        // try_send keeps delivery at-most-once: a full mailbox means the
        // receiver is behind and the message is dropped, not queued
        // forever.
        sender
            .try_send(msg)
            .map_err(|e| anyhow::anyhow!("failed to deliver to '{to}': {e}"))?;

        debug!(destination = %to, "Message delivered");
        Ok(())
    }
}
