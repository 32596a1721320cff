//! Message Bus Port - Role-addressed Asynchronous Delivery
//!
//! Defines the send-side trait for the bus that carries structured
//! envelopes between named roles. Delivery is at-most-once with no
//! ordering guarantee across senders; a send failure is the sender's
//! problem to log, never to escalate.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::message::{BusAddress, BusMessage};

/// Receive side of one address's mailbox.
pub type Mailbox = mpsc::Receiver<BusMessage>;

/// Trait for bus send handles.
///
/// Implementors own the address→mailbox routing. The in-process adapter
/// backs each address with a bounded tokio channel; a remote adapter
/// would put a wire protocol behind the same trait.
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    /// Deliver a message to the given address.
    ///
    /// Fails when the address is unknown, its mailbox is full, or the
    /// receiver is gone. At-most-once: a failed send is not retried.
    async fn send(&self, to: BusAddress, msg: BusMessage) -> anyhow::Result<()>;
}

/// Receive with a bounded wait.
///
/// A timeout is not an error; it ends the cycle with no message
/// processed. Returns `None` on timeout or when the channel is closed.
pub async fn recv_timeout(mailbox: &mut Mailbox, timeout: Duration) -> Option<BusMessage> {
    match tokio::time::timeout(timeout, mailbox.recv()).await {
        Ok(msg) => msg,
        Err(_) => None,
    }
}
