//! Messages exchanged between vehicles and zone managers.
//!
//! Every message names its source and destination. The transport is external:
//! a [Mailbox] is filled by the caller before a tick and drained after it.

use std::collections::VecDeque;

pub mod i2v;
pub mod v2i;

/// A vehicle's message buffers.
#[derive(Clone, Debug)]
pub struct Mailbox<I, O> {
    /// Messages received from the manager, oldest first.
    inbox: VecDeque<I>,
    /// Messages to be transmitted to the manager, oldest first.
    outbox: Vec<O>,
}

impl<I, O> Default for Mailbox<I, O> {
    fn default() -> Self {
        Self {
            inbox: VecDeque::new(),
            outbox: vec![],
        }
    }
}

impl<I, O> Mailbox<I, O> {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers an inbound message.
    pub fn deliver(&mut self, msg: I) {
        self.inbox.push_back(msg);
    }

    /// The number of inbound messages not yet processed.
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Removes and returns all inbound messages in arrival order.
    pub(crate) fn drain_inbox(&mut self) -> Vec<I> {
        self.inbox.drain(..).collect()
    }

    /// Queues an outbound message.
    pub(crate) fn send(&mut self, msg: O) {
        self.outbox.push(msg);
    }

    /// The outbound messages not yet taken.
    pub fn outbox(&self) -> &[O] {
        &self.outbox
    }

    /// Takes all outbound messages for transmission.
    pub fn take_outbox(&mut self) -> Vec<O> {
        std::mem::take(&mut self.outbox)
    }
}

/// The kind of a message, for logging.
pub trait MessageKind {
    fn kind(&self) -> &'static str;
}

impl MessageKind for std::convert::Infallible {
    fn kind(&self) -> &'static str {
        match *self {}
    }
}
