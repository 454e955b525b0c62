use crate::message::Message;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;

/// Multi-producer queue of messages awaiting a system's next tick.
pub struct Mailbox {
    sender: Sender<Arc<Message>>,
    receiver: Receiver<Arc<Message>>,
}

impl Mailbox {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn push(&self, message: Arc<Message>) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.sender.send(message);
    }

    /// Messages queued so far, oldest first. Messages pushed while draining
    /// wait for the next drain.
    pub(crate) fn drain(&self) -> impl Iterator<Item = Arc<Message>> + '_ {
        let pending = self.receiver.len();
        self.receiver.try_iter().take(pending)
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SystemRouter;

    #[test]
    fn drain_preserves_order() {
        let mailbox = Mailbox::new();
        for id in 0..4 {
            mailbox.push(Arc::new(Message::new(id, SystemRouter::new(0))));
        }
        let ids: Vec<_> = mailbox.drain().map(|message| message.id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn pushes_during_drain_wait_for_next_drain() {
        let mailbox = Mailbox::new();
        mailbox.push(Arc::new(Message::new(1, SystemRouter::new(0))));

        let mut seen = Vec::new();
        for message in mailbox.drain() {
            seen.push(message.id());
            mailbox.push(Arc::new(Message::new(2, SystemRouter::new(0))));
        }
        assert_eq!(seen, vec![1]);
        assert_eq!(mailbox.len(), 1);
    }
}
