//! The pending-message queue with debounce tracking and coalescing.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uplink_types::{Message, MessageId, ObjectKey, Timestamp};

/// Ordered buffer of change-events awaiting batching.
///
/// Messages keep insertion order. Each enqueue resets the debounce clock;
/// the engine only drains the queue once the configured quiet period has
/// elapsed. Ids come from a counter owned by the queue and are strictly
/// increasing for the lifetime of the engine.
#[derive(Debug)]
pub struct MessageQueue {
    messages: VecDeque<Message>,
    next_id: u64,
    clock: Timestamp,
    last_enqueue: Option<Instant>,
}

impl MessageQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            next_id: 1,
            clock: Timestamp::now(),
            last_enqueue: None,
        }
    }

    /// Appends a change-event and resets the debounce clock.
    pub fn enqueue(&mut self, payload: impl Into<String>, object: ObjectKey) -> MessageId {
        let id = MessageId::new(self.next_id);
        self.next_id += 1;
        self.clock = self.clock.tick();

        self.messages
            .push_back(Message::new(id, object, payload, self.clock));
        self.last_enqueue = Some(Instant::now());

        debug!("queued message {id} for object {object}");
        id
    }

    /// Number of pending messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates the pending messages in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Whether the debounce window has closed as of `now`.
    ///
    /// True when no enqueue has happened yet or the quiet period since the
    /// most recent enqueue has reached `window`.
    #[must_use]
    pub fn debounce_expired(&self, window: Duration, now: Instant) -> bool {
        match self.last_enqueue {
            Some(last) => now.saturating_duration_since(last) >= window,
            None => true,
        }
    }

    /// Coalesces the queue: for every object key, only the most recently
    /// enqueued message survives.
    ///
    /// The survivor is the message with the greatest `(enqueued_at, id)`;
    /// on identical timestamps the higher id (the later insertion) wins.
    /// Running this twice without an intervening enqueue is a no-op.
    pub fn normalize(&mut self) {
        let mut newest: HashMap<ObjectKey, (Timestamp, MessageId)> = HashMap::new();
        for msg in &self.messages {
            let candidate = (msg.enqueued_at, msg.id);
            newest
                .entry(msg.object)
                .and_modify(|best| {
                    if candidate > *best {
                        *best = candidate;
                    }
                })
                .or_insert(candidate);
        }

        let before = self.messages.len();
        self.messages
            .retain(|msg| newest[&msg.object] == (msg.enqueued_at, msg.id));

        let dropped = before - self.messages.len();
        if dropped > 0 {
            debug!("normalized queue, dropped {dropped} superseded message(s)");
        }
    }

    /// Removes and returns up to `max` of the oldest messages, in FIFO
    /// order. Returns an empty vec when the queue is empty.
    pub fn dequeue_batch(&mut self, max: usize) -> Vec<Message> {
        let take = max.min(self.messages.len());
        self.messages.drain(..take).collect()
    }

    /// Returns clones of up to `max` of the oldest messages without
    /// removing them. Used to build a packet before the store has accepted
    /// it; the batch is only dequeued once the commit succeeds.
    #[must_use]
    pub fn peek_batch(&self, max: usize) -> Vec<Message> {
        self.messages.iter().take(max).cloned().collect()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}
