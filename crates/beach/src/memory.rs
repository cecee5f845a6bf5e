use std::collections::VecDeque;

use crate::models::message::Message;

pub const DEFAULT_MAX_MESSAGES: usize = 20;

/// Bounded, ordered log of the messages exchanged in one conversation.
///
/// Once full, every `add` evicts from the front so the log keeps the most
/// recent `capacity` messages in insertion order. `clear` restores the
/// seed (system prompt plus any example exchanges) so the log is never empty
/// after construction or reset.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    messages: VecDeque<Message>,
    capacity: usize,
    seed: Vec<Message>,
}

impl ConversationMemory {
    /// Create a memory holding at most `capacity` messages, seeded with `seed`.
    ///
    /// A capacity of zero is treated as one so the log can always hold the
    /// most recent message.
    pub fn new(capacity: usize, seed: Vec<Message>) -> Self {
        let mut memory = Self {
            messages: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            seed,
        };
        memory.clear();
        memory
    }

    pub fn add(&mut self, message: Message) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// The messages in order, ready to hand to a language model.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        let seed = self.seed.clone();
        for message in seed {
            self.add(message);
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }
}
