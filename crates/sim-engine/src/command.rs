//! The single FIFO of inbound typed commands, from players and AI alike.

use std::collections::VecDeque;

use world_model::CharacterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    Player,
    Ai,
}

#[derive(Debug, Clone)]
pub struct Command {
    pub source: CommandSource,
    pub actor_id: CharacterId,
    pub text: String,
    pub enqueued_at: u64,
}

impl Command {
    pub fn player(actor_id: CharacterId, text: impl Into<String>, enqueued_at: u64) -> Self {
        Self { source: CommandSource::Player, actor_id, text: text.into(), enqueued_at }
    }

    pub fn ai(actor_id: CharacterId, text: impl Into<String>, enqueued_at: u64) -> Self {
        Self { source: CommandSource::Ai, actor_id, text: text.into(), enqueued_at }
    }
}

/// Non-blocking FIFO with a soft per-tick drain cap. Items left over after
/// the cap stay at the front of the queue, preserving per-actor order into
/// the next tick.
#[derive(Debug)]
pub struct CommandQueue {
    queue: VecDeque<Command>,
    drain_cap: usize,
}

impl CommandQueue {
    pub fn new(drain_cap: usize) -> Self {
        Self { queue: VecDeque::new(), drain_cap }
    }

    pub fn enqueue(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pops up to the drain cap worth of commands, in FIFO order.
    pub fn drain_tick(&mut self) -> Vec<Command> {
        let take = self.drain_cap.min(self.queue.len());
        self.queue.drain(0..take).collect()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_cap_preserves_order_across_ticks() {
        let mut queue = CommandQueue::new(2);
        let actor = CharacterId::new();
        queue.enqueue(Command::player(actor, "look", 0));
        queue.enqueue(Command::player(actor, "say hi", 0));
        queue.enqueue(Command::player(actor, "go north", 0));

        let first_batch = queue.drain_tick();
        assert_eq!(first_batch.len(), 2);
        assert_eq!(first_batch[0].text, "look");
        assert_eq!(first_batch[1].text, "say hi");

        let second_batch = queue.drain_tick();
        assert_eq!(second_batch.len(), 1);
        assert_eq!(second_batch[0].text, "go north");
    }
}
