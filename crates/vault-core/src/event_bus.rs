//! Broadcast channel for vault events.
//!
//! Publishing never blocks and never fails because nobody is listening.
//! Slow subscribers observe `RecvError::Lagged` and skip ahead.

use tokio::sync::broadcast;
use vault_types::VaultEvent;

/// Event bus shared by the issuer, the verifier and any observers.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<VaultEvent>,
}

impl EventBus {
	/// Creates a bus buffering up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
		self.sender.subscribe()
	}

	/// Publishes `event`, returning how many subscribers received it.
	pub fn publish(&self, event: VaultEvent) -> usize {
		self.sender.send(event).unwrap_or(0)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1000)
	}
}
