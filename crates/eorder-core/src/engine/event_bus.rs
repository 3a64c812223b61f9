//! Broadcast channel for session events.

use eorder_types::SessionEvent;
use tokio::sync::broadcast;

/// Fan-out of [`SessionEvent`]s to any number of subscribers.
///
/// Publishing without subscribers is not an error for callers that ignore the
/// result; subscribers only see events published after they subscribed.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.sender.subscribe()
	}

	/// Returns the number of subscribers that received the event.
	pub fn publish(
		&self,
		event: SessionEvent,
	) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
		self.sender.send(event)
	}
}
