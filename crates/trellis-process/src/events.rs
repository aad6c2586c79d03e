//! Execution events and notifiers.
//!
//! Events let callers follow an invocation as it runs: stream it to a UI,
//! persist it, or assert on it in tests.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted while a process is being invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProcessEvent {
  ProcessStarted {
    execution_id: String,
    process_id: String,
  },

  ActionStarted {
    execution_id: String,
    action: String,
    coordinates: Vec<i32>,
  },

  /// `data` is the JSON rendering of the action's output.
  ActionCompleted {
    execution_id: String,
    action: String,
    coordinates: Vec<i32>,
    data: serde_json::Value,
  },

  ActionFailed {
    execution_id: String,
    action: String,
    coordinates: Vec<i32>,
    error: String,
  },

  ProcessCompleted {
    execution_id: String,
    output: serde_json::Value,
  },

  ProcessFailed { execution_id: String, error: String },
}

/// Receives [`ProcessEvent`]s. Called from worker tasks; must not block.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ProcessEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ProcessEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ProcessEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ProcessEvent>) -> Self {
    Self { sender }
  }

  /// A notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProcessEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ProcessEvent) {
    // The receiver may be gone.
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_events_are_tagged() {
    let event = ProcessEvent::ActionFailed {
      execution_id: "e".to_string(),
      action: "fail".to_string(),
      coordinates: vec![1, 0],
      error: "boom".to_string(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "action_failed");
    assert_eq!(json["coordinates"], serde_json::json!([1, 0]));
  }

  #[test]
  fn test_channel_notifier_survives_dropped_receiver() {
    let (notifier, receiver) = ChannelNotifier::channel();
    drop(receiver);
    notifier.notify(ProcessEvent::ProcessFailed {
      execution_id: "e".to_string(),
      error: "gone".to_string(),
    });
  }
}
