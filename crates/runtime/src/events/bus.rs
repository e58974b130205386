//! Topic-based event bus implementation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::{DiagnosticEvent, EngineEvent, FrameEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Tick summaries
    Frame,
    /// Engine state machine and stage changes
    Engine,
    /// Script faults, pool exhaustion and script logs
    Diagnostics,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Frame(FrameEvent),
    Engine(EngineEvent),
    Diagnostic(DiagnosticEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Frame(_) => Topic::Frame,
            Event::Engine(_) => Topic::Engine,
            Event::Diagnostic(_) => Topic::Diagnostics,
        }
    }
}

struct Channels {
    frame: broadcast::Sender<Event>,
    engine: broadcast::Sender<Event>,
    diagnostics: broadcast::Sender<Event>,
}

impl Channels {
    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Frame => &self.frame,
            Topic::Engine => &self.engine,
            Topic::Diagnostics => &self.diagnostics,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Publishing never blocks; events nobody listens
/// to are dropped.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<Channels>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(Channels {
                frame: broadcast::channel(capacity).0,
                engine: broadcast::channel(capacity).0,
                diagnostics: broadcast::channel(capacity).0,
            }),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.channels.sender(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels.sender(topic).subscribe()
    }

    /// Subscribe to multiple topics
    ///
    /// Returns receivers for each requested topic.
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::EngineState;

    #[test]
    fn events_reach_only_their_topic() {
        let bus = EventBus::with_capacity(4);
        let mut engine_rx = bus.subscribe(Topic::Engine);
        let mut diag_rx = bus.subscribe(Topic::Diagnostics);

        bus.publish(Event::Engine(EngineEvent::StateChanged {
            from: EngineState::MainGame,
            to: EngineState::Paused,
        }));

        assert_eq!(engine_rx.try_recv().unwrap().topic(), Topic::Engine);
        assert!(diag_rx.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(Event::Diagnostic(DiagnosticEvent::ScriptLog { slot: None, value: 3 }));
    }
}
