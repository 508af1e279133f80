//! Iteration-end notifications.
//!
//! Subscribers receive an [`IterationEvent`] on a channel after every
//! completed iteration. Receivers that have been dropped are forgotten on the
//! next publish.

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use bl_types::Observation;

/// Unique outer-loop identifier.
pub type LoopId = Uuid;

/// Published once an iteration's observations have been recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationEvent {
    pub loop_id: LoopId,
    /// Iteration counter after the update.
    pub iteration: usize,
    pub new_observations: Vec<Observation>,
    pub total_observations: usize,
    /// Smallest first output seen so far.
    pub best_objective: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Fan-out of iteration events to any number of subscribers.
#[derive(Debug, Default)]
pub struct IterationEvents {
    subscribers: Vec<Sender<IterationEvent>>,
}

impl IterationEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<IterationEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.is_empty()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn publish(&mut self, event: &IterationEvent) {
        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        let dropped = before - self.subscribers.len();
        if dropped > 0 {
            warn!(
                "Dropped {} disconnected iteration subscriber(s) for loop {}",
                dropped, event.loop_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(iteration: usize) -> IterationEvent {
        IterationEvent {
            loop_id: Uuid::new_v4(),
            iteration,
            new_observations: vec![Observation::new(vec![0.0], vec![1.0])],
            total_observations: iteration,
            best_objective: Some(1.0),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn every_subscriber_receives_events() {
        let mut events = IterationEvents::new();
        let a = events.subscribe();
        let b = events.subscribe();

        events.publish(&event(1));
        events.publish(&event(2));

        assert_eq!(a.try_iter().map(|e| e.iteration).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(b.try_iter().count(), 2);
    }

    #[test]
    fn disconnected_subscribers_are_pruned() {
        let mut events = IterationEvents::new();
        let kept = events.subscribe();
        drop(events.subscribe());
        assert_eq!(events.subscriber_count(), 2);

        events.publish(&event(1));
        assert_eq!(events.subscriber_count(), 1);
        assert_eq!(kept.try_recv().unwrap().iteration, 1);
    }

    #[test]
    fn event_serialization() {
        let original = event(3);
        let json = serde_json::to_string(&original).unwrap();
        let back: IterationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }
}
