//! Standing subscriber that records every [`ProjectEvent`].

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::EventBus;
use crate::persistence::ProjectStore;

/// Spawns the event-log task. It saves each event through the store and
/// ends when the bus is dropped.
#[must_use]
pub fn spawn(event_bus: &EventBus, store: Arc<dyn ProjectStore>) -> JoinHandle<()> {
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::debug!(
                        project_id = %event.project_id(),
                        event_type = event.event_type_str(),
                        "project event"
                    );
                    if let Err(err) = store.save_event(&event).await {
                        tracing::warn!(error = %err, event_type = event.event_type_str(), "failed to record event");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event log lagged behind event bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("event log stopped");
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::domain::{ProjectEvent, ProjectId};
    use crate::persistence::memory::MemoryStore;

    #[tokio::test]
    async fn events_reach_the_store() {
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new(16);
        let task = spawn(&bus, Arc::clone(&store) as Arc<dyn ProjectStore>);

        let id = ProjectId::new();
        bus.publish(ProjectEvent::ProjectPaused {
            project_id: id,
            timestamp: Utc::now(),
        });

        let mut saved = Vec::new();
        for _ in 0..50 {
            saved = store.events().await;
            if !saved.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(saved.len(), 1);
        assert!(saved.iter().all(|e| e.project_id() == id));

        drop(bus);
        let _ = task.await;
    }
}
