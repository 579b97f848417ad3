//! Notification side effects of routing and recurrence.
//!
//! The pipeline only knows the [`NotificationDispatcher`] trait. Concrete
//! delivery (in-app, e-mail, chat) subscribes to the [`EventBus`] downstream.

use std::sync::Arc;

use jobroute_core::task::Task;
use jobroute_db::models::assignment::Assignment;

use crate::bus::{EventBus, PlatformEvent};

pub const EVENT_ASSIGNMENT_CREATED: &str = "assignment.created";
pub const EVENT_TASK_RECURRED: &str = "task.recurred";

/// Fire-and-forget notifications. Implementations must not fail the caller;
/// delivery problems are theirs to log.
pub trait NotificationDispatcher: Send + Sync {
    /// An entity was routed to an operator and its task created.
    fn assignment_created(&self, assignment: &Assignment, task: &Task);

    /// A recurring task was reset for occurrence `iteration`.
    fn task_recurred(&self, task: &Task, iteration: u32);
}

/// Publishes one [`PlatformEvent`] per notification on the shared bus.
#[derive(Clone)]
pub struct BusNotificationDispatcher {
    bus: Arc<EventBus>,
}

impl BusNotificationDispatcher {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl NotificationDispatcher for BusNotificationDispatcher {
    fn assignment_created(&self, assignment: &Assignment, task: &Task) {
        let event = PlatformEvent::new(EVENT_ASSIGNMENT_CREATED)
            .with_source("task", task.id)
            .with_actor(assignment.operator_id)
            .with_payload(serde_json::json!({
                "assignment_id": assignment.id,
                "entity_type": assignment.entity_type,
                "external_entity_id": assignment.external_entity_id,
                "country_code": assignment.country_code,
                "task_title": task.title,
            }));
        tracing::debug!(
            assignment_id = assignment.id,
            task_id = task.id,
            operator_id = assignment.operator_id,
            "Publishing assignment notification"
        );
        self.bus.publish(event);
    }

    fn task_recurred(&self, task: &Task, iteration: u32) {
        let mut event = PlatformEvent::new(EVENT_TASK_RECURRED)
            .with_source("task", task.id)
            .with_payload(serde_json::json!({
                "iteration": iteration,
                "recurring_at": task.recurring_at,
                "task_title": task.title,
            }));
        if let Some(&operator_id) = task.assignees.first() {
            event = event.with_actor(operator_id);
        }
        self.bus.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jobroute_core::entity::EntityType;

    fn task() -> Task {
        Task {
            id: 11,
            list_id: 1,
            title: "Follow up with Employer: Acme".into(),
            description: String::new(),
            assignees: vec![5],
            labels: vec![],
            meta: Default::default(),
            completed_at: None,
            recurring_at: None,
            total_seconds: 0,
            checklist_items: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn assignment_created_is_published_with_operator_as_actor() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let dispatcher = BusNotificationDispatcher::new(Arc::clone(&bus));

        let assignment = Assignment {
            id: 3,
            operator_id: 5,
            external_entity_id: 99,
            entity_type: EntityType::Employer,
            country_code: Some("MW".into()),
            auto_assigned: true,
            task_id: Some(11),
            created_at: Utc::now(),
        };
        dispatcher.assignment_created(&assignment, &task());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, EVENT_ASSIGNMENT_CREATED);
        assert_eq!(event.actor_user_id, Some(5));
        assert_eq!(event.source_entity_id, Some(11));
        assert_eq!(event.payload["entity_type"], "employer");
        assert_eq!(event.payload["external_entity_id"], 99);
    }

    #[tokio::test]
    async fn task_recurred_carries_iteration() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        BusNotificationDispatcher::new(Arc::clone(&bus)).task_recurred(&task(), 4);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, EVENT_TASK_RECURRED);
        assert_eq!(event.payload["iteration"], 4);
        assert_eq!(event.actor_user_id, Some(5));
    }
}
