use uuid::Uuid;

/// A progress-worthy thing that happened. Identity for idempotency purposes
/// is (user, kind, source entity): dispatching the same event twice awards
/// nothing the second time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivityEvent {
    ExamCompleted {
        attempt_id: Uuid,
        user_id: Uuid,
        /// Total points the attempt earned, as stored on the attempt row.
        score: f64,
    },
    MaterialUploaded {
        material_id: Uuid,
        user_id: Uuid,
    },
}

impl ActivityEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ActivityEvent::ExamCompleted { .. } => "exam_completed",
            ActivityEvent::MaterialUploaded { .. } => "material_uploaded",
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            ActivityEvent::ExamCompleted { user_id, .. } => *user_id,
            ActivityEvent::MaterialUploaded { user_id, .. } => *user_id,
        }
    }

    /// The entity whose existence caused the event; part of the idempotency
    /// key.
    pub fn source_entity_id(&self) -> Uuid {
        match self {
            ActivityEvent::ExamCompleted { attempt_id, .. } => *attempt_id,
            ActivityEvent::MaterialUploaded { material_id, .. } => *material_id,
        }
    }
}
