use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity levels for activity logs.
/// Controls retention policies and log filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Membership changes and deletions: never auto-deleted
    Critical,
    #[default]
    Important,
    /// Aggressively trimmed
    Noise,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Noise => "noise",
        }
    }
}

/// Trait for entities that can be logged in the activity log.
pub trait Loggable: Serialize + Send + Sync {
    /// Prefix of the event name, e.g. "task" in "task.created"
    fn entity_type() -> &'static str;

    fn subject_id(&self) -> Uuid;

    /// Project the activity is listed under, if any.
    fn project_id(&self) -> Option<Uuid> {
        None
    }

    fn severity(&self) -> Severity {
        Severity::Important
    }

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "deleted" | "removed" => Severity::Critical,
            "created" | "updated" | "added" => self.severity(),
            _ => Severity::Important,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Note {
        id: Uuid,
    }

    impl Loggable for Note {
        fn entity_type() -> &'static str { "note" }
        fn subject_id(&self) -> Uuid { self.id }
        fn severity(&self) -> Severity { Severity::Noise }
    }

    #[test]
    fn test_destructive_actions_are_critical() {
        let note = Note { id: Uuid::new_v4() };
        assert_eq!(note.severity_for_action("deleted"), Severity::Critical);
        assert_eq!(note.severity_for_action("removed"), Severity::Critical);
        assert_eq!(note.severity_for_action("updated"), Severity::Noise);
        assert_eq!(note.severity_for_action("login"), Severity::Important);
    }
}
