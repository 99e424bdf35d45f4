use serde::{Deserialize, Serialize};

/// Severity levels for activity events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Permission-relevant changes: roles, grants, overrides
    Critical,
    #[default]
    Important,
}

/// Trait for entities that can be recorded in the activity log.
pub trait Loggable: Serialize + Send + Sync {
    /// The entity type name (e.g. "role"), used as the prefix in event names like "role.created"
    fn entity_type() -> &'static str;

    fn subject_id(&self) -> String;

    fn severity(&self) -> Severity {
        Severity::Important
    }

    /// Override severity based on action (e.g., "deleted" -> Critical)
    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "deleted" => Severity::Critical,
            "created" | "updated" => self.severity(),
            _ => Severity::Important,
        }
    }
}
