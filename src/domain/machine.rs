use chrono::{DateTime, Utc};
use serde::Serialize;

/// The primary occupant's claim on a machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occupancy {
    pub occupant: String,
    pub project: String,
    pub duration_hours: f64,
    pub started_at: DateTime<Utc>,
    /// The occupant has left but contributors are still attached.
    pub main_released: bool,
}

/// Every known machine is in exactly one of these states.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MachineState {
    Free,
    Occupied(Occupancy),
}

impl MachineState {
    #[must_use]
    pub const fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }

    #[must_use]
    pub const fn occupancy(&self) -> Option<&Occupancy> {
        match self {
            Self::Free => None,
            Self::Occupied(occupancy) => Some(occupancy),
        }
    }

    #[must_use]
    pub fn is_held_by(&self, identity: &str) -> bool {
        self.occupancy()
            .is_some_and(|o| o.occupant == identity && !o.main_released)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Machine {
    pub ip: String,
    pub state: MachineState,
}

/// A secondary identity sharing an occupied machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub id: i32,
    pub machine_ip: String,
    pub main_occupant: String,
    pub contributor: String,
    pub project: String,
    pub duration_hours: f64,
    pub started_at: DateTime<Utc>,
}

/// Closed usage span. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageLog {
    pub id: i32,
    pub ip: String,
    pub identity: String,
    pub project: String,
    pub duration_hours: f64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub is_contribution: bool,
    pub main_occupant: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupied(occupant: &str, main_released: bool) -> MachineState {
        MachineState::Occupied(Occupancy {
            occupant: occupant.to_string(),
            project: "proj".to_string(),
            duration_hours: 1.0,
            started_at: Utc::now(),
            main_released,
        })
    }

    #[test]
    fn held_by_requires_unreleased_occupancy() {
        assert!(!MachineState::Free.is_held_by("alice@example.com"));
        assert!(occupied("alice@example.com", false).is_held_by("alice@example.com"));
        assert!(!occupied("alice@example.com", true).is_held_by("alice@example.com"));
        assert!(!occupied("alice@example.com", false).is_held_by("bob@example.com"));
    }

    #[test]
    fn serializes_as_tagged_variant() {
        let json = serde_json::to_value(MachineState::Free).unwrap();
        assert_eq!(json["status"], "free");

        let json = serde_json::to_value(occupied("alice@example.com", true)).unwrap();
        assert_eq!(json["status"], "occupied");
        assert_eq!(json["occupant"], "alice@example.com");
        assert_eq!(json["main_released"], true);
    }
}
