#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Open,
    Closed,
    Unknown,
}

impl DoorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Unknown => "N/A",
        }
    }

    /// Action label and button color for the web UI: an open door offers
    /// "CLOSE", a closed one offers "OPEN".
    pub fn action_label(self) -> (&'static str, &'static str) {
        match self {
            Self::Open => ("CLOSE", "red"),
            Self::Closed => ("OPEN", "green"),
            Self::Unknown => ("N/A", "orange"),
        }
    }
}

/// Tri-state door inference from a single sonar range sample.
///
/// A reflective surface closer than the trigger distance means the door panel
/// is in front of the sensor. No hysteresis band is applied; a distance
/// oscillating around the threshold flips the reported state on every sample.
#[derive(Debug, Clone, Copy)]
pub struct DoorClassifier {
    trigger_distance_cm: f32,
}

impl DoorClassifier {
    pub fn new(trigger_distance_cm: f32) -> Self {
        Self {
            trigger_distance_cm,
        }
    }

    pub fn classify(&self, distance_cm: f32) -> DoorState {
        if distance_cm < self.trigger_distance_cm {
            DoorState::Open
        } else {
            DoorState::Closed
        }
    }

    pub fn trigger_distance_cm(&self) -> f32 {
        self.trigger_distance_cm
    }
}
