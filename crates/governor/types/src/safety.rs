use serde::{Deserialize, Serialize};

/// Overall posture of the governor, ordered by severity.
///
/// The governor only ever raises the level; lowering it requires an explicit
/// reset through the privileged channel.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyLevel {
    #[default]
    Operational,
    Caution,
    Warning,
    Lockdown,
    EmergencyStop,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Operational => "OPERATIONAL",
            SafetyLevel::Caution => "CAUTION",
            SafetyLevel::Warning => "WARNING",
            SafetyLevel::Lockdown => "LOCKDOWN",
            SafetyLevel::EmergencyStop => "EMERGENCY_STOP",
        }
    }

    /// Raise to `candidate` if it is more severe; never lowers.
    pub fn escalate(self, candidate: SafetyLevel) -> SafetyLevel {
        self.max(candidate)
    }
}

impl std::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
