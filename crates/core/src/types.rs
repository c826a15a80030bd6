//! Shared domain enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two things the gate can be told to do.
///
/// The current gate status is derived from the action of the most recent
/// history entry, so this doubles as the status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GateAction {
    Open,
    Close,
}

impl GateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateAction::Open => "open",
            GateAction::Close => "close",
        }
    }
}

impl fmt::Display for GateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(GateAction::Open),
            "close" => Ok(GateAction::Close),
            other => Err(format!("unknown gate action '{}'", other)),
        }
    }
}

/// Who caused a gate history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    /// A human hitting the action endpoint.
    User,
    /// A schedule fire.
    Schedule,
    /// Synthetic entries written by the system itself (bootstrap seed).
    System,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::User => "user",
            ActorKind::Schedule => "schedule",
            ActorKind::System => "system",
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ActorKind::User),
            "schedule" => Ok(ActorKind::Schedule),
            "system" => Ok(ActorKind::System),
            other => Err(format!("unknown actor kind '{}'", other)),
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_action_roundtrip() {
        assert_eq!("open".parse::<GateAction>().unwrap(), GateAction::Open);
        assert_eq!("close".parse::<GateAction>().unwrap(), GateAction::Close);
        assert_eq!(GateAction::Open.to_string(), "open");
        assert!("ajar".parse::<GateAction>().is_err());
    }

    #[test]
    fn gate_action_serde_lowercase() {
        assert_eq!(serde_json::to_string(&GateAction::Close).unwrap(), "\"close\"");
        let parsed: GateAction = serde_json::from_str("\"open\"").unwrap();
        assert_eq!(parsed, GateAction::Open);
        assert!(serde_json::from_str::<GateAction>("\"shut\"").is_err());
    }

    #[test]
    fn actor_kind_roundtrip() {
        for kind in [ActorKind::User, ActorKind::Schedule, ActorKind::System] {
            assert_eq!(kind.as_str().parse::<ActorKind>().unwrap(), kind);
        }
    }
}
