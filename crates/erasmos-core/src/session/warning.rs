use serde::{Deserialize, Serialize};

/// Where the coordinator is in a credential's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SessionPhase {
    /// No credential is being watched
    #[default]
    Idle,
    /// Timers scheduled, no warning visible
    Armed,
    /// Expiry warning visible with a live countdown
    Warning,
}

/// Present only while the expiry warning is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SessionWarningState {
    pub remaining_seconds: u64,
    pub auto_refresh_enabled: bool,
}

impl SessionWarningState {
    /// Countdown formatted as `m:ss`
    pub fn remaining_label(&self) -> String {
        format!("{}:{:02}", self.remaining_seconds / 60, self.remaining_seconds % 60)
    }
}

/// Everything a notification UI needs, published as one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SessionView {
    pub phase: SessionPhase,
    pub warning: Option<SessionWarningState>,
    pub auto_refresh_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_label() {
        let state = SessionWarningState { remaining_seconds: 299, auto_refresh_enabled: false };
        assert_eq!(state.remaining_label(), "4:59");

        let state = SessionWarningState { remaining_seconds: 5, auto_refresh_enabled: true };
        assert_eq!(state.remaining_label(), "0:05");
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let view = SessionView {
            phase: SessionPhase::Warning,
            warning: Some(SessionWarningState { remaining_seconds: 42, auto_refresh_enabled: true }),
            auto_refresh_enabled: true,
        };
        let json = serde_json::to_value(view).expect("serialize");
        assert_eq!(json["phase"], "Warning");
        assert_eq!(json["warning"]["remainingSeconds"], 42);
        assert_eq!(json["autoRefreshEnabled"], true);
    }
}
