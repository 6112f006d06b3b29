// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::motor::{Direction, Motor, MotorDriver};

// Command from teleop/scripts -> runtime
// Tagged by "cmd", e.g. {"cmd":"go_for","duration_ms":500,"direction":"ccw"}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum MotorCommand {
    Go {
        #[serde(default)]
        direction: Direction,
    },
    GoFor {
        duration_ms: u32,
        #[serde(default)]
        direction: Direction,
    },
    SetSpeed {
        percent: i32,
    },
    Stop,
}

// Motor snapshot published every loop tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MotorStatus {
    pub running: bool,
    pub direction: Option<Direction>,
    pub speed: u8,
    pub timed: bool,
    pub remaining_ms: Option<u32>,
}

impl<D: MotorDriver, C: Clock> From<&Motor<D, C>> for MotorStatus {
    fn from(motor: &Motor<D, C>) -> Self {
        Self {
            running: motor.is_running(),
            direction: motor.direction(),
            speed: motor.speed(),
            timed: motor.is_timed(),
            remaining_ms: motor.remaining_ms(),
        }
    }
}

/// One-off events published by runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MotorEvent {
    RunComplete { direction: Direction },
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    DriverFault,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cmd: MotorCommand = serde_json::from_str(r#"{"cmd":"go","direction":"ccw"}"#).unwrap();
        assert_eq!(
            cmd,
            MotorCommand::Go {
                direction: Direction::CounterClockwise
            }
        );

        let cmd: MotorCommand =
            serde_json::from_str(r#"{"cmd":"go_for","duration_ms":500}"#).unwrap();
        assert_eq!(
            cmd,
            MotorCommand::GoFor {
                duration_ms: 500,
                direction: Direction::Clockwise
            }
        );

        let cmd: MotorCommand =
            serde_json::from_str(r#"{"cmd":"set_speed","percent":-3}"#).unwrap();
        assert_eq!(cmd, MotorCommand::SetSpeed { percent: -3 });

        let cmd: MotorCommand = serde_json::from_str(r#"{"cmd":"stop"}"#).unwrap();
        assert_eq!(cmd, MotorCommand::Stop);
    }

    #[test]
    fn test_reject_unknown_command() {
        assert!(serde_json::from_str::<MotorCommand>(r#"{"cmd":"spin"}"#).is_err());
        assert!(serde_json::from_str::<MotorCommand>(r#"{"cmd":"go_for"}"#).is_err());
    }

    #[test]
    fn test_command_wire_format() {
        let json = serde_json::to_string(&MotorCommand::GoFor {
            duration_ms: 250,
            direction: Direction::CounterClockwise,
        })
        .unwrap();
        assert_eq!(json, r#"{"cmd":"go_for","duration_ms":250,"direction":"ccw"}"#);
    }

    #[test]
    fn test_event_and_health_wire_format() {
        let json = serde_json::to_string(&MotorEvent::RunComplete {
            direction: Direction::Clockwise,
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"run_complete","direction":"cw"}"#);
        assert_eq!(
            serde_json::to_string(&RuntimeHealth::DriverFault).unwrap(),
            "\"driver_fault\""
        );
    }

    #[test]
    fn test_stopped_status_default() {
        let json = serde_json::to_string(&MotorStatus::default()).unwrap();
        assert_eq!(
            json,
            r#"{"running":false,"direction":null,"speed":0,"timed":false,"remaining_ms":null}"#
        );
    }
}
