// Timeouts, topics, backend selection
use std::time::Duration;

use clap::ValueEnum;

use crate::motor::HubPort;
use crate::motor::drivers::port_hub::DEFAULT_ADDRESS;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;
pub const MAX_LOOP_HZ: u64 = 1000; // 1 ms tick

// Command timeout for watchdog (indefinite runs only)
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD: &str = "dcmotor/cmd"; // commands
pub const TOPIC_STATE: &str = "dcmotor/state"; // motor status
pub const TOPIC_HEALTH: &str = "dcmotor/state/health"; // health status
pub const TOPIC_EVENT: &str = "dcmotor/event"; // run completions

/// Which driver wiring the runtime drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Backend {
    /// Two on/off lines (full speed or stop)
    TwoPin,
    /// Two PWM lines, one per direction
    #[default]
    TwoPinPwm,
    /// Direction line plus one PWM line
    DirectionPwm,
    /// Port of an I2C port hub
    PortHub,
}

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub backend: Backend,
    pub loop_hz: u64,
    /// `None` disables the watchdog
    pub watchdog: Option<Duration>,
    pub hub_port: HubPort,
    pub hub_address: u8,
}

impl RuntimeOptions {
    /// Tick period, with the rate clamped to `1..=MAX_LOOP_HZ`
    pub fn loop_period(&self) -> Duration {
        Duration::from_secs(1) / self.loop_hz.clamp(1, MAX_LOOP_HZ) as u32
    }
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            loop_hz: LOOP_HZ,
            watchdog: Some(CMD_TIMEOUT),
            hub_port: HubPort::default(),
            hub_address: DEFAULT_ADDRESS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RuntimeOptions::default();
        assert_eq!(options.backend, Backend::TwoPinPwm);
        assert_eq!(options.loop_period(), Duration::from_millis(20));
        assert_eq!(options.watchdog, Some(CMD_TIMEOUT));
        assert_eq!(options.hub_address, 0x61);
    }

    #[test]
    fn test_loop_period_guards_zero_rate() {
        let options = RuntimeOptions {
            loop_hz: 0,
            ..Default::default()
        };
        assert_eq!(options.loop_period(), Duration::from_secs(1));
    }

    #[test]
    fn test_loop_period_never_zero_above_max_rate() {
        let options = RuntimeOptions {
            loop_hz: 2000,
            ..Default::default()
        };
        assert_eq!(options.loop_period(), Duration::from_millis(1));

        let options = RuntimeOptions {
            loop_hz: u64::MAX,
            ..Default::default()
        };
        assert!(!options.loop_period().is_zero());
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(
            Backend::from_str("direction-pwm", true).unwrap(),
            Backend::DirectionPwm
        );
        assert_eq!(Backend::from_str("port-hub", true).unwrap(), Backend::PortHub);
    }
}
