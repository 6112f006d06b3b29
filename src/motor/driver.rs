// Driver capability contract for brushed DC motor backends
//
// Every backend (pin pairs, PWM pairs, direction + PWM, bus-attached port hub)
// normalizes its hardware into three operations: stop, go and check_speed.
// The controller only ever talks to this trait.

use embedded_hal::{digital, i2c, pwm};
use serde::{Deserialize, Serialize};

/// Highest speed percentage a driver accepts.
pub const MAX_SPEED: u8 = 100;

/// Full-scale value of the 8-bit duty cycle used by PWM and bus backends.
pub const DUTY_SCALE: u8 = 255;

/// Rotation sense of the motor shaft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "cw")]
    Clockwise,
    #[serde(rename = "ccw")]
    CounterClockwise,
}

/// Hardware failures reported by a driver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("digital output write failed: {0:?}")]
    Pin(digital::ErrorKind),

    #[error("PWM duty cycle write failed: {0:?}")]
    Pwm(pwm::ErrorKind),

    #[error("bus write to device 0x{address:02X}, register 0x{register:02X} failed: {kind:?}")]
    Bus {
        address: u8,
        register: u8,
        kind: i2c::ErrorKind,
    },
}

impl DriverError {
    pub fn pin(err: impl digital::Error) -> Self {
        DriverError::Pin(err.kind())
    }

    pub fn pwm(err: impl pwm::Error) -> Self {
        DriverError::Pwm(err.kind())
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// Abstract motor backend.
///
/// Implementations must keep direction changes break-before-make: the
/// line or channel driving the old direction is de-energized before the one
/// for the new direction is energized.
pub trait MotorDriver {
    /// De-energize the motor. Safe to call when already stopped.
    fn stop(&mut self) -> Result<()>;

    /// Run continuously at `speed` (already passed through [`check_speed`]).
    ///
    /// A speed of 0 behaves exactly like [`stop`].
    ///
    /// [`check_speed`]: MotorDriver::check_speed
    /// [`stop`]: MotorDriver::stop
    fn go(&mut self, direction: Direction, speed: u8) -> Result<()>;

    /// Validate a requested speed percentage.
    ///
    /// Returns `None` outside `0..=100`, otherwise the speed this backend
    /// will actually realize. Has no side effects.
    fn check_speed(&self, speed: i32) -> Option<u8> {
        full_range_speed(speed)
    }
}

impl<T: MotorDriver + ?Sized> MotorDriver for &mut T {
    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }

    fn go(&mut self, direction: Direction, speed: u8) -> Result<()> {
        (**self).go(direction, speed)
    }

    fn check_speed(&self, speed: i32) -> Option<u8> {
        (**self).check_speed(speed)
    }
}

impl<T: MotorDriver + ?Sized> MotorDriver for Box<T> {
    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }

    fn go(&mut self, direction: Direction, speed: u8) -> Result<()> {
        (**self).go(direction, speed)
    }

    fn check_speed(&self, speed: i32) -> Option<u8> {
        (**self).check_speed(speed)
    }
}

/// Identity validation over `0..=100`
pub fn full_range_speed(speed: i32) -> Option<u8> {
    u8::try_from(speed).ok().filter(|&s| s <= MAX_SPEED)
}

/// Map a speed percentage onto the 0..=255 duty scale (truncating)
pub fn duty_for_speed(speed: u8) -> u8 {
    let speed = speed.min(MAX_SPEED) as u16;
    (speed * DUTY_SCALE as u16 / MAX_SPEED as u16) as u8
}
