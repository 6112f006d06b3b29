// On/off H-bridge driven by two digital lines (L9110, HG7881, relay pairs)
//
// IN1   IN2   State
// HIGH  LOW   clockwise
// LOW   HIGH  counter-clockwise
// LOW   LOW   stop
// HIGH  HIGH  never driven

use embedded_hal::digital::OutputPin;
use tracing::debug;

use crate::motor::driver::{Direction, DriverError, MAX_SPEED, MotorDriver, Result};

/// Requests at or above this percentage run at full speed, below it stop.
pub const FULL_ON_THRESHOLD: u8 = 50;

/// Full speed or nothing over two digital control lines.
pub struct TwoPinDriver<A, B> {
    in1: A,
    in2: B,
}

impl<A: OutputPin, B: OutputPin> TwoPinDriver<A, B> {
    /// Take ownership of the control lines and drive both low.
    pub fn new(in1: A, in2: B) -> Result<Self> {
        let mut driver = Self { in1, in2 };
        driver.stop()?;
        Ok(driver)
    }
}

impl<A: OutputPin, B: OutputPin> MotorDriver for TwoPinDriver<A, B> {
    fn stop(&mut self) -> Result<()> {
        debug!("two-pin: stop");
        self.in1.set_low().map_err(DriverError::pin)?;
        self.in2.set_low().map_err(DriverError::pin)
    }

    fn go(&mut self, direction: Direction, speed: u8) -> Result<()> {
        if speed == 0 {
            return self.stop();
        }
        debug!("two-pin: go {:?}", direction);

        // Release the opposite line first
        match direction {
            Direction::Clockwise => {
                self.in2.set_low().map_err(DriverError::pin)?;
                self.in1.set_high().map_err(DriverError::pin)
            }
            Direction::CounterClockwise => {
                self.in1.set_low().map_err(DriverError::pin)?;
                self.in2.set_high().map_err(DriverError::pin)
            }
        }
    }

    fn check_speed(&self, speed: i32) -> Option<u8> {
        match u8::try_from(speed).ok()? {
            s if s > MAX_SPEED => None,
            s if s >= FULL_ON_THRESHOLD => Some(MAX_SPEED),
            _ => Some(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBoard, SimEvent, SimOutput};

    fn driver() -> (SimBoard, TwoPinDriver<SimOutput, SimOutput>) {
        let board = SimBoard::new();
        let driver = TwoPinDriver::new(board.output("in1"), board.output("in2")).unwrap();
        board.clear_journal();
        (board, driver)
    }

    #[test]
    fn test_new_drives_both_low() {
        let board = SimBoard::new();
        let _driver = TwoPinDriver::new(board.output("in1"), board.output("in2")).unwrap();
        assert_eq!(board.level("in1"), Some(false));
        assert_eq!(board.level("in2"), Some(false));
    }

    #[test]
    fn test_check_speed_rounds_to_on_off() {
        let (_board, driver) = driver();
        for s in 0..=49 {
            assert_eq!(driver.check_speed(s), Some(0), "speed {}", s);
        }
        for s in 50..=100 {
            assert_eq!(driver.check_speed(s), Some(100), "speed {}", s);
        }
        for s in [-100, -1, 101, 255, 1000] {
            assert_eq!(driver.check_speed(s), None, "speed {}", s);
        }
    }

    #[test]
    fn test_check_speed_is_idempotent() {
        let (_board, driver) = driver();
        for s in 0..=100 {
            let once = driver.check_speed(s).unwrap();
            assert_eq!(driver.check_speed(once as i32), Some(once));
        }
    }

    #[test]
    fn test_go_sets_direction_lines() {
        let (board, mut driver) = driver();

        driver.go(Direction::Clockwise, 100).unwrap();
        assert_eq!(board.level("in1"), Some(true));
        assert_eq!(board.level("in2"), Some(false));

        driver.go(Direction::CounterClockwise, 100).unwrap();
        assert_eq!(board.level("in1"), Some(false));
        assert_eq!(board.level("in2"), Some(true));
    }

    #[test]
    fn test_direction_change_is_break_before_make() {
        let (board, mut driver) = driver();
        driver.go(Direction::Clockwise, 100).unwrap();
        board.clear_journal();

        driver.go(Direction::CounterClockwise, 100).unwrap();
        assert_eq!(
            board.journal(),
            vec![
                SimEvent::Level { line: "in1", high: false },
                SimEvent::Level { line: "in2", high: true },
            ]
        );
    }

    #[test]
    fn test_go_zero_is_stop() {
        let (board, mut driver) = driver();
        driver.go(Direction::CounterClockwise, 100).unwrap();

        driver.go(Direction::CounterClockwise, 0).unwrap();
        let after_go_zero = (board.level("in1"), board.level("in2"));
        driver.stop().unwrap();
        let after_stop = (board.level("in1"), board.level("in2"));

        assert_eq!(after_go_zero, (Some(false), Some(false)));
        assert_eq!(after_go_zero, after_stop);
    }

    #[test]
    fn test_stop_is_repeatable() {
        let (board, mut driver) = driver();
        driver.stop().unwrap();
        driver.stop().unwrap();
        assert_eq!(board.level("in1"), Some(false));
        assert_eq!(board.level("in2"), Some(false));
    }
}
