// H-bridge with a PWM-capable line per direction (L9110, HG7881 with PWM)
//
// IN1   IN2   State
// PWM   0     clockwise
// 0     PWM   counter-clockwise
// 0     0     stop

use embedded_hal::pwm::SetDutyCycle;
use tracing::debug;

use crate::motor::driver::{DUTY_SCALE, Direction, DriverError, MotorDriver, Result, duty_for_speed};

/// Variable speed over two PWM channels.
///
/// Channel setup (timer, frequency, pin attachment) is done by the HAL before
/// the channels are handed over.
pub struct TwoPinPwmDriver<A, B> {
    in1: A,
    in2: B,
}

impl<A: SetDutyCycle, B: SetDutyCycle> TwoPinPwmDriver<A, B> {
    pub fn new(in1: A, in2: B) -> Result<Self> {
        let mut driver = Self { in1, in2 };
        driver.stop()?;
        Ok(driver)
    }
}

impl<A: SetDutyCycle, B: SetDutyCycle> MotorDriver for TwoPinPwmDriver<A, B> {
    fn stop(&mut self) -> Result<()> {
        debug!("two-pin-pwm: stop");
        self.in1.set_duty_cycle_fully_off().map_err(DriverError::pwm)?;
        self.in2.set_duty_cycle_fully_off().map_err(DriverError::pwm)
    }

    fn go(&mut self, direction: Direction, speed: u8) -> Result<()> {
        if speed == 0 {
            return self.stop();
        }
        let duty = duty_for_speed(speed) as u16;
        debug!("two-pin-pwm: go {:?} duty {}/{}", direction, duty, DUTY_SCALE);

        match direction {
            Direction::Clockwise => {
                self.in2.set_duty_cycle_fully_off().map_err(DriverError::pwm)?;
                self.in1
                    .set_duty_cycle_fraction(duty, DUTY_SCALE as u16)
                    .map_err(DriverError::pwm)
            }
            Direction::CounterClockwise => {
                self.in1.set_duty_cycle_fully_off().map_err(DriverError::pwm)?;
                self.in2
                    .set_duty_cycle_fraction(duty, DUTY_SCALE as u16)
                    .map_err(DriverError::pwm)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBoard, SimEvent, SimPwm};

    fn driver() -> (SimBoard, TwoPinPwmDriver<SimPwm, SimPwm>) {
        let board = SimBoard::new();
        let driver = TwoPinPwmDriver::new(board.pwm("in1"), board.pwm("in2")).unwrap();
        board.clear_journal();
        (board, driver)
    }

    #[test]
    fn test_check_speed_is_identity_in_range() {
        let (_board, driver) = driver();
        for s in 0..=100 {
            assert_eq!(driver.check_speed(s), Some(s as u8));
        }
        assert_eq!(driver.check_speed(-1), None);
        assert_eq!(driver.check_speed(101), None);
    }

    #[test]
    fn test_go_forty_percent_clockwise() {
        let (board, mut driver) = driver();
        driver.go(Direction::Clockwise, 40).unwrap();
        assert_eq!(board.duty("in1"), Some(102));
        assert_eq!(board.duty("in2"), Some(0));
    }

    #[test]
    fn test_go_counter_clockwise_full() {
        let (board, mut driver) = driver();
        driver.go(Direction::CounterClockwise, 100).unwrap();
        assert_eq!(board.duty("in1"), Some(0));
        assert_eq!(board.duty("in2"), Some(255));
    }

    #[test]
    fn test_duty_scales_to_channel_resolution() {
        let board = SimBoard::new();
        let mut driver =
            TwoPinPwmDriver::new(board.pwm_with_max("in1", 1000), board.pwm_with_max("in2", 1000))
                .unwrap();
        driver.go(Direction::Clockwise, 40).unwrap();
        assert_eq!(board.duty("in1"), Some(400));
    }

    #[test]
    fn test_direction_change_is_break_before_make() {
        let (board, mut driver) = driver();
        driver.go(Direction::Clockwise, 60).unwrap();
        board.clear_journal();

        driver.go(Direction::CounterClockwise, 60).unwrap();
        assert_eq!(
            board.journal(),
            vec![
                SimEvent::Duty { line: "in1", duty: 0 },
                SimEvent::Duty { line: "in2", duty: 153 },
            ]
        );
    }

    #[test]
    fn test_go_zero_is_stop() {
        let (board, mut driver) = driver();
        driver.go(Direction::Clockwise, 80).unwrap();
        driver.go(Direction::Clockwise, 0).unwrap();
        assert_eq!(board.duty("in1"), Some(0));
        assert_eq!(board.duty("in2"), Some(0));
    }
}
