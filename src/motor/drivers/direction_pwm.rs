// Driver boards with a DIR input and a PWM (speed) input
//
// The direction line sets the rotation sense, the PWM line the magnitude.
// Stopping only zeroes the PWM line; the direction line keeps its level.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use tracing::debug;

use crate::motor::driver::{DUTY_SCALE, Direction, DriverError, MotorDriver, Result, duty_for_speed};

pub struct DirectionPwmDriver<D, P> {
    dir: D,
    pwm: P,
    // Direction currently applied to the DIR line, None until first go
    applied: Option<Direction>,
}

impl<D: OutputPin, P: SetDutyCycle> DirectionPwmDriver<D, P> {
    /// Take ownership of the lines; the PWM line starts at zero duty.
    pub fn new(dir: D, pwm: P) -> Result<Self> {
        let mut driver = Self {
            dir,
            pwm,
            applied: None,
        };
        driver.stop()?;
        Ok(driver)
    }

    fn apply_direction(&mut self, direction: Direction) -> Result<()> {
        if self.applied == Some(direction) {
            return Ok(());
        }
        // Never flip DIR with the bridge energized
        self.pwm.set_duty_cycle_fully_off().map_err(DriverError::pwm)?;
        let level = match direction {
            Direction::Clockwise => self.dir.set_high(),
            Direction::CounterClockwise => self.dir.set_low(),
        };
        level.map_err(DriverError::pin)?;
        self.applied = Some(direction);
        Ok(())
    }
}

impl<D: OutputPin, P: SetDutyCycle> MotorDriver for DirectionPwmDriver<D, P> {
    fn stop(&mut self) -> Result<()> {
        debug!("direction-pwm: stop");
        self.pwm.set_duty_cycle_fully_off().map_err(DriverError::pwm)
    }

    fn go(&mut self, direction: Direction, speed: u8) -> Result<()> {
        if speed == 0 {
            return self.stop();
        }
        let duty = duty_for_speed(speed) as u16;
        debug!("direction-pwm: go {:?} duty {}/{}", direction, duty, DUTY_SCALE);

        self.apply_direction(direction)?;
        self.pwm
            .set_duty_cycle_fraction(duty, DUTY_SCALE as u16)
            .map_err(DriverError::pwm)
    }
}
