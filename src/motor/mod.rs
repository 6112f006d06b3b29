// Brushed DC motor control
//
// Provides:
// - The driver capability contract (stop / go / check_speed)
// - Concrete drivers for pin pairs, PWM pairs, direction + PWM and an I2C port hub
// - A non-blocking controller with indefinite and timed runs

mod controller;
pub mod driver;
pub mod drivers;

pub use controller::{Motor, OnComplete, RunState, Timer};
pub use driver::{Direction, DriverError, MotorDriver};
pub use drivers::{DirectionPwmDriver, HubPort, PortHubDriver, TwoPinDriver, TwoPinPwmDriver};
