// Concrete motor backends
//
// Each type binds its hardware handles at construction and implements
// `MotorDriver` over a different wiring topology.

mod direction_pwm;
pub mod port_hub;
mod two_pin;
mod two_pin_pwm;

pub use direction_pwm::DirectionPwmDriver;
pub use port_hub::{HubPort, PortHubDriver};
pub use two_pin::TwoPinDriver;
pub use two_pin_pwm::TwoPinPwmDriver;
