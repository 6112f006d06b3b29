// Brushed DC motor control over interchangeable hardware backends,
// plus a zenoh runtime that drives a motor from remote commands.

pub mod clock;
pub mod config;
pub mod messages;
pub mod motor;
pub mod runtime;
pub mod sim;
