// I2C port hub (M5Stack PbHub style) driving a motor from one of its ports
//
// Each port has two wires, A and B, with an analog (PWM) write command each.
// One register write is a single bus transaction:
// [START, address, port_select | channel_opcode, duty (0..=255), STOP]

use embedded_hal::i2c::{Error as _, I2c};
use tracing::debug;

use crate::motor::driver::{DUTY_SCALE, Direction, DriverError, MotorDriver, Result, duty_for_speed};

/// Factory I2C address of the hub
pub const DEFAULT_ADDRESS: u8 = 0x61;

/// PWM write commands for the two wires of a port
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    A = 0x02,
    B = 0x03,
}

/// Hub port the motor is plugged into
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HubPort {
    #[default]
    Port0 = 0x40,
    Port1 = 0x50,
    Port2 = 0x60,
    Port3 = 0x70,
    Port4 = 0x80,
    Port5 = 0xA0,
}

impl HubPort {
    pub const ALL: [HubPort; 6] = [
        HubPort::Port0,
        HubPort::Port1,
        HubPort::Port2,
        HubPort::Port3,
        HubPort::Port4,
        HubPort::Port5,
    ];

    /// Port select bits ORed into every register byte
    pub fn select(self) -> u8 {
        self as u8
    }

    /// Register byte for a PWM write on `channel` of this port
    pub fn register(self, channel: Channel) -> u8 {
        self.select() | channel as u8
    }
}

impl TryFrom<u8> for HubPort {
    type Error = u8;

    /// Port from its index on the hub label (0..=5)
    fn try_from(index: u8) -> std::result::Result<Self, Self::Error> {
        HubPort::ALL.get(index as usize).copied().ok_or(index)
    }
}

/// Motor on a hub port, channel A drives clockwise and channel B
/// counter-clockwise.
///
/// `bus` may be an owned bus, `&mut` bus, or a shared-bus device when several
/// hub drivers sit on one bus.
pub struct PortHubDriver<I2C> {
    bus: I2C,
    address: u8,
    port: HubPort,
}

impl<I2C: I2c> PortHubDriver<I2C> {
    /// Driver for `port` on a hub at [`DEFAULT_ADDRESS`]. No bus traffic.
    pub fn new(bus: I2C, port: HubPort) -> Self {
        Self::with_address(bus, port, DEFAULT_ADDRESS)
    }

    pub fn with_address(bus: I2C, port: HubPort, address: u8) -> Self {
        Self { bus, address, port }
    }

    pub fn port(&self) -> HubPort {
        self.port
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    fn write_channel(&mut self, channel: Channel, duty: u8) -> Result<()> {
        let register = self.port.register(channel);
        debug!(
            "port-hub: write 0x{:02X} reg=0x{:02X} duty={}",
            self.address, register, duty
        );
        self.bus
            .write(self.address, &[register, duty])
            .map_err(|e| DriverError::Bus {
                address: self.address,
                register,
                kind: e.kind(),
            })
    }

    /// Write `first` then `second`; a failed write skips the rest.
    fn send(&mut self, first: (Channel, u8), second: (Channel, u8)) -> Result<()> {
        self.write_channel(first.0, first.1)?;
        self.write_channel(second.0, second.1)
    }
}

impl<I2C: I2c> MotorDriver for PortHubDriver<I2C> {
    fn stop(&mut self) -> Result<()> {
        self.send((Channel::A, 0), (Channel::B, 0))
    }

    fn go(&mut self, direction: Direction, speed: u8) -> Result<()> {
        if speed == 0 {
            return self.stop();
        }
        let duty = duty_for_speed(speed);
        debug!("port-hub: go {:?} duty {}/{}", direction, duty, DUTY_SCALE);

        // Zero the idle wire before driving the active one
        match direction {
            Direction::Clockwise => self.send((Channel::B, 0), (Channel::A, duty)),
            Direction::CounterClockwise => self.send((Channel::A, 0), (Channel::B, duty)),
        }
    }
}
