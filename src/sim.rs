// Simulated motor board
//
// In-memory implementations of the embedded-hal output, PWM and I2C traits.
// Every write lands in a shared journal so the runtime can run without
// hardware and tests can check what a driver actually did, in order.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{self, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};
use embedded_hal::pwm::{self, SetDutyCycle};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Duty resolution of simulated PWM channels unless asked otherwise
pub const DEFAULT_MAX_DUTY: u16 = 255;

/// One hardware write observed on the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    Level { line: &'static str, high: bool },
    Duty { line: &'static str, duty: u16 },
    BusWrite { address: u8, bytes: Vec<u8> },
}

#[derive(Debug, Default)]
struct BoardState {
    journal: Vec<SimEvent>,
    levels: HashMap<&'static str, bool>,
    duties: HashMap<&'static str, u16>,
    registers: HashMap<(u8, u8), u8>,
    // Remaining bus transactions before the bus starts failing
    bus_budget: Option<usize>,
}

/// Handle to a simulated board; cheap to clone, all clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimBoard {
    state: Arc<Mutex<BoardState>>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digital output line named `line`
    pub fn output(&self, line: &'static str) -> SimOutput {
        SimOutput {
            line,
            state: Arc::clone(&self.state),
        }
    }

    /// PWM channel named `line` with the default 8-bit resolution
    pub fn pwm(&self, line: &'static str) -> SimPwm {
        self.pwm_with_max(line, DEFAULT_MAX_DUTY)
    }

    pub fn pwm_with_max(&self, line: &'static str, max_duty: u16) -> SimPwm {
        SimPwm {
            line,
            max_duty,
            state: Arc::clone(&self.state),
        }
    }

    /// I2C bus shared by every handle created from this board
    pub fn bus(&self) -> SimBus {
        SimBus {
            state: Arc::clone(&self.state),
        }
    }

    /// Last level written to `line`, if any
    pub fn level(&self, line: &str) -> Option<bool> {
        self.state.lock().levels.get(line).copied()
    }

    /// Last duty written to `line`, if any
    pub fn duty(&self, line: &str) -> Option<u16> {
        self.state.lock().duties.get(line).copied()
    }

    /// Last value written to a device register over the bus
    pub fn register(&self, address: u8, register: u8) -> Option<u8> {
        self.state.lock().registers.get(&(address, register)).copied()
    }

    pub fn journal(&self) -> Vec<SimEvent> {
        self.state.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Let `transactions` more bus transactions succeed, then NACK every one
    pub fn fail_bus_after(&self, transactions: usize) {
        self.state.lock().bus_budget = Some(transactions);
    }

    pub fn heal_bus(&self) {
        self.state.lock().bus_budget = None;
    }
}

/// Simulated push-pull output
#[derive(Debug)]
pub struct SimOutput {
    line: &'static str,
    state: Arc<Mutex<BoardState>>,
}

impl SimOutput {
    fn write(&mut self, high: bool) {
        debug!("sim {} -> {}", self.line, if high { "high" } else { "low" });
        let mut state = self.state.lock();
        state.levels.insert(self.line, high);
        state.journal.push(SimEvent::Level {
            line: self.line,
            high,
        });
    }
}

impl digital::ErrorType for SimOutput {
    type Error = Infallible;
}

impl OutputPin for SimOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

/// Simulated PWM channel
#[derive(Debug)]
pub struct SimPwm {
    line: &'static str,
    max_duty: u16,
    state: Arc<Mutex<BoardState>>,
}

impl pwm::ErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        let duty = duty.min(self.max_duty);
        debug!("sim {} -> duty {}/{}", self.line, duty, self.max_duty);
        let mut state = self.state.lock();
        state.duties.insert(self.line, duty);
        state.journal.push(SimEvent::Duty {
            line: self.line,
            duty,
        });
        Ok(())
    }
}

/// Error returned by [`SimBus`] once its transaction budget runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimBusError(i2c::ErrorKind);

impl i2c::Error for SimBusError {
    fn kind(&self) -> i2c::ErrorKind {
        self.0
    }
}

/// Simulated I2C bus. Reads return zeros.
#[derive(Debug)]
pub struct SimBus {
    state: Arc<Mutex<BoardState>>,
}

impl i2c::ErrorType for SimBus {
    type Error = SimBusError;
}

impl I2c<SevenBitAddress> for SimBus {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.lock();

        if let Some(remaining) = state.bus_budget.as_mut() {
            if *remaining == 0 {
                warn!("sim bus: device 0x{:02X} did not acknowledge", address);
                return Err(SimBusError(i2c::ErrorKind::NoAcknowledge(
                    NoAcknowledgeSource::Address,
                )));
            }
            *remaining -= 1;
        }

        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    debug!("sim bus: write to 0x{:02X}: {:02X?}", address, bytes);
                    if let [register, value, ..] = **bytes {
                        state.registers.insert((address, register), value);
                    }
                    state.journal.push(SimEvent::BusWrite {
                        address,
                        bytes: bytes.to_vec(),
                    });
                }
                Operation::Read(buffer) => buffer.fill(0),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_levels_are_journaled() {
        let board = SimBoard::new();
        let mut pin = board.output("in1");
        assert_eq!(board.level("in1"), None);

        pin.set_high().unwrap();
        pin.set_low().unwrap();

        assert_eq!(board.level("in1"), Some(false));
        assert_eq!(
            board.journal(),
            vec![
                SimEvent::Level { line: "in1", high: true },
                SimEvent::Level { line: "in1", high: false },
            ]
        );
    }

    #[test]
    fn test_pwm_fraction_scales_to_resolution() {
        let board = SimBoard::new();
        let mut pwm = board.pwm_with_max("pwm", 1000);

        pwm.set_duty_cycle_fraction(102, 255).unwrap();
        assert_eq!(board.duty("pwm"), Some(400));

        pwm.set_duty_cycle(5000).unwrap();
        assert_eq!(board.duty("pwm"), Some(1000));
    }

    #[test]
    fn test_bus_records_registers() {
        let board = SimBoard::new();
        let mut bus = board.bus();

        bus.write(0x61, &[0x42, 0x80]).unwrap();

        assert_eq!(board.register(0x61, 0x42), Some(0x80));
        assert_eq!(
            board.journal(),
            vec![SimEvent::BusWrite {
                address: 0x61,
                bytes: vec![0x42, 0x80]
            }]
        );
    }

    #[test]
    fn test_bus_fault_injection() {
        let board = SimBoard::new();
        let mut bus = board.bus();
        board.fail_bus_after(1);

        assert!(bus.write(0x61, &[0x42, 1]).is_ok());
        let err = bus.write(0x61, &[0x43, 1]).unwrap_err();
        assert_eq!(
            i2c::Error::kind(&err),
            i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(board.register(0x61, 0x43), None);

        board.heal_bus();
        assert!(bus.write(0x61, &[0x43, 1]).is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let board = SimBoard::new();
        let other = board.clone();
        let mut pin = board.output("dir");
        pin.set_high().unwrap();
        assert_eq!(other.level("dir"), Some(true));
        other.clear_journal();
        assert!(board.journal().is_empty());
    }
}
