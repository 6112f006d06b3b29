// Non-blocking motor controller
//
// Layers indefinite and timed runs on top of any `MotorDriver`. Nothing here
// blocks: timed runs end when `update()` is polled after the deadline.

use tracing::{debug, info, warn};

use super::driver::{Direction, MotorDriver, Result};
use crate::clock::{Clock, elapsed_ms};

/// Start time and length of a timed run, in clock milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub started_at: u32,
    pub duration_ms: u32,
}

impl Timer {
    pub fn start(now_ms: u32, duration_ms: u32) -> Self {
        Self {
            started_at: now_ms,
            duration_ms,
        }
    }

    pub fn elapsed(&self, now_ms: u32) -> u32 {
        elapsed_ms(self.started_at, now_ms)
    }

    /// True once strictly more than the duration has elapsed
    pub fn expired(&self, now_ms: u32) -> bool {
        self.elapsed(now_ms) > self.duration_ms
    }

    pub fn remaining(&self, now_ms: u32) -> u32 {
        self.duration_ms.saturating_sub(self.elapsed(now_ms))
    }
}

/// What the motor is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Running { direction: Direction },
    RunningTimed { direction: Direction, timer: Timer },
}

impl RunState {
    pub fn direction(&self) -> Option<Direction> {
        match *self {
            RunState::Stopped => None,
            RunState::Running { direction } | RunState::RunningTimed { direction, .. } => {
                Some(direction)
            }
        }
    }
}

/// Handler run once when a timed run expires, with the motor already stopped
pub type OnComplete<D, C> = Box<dyn FnOnce(&mut Motor<D, C>)>;

/// A brushed DC motor behind some driver.
///
/// `D` can be the driver itself, `&mut` a driver owned elsewhere, or a
/// `Box<dyn MotorDriver>`. Call [`update`](Motor::update) often (every main
/// loop pass) so timed runs end on time.
pub struct Motor<D: MotorDriver, C: Clock> {
    driver: D,
    clock: C,
    state: RunState,
    speed: u8,
    on_complete: Option<OnComplete<D, C>>,
}

impl<D: MotorDriver, C: Clock> Motor<D, C> {
    /// New stopped motor, speed preset to the driver's idea of 100%.
    pub fn new(driver: D, clock: C) -> Self {
        let speed = driver.check_speed(100).unwrap_or(0);
        Self {
            driver,
            clock,
            state: RunState::Stopped,
            speed,
            on_complete: None,
        }
    }

    /// Stop now. Cancels a timed run without calling its handler.
    ///
    /// The motor is considered stopped even if the driver reports an error.
    pub fn stop(&mut self) -> Result<()> {
        self.on_complete = None;
        if self.state != RunState::Stopped {
            info!("Motor stopped");
        }
        self.state = RunState::Stopped;
        self.driver.stop()
    }

    pub fn is_running(&self) -> bool {
        self.state != RunState::Stopped
    }

    /// Poll the timed-run deadline; a no-op unless a timed run is active.
    pub fn update(&mut self) -> Result<()> {
        let RunState::RunningTimed { direction, timer } = self.state else {
            return Ok(());
        };
        let now = self.clock.now_ms();
        if !timer.expired(now) {
            return Ok(());
        }

        info!(
            "Timed run {:?} finished after {} ms",
            direction,
            timer.elapsed(now)
        );
        let result = self.driver.stop();
        if let Err(e) = &result {
            warn!("Driver failed to stop at end of timed run: {}", e);
        }
        self.state = RunState::Stopped;

        if let Some(handler) = self.on_complete.take() {
            handler(self);
        }
        result
    }

    /// Run until stopped.
    pub fn go(&mut self, direction: Direction) -> Result<()> {
        info!("Motor go {:?} at {}%", direction, self.speed);
        self.on_complete = None;
        self.state = RunState::Running { direction };
        self.driver.go(direction, self.speed)
    }

    /// Run for `duration_ms`, then stop on a later [`update`](Motor::update).
    pub fn go_for(&mut self, duration_ms: u32, direction: Direction) -> Result<()> {
        self.start_timed(duration_ms, direction, None)
    }

    /// Like [`go_for`](Motor::go_for), calling `on_complete` once the run
    /// expires. The handler is dropped if the run is stopped or replaced first.
    pub fn go_for_then<F>(
        &mut self,
        duration_ms: u32,
        direction: Direction,
        on_complete: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Self) + 'static,
    {
        self.start_timed(duration_ms, direction, Some(Box::new(on_complete)))
    }

    fn start_timed(
        &mut self,
        duration_ms: u32,
        direction: Direction,
        on_complete: Option<OnComplete<D, C>>,
    ) -> Result<()> {
        info!(
            "Motor go {:?} at {}% for {} ms",
            direction, self.speed, duration_ms
        );
        let result = self.driver.go(direction, self.speed);
        self.state = RunState::RunningTimed {
            direction,
            timer: Timer::start(self.clock.now_ms(), duration_ms),
        };
        self.on_complete = on_complete;
        result
    }

    /// Validate and store a new speed; a running motor picks it up at once.
    ///
    /// Returns `Ok(None)` and changes nothing if the driver rejects `speed`.
    pub fn set_speed(&mut self, speed: i32) -> Result<Option<u8>> {
        let Some(checked) = self.driver.check_speed(speed) else {
            debug!("Rejected speed {}", speed);
            return Ok(None);
        };
        debug!("Speed {} -> {}%", speed, checked);
        self.speed = checked;
        if let Some(direction) = self.state.direction() {
            self.driver.go(direction, checked)?;
        }
        Ok(Some(checked))
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Current direction, `None` when stopped
    pub fn direction(&self) -> Option<Direction> {
        self.state.direction()
    }

    pub fn is_timed(&self) -> bool {
        matches!(self.state, RunState::RunningTimed { .. })
    }

    /// Time left in the current timed run
    pub fn remaining_ms(&self) -> Option<u32> {
        match self.state {
            RunState::RunningTimed { timer, .. } => Some(timer.remaining(self.clock.now_ms())),
            _ => None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: MotorDriver, C: Clock> Drop for Motor<D, C> {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.driver.stop() {
                warn!("Failed to stop motor on drop: {}", e);
            }
        }
    }
}
