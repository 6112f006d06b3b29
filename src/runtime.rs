// Fixed-rate motor loop with watchdog
// Note: the watchdog only guards indefinite runs. If the commander stops talking while the motor
// runs with no end time, the runtime stops it. Timed runs end on their own.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

// local imports
use crate::clock::{Clock, SystemClock, elapsed_ms};
use crate::config::{Backend, RuntimeOptions, TOPIC_CMD, TOPIC_EVENT, TOPIC_HEALTH, TOPIC_STATE};
use crate::messages::{MotorCommand, MotorEvent, MotorStatus, RuntimeHealth};
use crate::motor::driver::Result as DriverResult;
use crate::motor::{
    DirectionPwmDriver, DriverError, Motor, MotorDriver, PortHubDriver, RunState, TwoPinDriver,
    TwoPinPwmDriver,
};
use crate::sim::SimBoard;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("zenoh: {0}")]
    Zenoh(zenoh::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("motor driver: {0}")]
    Driver(#[from] DriverError),
}

/// Everything the loop publishes after one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub status: MotorStatus,
    pub health: RuntimeHealth,
    pub events: Vec<MotorEvent>,
}

pub struct Runtime<C: Clock + Clone> {
    motor: Motor<Box<dyn MotorDriver>, C>,
    clock: C,
    watchdog_ms: Option<u32>,
    cmd_received_at: Option<u32>,
    stale: bool,
    fault: bool,
    events: Rc<RefCell<Vec<MotorEvent>>>,
}

impl<C: Clock + Clone> Runtime<C> {
    pub fn new(driver: Box<dyn MotorDriver>, clock: C, watchdog: Option<Duration>) -> Self {
        Self {
            motor: Motor::new(driver, clock.clone()),
            clock,
            watchdog_ms: watchdog.map(|t| t.as_millis().min(u32::MAX as u128) as u32),
            cmd_received_at: None, // stale until first cmd
            stale: false,
            fault: false,
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Apply an incoming command to the motor
    pub fn on_command(&mut self, cmd: MotorCommand) {
        info!("Received command: {:?}", &cmd);
        self.cmd_received_at = Some(self.clock.now_ms());
        self.stale = false;

        let result = match cmd {
            MotorCommand::Go { direction } => self.motor.go(direction),
            MotorCommand::GoFor {
                duration_ms,
                direction,
            } => {
                let events = Rc::clone(&self.events);
                self.motor.go_for_then(duration_ms, direction, move |_| {
                    events
                        .borrow_mut()
                        .push(MotorEvent::RunComplete { direction })
                })
            }
            MotorCommand::SetSpeed { percent } => {
                // Stopped motor or rejected speed: no driver call, health unchanged
                let reissues_go = self.motor.is_running();
                match self.motor.set_speed(percent) {
                    Ok(None) => {
                        warn!("Ignoring invalid speed {}%", percent);
                        return;
                    }
                    Ok(Some(_)) if !reissues_go => return,
                    other => other.map(|_| ()),
                }
            }
            MotorCommand::Stop => self.motor.stop(),
        };
        self.record(result);
    }

    /// Poll the motor, run the watchdog, and collect what to publish
    pub fn tick(&mut self) -> TickReport {
        // Idle polls say nothing about driver health, only failures count
        if let Err(e) = self.motor.update() {
            self.record(Err(e));
        }
        self.check_watchdog();

        TickReport {
            status: self.status(),
            health: self.health(),
            events: self.events.borrow_mut().drain(..).collect(),
        }
    }

    pub fn status(&self) -> MotorStatus {
        MotorStatus::from(&self.motor)
    }

    pub fn health(&self) -> RuntimeHealth {
        if self.fault {
            RuntimeHealth::DriverFault
        } else if self.stale || self.cmd_received_at.is_none() {
            RuntimeHealth::CmdStale
        } else {
            RuntimeHealth::Ok
        }
    }

    /// Stop the motor before exiting
    pub fn shutdown(&mut self) -> DriverResult<()> {
        info!("Stopping motor for shutdown");
        self.motor.stop()
    }

    fn check_watchdog(&mut self) {
        let Some(timeout) = self.watchdog_ms else {
            return;
        };
        if !matches!(self.motor.state(), RunState::Running { .. }) {
            return;
        }
        let now = self.clock.now_ms();
        let age = self
            .cmd_received_at
            .map_or(u32::MAX, |at| elapsed_ms(at, now));

        if age > timeout {
            // Watchdog triggered - stop the motor
            warn!("Command stale ({} ms old), stopping motor", age);
            let result = self.motor.stop();
            self.record(result);
            self.stale = true;
        }
    }

    // A fault clears on the next successful driver call
    fn record(&mut self, result: DriverResult<()>) {
        match result {
            Ok(()) => self.fault = false,
            Err(e) => {
                if !self.fault {
                    warn!("Motor driver fault: {}", e);
                }
                self.fault = true;
            }
        }
    }
}

/// Build the selected backend on a simulated board
pub fn build_driver(
    options: &RuntimeOptions,
    board: &SimBoard,
) -> DriverResult<Box<dyn MotorDriver>> {
    let driver: Box<dyn MotorDriver> = match options.backend {
        Backend::TwoPin => Box::new(TwoPinDriver::new(board.output("in1"), board.output("in2"))?),
        Backend::TwoPinPwm => Box::new(TwoPinPwmDriver::new(board.pwm("in1"), board.pwm("in2"))?),
        Backend::DirectionPwm => Box::new(DirectionPwmDriver::new(
            board.output("dir"),
            board.pwm("pwm"),
        )?),
        Backend::PortHub => {
            let mut hub =
                PortHubDriver::with_address(board.bus(), options.hub_port, options.hub_address);
            hub.stop()?;
            Box::new(hub)
        }
    };
    info!("Backend {:?} ready", options.backend);
    Ok(driver)
}

pub async fn run(options: RuntimeOptions) -> Result<(), RuntimeError> {
    let board = SimBoard::new();
    let driver = build_driver(&options, &board)?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default())
        .await
        .map_err(RuntimeError::Zenoh)?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session
        .declare_subscriber(TOPIC_CMD)
        .await
        .map_err(RuntimeError::Zenoh)?;
    let pub_state = session
        .declare_publisher(TOPIC_STATE)
        .await
        .map_err(RuntimeError::Zenoh)?;
    let pub_health = session
        .declare_publisher(TOPIC_HEALTH)
        .await
        .map_err(RuntimeError::Zenoh)?;
    let pub_event = session
        .declare_publisher(TOPIC_EVENT)
        .await
        .map_err(RuntimeError::Zenoh)?;

    let mut runtime = Runtime::new(driver, SystemClock::new(), options.watchdog);
    let mut tick = interval(options.loop_period());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        "Runtime started: {}Hz loop, watchdog {:?}",
        options.loop_hz, options.watchdog
    );
    info!("Subscribed to: {}", TOPIC_CMD);
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_STATE, TOPIC_HEALTH, TOPIC_EVENT
    );

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut shutdown => {
                runtime.shutdown()?;
                return Ok(());
            }
        }

        // 1. Drain all pending commands (non-blocking), apply in order
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<MotorCommand>(&payload) {
                Ok(cmd) => runtime.on_command(cmd),
                Err(e) => warn!("Failed to parse command: {}", e),
            }
        }

        // 2. Advance timers and watchdog
        let report = runtime.tick();

        // 3. Publish status, health, events
        pub_state
            .put(serde_json::to_string(&report.status)?)
            .await
            .map_err(RuntimeError::Zenoh)?;
        pub_health
            .put(serde_json::to_string(&report.health)?)
            .await
            .map_err(RuntimeError::Zenoh)?;
        for event in &report.events {
            info!("Publishing event: {:?}", event);
            pub_event
                .put(serde_json::to_string(event)?)
                .await
                .map_err(RuntimeError::Zenoh)?;
        }
    }
}
