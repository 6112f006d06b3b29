// Keyboard teleop: A/D hold to run, T timed run, R/F speed, Space stop, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use dcmotor_runtime::config::TOPIC_CMD;
use dcmotor_runtime::messages::MotorCommand;
use dcmotor_runtime::motor::Direction;

const SPEEDS: [i32; 4] = [25, 50, 75, 100]; // percent
const TIMED_RUN_MS: u32 = 1_000;
const INPUT_TIMEOUT_MS: u64 = 100; // Stop after this much time with no movement key held

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD).await?;

    info!("Controls: A/D=run ccw/cw, T=timed run, R/F=speed, Space=stop, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn send(
    publisher: &zenoh::pubsub::Publisher<'_>,
    cmd: &MotorCommand,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    publisher.put(serde_json::to_string(cmd)?).await?;
    Ok(())
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = SPEEDS.len() - 1;
    let mut direction = Direction::Clockwise;

    // Some(_) while a movement key is held
    let mut last_movement_input: Option<Instant> = None;

    let cmd = MotorCommand::SetSpeed {
        percent: SPEEDS[speed_idx],
    };
    send(publisher, &cmd).await?;
    print_speed(speed_idx);

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    // Hold to run, refreshes the runtime watchdog
                    KeyCode::Char('a') if pressed => {
                        direction = Direction::CounterClockwise;
                        last_movement_input = Some(Instant::now());
                    }
                    KeyCode::Char('d') if pressed => {
                        direction = Direction::Clockwise;
                        last_movement_input = Some(Instant::now());
                    }

                    // Fire and forget, the runtime ends it
                    KeyCode::Char('t') if pressed => {
                        last_movement_input = None;
                        info!("Timed run {:?} for {} ms", direction, TIMED_RUN_MS);
                        send(
                            publisher,
                            &MotorCommand::GoFor {
                                duration_ms: TIMED_RUN_MS,
                                direction,
                            },
                        )
                        .await?;
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(SPEEDS.len() - 1);
                        let cmd = MotorCommand::SetSpeed {
                            percent: SPEEDS[speed_idx],
                        };
                        send(publisher, &cmd).await?;
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        let cmd = MotorCommand::SetSpeed {
                            percent: SPEEDS[speed_idx],
                        };
                        send(publisher, &cmd).await?;
                        print_speed(speed_idx);
                    }

                    KeyCode::Char(' ') if pressed => {
                        last_movement_input = None;
                        send(publisher, &MotorCommand::Stop).await?;
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => {
                        send(publisher, &MotorCommand::Stop).await?;
                        break;
                    }

                    _ => {}
                }
            }
        }

        // Keep going while held, stop once when released
        match last_movement_input {
            Some(at) if at.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) => {
                last_movement_input = None;
                send(publisher, &MotorCommand::Stop).await?;
            }
            Some(_) => send(publisher, &MotorCommand::Go { direction }).await?,
            None => {}
        }
    }

    Ok(())
}

fn print_speed(idx: usize) {
    info!("Speed: {}%", SPEEDS[idx]);
}
