// Keyboard teleop: WASD translate/strafe, Q/E rotate, Space stop,
// 0-3 drive mode, Esc quit
//
// Publishes single-byte commands to the runtime's command topic; the robot
// latches motion until it receives a stop or a new command.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::Duration;
use tracing::info;

use tribot_runtime::config::TOPIC_CMD;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD).await?;

    info!("Controls: WASD=move, Q/E=rotate, Space=stop, 0-3=mode, Esc=quit");
    info!("Modes: 0=manual, 1=avoidance, 2=wall follow, 3=mapping");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        // poll so Ctrl+C and Esc stay responsive
        if !event::poll(Duration::from_millis(20))? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press && kind != KeyEventKind::Repeat {
            continue;
        }

        let byte = match code {
            KeyCode::Char(c @ ('w' | 'a' | 's' | 'd' | 'q' | 'e')) => c as u8,
            KeyCode::Char(c @ '0'..='3') => c as u8,
            KeyCode::Char(' ') => b' ',
            KeyCode::Esc => break,
            _ => continue,
        };

        publisher.put(vec![byte]).await?;
        info!("Sent command: {:?}", byte as char);
    }

    // leave the robot stopped on exit
    publisher.put(vec![b' ']).await?;
    Ok(())
}
