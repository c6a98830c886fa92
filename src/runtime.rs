// Task wiring: zenoh ingestion, the control loop, wheel actuation
//
// One control task owns the drive-mode controller; command and sensor
// subscribers feed it over a single mpsc channel so every mutation is
// serialized. Each wheel node gets its own actuation task blocking on a
// single-slot watch channel, so a slow wheel only ever sees the newest
// command.

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{
    DEFAULT_SPEED_CAP, LOOP_HZ, SENSOR_TIMEOUT, TOPIC_CMD, TOPIC_MAP, TOPIC_SENSORS,
    TOPIC_TELEMETRY, TOPIC_WHEELS,
};
use crate::control::DriveModeController;
use crate::heading::HeadingFilter;
use crate::messages::{Command, MapSnapshot, SensorReport, Telemetry};
use crate::motion::{MotorCommand, WheelDispatcher};

/// Runtime flags from the command line.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Log wheel commands instead of publishing them to the wheel nodes.
    pub dry_run: bool,
    /// Initial global PWM speed cap.
    pub speed_cap: u16,
    /// Disable the moving-average smoothing of raw sensor inputs.
    pub no_smoothing: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            speed_cap: DEFAULT_SPEED_CAP,
            no_smoothing: false,
        }
    }
}

/// Everything the control loop reacts to, funneled into one queue.
enum ControlEvent {
    Command(Command),
    Sensors(SensorReport),
}

pub async fn run(options: RuntimeOptions) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let (event_tx, mut event_rx) = mpsc::channel::<ControlEvent>(32);

    let (dispatcher, wheel_receivers) = WheelDispatcher::new();
    let (telemetry_tx, telemetry_rx) = watch::channel(Telemetry::startup(options.speed_cap));
    let (map_tx, map_rx) = watch::channel(None::<MapSnapshot>);

    // one actuation task per wheel, each blocking on its own channel
    for (topic, receiver) in TOPIC_WHEELS.into_iter().zip(wheel_receivers) {
        tokio::spawn(wheel_task(
            session.clone(),
            topic,
            receiver,
            options.dry_run,
        ));
    }

    // command ingestion: inbound bytes -> decoded commands
    {
        let session = session.clone();
        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            let subscriber = match session.declare_subscriber(TOPIC_CMD).await {
                Ok(subscriber) => subscriber,
                Err(e) => {
                    warn!("Failed to declare command subscriber: {}", e);
                    return;
                }
            };
            while let Ok(sample) = subscriber.recv_async().await {
                let payload = sample.payload().to_bytes();
                match Command::from_payload(&payload) {
                    Ok(command) => {
                        if event_tx.send(ControlEvent::Command(command)).await.is_err() {
                            break;
                        }
                    }
                    // invalid input: ignored, no state change
                    Err(e) => warn!("Dropping command: {}", e),
                }
            }
        });
    }

    // sensor ingestion: raw range/yaw reports
    {
        let session = session.clone();
        tokio::spawn(async move {
            let subscriber = match session.declare_subscriber(TOPIC_SENSORS).await {
                Ok(subscriber) => subscriber,
                Err(e) => {
                    warn!("Failed to declare sensor subscriber: {}", e);
                    return;
                }
            };
            while let Ok(sample) = subscriber.recv_async().await {
                let payload = sample.payload().to_bytes();
                match serde_json::from_slice::<SensorReport>(&payload) {
                    Ok(report) => {
                        if event_tx.send(ControlEvent::Sensors(report)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to parse sensor report: {}", e),
                }
            }
        });
    }

    // telemetry projection -> zenoh
    {
        let session = session.clone();
        let mut telemetry_rx = telemetry_rx;
        tokio::spawn(async move {
            let publisher = match session.declare_publisher(TOPIC_TELEMETRY).await {
                Ok(publisher) => publisher,
                Err(e) => {
                    warn!("Failed to declare telemetry publisher: {}", e);
                    return;
                }
            };
            while telemetry_rx.changed().await.is_ok() {
                let telemetry = *telemetry_rx.borrow_and_update();
                match serde_json::to_string(&telemetry) {
                    Ok(json) => {
                        if let Err(e) = publisher.put(json).await {
                            warn!("Telemetry publish failed: {}", e);
                        }
                    }
                    Err(e) => warn!("Telemetry serialize failed: {}", e),
                }
            }
        });
    }

    // throttled exploration map -> zenoh
    {
        let session = session.clone();
        let mut map_rx = map_rx;
        tokio::spawn(async move {
            let publisher = match session.declare_publisher(TOPIC_MAP).await {
                Ok(publisher) => publisher,
                Err(e) => {
                    warn!("Failed to declare map publisher: {}", e);
                    return;
                }
            };
            while map_rx.changed().await.is_ok() {
                let snapshot = map_rx.borrow_and_update().clone();
                let Some(snapshot) = snapshot else { continue };
                match serde_json::to_string(&snapshot) {
                    Ok(json) => {
                        if let Err(e) = publisher.put(json).await {
                            warn!("Map publish failed: {}", e);
                        }
                    }
                    Err(e) => warn!("Map serialize failed: {}", e),
                }
            }
        });
    }

    let mut controller =
        DriveModeController::new(dispatcher, telemetry_tx, map_tx, options.speed_cap);
    let mut filter = HeadingFilter::new(!options.no_smoothing);
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    // one-shot log latch for the staleness watchdog
    let mut stall_logged = false;

    info!(
        "Runtime started: {}Hz loop, {}ms sensor watchdog, speed cap {}",
        LOOP_HZ,
        SENSOR_TIMEOUT.as_millis(),
        options.speed_cap
    );
    info!("Subscribed to: {}, {}", TOPIC_CMD, TOPIC_SENSORS);
    info!("Publishing to: {}, {}", TOPIC_TELEMETRY, TOPIC_MAP);

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let now = Instant::now();
                match event {
                    Some(ControlEvent::Command(command)) => {
                        info!("Received command: {:?}", command);
                        controller.handle_command(command, now);
                    }
                    Some(ControlEvent::Sensors(report)) => {
                        stall_logged = false;
                        let fused = filter.update(&report);
                        controller.update_sensors(fused, now);
                    }
                    None => break,
                }
            }
            _ = tick.tick() => {
                let now = Instant::now();
                controller.tick(now);
                if controller.enforce_sensor_watchdog(now) && !stall_logged {
                    warn!(
                        "No sensor frame within {:?}, stopping wheels",
                        SENSOR_TIMEOUT
                    );
                    stall_logged = true;
                }
            }
        }
    }

    Ok(())
}

/// One wheel-actuation task: block on the wheel's watch channel, forward the
/// newest command to that wheel's node.
async fn wheel_task(
    session: zenoh::Session,
    topic: &'static str,
    mut receiver: watch::Receiver<MotorCommand>,
    dry_run: bool,
) {
    let publisher = match session.declare_publisher(topic).await {
        Ok(publisher) => publisher,
        Err(e) => {
            warn!("Failed to declare wheel publisher {}: {}", topic, e);
            return;
        }
    };

    while receiver.changed().await.is_ok() {
        let command = *receiver.borrow_and_update();
        if dry_run {
            debug!(topic, ?command, "dry run, wheel command suppressed");
            continue;
        }
        match serde_json::to_string(&command) {
            Ok(json) => {
                if let Err(e) = publisher.put(json).await {
                    warn!("Wheel publish on {} failed: {}", topic, e);
                }
            }
            Err(e) => warn!("Wheel command serialize failed: {}", e),
        }
    }
    debug!(topic, "wheel task exiting");
}
