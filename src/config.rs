// Loop rates, topics and control constants
use std::time::Duration;

// Control loop frequency
pub const LOOP_HZ: u64 = 50;

// Sensor watchdog: autonomous modes stop if no fused frame arrives within this
pub const SENSOR_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD: &str = "tribot/cmd"; // single-byte commands
pub const TOPIC_SENSORS: &str = "tribot/sensors"; // raw ranges + yaw
pub const TOPIC_TELEMETRY: &str = "tribot/state/telemetry"; // status projection
pub const TOPIC_MAP: &str = "tribot/state/map"; // exploration path
pub const TOPIC_WHEELS: [&str; 3] = [
    // actuation, one topic per wheel node
    "tribot/wheel/1",
    "tribot/wheel/2",
    "tribot/wheel/3",
];

// Distance thresholds (cm)
pub const SAFE_DISTANCE: f32 = 30.0;
pub const TOO_CLOSE: f32 = 15.0;
pub const WALL_DISTANCE: f32 = 25.0;

// Speed ratios for the autonomous modes
pub const MAX_SPEED: f32 = 1.0;
pub const MIN_SPEED: f32 = 0.6;

// Global PWM cap applied when wheel ratios become motor commands
pub const DEFAULT_SPEED_CAP: u16 = 255;

// Heading lock. Gains are negative: a positive heading error (drifted
// clockwise) needs a counter-clockwise correction.
pub const HEADING_KP: f32 = -0.8;
pub const HEADING_KI: f32 = -0.015;
pub const HEADING_KD: f32 = -0.03;
pub const HEADING_OUT_MIN: f32 = -0.5;
pub const HEADING_OUT_MAX: f32 = 0.5;
pub const HEADING_DEADBAND_DEG: f32 = 5.0;

// Sensor fusion
pub const FILTER_WINDOW: usize = 5;
pub const DISTANCE_EPSILON: f32 = 0.01;
pub const SNAP_BAND_DEG: f32 = 5.0;

// Wall following steering gain
pub const WALL_STEER_GAIN: f32 = 0.03;

// Timed maneuvers (the mode logic never sleeps; it parks a deadline instead)
pub const REVERSE_DURATION: Duration = Duration::from_millis(300);
pub const STEER_HOLD: Duration = Duration::from_millis(200);
pub const TURN_DURATION: Duration = Duration::from_millis(500);

// Room mapping
pub const MAP_STEP_SCALE: f32 = 0.1; // cm of clearance -> grid units advanced
pub const MAP_PUBLISH_INTERVAL: Duration = Duration::from_secs(2);
