// Control runtime for the tribot three-wheel omnidirectional base
//
// Provides:
// - Sensor fusion (ultrasonic ranges + compass yaw -> robot-frame distances)
// - Heading-locked omniwheel mixing with PID correction
// - Drive-mode state machine (manual, avoidance, wall following, mapping)
// - Zenoh task wiring between teleop, sensor nodes and the wheel nodes

pub mod config;
pub mod control;
pub mod heading;
pub mod messages;
pub mod motion;
pub mod runtime;
