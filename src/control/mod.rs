// Drive-mode control
//
// Provides:
// - PID controller used for the heading lock
// - Autonomous mode heuristics and the room-mapping sub-machine
// - The single-writer drive-mode controller all events funnel through

pub mod controller;
pub mod modes;
pub mod pid;

pub use controller::{DriveModeController, HeadingState};
pub use pid::PidController;
