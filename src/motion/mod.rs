// Motion pipeline for the three-wheel omni base
//
// Provides:
// - Inverse-kinematics mixing (drive intent -> signed wheel ratios)
// - Dispatch of per-wheel motor commands over latest-value-wins channels

pub mod dispatcher;
pub mod mixer;

pub use dispatcher::{MotorCommand, WheelDispatcher};
pub use mixer::{damp_correction, mix, DriveIntent, WheelMotion};
