// Range/yaw fusion: rotates sensor-fixed distances into the robot frame
//
// The four ultrasonic sensors are mounted facing fixed compass directions.
// Once the robot has turned, "north sensor" no longer means "ahead of the
// robot", so every fused frame rotates the raw readings by -yaw before the
// drive modes compare them.

use crate::config::{DISTANCE_EPSILON, FILTER_WINDOW, SNAP_BAND_DEG};
use crate::messages::SensorReport;

/// Fixed-window mean filter, applied identically to every input channel.
///
/// The window starts zero-filled, so early outputs are biased toward zero.
/// Downstream treats small distances as "obstacle close", which is the safe
/// direction for that bias.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    history: [f32; FILTER_WINDOW],
    index: usize,
}

impl MovingAverage {
    pub fn new() -> Self {
        Self {
            history: [0.0; FILTER_WINDOW],
            index: 0,
        }
    }

    pub fn push(&mut self, value: f32) -> f32 {
        self.history[self.index] = value;
        self.index = (self.index + 1) % FILTER_WINDOW;
        self.history.iter().sum::<f32>() / FILTER_WINDOW as f32
    }
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self::new()
    }
}

/// Distances in the robot's own frame plus the zeroed yaw that produced them.
///
/// Field names keep the sensor labels: `north` is whatever is ahead of the
/// robot right now, `east` to its right, and so on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FusedFrame {
    pub heading: f32,
    pub north: f32,
    pub east: f32,
    pub south: f32,
    pub west: f32,
}

/// Rotate raw sensor-frame distances by the given yaw (degrees).
///
/// Every output carries a small epsilon floor so a literal zero reading (a
/// silent sensor) can never be read as "path clear" downstream.
pub fn rotate_to_robot_frame(
    raw_n: f32,
    raw_e: f32,
    raw_s: f32,
    raw_w: f32,
    yaw: f32,
) -> FusedFrame {
    let radians = yaw.to_radians();
    let (sin, cos) = radians.sin_cos();

    let mut frame = FusedFrame {
        heading: yaw,
        north: (raw_n * cos - raw_w * sin).abs() + DISTANCE_EPSILON,
        east: (raw_e * cos - raw_n * sin).abs() + DISTANCE_EPSILON,
        south: (raw_s * cos - raw_e * sin).abs() + DISTANCE_EPSILON,
        west: (raw_w * cos - raw_s * sin).abs() + DISTANCE_EPSILON,
    };

    // The generic rotation is numerically unstable exactly at the cardinal
    // turns, where the correct answer is a plain permutation of the raw
    // readings. Snap to that permutation inside a narrow band.
    if (yaw - 90.0).abs() <= SNAP_BAND_DEG {
        frame.north = raw_w + DISTANCE_EPSILON;
        frame.east = raw_n + DISTANCE_EPSILON;
        frame.south = raw_e + DISTANCE_EPSILON;
        frame.west = raw_s + DISTANCE_EPSILON;
    } else if (yaw - 180.0).abs() <= SNAP_BAND_DEG {
        frame.north = raw_s + DISTANCE_EPSILON;
        frame.east = raw_w + DISTANCE_EPSILON;
        frame.south = raw_n + DISTANCE_EPSILON;
        frame.west = raw_e + DISTANCE_EPSILON;
    } else if (yaw - 270.0).abs() <= SNAP_BAND_DEG {
        frame.north = raw_e + DISTANCE_EPSILON;
        frame.east = raw_s + DISTANCE_EPSILON;
        frame.south = raw_w + DISTANCE_EPSILON;
        frame.west = raw_n + DISTANCE_EPSILON;
    }

    frame
}

/// Shortest signed angular difference, mapped to [-180, 180).
pub fn wrap_degrees(degrees: f32) -> f32 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

/// Stateful fusion pipeline: optional smoothing, yaw zeroing, frame rotation.
#[derive(Debug)]
pub struct HeadingFilter {
    north: MovingAverage,
    east: MovingAverage,
    south: MovingAverage,
    west: MovingAverage,
    yaw: MovingAverage,
    initial_yaw: Option<f32>,
    smoothing: bool,
}

impl HeadingFilter {
    pub fn new(smoothing: bool) -> Self {
        Self {
            north: MovingAverage::new(),
            east: MovingAverage::new(),
            south: MovingAverage::new(),
            west: MovingAverage::new(),
            yaw: MovingAverage::new(),
            initial_yaw: None,
            smoothing,
        }
    }

    /// Fuse one raw report into a robot-frame distance set.
    ///
    /// The first yaw sample becomes the 0-degree reference: the compass may
    /// point anywhere at power-up, and all headings are relative to it.
    pub fn update(&mut self, report: &SensorReport) -> FusedFrame {
        let (n, e, s, w, raw_yaw) = if self.smoothing {
            (
                self.north.push(report.north),
                self.east.push(report.east),
                self.south.push(report.south),
                self.west.push(report.west),
                self.yaw.push(report.yaw),
            )
        } else {
            (
                report.north,
                report.east,
                report.south,
                report.west,
                report.yaw,
            )
        };

        let initial = *self.initial_yaw.get_or_insert(raw_yaw);
        let yaw = (raw_yaw - initial).rem_euclid(360.0);

        rotate_to_robot_frame(n, e, s, w, yaw)
    }
}
