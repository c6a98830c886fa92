// Room-mapping sub-machine and exploration path bookkeeping
//
// A frontier-heuristic wall-follower, not SLAM: advance until a forward
// obstacle forces a timed right turn, alternating forward/turn, while
// dead-reckoning the visited path from heading + clearance deltas.

use std::time::Instant;

use crate::config::{
    MAP_PUBLISH_INTERVAL, MAP_STEP_SCALE, SAFE_DISTANCE, TOO_CLOSE, TURN_DURATION,
};
use crate::heading::FusedFrame;

/// What the mapper wants the controller to do for this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapAction {
    /// Drive forward and log the position.
    Advance,
    /// Rotate right in place.
    Turn,
    /// Back away from an obstacle that got too close.
    Reverse,
    /// Keep the current command; a decision follows on the next frame.
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    Forward,
    TurnRight { until: Instant },
    Decide,
}

#[derive(Debug)]
pub struct RoomMapper {
    state: MapState,
    path: Vec<(f32, f32)>,
    last_publish: Option<Instant>,
}

impl RoomMapper {
    pub fn new() -> Self {
        Self {
            state: MapState::Decide,
            path: Vec::new(),
            last_publish: None,
        }
    }

    /// Restart exploration from the origin.
    pub fn begin(&mut self) {
        self.state = MapState::Decide;
        self.path.clear();
        self.path.push((0.0, 0.0));
        self.last_publish = None;
    }

    /// Advance the sub-machine by one fused frame.
    ///
    /// The emergency branch fires first: forward clearance below the
    /// too-close threshold reverses and resets to Decide no matter which
    /// sub-state was active.
    pub fn plan(&mut self, frame: &FusedFrame, now: Instant) -> MapAction {
        if frame.north < TOO_CLOSE {
            self.state = MapState::Decide;
            return MapAction::Reverse;
        }

        match self.state {
            MapState::Forward => {
                if frame.north > SAFE_DISTANCE {
                    self.log_position(frame);
                    MapAction::Advance
                } else {
                    self.state = MapState::TurnRight {
                        until: now + TURN_DURATION,
                    };
                    MapAction::Turn
                }
            }
            MapState::TurnRight { until } => {
                if now >= until {
                    self.state = MapState::Decide;
                    MapAction::Hold
                } else {
                    MapAction::Turn
                }
            }
            MapState::Decide => {
                if frame.north > SAFE_DISTANCE {
                    self.state = MapState::Forward;
                    self.log_position(frame);
                    MapAction::Advance
                } else {
                    self.state = MapState::TurnRight {
                        until: now + TURN_DURATION,
                    };
                    MapAction::Turn
                }
            }
        }
    }

    /// Dead-reckon one step along the current heading.
    fn log_position(&mut self, frame: &FusedFrame) {
        let angle = frame.heading.to_radians();
        let dx = angle.cos() * frame.north * MAP_STEP_SCALE;
        let dy = angle.sin() * frame.north * MAP_STEP_SCALE;
        if let Some(&(x, y)) = self.path.last() {
            self.path.push((x + dx, y + dy));
        }
    }

    pub fn path(&self) -> &[(f32, f32)] {
        &self.path
    }

    pub fn state(&self) -> MapState {
        self.state
    }

    /// True at most once per publish interval; arms the throttle as a side
    /// effect.
    pub fn publish_due(&mut self, now: Instant) -> bool {
        let due = match self.last_publish {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= MAP_PUBLISH_INTERVAL,
        };
        if due {
            self.last_publish = Some(now);
        }
        due
    }
}

impl Default for RoomMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn frame(north: f32, heading: f32) -> FusedFrame {
        FusedFrame {
            heading,
            north,
            east: 50.0,
            south: 50.0,
            west: 50.0,
        }
    }

    #[test]
    fn clear_path_advances_and_logs() {
        let mut mapper = RoomMapper::new();
        mapper.begin();
        let now = Instant::now();

        assert_eq!(mapper.plan(&frame(100.0, 0.0), now), MapAction::Advance);
        assert_eq!(mapper.state(), MapState::Forward);
        // origin + one step of clearance * scale along heading 0
        assert_eq!(mapper.path().len(), 2);
        let (x, y) = mapper.path()[1];
        assert!((x - 10.0).abs() < 1e-4);
        assert!(y.abs() < 1e-4);
    }

    #[test]
    fn blocked_path_turns_for_the_configured_time() {
        let mut mapper = RoomMapper::new();
        mapper.begin();
        let now = Instant::now();

        assert_eq!(mapper.plan(&frame(20.0, 0.0), now), MapAction::Turn);
        assert!(matches!(mapper.state(), MapState::TurnRight { .. }));

        // still turning halfway through
        let mid = now + TURN_DURATION / 2;
        assert_eq!(mapper.plan(&frame(20.0, 0.0), mid), MapAction::Turn);

        // deadline passed: hand back to Decide
        let after = now + TURN_DURATION + Duration::from_millis(1);
        assert_eq!(mapper.plan(&frame(20.0, 0.0), after), MapAction::Hold);
        assert_eq!(mapper.state(), MapState::Decide);
    }

    #[test]
    fn emergency_reverse_overrides_any_substate() {
        let mut mapper = RoomMapper::new();
        mapper.begin();
        let now = Instant::now();

        // get into Forward first
        mapper.plan(&frame(100.0, 0.0), now);
        assert_eq!(mapper.state(), MapState::Forward);

        assert_eq!(mapper.plan(&frame(5.0, 0.0), now), MapAction::Reverse);
        assert_eq!(mapper.state(), MapState::Decide);

        // same from inside a turn
        mapper.plan(&frame(20.0, 0.0), now);
        assert!(matches!(mapper.state(), MapState::TurnRight { .. }));
        assert_eq!(mapper.plan(&frame(5.0, 0.0), now), MapAction::Reverse);
        assert_eq!(mapper.state(), MapState::Decide);
    }

    #[test]
    fn publish_throttle_fires_at_interval() {
        let mut mapper = RoomMapper::new();
        mapper.begin();
        let now = Instant::now();

        assert!(mapper.publish_due(now));
        assert!(!mapper.publish_due(now + Duration::from_secs(1)));
        assert!(mapper.publish_due(now + MAP_PUBLISH_INTERVAL));
    }
}
