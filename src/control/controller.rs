// Drive-mode state machine and heading lock
//
// Single-writer actor: the runtime funnels every command byte, fused sensor
// frame and timer tick through one instance on one task, so the PID memory
// and mode state never see concurrent mutation.

use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::{
    HEADING_DEADBAND_DEG, HEADING_KD, HEADING_KI, HEADING_KP, HEADING_OUT_MAX, HEADING_OUT_MIN,
    MAX_SPEED, MIN_SPEED, REVERSE_DURATION, SAFE_DISTANCE, SENSOR_TIMEOUT, STEER_HOLD, TOO_CLOSE,
    WALL_DISTANCE, WALL_STEER_GAIN,
};
use crate::heading::{wrap_degrees, FusedFrame};
use crate::messages::{Command, DriveMode, MapSnapshot, Telemetry};
use crate::motion::{damp_correction, mix, DriveIntent, WheelDispatcher};

use super::modes::{MapAction, RoomMapper};
use super::pid::PidController;

/// Current and latched heading plus whether the lock is driving corrections.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingState {
    pub current: f32,
    pub target: f32,
    pub lock_engaged: bool,
}

pub struct DriveModeController {
    mode: DriveMode,
    heading: HeadingState,
    pid: PidController,
    /// Latched translational intent, re-mixed on every heading correction.
    intent: DriveIntent,
    speed_cap: u16,
    dispatcher: WheelDispatcher,
    /// Latest fused distances, robot frame.
    frame: FusedFrame,
    /// While set, autonomous re-planning is suppressed (timed maneuver).
    maneuver_until: Option<Instant>,
    /// When the last fused frame arrived; feeds the staleness watchdog.
    last_frame_at: Instant,
    mapper: RoomMapper,
    telemetry: watch::Sender<Telemetry>,
    map: watch::Sender<Option<MapSnapshot>>,
}

impl DriveModeController {
    pub fn new(
        dispatcher: WheelDispatcher,
        telemetry: watch::Sender<Telemetry>,
        map: watch::Sender<Option<MapSnapshot>>,
        speed_cap: u16,
    ) -> Self {
        Self {
            mode: DriveMode::Manual,
            heading: HeadingState::default(),
            pid: PidController::new(
                HEADING_KP,
                HEADING_KI,
                HEADING_KD,
                HEADING_OUT_MIN,
                HEADING_OUT_MAX,
            ),
            intent: DriveIntent::default(),
            speed_cap,
            dispatcher,
            frame: FusedFrame::default(),
            maneuver_until: None,
            last_frame_at: Instant::now(),
            mapper: RoomMapper::new(),
            telemetry,
            map,
        }
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn heading(&self) -> HeadingState {
        self.heading
    }

    pub fn set_speed_cap(&mut self, speed_cap: u16) {
        self.speed_cap = speed_cap;
        self.publish_status();
    }

    /// Process one decoded teleop command.
    pub fn handle_command(&mut self, command: Command, now: Instant) {
        if let Command::SetMode(mode) = command {
            self.set_drive_mode(mode, now);
            return;
        }

        // movement keys only apply in manual mode; stop always applies
        if self.mode != DriveMode::Manual && command != Command::Stop {
            debug!(?command, mode = ?self.mode, "movement command ignored outside manual mode");
            return;
        }

        match command {
            Command::Forward => self.begin_straight(DriveIntent::forward(1.0)),
            Command::Backward => self.begin_straight(DriveIntent::reverse(1.0)),
            Command::StrafeLeft => self.begin_straight(DriveIntent::translate(1.0, 0.0)),
            Command::StrafeRight => self.begin_straight(DriveIntent::translate(-1.0, 0.0)),
            Command::RotateLeft => self.begin_rotation(-1.0),
            Command::RotateRight => self.begin_rotation(1.0),
            Command::Stop => self.stop_all(),
            Command::SetMode(_) => {}
        }

        self.publish_status();
    }

    /// Switch drive mode. Wheels stop and lock/PID state clears before the
    /// new mode's logic can run.
    pub fn set_drive_mode(&mut self, mode: DriveMode, _now: Instant) {
        info!(?mode, "drive mode change");
        if mode == DriveMode::RoomMapping {
            self.mapper.begin();
        }
        self.mode = mode;
        self.stop_all();
        self.pid.reset();
        self.publish_status();
    }

    /// Zero all wheels and drop any latched motion state.
    pub fn stop_all(&mut self) {
        self.dispatcher.stop_all();
        self.heading.lock_engaged = false;
        self.intent = DriveIntent::default();
        self.maneuver_until = None;
    }

    /// Consume one fused sensor frame. Heading correction is event-driven by
    /// sensor arrival, not polled: every yaw sample can re-mix the wheels.
    pub fn update_sensors(&mut self, frame: FusedFrame, now: Instant) {
        self.frame = frame;
        self.last_frame_at = now;
        self.on_heading(frame.heading, now);
        if self.mode != DriveMode::Manual {
            self.autonomous_drive(now);
        }
        self.publish_status();
    }

    /// Periodic tick: expire timed maneuvers and let the active mode
    /// re-plan from the last frame.
    pub fn tick(&mut self, now: Instant) {
        if let Some(deadline) = self.maneuver_until {
            if now >= deadline {
                self.maneuver_until = None;
                if self.mode != DriveMode::Manual {
                    self.autonomous_drive(now);
                }
            }
        }
    }

    /// Sensor staleness watchdog: an autonomous mode without a fresh fused
    /// frame is driving blind, so the wheels stop until frames resume.
    /// Manual mode keeps its latched command. Returns true while the
    /// watchdog is holding the wheels stopped.
    pub fn enforce_sensor_watchdog(&mut self, now: Instant) -> bool {
        if self.mode == DriveMode::Manual {
            return false;
        }
        if now.saturating_duration_since(self.last_frame_at) <= SENSOR_TIMEOUT {
            return false;
        }
        self.stop_all();
        true
    }

    fn begin_straight(&mut self, intent: DriveIntent) {
        self.heading.target = self.heading.current;
        self.heading.lock_engaged = true;
        self.pid.reset();
        self.pid.set_target(self.heading.target);
        self.intent = intent;
        self.drive(intent);
    }

    fn begin_rotation(&mut self, rotation: f32) {
        self.heading.lock_engaged = false;
        self.intent = DriveIntent::rotate(rotation);
        self.drive(self.intent);
    }

    fn on_heading(&mut self, heading: f32, now: Instant) {
        self.heading.current = heading;
        if !self.heading.lock_engaged {
            return;
        }

        // shortest angular error, so 359 -> 1 corrects through 0 rather than
        // whipping the robot the long way round
        let error = wrap_degrees(heading - self.heading.target);
        if error.abs() > HEADING_DEADBAND_DEG {
            let input = self.heading.target + error;
            let correction = self.pid.compute_at(input, now);
            let rotation = damp_correction(correction);
            debug!(error, rotation, "heading correction");
            self.drive(self.intent.with_rotation(rotation));
        } else {
            self.drive(self.intent);
        }
    }

    fn autonomous_drive(&mut self, now: Instant) {
        // a running timed maneuver holds its command; only the emergency
        // clearance check may preempt it
        let emergency = self.frame.north < TOO_CLOSE;
        if self.in_maneuver(now) && !emergency {
            return;
        }

        match self.mode {
            DriveMode::Manual => {}
            DriveMode::ObstacleAvoidance => self.avoid_obstacles(now),
            DriveMode::WallFollowing => self.follow_right_wall(),
            DriveMode::RoomMapping => self.explore_room(now),
        }
    }

    fn avoid_obstacles(&mut self, now: Instant) {
        let forward = self.frame.north;
        if forward < TOO_CLOSE {
            self.drive(DriveIntent::reverse(MAX_SPEED / 2.0));
            self.maneuver_until = Some(now + REVERSE_DURATION);
        } else if forward > SAFE_DISTANCE {
            self.drive(DriveIntent::forward(MAX_SPEED));
        } else {
            // ease forward while steering toward the freer side
            let rotation = if self.frame.east > self.frame.west {
                0.7
            } else {
                -0.7
            };
            self.drive(DriveIntent::forward(MIN_SPEED).with_rotation(rotation));
            self.maneuver_until = Some(now + STEER_HOLD);
        }
    }

    fn follow_right_wall(&mut self) {
        let error = self.frame.east - WALL_DISTANCE;
        let steering = (error * WALL_STEER_GAIN).clamp(-0.3, 0.3);
        let speed = if self.frame.north > SAFE_DISTANCE {
            MAX_SPEED
        } else if self.frame.north > TOO_CLOSE {
            MAX_SPEED * 0.7
        } else {
            0.0
        };
        self.drive(DriveIntent::forward(speed).with_rotation(steering));
    }

    fn explore_room(&mut self, now: Instant) {
        match self.mapper.plan(&self.frame, now) {
            MapAction::Advance => self.drive(DriveIntent::forward(0.9)),
            MapAction::Turn => self.drive(DriveIntent::rotate(0.8)),
            MapAction::Reverse => {
                self.drive(DriveIntent::reverse(0.9));
                self.maneuver_until = Some(now + REVERSE_DURATION);
            }
            MapAction::Hold => {}
        }

        if self.mapper.publish_due(now) {
            let snapshot = MapSnapshot {
                path: self.mapper.path().to_vec(),
                n: self.frame.north,
                e: self.frame.east,
                w: self.frame.west,
                y: self.heading.current,
            };
            let _ = self.map.send(Some(snapshot));
        }
    }

    fn drive(&mut self, intent: DriveIntent) {
        let motion = mix(intent);
        self.dispatcher.dispatch(motion, self.speed_cap);
    }

    fn in_maneuver(&self, now: Instant) -> bool {
        self.maneuver_until.is_some_and(|deadline| now < deadline)
    }

    fn publish_status(&self) {
        let _ = self.telemetry.send(Telemetry {
            mode: self.mode,
            speed: self.speed_cap,
            heading: self.heading.current,
        });
    }
}
