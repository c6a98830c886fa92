// Per-wheel command dispatch
//
// Each wheel node consumes from its own single-slot watch channel, so a slow
// consumer only ever sees the newest command. Motor actuation is a real-time
// signal, not a work backlog: stale commands are overwritten, never queued.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::mixer::WheelMotion;

/// Wheel ratios below this are treated as a stop rather than a direction.
const STOP_THRESHOLD: f32 = 1e-3;

/// One wheel's actuation command: direction in {-1, 0, 1} and a PWM speed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorCommand {
    pub direction: i8,
    pub speed: u16,
}

impl MotorCommand {
    pub const STOP: Self = Self {
        direction: 0,
        speed: 0,
    };

    /// Convert a signed wheel ratio to a motor command under a PWM cap.
    pub fn from_ratio(ratio: f32, speed_cap: u16) -> Self {
        if ratio.abs() < STOP_THRESHOLD {
            return Self::STOP;
        }
        let direction = if ratio > 0.0 { 1 } else { -1 };
        let speed = (ratio.abs() * speed_cap as f32).round() as u16;
        Self {
            direction,
            speed: speed.min(speed_cap),
        }
    }
}

/// Fans one mixing decision out to the three wheel channels.
///
/// All three sends happen back-to-back from the control-loop context before
/// any wheel task can observe the cycle, so no wheel applies a new command
/// while its siblings still run the previous one.
pub struct WheelDispatcher {
    senders: [watch::Sender<MotorCommand>; 3],
}

impl WheelDispatcher {
    /// Create the dispatcher plus one receiver per wheel task.
    pub fn new() -> (Self, [watch::Receiver<MotorCommand>; 3]) {
        let (tx1, rx1) = watch::channel(MotorCommand::STOP);
        let (tx2, rx2) = watch::channel(MotorCommand::STOP);
        let (tx3, rx3) = watch::channel(MotorCommand::STOP);
        (
            Self {
                senders: [tx1, tx2, tx3],
            },
            [rx1, rx2, rx3],
        )
    }

    /// Deliver one command per wheel for this cycle.
    pub fn dispatch(&self, motion: WheelMotion, speed_cap: u16) {
        let commands = [
            MotorCommand::from_ratio(motion.m1, speed_cap),
            MotorCommand::from_ratio(motion.m2, speed_cap),
            MotorCommand::from_ratio(motion.m3, speed_cap),
        ];
        for (sender, command) in self.senders.iter().zip(commands) {
            // send only fails once every wheel task is gone (shutdown)
            let _ = sender.send(command);
        }
    }

    /// Command all three wheels to stop.
    pub fn stop_all(&self) {
        for sender in &self.senders {
            let _ = sender.send(MotorCommand::STOP);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_conversion_rounds_against_the_cap() {
        assert_eq!(
            MotorCommand::from_ratio(1.0, 255),
            MotorCommand {
                direction: 1,
                speed: 255
            }
        );
        assert_eq!(
            MotorCommand::from_ratio(-0.5, 255),
            MotorCommand {
                direction: -1,
                speed: 128
            }
        );
        assert_eq!(MotorCommand::from_ratio(0.0, 255), MotorCommand::STOP);
        // floating error above 1.0 still respects the cap
        assert_eq!(MotorCommand::from_ratio(1.0000001, 255).speed, 255);
    }

    #[test]
    fn dispatch_converts_each_wheel() {
        let (dispatcher, receivers) = WheelDispatcher::new();
        dispatcher.dispatch(
            WheelMotion {
                m1: 0.826,
                m2: -0.6,
                m3: -1.0,
            },
            255,
        );

        assert_eq!(
            *receivers[0].borrow(),
            MotorCommand {
                direction: 1,
                speed: 211
            }
        );
        assert_eq!(
            *receivers[1].borrow(),
            MotorCommand {
                direction: -1,
                speed: 153
            }
        );
        assert_eq!(
            *receivers[2].borrow(),
            MotorCommand {
                direction: -1,
                speed: 255
            }
        );
    }

    #[test]
    fn latest_command_wins() {
        let (dispatcher, mut receivers) = WheelDispatcher::new();
        dispatcher.dispatch(
            WheelMotion {
                m1: 1.0,
                m2: 1.0,
                m3: 1.0,
            },
            255,
        );
        dispatcher.dispatch(
            WheelMotion {
                m1: -0.2,
                m2: -0.2,
                m3: -0.2,
            },
            255,
        );

        // a late consumer only ever sees the newest command
        let seen = *receivers[0].borrow_and_update();
        assert_eq!(
            seen,
            MotorCommand {
                direction: -1,
                speed: 51
            }
        );
        assert!(!receivers[0].has_changed().unwrap());
    }

    #[test]
    fn stop_all_zeroes_every_wheel() {
        let (dispatcher, receivers) = WheelDispatcher::new();
        dispatcher.dispatch(
            WheelMotion {
                m1: 0.4,
                m2: 0.4,
                m3: 0.4,
            },
            255,
        );
        dispatcher.stop_all();
        for receiver in &receivers {
            assert_eq!(*receiver.borrow(), MotorCommand::STOP);
        }
    }
}
