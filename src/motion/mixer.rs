// Omniwheel mixing for the tribot three-wheel base
//
// Converts a body-frame drive intent (x, y, rotation) to signed per-wheel
// drive ratios. The dominant manual directions use hand-tuned presets; every
// other input goes through the generic mix with per-wheel compensation.

/// Body-frame drive intent. All components are normalized to [-1, 1].
///
/// Sign convention follows the teleop mapping: forward is `direction_y = -1`,
/// strafe left is `direction_x = 1`, positive rotation is clockwise.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveIntent {
    pub direction_x: f32,
    pub direction_y: f32,
    pub rotation: f32,
}

impl DriveIntent {
    pub fn translate(direction_x: f32, direction_y: f32) -> Self {
        Self {
            direction_x,
            direction_y,
            rotation: 0.0,
        }
    }

    pub fn rotate(rotation: f32) -> Self {
        Self {
            direction_x: 0.0,
            direction_y: 0.0,
            rotation,
        }
    }

    /// Forward translation at the given speed ratio.
    pub fn forward(speed: f32) -> Self {
        Self::translate(0.0, -speed)
    }

    /// Reverse translation at the given speed ratio.
    pub fn reverse(speed: f32) -> Self {
        Self::translate(0.0, speed)
    }

    /// The same translation with a different rotation term.
    pub fn with_rotation(self, rotation: f32) -> Self {
        Self { rotation, ..self }
    }
}

/// Normalized signed drive ratios for the three wheels,
/// max(|m1|,|m2|,|m3|) <= 1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelMotion {
    pub m1: f32,
    pub m2: f32,
    pub m3: f32,
}

impl WheelMotion {
    pub const ZERO: Self = Self {
        m1: 0.0,
        m2: 0.0,
        m3: 0.0,
    };

    pub fn max_magnitude(&self) -> f32 {
        self.m1.abs().max(self.m2.abs()).max(self.m3.abs())
    }
}

/// Per-wheel mechanical compensation. Wheel 2 runs hot on this chassis.
const WHEEL_COMP: [f32; 3] = [1.0, 0.6, 1.0];

/// Inputs must match a preset this closely before the tuned constants apply.
const PRESET_AXIS_MIN: f32 = 0.9;
const PRESET_AXIS_MAX: f32 = 0.1;
const PRESET_ROT_EPSILON: f32 = 0.01;

/// The six canonical manual-drive cases with hand-tuned wheel ratios.
///
/// The tuned constants deliberately do not lie on the generic formula's
/// output surface; they were calibrated on hardware for repeatable straight
/// runs and stay authoritative over the formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preset {
    Forward,
    Backward,
    Left,
    Right,
    RotateLeft,
    RotateRight,
}

impl Preset {
    fn detect(intent: DriveIntent) -> Option<Self> {
        let dx = intent.direction_x;
        let dy = intent.direction_y;
        let rot = intent.rotation;

        if rot.abs() < PRESET_ROT_EPSILON {
            if dy < -PRESET_AXIS_MIN && dx.abs() < PRESET_AXIS_MAX {
                return Some(Preset::Forward);
            }
            if dy > PRESET_AXIS_MIN && dx.abs() < PRESET_AXIS_MAX {
                return Some(Preset::Backward);
            }
            if dx > PRESET_AXIS_MIN && dy.abs() < PRESET_AXIS_MAX {
                return Some(Preset::Left);
            }
            if dx < -PRESET_AXIS_MIN && dy.abs() < PRESET_AXIS_MAX {
                return Some(Preset::Right);
            }
        } else if dx.abs() < PRESET_AXIS_MAX && dy.abs() < PRESET_AXIS_MAX {
            if rot < -PRESET_AXIS_MIN {
                return Some(Preset::RotateLeft);
            }
            if rot > PRESET_AXIS_MIN {
                return Some(Preset::RotateRight);
            }
        }

        None
    }

    fn motion(self) -> WheelMotion {
        match self {
            Preset::Forward => WheelMotion {
                m1: 0.826,
                m2: -0.6,
                m3: -1.0,
            },
            Preset::Backward => WheelMotion {
                m1: -0.866,
                m2: 0.95,
                m3: 1.0,
            },
            Preset::Left => WheelMotion {
                m1: 0.75,
                m2: 0.6,
                m3: -0.6,
            },
            Preset::Right => WheelMotion {
                m1: -0.95,
                m2: -0.6,
                m3: 0.7,
            },
            Preset::RotateLeft => WheelMotion {
                m1: -1.0,
                m2: -1.0,
                m3: -1.0,
            },
            Preset::RotateRight => WheelMotion {
                m1: 1.0,
                m2: 1.0,
                m3: 1.0,
            },
        }
    }
}

/// Mix a drive intent into per-wheel ratios.
///
/// Preset inputs return their tuned constants bit-for-bit; everything else
/// goes through the generic three-wheel formula, normalized so no wheel
/// exceeds unit magnitude while relative proportions are preserved.
pub fn mix(intent: DriveIntent) -> WheelMotion {
    if let Some(preset) = Preset::detect(intent) {
        return preset.motion();
    }

    let dx = intent.direction_x;
    let dy = intent.direction_y;
    let rot = intent.rotation;

    let mut motion = WheelMotion {
        m1: (-0.5 * dx + 0.866 * dy + rot) * WHEEL_COMP[0],
        m2: (0.5 * dx - 0.866 * dy + rot) * WHEEL_COMP[1],
        m3: (dx + rot - 0.1 * dy) * WHEEL_COMP[2],
    };

    let max = motion.max_magnitude();
    if max > 1.0 {
        motion.m1 /= max;
        motion.m2 /= max;
        motion.m3 /= max;
    }

    motion
}

/// Shape a heading-lock PID correction before it enters the mix as the
/// rotation term: halved and clamped so correction never dominates the
/// translational intent during a straight run.
pub fn damp_correction(correction: f32) -> f32 {
    (correction * 0.5).clamp(-0.3, 0.3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_never_exceeds_unit_magnitude() {
        let mut value = -1.0f32;
        let mut inputs = Vec::new();
        while value <= 1.0 {
            inputs.push(value);
            value += 0.25;
        }

        for &dx in &inputs {
            for &dy in &inputs {
                for &rot in &inputs {
                    let motion = mix(DriveIntent {
                        direction_x: dx,
                        direction_y: dy,
                        rotation: rot,
                    });
                    assert!(
                        motion.max_magnitude() <= 1.0 + 1e-6,
                        "({}, {}, {}) -> {:?}",
                        dx,
                        dy,
                        rot,
                        motion
                    );
                }
            }
        }
    }

    #[test]
    fn forward_preset_is_exact() {
        let motion = mix(DriveIntent::forward(1.0));
        assert_eq!(motion.m1, 0.826);
        assert_eq!(motion.m2, -0.6);
        assert_eq!(motion.m3, -1.0);

        // repeatable regardless of prior calls
        assert_eq!(mix(DriveIntent::forward(1.0)), motion);
    }

    #[test]
    fn all_presets_snap() {
        assert_eq!(
            mix(DriveIntent::reverse(1.0)),
            Preset::Backward.motion()
        );
        assert_eq!(
            mix(DriveIntent::translate(1.0, 0.0)),
            Preset::Left.motion()
        );
        assert_eq!(
            mix(DriveIntent::translate(-1.0, 0.0)),
            Preset::Right.motion()
        );
        assert_eq!(mix(DriveIntent::rotate(-1.0)), Preset::RotateLeft.motion());
        assert_eq!(mix(DriveIntent::rotate(1.0)), Preset::RotateRight.motion());
    }

    #[test]
    fn nonzero_rotation_bypasses_translation_presets() {
        let motion = mix(DriveIntent::forward(1.0).with_rotation(0.25));
        assert_ne!(motion, Preset::Forward.motion());
        // generic formula: m1 = 0.866*(-1) + 0.25
        assert!((motion.m1 - (-0.616)).abs() < 1e-3);
    }

    #[test]
    fn diagonal_input_uses_generic_formula_normalized() {
        let motion = mix(DriveIntent {
            direction_x: 0.7,
            direction_y: -0.7,
            rotation: 0.5,
        });
        assert!(motion.max_magnitude() <= 1.0 + 1e-6);
        // relative proportions survive normalization
        let raw_m1 = (-0.5 * 0.7 + 0.866 * -0.7 + 0.5) * 1.0;
        let raw_m3 = (0.7 + 0.5 - 0.1 * -0.7) * 1.0;
        assert!((motion.m1 / motion.m3 - raw_m1 / raw_m3).abs() < 1e-5);
    }

    #[test]
    fn damping_halves_then_clamps() {
        assert!((damp_correction(0.4) - 0.2).abs() < 1e-6);
        assert_eq!(damp_correction(1.0), 0.3);
        assert_eq!(damp_correction(-1.0), -0.3);
    }
}
