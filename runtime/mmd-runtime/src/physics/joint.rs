//! Six degree of freedom spring joints

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec3};
use mmd_pmx::Joint;
use rapier3d::prelude::{
    GenericJoint, GenericJointBuilder, ImpulseJointHandle, JointAxesMask, JointAxis,
};

use super::convert::{inverse_or_identity, to_isometry};

const LINEAR_AXES: [(JointAxis, JointAxesMask); 3] = [
    (JointAxis::LinX, JointAxesMask::LIN_X),
    (JointAxis::LinY, JointAxesMask::LIN_Y),
    (JointAxis::LinZ, JointAxesMask::LIN_Z),
];

const ANGULAR_AXES: [(JointAxis, JointAxesMask); 3] = [
    (JointAxis::AngX, JointAxesMask::ANG_X),
    (JointAxis::AngY, JointAxesMask::ANG_Y),
    (JointAxis::AngZ, JointAxesMask::ANG_Z),
];

/// A joint created in the simulation
#[derive(Debug, Clone)]
pub struct PhysicsJoint {
    pub name: String,
    pub body_a: usize,
    pub body_b: usize,
    /// Joint frame relative to body A at creation
    pub frame_a: Mat4,
    pub handle: ImpulseJointHandle,
}

/// Wrap an angle into `(-π, π]`. Non-finite angles become zero.
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// How one axis of a joint is constrained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisLimit {
    Locked,
    Limited(f32, f32),
    Free,
}

impl AxisLimit {
    pub fn new(lower: f32, upper: f32) -> Self {
        if !lower.is_finite() || !upper.is_finite() || lower > upper {
            Self::Free
        } else if lower == upper {
            Self::Locked
        } else {
            Self::Limited(lower, upper)
        }
    }
}

fn axis_limits(lower: Vec3, upper: Vec3) -> [AxisLimit; 3] {
    [
        AxisLimit::new(lower.x, upper.x),
        AxisLimit::new(lower.y, upper.y),
        AxisLimit::new(lower.z, upper.z),
    ]
}

/// Build the solver joint against the current body transforms
///
/// The joint's bind transform is expressed in each body's frame. Axes
/// whose lower and upper limits are equal are locked, reversed limits
/// leave the axis free, and non-zero springs become position motors
/// pulling back towards the rest pose.
pub fn build(joint: &Joint, body_a_world: Mat4, body_b_world: Mat4) -> (GenericJoint, Mat4) {
    let world = joint.transform();
    let frame_a = inverse_or_identity(body_a_world) * world;
    let frame_b = inverse_or_identity(body_b_world) * world;

    let linear = axis_limits(joint.linear_lower, joint.linear_upper);
    let angular = axis_limits(
        joint.angular_lower.map(normalize_angle),
        joint.angular_upper.map(normalize_angle),
    );

    let mut locked = JointAxesMask::empty();
    for ((_, mask), limit) in LINEAR_AXES.iter().zip(&linear) {
        if *limit == AxisLimit::Locked {
            locked |= *mask;
        }
    }
    for ((_, mask), limit) in ANGULAR_AXES.iter().zip(&angular) {
        if *limit == AxisLimit::Locked {
            locked |= *mask;
        }
    }

    let mut builder = GenericJointBuilder::new(locked)
        .local_frame1(to_isometry(frame_a))
        .local_frame2(to_isometry(frame_b))
        .contacts_enabled(false);

    let springs = joint
        .linear_spring
        .to_array()
        .into_iter()
        .chain(joint.angular_spring.to_array());
    let axes = LINEAR_AXES.iter().chain(&ANGULAR_AXES);
    let limits = linear.iter().chain(&angular);
    for (((axis, _), limit), stiffness) in axes.zip(limits).zip(springs) {
        if let AxisLimit::Limited(lower, upper) = *limit {
            builder = builder.limits(*axis, [lower, upper]);
        }
        if *limit != AxisLimit::Locked && stiffness.is_finite() && stiffness > 0.0 {
            builder = builder.motor_position(*axis, 0.0, stiffness, 0.0);
        }
    }

    (builder.build(), frame_a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.0, 0.0 ; "zero")]
    #[test_case(PI, PI ; "pi stays")]
    #[test_case(-PI, PI ; "minus pi wraps")]
    #[test_case(3.0 * PI / 2.0, -PI / 2.0 ; "three quarters")]
    #[test_case(f32::NAN, 0.0 ; "nan")]
    fn test_normalize_angle(angle: f32, expected: f32) {
        let normalized = normalize_angle(angle);
        assert!((normalized - expected).abs() < 1e-5, "{angle} -> {normalized}");
        assert!(normalized > -PI && normalized <= PI);
    }

    #[test]
    fn test_axis_limit() {
        assert_eq!(AxisLimit::new(0.0, 0.0), AxisLimit::Locked);
        assert_eq!(AxisLimit::new(1.0, -1.0), AxisLimit::Free);
        assert_eq!(AxisLimit::new(-1.0, 1.0), AxisLimit::Limited(-1.0, 1.0));
    }

    #[test]
    fn test_joint_axes() {
        let joint = Joint {
            position: Vec3::new(0.0, 1.0, 0.0),
            linear_lower: Vec3::ZERO,
            linear_upper: Vec3::ZERO,
            angular_lower: Vec3::new(-0.5, 1.0, 0.0),
            angular_upper: Vec3::new(0.5, -1.0, 0.0),
            angular_spring: Vec3::new(10.0, 0.0, 0.0),
            ..Default::default()
        };
        let body_a = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let (generic, frame_a) = build(&joint, body_a, Mat4::IDENTITY);

        assert!(
            frame_a
                .w_axis
                .truncate()
                .abs_diff_eq(Vec3::new(0.0, -1.0, 0.0), 1e-6)
        );
        let locked = generic.locked_axes;
        assert!(locked.contains(JointAxesMask::LIN_AXES));
        assert!(locked.contains(JointAxesMask::ANG_Z));
        assert!(!locked.contains(JointAxesMask::ANG_X));
        assert!(!locked.contains(JointAxesMask::ANG_Y));
    }
}
