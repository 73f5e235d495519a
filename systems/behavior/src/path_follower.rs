//! Waypoint following and the desired heading/speed it produces.

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use skirmish_core::{to_direction, to_rotation, PathFollowingInfo};
use skirmish_world::Unit;

/// Motion attributes of a unit that the path follower reads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kinematics {
    /// World position.
    pub position: Vec3,
    /// Rotation around the Y axis.
    pub rotation: f32,
    /// Current forward speed.
    pub current_speed: f32,
    /// Top speed.
    pub max_speed: f32,
    /// Turn rate in radians per tick.
    pub turn_rate: f32,
    /// Speed lost per tick while braking.
    pub brake_rate: f32,
}

impl Kinematics {
    /// Captures the motion attributes of `unit`.
    #[must_use]
    pub fn of(unit: &Unit) -> Self {
        Self {
            position: unit.position,
            rotation: unit.rotation,
            current_speed: unit.current_speed,
            max_speed: unit.max_speed,
            turn_rate: unit.turn_rate,
            brake_rate: unit.brake_rate,
        }
    }
}

/// Outcome of one path-following step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathProgress {
    /// The final waypoint was reached.
    Completed,
    /// An intermediate waypoint was reached and the cursor moved on.
    Advanced,
    /// The unit should steer toward the current waypoint.
    Steering {
        /// Rotation to turn toward.
        target_angle: f32,
        /// Speed to converge to.
        target_speed: f32,
    },
}

/// Advances along `path` and decides how the unit should steer this tick.
///
/// Waypoints count as reached once the planar distance drops below
/// `arrival_distance`. Reaching the final waypoint leaves the cursor where it
/// is.
pub fn follow_path(
    path: &mut PathFollowingInfo,
    kinematics: &Kinematics,
    arrival_distance: f32,
) -> PathProgress {
    let waypoint = path.current_waypoint();
    let offset = planar(waypoint - kinematics.position);
    let distance_squared = offset.length_squared();

    if distance_squared < arrival_distance * arrival_distance {
        if path.is_final_waypoint() {
            return PathProgress::Completed;
        }
        let _ = path.advance();
        return PathProgress::Advanced;
    }

    let braking = braking_distance(kinematics.current_speed, kinematics.brake_rate);
    let target_speed = if is_within_turning_circle(kinematics, waypoint) {
        0.0
    } else if path.is_final_waypoint() && distance_squared <= braking * braking {
        0.0
    } else {
        kinematics.max_speed
    };

    PathProgress::Steering {
        target_angle: to_rotation(offset),
        target_speed,
    }
}

/// Distance covered while braking from `speed` to a standstill.
#[must_use]
pub fn braking_distance(speed: f32, brake_rate: f32) -> f32 {
    if brake_rate <= 0.0 {
        return 0.0;
    }
    (speed * speed) / (2.0 * brake_rate)
}

/// Reports whether `destination` cannot be reached by turning at the current speed.
///
/// The turning circles have radius `current_speed / turn_rate` and touch the
/// unit on either side of its heading. A destination behind the unit closer
/// than that radius is also unreachable without slowing down first.
#[must_use]
pub fn is_within_turning_circle(kinematics: &Kinematics, destination: Vec3) -> bool {
    if kinematics.turn_rate <= 0.0 || kinematics.current_speed <= 0.0 {
        return false;
    }

    let radius = kinematics.current_speed / kinematics.turn_rate;
    let radius_squared = radius * radius;
    let offset = planar(destination - kinematics.position);

    let left = to_direction(kinematics.rotation - FRAC_PI_2) * radius;
    let right = to_direction(kinematics.rotation + FRAC_PI_2) * radius;
    if offset.distance_squared(left) <= radius_squared
        || offset.distance_squared(right) <= radius_squared
    {
        return true;
    }

    let forward = offset.dot(to_direction(kinematics.rotation));
    forward < 0.0 && offset.length_squared() < radius_squared
}

fn planar(vector: Vec3) -> Vec3 {
    Vec3::new(vector.x, 0.0, vector.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{GameTime, UnitPath};

    fn kinematics(speed: f32) -> Kinematics {
        Kinematics {
            position: Vec3::ZERO,
            rotation: 0.0,
            current_speed: speed,
            max_speed: 4.0,
            turn_rate: 0.1,
            brake_rate: 1.0,
        }
    }

    fn path(waypoints: Vec<Vec3>) -> PathFollowingInfo {
        PathFollowingInfo::new(UnitPath::new(waypoints), GameTime::new(0)).expect("non-empty")
    }

    #[test]
    fn reaching_the_final_waypoint_completes_without_moving_the_cursor() {
        let mut info = path(vec![Vec3::new(3.0, 40.0, 4.0)]);
        let progress = follow_path(&mut info, &kinematics(0.0), 8.0);

        assert_eq!(progress, PathProgress::Completed);
        assert_eq!(info.cursor(), 0);
    }

    #[test]
    fn reaching_an_intermediate_waypoint_advances_once() {
        let mut info = path(vec![Vec3::new(3.0, 0.0, 4.0), Vec3::new(0.0, 0.0, 100.0)]);
        let progress = follow_path(&mut info, &kinematics(0.0), 8.0);

        assert_eq!(progress, PathProgress::Advanced);
        assert_eq!(info.cursor(), 1);
    }

    #[test]
    fn distant_waypoints_are_driven_toward_at_full_speed() {
        let mut info = path(vec![Vec3::new(100.0, 0.0, 0.0)]);
        let PathProgress::Steering {
            target_angle,
            target_speed,
        } = follow_path(&mut info, &kinematics(0.0), 8.0)
        else {
            panic!("expected steering");
        };

        assert!((target_angle - FRAC_PI_2).abs() < 1e-5);
        assert_eq!(target_speed, 4.0);
    }

    #[test]
    fn final_waypoint_inside_braking_distance_stops() {
        let mut info = path(vec![Vec3::new(0.0, 0.0, 9.0)]);
        let fast = Kinematics {
            turn_rate: 1.0,
            brake_rate: 0.5,
            ..kinematics(4.0)
        };
        let progress = follow_path(&mut info, &fast, 8.0);

        assert_eq!(
            progress,
            PathProgress::Steering {
                target_angle: 0.0,
                target_speed: 0.0
            }
        );
    }

    #[test]
    fn destinations_behind_the_unit_inside_the_turn_radius_stop_it() {
        let moving = kinematics(4.0);
        assert!(is_within_turning_circle(&moving, Vec3::new(0.0, 0.0, -20.0)));
        assert!(!is_within_turning_circle(&moving, Vec3::new(0.0, 0.0, -60.0)));
        assert!(!is_within_turning_circle(&moving, Vec3::new(0.0, 0.0, 30.0)));
    }

    #[test]
    fn destinations_beside_the_unit_fall_inside_a_tangent_circle() {
        let moving = kinematics(4.0);
        assert!(is_within_turning_circle(&moving, Vec3::new(30.0, 0.0, 5.0)));
        assert!(is_within_turning_circle(&moving, Vec3::new(-30.0, 0.0, 5.0)));
        assert!(!is_within_turning_circle(&kinematics(0.0), Vec3::new(30.0, 0.0, 5.0)));
    }

    #[test]
    fn braking_distance_grows_with_speed() {
        assert_eq!(braking_distance(4.0, 1.0), 8.0);
        assert_eq!(braking_distance(4.0, 0.0), 0.0);
    }
}
