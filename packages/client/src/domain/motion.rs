//! Motion rules for avatar interpolation.
//!
//! Velocity is computed once when a position update is dispatched and is not
//! normalized against elapsed time: speed is proportional to the distance at
//! dispatch time and inversely proportional to [`INVERSE_VELOCITY`].

use super::value_object::{Point, Velocity};

/// Divisor turning a positional distance into a per-frame step.
pub const INVERSE_VELOCITY: f64 = 56.0;

/// Signed per-frame velocity moving `current` towards `target`.
pub fn velocity_towards(current: Point, target: Point) -> Velocity {
    Velocity::new(
        axis_velocity(current.x, target.x),
        axis_velocity(current.y, target.y),
    )
}

fn axis_velocity(current: f64, target: f64) -> f64 {
    let distance = (target - current).abs();
    if distance == 0.0 {
        return 0.0;
    }
    if target > current {
        distance / INVERSE_VELOCITY
    } else {
        -distance / INVERSE_VELOCITY
    }
}

/// Advance `current` by one frame of `velocity`, snapping to `target` on each
/// axis that reaches or passes it.
pub fn step_towards(current: Point, target: Point, velocity: Velocity) -> Point {
    Point::new(
        axis_step(current.x, target.x, velocity.x),
        axis_step(current.y, target.y, velocity.y),
    )
}

fn axis_step(current: f64, target: f64, velocity: f64) -> f64 {
    let next = current + velocity;
    let arrived = velocity == 0.0
        || (velocity > 0.0 && next >= target)
        || (velocity < 0.0 && next <= target);
    if arrived { target } else { next }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_towards_positive_x_axis() {
        // テスト項目: x 方向に 112 離れた目標への速度は (2, 0) になる
        // given (前提条件):
        let current = Point::new(100.0, 50.0);
        let target = Point::new(212.0, 50.0);

        // when (操作):
        let velocity = velocity_towards(current, target);

        // then (期待する結果):
        assert_eq!(velocity.x, 2.0);
        assert_eq!(velocity.y, 0.0);
        assert!(!velocity.y.is_sign_negative());
    }

    #[test]
    fn test_velocity_towards_negative_direction() {
        // テスト項目: 目標が現在位置より小さい場合、速度は負になる
        // given (前提条件):
        let current = Point::new(300.0, 300.0);
        let target = Point::new(188.0, 244.0);

        // when (操作):
        let velocity = velocity_towards(current, target);

        // then (期待する結果):
        assert_eq!(velocity.x, -2.0);
        assert_eq!(velocity.y, -1.0);
    }

    #[test]
    fn test_velocity_towards_same_point_is_zero() {
        // テスト項目: 現在位置と目標が同じ場合、速度は 0 になる
        // given (前提条件):
        let point = Point::new(10.0, 10.0);

        // when (操作):
        let velocity = velocity_towards(point, point);

        // then (期待する結果):
        assert!(velocity.is_zero());
    }

    #[test]
    fn test_step_towards_advances_by_velocity() {
        // テスト項目: 1 フレームで速度分だけ移動する
        // given (前提条件):
        let current = Point::new(0.0, 0.0);
        let target = Point::new(112.0, 56.0);
        let velocity = velocity_towards(current, target);

        // when (操作):
        let next = step_towards(current, target, velocity);

        // then (期待する結果):
        assert_eq!(next, Point::new(2.0, 1.0));
    }

    #[test]
    fn test_step_towards_snaps_on_arrival() {
        // テスト項目: 目標を越える場合は目標位置に吸着する
        // given (前提条件):
        let current = Point::new(111.0, 10.0);
        let target = Point::new(112.0, 10.0);
        let velocity = Velocity::new(2.0, 0.0);

        // when (操作):
        let next = step_towards(current, target, velocity);

        // then (期待する結果):
        assert_eq!(next, target);
    }

    #[test]
    fn test_step_towards_reaches_target_in_inverse_velocity_frames() {
        // テスト項目: 速度は発行時に固定されるため、56 フレームで到着する
        // given (前提条件):
        let mut current = Point::new(0.0, 0.0);
        let target = Point::new(560.0, -280.0);
        let velocity = velocity_towards(current, target);

        // when (操作):
        for _ in 0..INVERSE_VELOCITY as usize {
            current = step_towards(current, target, velocity);
        }

        // then (期待する結果):
        assert_eq!(current, target);
    }
}
