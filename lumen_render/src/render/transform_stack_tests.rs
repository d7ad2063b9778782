use super::*;
use crate::log::capture;
use glam::Vec3;
use serial_test::serial;

#[test]
fn test_starts_at_identity_depth_one() {
    let stack = TransformStack::new();
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.top(), Mat4::IDENTITY);
}

#[test]
fn test_push_mul_pop_restores() {
    let mut stack = TransformStack::new();
    let translate = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    let scale = Mat4::from_scale(Vec3::splat(2.0));

    stack.mul_right(translate);
    stack.push();
    stack.mul_right(scale);
    assert_eq!(stack.depth(), 2);
    assert_eq!(stack.top(), translate * scale);

    stack.pop();
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.top(), translate);
}

#[test]
fn test_load_identity_only_touches_top() {
    let mut stack = TransformStack::new();
    let translate = Mat4::from_translation(Vec3::X);
    stack.load(translate);
    stack.push();
    stack.load_identity();
    assert_eq!(stack.top(), Mat4::IDENTITY);
    stack.pop();
    assert_eq!(stack.top(), translate);
}

#[test]
fn test_reset() {
    let mut stack = TransformStack::new();
    stack.push();
    stack.push();
    stack.mul_right(Mat4::from_scale(Vec3::splat(3.0)));
    stack.reset();
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.top(), Mat4::IDENTITY);
}

#[test]
#[serial]
fn test_pop_at_depth_one_is_internal_error() {
    let entries = capture::install();
    let mut stack = TransformStack::new();
    stack.pop();
    assert_eq!(stack.depth(), 1);
    assert_eq!(capture::count_containing(&entries, "[Internal error] pop on a transform stack"), 1);
    crate::log::reset_logger();
}
