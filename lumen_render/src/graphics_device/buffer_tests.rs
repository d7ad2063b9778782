/// Tests for PrimitiveType arity rules and primitive counting

use super::*;

// ============================================================================
// Primitive Count
// ============================================================================

#[test]
fn test_primitive_count_per_type() {
    assert_eq!(PrimitiveType::Points.primitive_count(5), 5);
    assert_eq!(PrimitiveType::LineStrip.primitive_count(5), 4);
    assert_eq!(PrimitiveType::LineLoop.primitive_count(5), 5);
    assert_eq!(PrimitiveType::Lines.primitive_count(6), 3);
    assert_eq!(PrimitiveType::TriangleStrip.primitive_count(6), 4);
    assert_eq!(PrimitiveType::TriangleFan.primitive_count(6), 4);
    assert_eq!(PrimitiveType::Triangles.primitive_count(6), 2);
}

#[test]
fn test_primitive_count_never_underflows() {
    assert_eq!(PrimitiveType::LineStrip.primitive_count(0), 0);
    assert_eq!(PrimitiveType::TriangleStrip.primitive_count(1), 0);
    assert_eq!(PrimitiveType::TriangleFan.primitive_count(0), 0);
}

// ============================================================================
// Arity
// ============================================================================

#[test]
fn test_triangles_require_multiple_of_three() {
    assert!(PrimitiveType::Triangles.check_arity(6).is_none());
    assert!(PrimitiveType::Triangles.check_arity(0).is_none());
    assert!(PrimitiveType::Triangles.check_arity(7).is_some());
}

#[test]
fn test_lines_require_even_count() {
    assert!(PrimitiveType::Lines.check_arity(4).is_none());
    assert!(PrimitiveType::Lines.check_arity(3).is_some());
}

#[test]
fn test_strip_and_fan_require_two() {
    assert!(PrimitiveType::TriangleStrip.check_arity(1).is_some());
    assert!(PrimitiveType::TriangleFan.check_arity(1).is_some());
    assert!(PrimitiveType::TriangleFan.check_arity(2).is_none());
}

#[test]
fn test_line_strip_requires_one() {
    assert!(PrimitiveType::LineStrip.check_arity(0).is_some());
    assert!(PrimitiveType::LineStrip.check_arity(1).is_none());
}

#[test]
fn test_points_and_loops_accept_anything() {
    assert!(PrimitiveType::Points.check_arity(0).is_none());
    assert!(PrimitiveType::LineLoop.check_arity(7).is_none());
}

#[test]
fn test_list_types() {
    assert!(PrimitiveType::Points.is_list());
    assert!(PrimitiveType::Lines.is_list());
    assert!(PrimitiveType::Triangles.is_list());
    assert!(!PrimitiveType::TriangleStrip.is_list());
    assert!(!PrimitiveType::LineLoop.is_list());
}

#[test]
fn test_display_names() {
    assert_eq!(PrimitiveType::TriangleStrip.to_string(), "TRIANGLE_STRIP");
    assert_eq!(PrimitiveType::Points.to_string(), "POINTS");
}
