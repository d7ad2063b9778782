/// Buffer binding targets and primitive topologies

use std::fmt;

/// Buffer binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex data
    ArrayBuffer,
    /// 16-bit index data
    ElementArrayBuffer,
}

/// Primitive topology of a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Points,
    LineStrip,
    LineLoop,
    Lines,
    TriangleStrip,
    TriangleFan,
    Triangles,
}

impl PrimitiveType {
    /// Number of primitives assembled from `count` indices (or vertices)
    pub fn primitive_count(&self, count: usize) -> usize {
        match self {
            PrimitiveType::Points => count,
            PrimitiveType::LineStrip => count.saturating_sub(1),
            PrimitiveType::LineLoop => count,
            PrimitiveType::Lines => count / 2,
            PrimitiveType::TriangleStrip | PrimitiveType::TriangleFan => count.saturating_sub(2),
            PrimitiveType::Triangles => count / 3,
        }
    }

    /// Check that `count` elements form whole primitives of this type
    ///
    /// Returns a description of the violated rule, if any.
    pub fn check_arity(&self, count: usize) -> Option<String> {
        match self {
            PrimitiveType::LineStrip if count < 1 => {
                Some(format!("line strip needs at least 1 element, got {}", count))
            }
            PrimitiveType::Lines if count % 2 != 0 => {
                Some(format!("lines need an even element count, got {}", count))
            }
            PrimitiveType::TriangleStrip | PrimitiveType::TriangleFan if count < 2 => {
                Some(format!("{} needs at least 2 elements, got {}", self, count))
            }
            PrimitiveType::Triangles if count % 3 != 0 => {
                Some(format!("triangles need a multiple of 3 elements, got {}", count))
            }
            _ => None,
        }
    }

    /// Whether independent primitives of this type can be concatenated
    pub fn is_list(&self) -> bool {
        matches!(self, PrimitiveType::Points | PrimitiveType::Lines | PrimitiveType::Triangles)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::Points => "POINTS",
            PrimitiveType::LineStrip => "LINE_STRIP",
            PrimitiveType::LineLoop => "LINE_LOOP",
            PrimitiveType::Lines => "LINES",
            PrimitiveType::TriangleStrip => "TRIANGLE_STRIP",
            PrimitiveType::TriangleFan => "TRIANGLE_FAN",
            PrimitiveType::Triangles => "TRIANGLES",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
