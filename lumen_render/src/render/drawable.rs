/// Anything the engine can draw in a frame.
///
/// Scene layers hold heterogeneous objects as `&dyn Drawable` and hand them
/// to [`Engine::render_all`](crate::engine::Engine::render_all); no draw
/// order is guaranteed between them.

use std::fmt;

use super::RenderState;

/// Geometry size of a drawable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawInfo {
    pub primitives: usize,
    pub vertices: usize,
    pub indices: usize,
}

impl fmt::Display for DrawInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} primitives, {} vertices, {} indices", self.primitives, self.vertices, self.indices)
    }
}

pub trait Drawable: Send + Sync {
    /// Issue the draw calls of this object
    fn draw(&self, render_state: &mut RenderState<'_>);

    fn info(&self) -> DrawInfo;
}
