/// Model transform stack used while drawing a frame.
///
/// Starts at depth 1 holding the identity. `push` duplicates the top,
/// `pop` restores the previous one. A frame must end at depth 1.

use glam::Mat4;

use crate::engine_internal_error;

const SOURCE: &str = "lumen::TransformStack";

#[derive(Debug, Clone)]
pub struct TransformStack {
    stack: Vec<Mat4>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self { stack: vec![Mat4::IDENTITY] }
    }

    /// Duplicate the top transform
    pub fn push(&mut self) {
        let top = self.top();
        self.stack.push(top);
    }

    /// Drop the top transform
    ///
    /// Popping the last entry is an internal error: it is logged and ignored.
    pub fn pop(&mut self) {
        if self.stack.len() <= 1 {
            engine_internal_error!(SOURCE, "pop on a transform stack of depth {}", self.stack.len());
            return;
        }
        self.stack.pop();
    }

    /// Post-multiply the top transform: `top = top * matrix`
    pub fn mul_right(&mut self, matrix: Mat4) {
        if let Some(top) = self.stack.last_mut() {
            *top *= matrix;
        }
    }

    /// Replace the top transform
    pub fn load(&mut self, matrix: Mat4) {
        if let Some(top) = self.stack.last_mut() {
            *top = matrix;
        }
    }

    pub fn load_identity(&mut self) {
        self.load(Mat4::IDENTITY);
    }

    pub fn top(&self) -> Mat4 {
        self.stack.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Back to depth 1 holding the identity
    pub fn reset(&mut self) {
        self.stack.clear();
        self.stack.push(Mat4::IDENTITY);
    }
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "transform_stack_tests.rs"]
mod tests;
