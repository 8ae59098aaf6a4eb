/// Deterministic frame metadata for the render loop.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Fixed delta time (seconds).
    pub dt_s: f64,
}

impl Frame {
    pub fn new(index: u64, dt_s: f64) -> Self {
        Self { index, dt_s }
    }

    /// Elapsed time at the start of the frame (seconds).
    pub fn elapsed_s(&self) -> f64 {
        self.index as f64 * self.dt_s
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.dt_s)
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;

    #[test]
    fn frame_time_is_deterministic() {
        let a = Frame::new(10, 0.25);
        let b = Frame::new(10, 0.25);
        assert_eq!(a, b);
        assert_eq!(a.elapsed_s(), 2.5);
    }

    #[test]
    fn next_advances_index() {
        let f1 = Frame::new(0, 0.5).next();
        assert_eq!(f1.index, 1);
        assert_eq!(f1.elapsed_s(), 0.5);
    }
}
