/// Eased scroll between two offsets, advanced one frame per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnimation {
    from: (f32, f32),
    to: (f32, f32),
    frame: u32,
    frames: u32,
}

impl ScrollAnimation {
    pub fn new(from: (f32, f32), to: (f32, f32), frames: u32) -> Self {
        Self {
            from,
            to,
            frame: 0,
            frames: frames.max(1),
        }
    }

    pub fn target(&self) -> (f32, f32) {
        self.to
    }

    pub fn is_finished(&self) -> bool {
        self.frame >= self.frames
    }

    /// Cubic ease-out: large steps first, settling onto the target.
    pub fn position(&self) -> (f32, f32) {
        if self.is_finished() {
            return self.to;
        }
        let t = self.frame as f32 / self.frames as f32;
        let eased = 1.0 - (1.0 - t).powi(3);
        (
            self.from.0 + (self.to.0 - self.from.0) * eased,
            self.from.1 + (self.to.1 - self.from.1) * eased,
        )
    }

    /// Returns false once the target has been reached.
    pub fn advance(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.frame += 1;
        true
    }
}
