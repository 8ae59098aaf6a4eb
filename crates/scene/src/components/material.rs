/// Linear RGB color plus opacity for a drawable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub color: [f32; 3],
    pub opacity: f32,
}

impl Material {
    pub const fn opaque(color: [f32; 3]) -> Self {
        Self {
            color,
            opacity: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::opaque([1.0, 1.0, 1.0])
    }
}
