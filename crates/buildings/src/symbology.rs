/// Packed `0xRRGGBB` color.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub fn to_rgb(self) -> [f32; 3] {
        let r = (self.0 >> 16) & 0xff;
        let g = (self.0 >> 8) & 0xff;
        let b = self.0 & 0xff;
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

/// Color of every building no filter owns.
pub const NEUTRAL: Color = Color(0xcccccc);

pub const GRID: Color = Color(0x888888);

/// Filter colors, cycled by filter index.
pub const PALETTE: [Color; 8] = [
    Color(0xff4d4d),
    Color(0x4da6ff),
    Color(0x5cd65c),
    Color(0xffb84d),
    Color(0xb366ff),
    Color(0x4dd2d2),
    Color(0xff66b3),
    Color(0xe6e64d),
];

pub fn palette_color(filter_index: usize) -> Color {
    PALETTE[filter_index % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::{Color, NEUTRAL, PALETTE, palette_color};

    #[test]
    fn palette_cycles_and_avoids_neutral() {
        assert_eq!(palette_color(0), PALETTE[0]);
        assert_eq!(palette_color(PALETTE.len() + 2), PALETTE[2]);
        assert!(!PALETTE.contains(&NEUTRAL));
        for (i, a) in PALETTE.iter().enumerate() {
            assert!(PALETTE[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn unpacks_channels() {
        assert_eq!(Color(0xff0000).to_rgb(), [1.0, 0.0, 0.0]);
        assert_eq!(Color(0x0000ff).to_string(), "#0000ff");
    }
}
