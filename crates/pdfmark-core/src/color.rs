//! Hex colour parsing

/// Device RGB colour with components in the 0-1 range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `#RGB` (leading `#` optional).
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let doubled: Vec<String> = hex.chars().map(|c| format!("{c}{c}")).collect();
                Some(Self::new(
                    channel(&doubled[0])?,
                    channel(&doubled[1])?,
                    channel(&doubled[2])?,
                ))
            }
            _ => None,
        }
    }

    /// Parse `color`, falling back to `default` when it is absent or invalid.
    pub fn resolve(color: Option<&str>, default: &str) -> Self {
        if let Some(raw) = color {
            if let Some(rgb) = Self::from_hex(raw) {
                return rgb;
            }
            tracing::warn!(color = raw, fallback = default, "invalid colour, using default");
        }
        Self::from_hex(default).unwrap_or(Self::new(0.0, 0.0, 0.0))
    }
}
