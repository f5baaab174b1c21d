use std::str::FromStr;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ThemePreset {
    #[default]
    System,
    Auto,
    Light,
    Dark,
}

impl ThemePreset {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl FromStr for ThemePreset {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "system" | "default" => Ok(Self::System),
            "auto" => Ok(Self::Auto),
            "light" | "day" => Ok(Self::Light),
            "dark" | "night" => Ok(Self::Dark),
            _ => Err(()),
        }
    }
}

/// Palette offered for task and category colors.
pub const DEFAULT_COLOR_LIST: [&str; 13] = [
    "#FF69B4", "#FF22B4", "#C6A7FF", "#7ACCFA", "#4898F4", "#5061FF", "#3DFF7F", "#3AE836",
    "#FFEA28", "#F9BE26", "#FF9518", "#FF5018", "#FF2F2F",
];

/// Accepts `#RGB` and `#RRGGBB`.
pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.trim().strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|ch| ch.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_preset_parse() {
        assert_eq!(ThemePreset::from_str("system"), Ok(ThemePreset::System));
        assert_eq!(ThemePreset::from_str(" Dark "), Ok(ThemePreset::Dark));
        assert_eq!(ThemePreset::from_str("day"), Ok(ThemePreset::Light));
        assert_eq!(ThemePreset::from_str("retro"), Err(()));
    }

    #[test]
    fn test_theme_preset_names_parse_back() {
        for preset in [
            ThemePreset::System,
            ThemePreset::Auto,
            ThemePreset::Light,
            ThemePreset::Dark,
        ] {
            assert_eq!(ThemePreset::from_str(preset.as_str()), Ok(preset));
        }
    }

    #[test]
    fn test_hex_colors() {
        assert!(is_hex_color("#88c9f2"));
        assert!(is_hex_color("#fff"));
        assert!(!is_hex_color("88c9f2"));
        assert!(!is_hex_color("#ggg"));
        assert!(DEFAULT_COLOR_LIST.iter().all(|color| is_hex_color(color)));
    }
}
