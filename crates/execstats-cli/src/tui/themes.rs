use ratatui::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeName {
    Green,
    Teal,
    Blue,
    Orange,
    Monochrome,
}

const ALL_THEMES: [ThemeName; 5] = [
    ThemeName::Green,
    ThemeName::Teal,
    ThemeName::Blue,
    ThemeName::Orange,
    ThemeName::Monochrome,
];

impl ThemeName {
    pub fn next(self) -> ThemeName {
        let idx = ALL_THEMES.iter().position(|&t| t == self).unwrap_or(0);
        ALL_THEMES[(idx + 1) % ALL_THEMES.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Green => "green",
            ThemeName::Teal => "teal",
            ThemeName::Blue => "blue",
            ThemeName::Orange => "orange",
            ThemeName::Monochrome => "monochrome",
        }
    }

    /// Brightest bar shade. Dimmer shades are blended toward the empty cell.
    fn peak(self) -> (u8, u8, u8) {
        match self {
            ThemeName::Green => (57, 211, 83),
            ThemeName::Teal => (57, 211, 196),
            ThemeName::Blue => (88, 146, 255),
            ThemeName::Orange => (240, 136, 62),
            ThemeName::Monochrome => (200, 205, 212),
        }
    }
}

impl std::str::FromStr for ThemeName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_THEMES
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

const EMPTY_CELL: (u8, u8, u8) = (22, 27, 34);

fn blend(from: (u8, u8, u8), to: (u8, u8, u8), step: u16, steps: u16) -> Color {
    let mix = |a: u8, b: u8| -> u8 {
        let (a, b) = (a as i32, b as i32);
        (a + (b - a) * step as i32 / steps as i32) as u8
    };
    Color::Rgb(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,
    /// Bar shades from empty to busiest.
    pub colors: [Color; 5],
    pub background: Color,
    pub foreground: Color,
    pub border: Color,
    pub highlight: Color,
    pub accent: Color,
    pub selection: Color,
    pub muted: Color,
}

impl Theme {
    pub fn from_name(name: ThemeName) -> Self {
        let peak = name.peak();
        let colors: [Color; 5] = std::array::from_fn(|i| blend(EMPTY_CELL, peak, i as u16, 4));

        Self {
            name,
            colors,
            background: Color::Rgb(13, 17, 23),
            foreground: Color::Rgb(201, 209, 217),
            border: Color::Rgb(48, 54, 61),
            highlight: colors[4],
            accent: colors[3],
            selection: Color::Rgb(33, 38, 45),
            muted: Color::Rgb(139, 148, 158),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_cycle_wraps() {
        let mut name = ThemeName::Green;
        for _ in 0..ALL_THEMES.len() {
            name = name.next();
        }
        assert_eq!(name, ThemeName::Green);
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!("Teal".parse::<ThemeName>(), Ok(ThemeName::Teal));
        assert_eq!(" monochrome ".parse::<ThemeName>(), Ok(ThemeName::Monochrome));
        assert!("halloween".parse::<ThemeName>().is_err());
    }

    #[test]
    fn test_shades_run_from_empty_to_peak() {
        let theme = Theme::from_name(ThemeName::Orange);
        assert_eq!(theme.colors[0], Color::Rgb(22, 27, 34));
        assert_eq!(theme.colors[4], Color::Rgb(240, 136, 62));
        assert_eq!(theme.highlight, theme.colors[4]);
    }
}
