//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::grid::Orb;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark palette plus orb colours, optionally overridden by a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Orb colours, indexed by [`Orb::index`]: red, blue, green, yellow, purple, heart.
    pub orbs: [Color; 6],
    /// Board background.
    pub bg: Color,
    /// Board border and cell separators.
    pub div_line: Color,
    /// Text (score, combo).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text and the empty part of the timer gauge.
    pub inactive_fg: Color,
    /// Background of cells on the current drag path.
    pub selected_bg: Color,
    /// Held-orb marker and the timer gauge.
    pub hi_fg: Color,
    /// Timer gauge once the drag is nearly out of time.
    pub warn: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_ORBS: [Color; 6] = [
    rgb(0xE0_6C_75),
    rgb(0x61_AF_EF),
    rgb(0x98_C3_79),
    rgb(0xE5_C0_7B),
    rgb(0xC6_78_DD),
    rgb(0xF4_8F_B1),
];

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// Hardcoded One Dark defaults, with a pink heart since One Dark has none.
    pub fn onedark_default() -> Self {
        Self {
            orbs: ONEDARK_ORBS,
            bg: rgb(0x31_35_3F),
            div_line: rgb(0x3F_44_4F),
            main_fg: rgb(0xAB_B2_BF),
            title: rgb(0xE5_C0_7B),
            inactive_fg: rgb(0x5C_63_70),
            selected_bg: rgb(0x2C_31_3C),
            hi_fg: rgb(0x61_AF_EF),
            warn: rgb(0xE0_6C_75),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file does not exist.
    /// `palette` then selects the orb colour variant.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override orb colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.orbs = [
                    rgb(0xFF_00_00),
                    rgb(0x00_88_FF),
                    rgb(0x00_FF_00),
                    rgb(0xFF_FF_00),
                    rgb(0xAA_00_FF),
                    rgb(0xFF_66_CC),
                ];
            }
            crate::Palette::Colorblind => {
                // Paul Tol's vibrant set; no two entries rely on red/green alone.
                self.orbs = [
                    rgb(0xCC_33_11),
                    rgb(0x00_77_BB),
                    rgb(0x00_99_88),
                    rgb(0xEE_77_33),
                    rgb(0x33_BB_EE),
                    rgb(0xEE_33_77),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let d = Self::onedark_default();
        // `orb_<name>` keys win; otherwise borrow the closest btop box colour.
        let fallbacks: [&[&str]; 6] = [
            &["cpu_end", "temp_end"],
            &["cpu_box"],
            &["mem_box", "cpu_start"],
            &["cpu_mid", "title"],
            &["net_box"],
            &["proc_misc"],
        ];
        let mut orbs = d.orbs;
        for (orb, keys) in Orb::ALL.into_iter().zip(fallbacks) {
            let own = format!("orb_{}", orb.name());
            if let Some(c) = get(&own).or_else(|| keys.iter().find_map(|&k| get(k))) {
                orbs[orb.index()] = c;
            }
        }
        Self {
            orbs,
            bg: get("meter_bg").unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
            selected_bg: get("selected_bg").unwrap_or(d.selected_bg),
            hi_fg: get("hi_fg").unwrap_or(d.hi_fg),
            warn: get("temp_end").unwrap_or(d.warn),
        }
    }

    #[inline]
    pub fn orb_color(&self, orb: Orb) -> Color {
        self.orbs[orb.index()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(bad)
    };
    match s.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GG0000").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_orb_keys_override_box_colours() {
        let map = parse_theme_file(
            "theme[orb_heart]='#FF00AA'\ntheme[cpu_box]=\"#0000FF\"\n# theme[net_box]=\"#FFFFFF\"",
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.orb_color(Orb::Heart), Color::Rgb(0xFF, 0x00, 0xAA));
        assert_eq!(theme.orb_color(Orb::Blue), Color::Rgb(0, 0, 0xFF));
        assert_eq!(theme.orb_color(Orb::Purple), ONEDARK_ORBS[Orb::Purple.index()]);
    }

    #[test]
    fn test_palettes_keep_orbs_distinct() {
        for palette in [
            crate::Palette::Normal,
            crate::Palette::HighContrast,
            crate::Palette::Colorblind,
        ] {
            let theme = Theme::load(None, palette).unwrap();
            for (i, a) in theme.orbs.iter().enumerate() {
                assert!(theme.orbs[i + 1..].iter().all(|b| b != a), "{palette:?}");
            }
        }
    }
}
