use std::fs;
use std::path::Path;

use ratatui::style::Color;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Theme {
    pub chat_bg: Color,
    pub table_bg: Color,
    pub input_bg: Color,
    pub status_bg: Color,
    pub modal_bg: Color,
    pub text_fg: Color,
    pub muted_fg: Color,
    pub active_fg: Color,
    pub user_fg: Color,
    pub assistant_fg: Color,
    pub accent_fg: Color,
    pub p0_fg: Color,
    pub p1_fg: Color,
    pub p2_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            chat_bg: Color::Rgb(44, 44, 44),
            table_bg: Color::Rgb(48, 48, 48),
            input_bg: Color::Rgb(62, 62, 62),
            status_bg: Color::Rgb(36, 36, 36),
            modal_bg: Color::Rgb(40, 40, 40),
            text_fg: Color::Rgb(225, 225, 225),
            muted_fg: Color::Rgb(165, 165, 165),
            active_fg: Color::Rgb(255, 255, 255),
            user_fg: Color::Rgb(186, 148, 255),
            assistant_fg: Color::Rgb(225, 225, 225),
            accent_fg: Color::Rgb(170, 130, 240),
            p0_fg: Color::Rgb(240, 110, 110),
            p1_fg: Color::Rgb(240, 170, 90),
            p2_fg: Color::Rgb(120, 200, 130),
        }
    }
}

impl Theme {
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path_ref = path.as_ref();
        match fs::read_to_string(path_ref) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(theme) => theme,
                Err(err) => {
                    eprintln!(
                        "Failed to parse theme file '{}': {err}. Using defaults.",
                        path_ref.display()
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        let cfg: ThemeToml = toml::from_str(s)?;
        Ok(Self {
            chat_bg: cfg.colors.chat_bg.to_color(),
            table_bg: cfg.colors.table_bg.to_color(),
            input_bg: cfg.colors.input_bg.to_color(),
            status_bg: cfg.colors.status_bg.to_color(),
            modal_bg: cfg.colors.modal_bg.to_color(),
            text_fg: cfg.colors.text_fg.to_color(),
            muted_fg: cfg.colors.muted_fg.to_color(),
            active_fg: cfg.colors.active_fg.to_color(),
            user_fg: cfg.colors.user_fg.to_color(),
            assistant_fg: cfg.colors.assistant_fg.to_color(),
            accent_fg: cfg.colors.accent_fg.to_color(),
            p0_fg: cfg.colors.p0_fg.to_color(),
            p1_fg: cfg.colors.p1_fg.to_color(),
            p2_fg: cfg.colors.p2_fg.to_color(),
        })
    }

    pub fn priority_fg(&self, priority: &str) -> Color {
        match priority {
            "P0" => self.p0_fg,
            "P1" => self.p1_fg,
            _ => self.p2_fg,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ThemeToml {
    colors: ThemeColorsToml,
}

#[derive(Debug, Deserialize)]
struct ThemeColorsToml {
    chat_bg: RgbToml,
    table_bg: RgbToml,
    input_bg: RgbToml,
    status_bg: RgbToml,
    modal_bg: RgbToml,
    text_fg: RgbToml,
    muted_fg: RgbToml,
    active_fg: RgbToml,
    user_fg: RgbToml,
    assistant_fg: RgbToml,
    accent_fg: RgbToml,
    p0_fg: RgbToml,
    p1_fg: RgbToml,
    p2_fg: RgbToml,
}

#[derive(Debug, Deserialize)]
struct RgbToml {
    r: u8,
    g: u8,
    b: u8,
}

impl RgbToml {
    fn to_color(&self) -> Color {
        Color::Rgb(self.r, self.g, self.b)
    }
}
