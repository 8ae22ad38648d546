//! Board appearance: light/dark mode, a named color scheme, corner radius
//! and font.
//!
//! [`ThemeSettings`] is what gets persisted. [`ThemeSettings::resolve`] turns
//! it into concrete [`ThemeTokens`], and the tokens give a terminal
//! [`Palette`]. Persistence goes through a [`ThemeStore`] handed to
//! [`ThemeController`].

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_COLOR_SCHEME: &str = "Atom One Dark";
pub const DEFAULT_BORDER_RADIUS: u32 = 8;
pub const DEFAULT_FONT_FAMILY: &str = "Poppins";
pub const MAX_BORDER_RADIUS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Light,
    Dark,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(AppError::invalid_input(format!(
                "unknown mode '{other}' (expected light or dark)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSettings {
    pub mode: Mode,
    pub color_scheme: String,
    pub border_radius: u32,
    pub font_family: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            mode: Mode::Light,
            color_scheme: DEFAULT_COLOR_SCHEME.to_string(),
            border_radius: DEFAULT_BORDER_RADIUS,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
        }
    }
}

impl ThemeSettings {
    /// Unknown scheme names resolve to the default scheme.
    pub fn resolve(&self) -> ThemeTokens {
        let scheme = find_scheme(&self.color_scheme).unwrap_or(&SCHEMES[DEFAULT_SCHEME_INDEX]);
        let colors = match self.mode {
            Mode::Light => scheme.light,
            Mode::Dark => scheme.dark,
        };
        let font_family = if self.font_family.trim().is_empty() {
            DEFAULT_FONT_FAMILY.to_string()
        } else {
            self.font_family.trim().to_string()
        };

        ThemeTokens {
            mode: self.mode,
            color_scheme: scheme.name,
            primary: colors.primary,
            text: colors.text,
            background: colors.background,
            border_radius: self.border_radius.min(MAX_BORDER_RADIUS),
            font_family,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeTokens {
    pub mode: Mode,
    pub color_scheme: &'static str,
    pub primary: &'static str,
    pub text: &'static str,
    pub background: &'static str,
    pub border_radius: u32,
    pub font_family: String,
}

impl ThemeTokens {
    pub fn palette(&self) -> Palette {
        Palette {
            accent: truecolor(self.primary),
            muted: truecolor(self.text),
            reset: "\x1b[0m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeColors {
    pub primary: &'static str,
    pub text: &'static str,
    pub background: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheme {
    pub name: &'static str,
    pub light: SchemeColors,
    pub dark: SchemeColors,
}

const fn colors(primary: &'static str, text: &'static str, background: &'static str) -> SchemeColors {
    SchemeColors {
        primary,
        text,
        background,
    }
}

const DEFAULT_SCHEME_INDEX: usize = 1;

pub static SCHEMES: [Scheme; 12] = [
    Scheme {
        name: "Alimey",
        light: colors("#FF4D5A", "#2E3440", "#FFFFFF"),
        dark: colors("#FF4D5A", "#E5E9F0", "#1E1E1E"),
    },
    Scheme {
        name: "Atom One Dark",
        light: colors("#61AFEF", "#24292e", "#f0f0f0"),
        dark: colors("#61AFEF", "#ABB2BF", "#282C34"),
    },
    Scheme {
        name: "Modern Dracula",
        light: colors("#BD93F9", "#282A36", "#F8F8F2"),
        dark: colors("#BD93F9", "#F8F8F2", "#282A36"),
    },
    Scheme {
        name: "Nordic Frost",
        light: colors("#5E81AC", "#2E3440", "#ECEFF4"),
        dark: colors("#88C0D0", "#ECEFF4", "#2E3440"),
    },
    Scheme {
        name: "Gruvbox",
        light: colors("#d65d0e", "#3c3836", "#fbf1c7"),
        dark: colors("#fe8019", "#ebdbb2", "#282828"),
    },
    Scheme {
        name: "Fluent Microsoft",
        light: colors("#005FB8", "#242424", "#FFFFFF"),
        dark: colors("#2899F5", "#FFFFFF", "#202020"),
    },
    Scheme {
        name: "Flat Color",
        light: colors("#3498DB", "#2C3E50", "#ECF0F1"),
        dark: colors("#3498DB", "#ECF0F1", "#2C3E50"),
    },
    Scheme {
        name: "Material Ocean",
        light: colors("#018786", "#212121", "#E8EAED"),
        dark: colors("#03DAC6", "#E0E0E0", "#121212"),
    },
    Scheme {
        name: "Solarized",
        light: colors("#2AA198", "#586E75", "#FDF6E3"),
        dark: colors("#268BD2", "#839496", "#002B36"),
    },
    Scheme {
        name: "Nord",
        light: colors("#88C0D0", "#2E3440", "#ECEFF4"),
        dark: colors("#88C0D0", "#ECEFF4", "#2E3440"),
    },
    Scheme {
        name: "Monokai Pro",
        light: colors("#A9DC76", "#272822", "#F8F8F2"),
        dark: colors("#A9DC76", "#F8F8F2", "#272822"),
    },
    Scheme {
        name: "Pastel Dream",
        light: colors("#FFB3BA", "#3E2723", "#FFF8E7"),
        dark: colors("#FFB3BA", "#FFF8E7", "#3E2723"),
    },
];

pub fn scheme_names() -> impl Iterator<Item = &'static str> {
    SCHEMES.iter().map(|scheme| scheme.name)
}

/// Matches ignoring case, spacing and punctuation, so `atom-one-dark` finds
/// "Atom One Dark".
pub fn find_scheme(raw: &str) -> Option<&'static Scheme> {
    let wanted = canonical_scheme_key(raw)?;
    SCHEMES
        .iter()
        .find(|scheme| canonical_scheme_key(scheme.name).as_deref() == Some(wanted.as_str()))
}

pub fn canonical_scheme_key(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(digits.get(range)?, 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn truecolor(hex: &str) -> String {
    match parse_hex(hex) {
        Some((r, g, b)) => format!("\x1b[38;2;{r};{g};{b}m"),
        None => String::new(),
    }
}

/// Terminal escape sequences for accented and muted text. Empty sequences
/// leave text untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    pub accent: String,
    pub muted: String,
    pub reset: String,
}

impl Palette {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn accentize(&self, text: &str) -> String {
        if self.accent.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.accent, text, self.reset)
        }
    }

    pub fn mutedize(&self, text: &str) -> String {
        if self.muted.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.muted, text, self.reset)
        }
    }
}

/// Per-run theme values from `--config-override`; never persisted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ThemeOverrides {
    pub mode: Option<Mode>,
    pub color_scheme: Option<String>,
    pub border_radius: Option<u32>,
    pub font_family: Option<String>,
}

impl ThemeOverrides {
    pub fn apply(&self, settings: &mut ThemeSettings) {
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(scheme) = self.color_scheme.as_ref() {
            settings.color_scheme = scheme.clone();
        }
        if let Some(radius) = self.border_radius {
            settings.border_radius = radius;
        }
        if let Some(font) = self.font_family.as_ref() {
            settings.font_family = font.clone();
        }
    }
}

pub trait ThemeStore {
    /// `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<ThemeSettings>, AppError>;

    fn save(&self, settings: &ThemeSettings) -> Result<(), AppError>;
}

pub struct JsonThemeStore {
    path: PathBuf,
}

impl JsonThemeStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ThemeStore for JsonThemeStore {
    fn load(&self) -> Result<Option<ThemeSettings>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|err| AppError::io(format!("{}: {}", self.path.display(), err)))?;
        let settings = serde_json::from_str(&content).map_err(|err| {
            AppError::invalid_data(format!("invalid JSON in {}: {}", self.path.display(), err))
        })?;
        Ok(Some(settings))
    }

    fn save(&self, settings: &ThemeSettings) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|err| AppError::io(format!("{}: {}", parent.display(), err)))?;
        }
        let content = serde_json::to_string_pretty(settings)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|err| AppError::io(format!("{}: {}", self.path.display(), err)))?;
        debug!(path = %self.path.display(), "theme saved");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryThemeStore {
    saved: RefCell<Option<ThemeSettings>>,
    saves: Cell<usize>,
}

impl MemoryThemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(settings: ThemeSettings) -> Self {
        Self {
            saved: RefCell::new(Some(settings)),
            saves: Cell::new(0),
        }
    }

    pub fn saved(&self) -> Option<ThemeSettings> {
        self.saved.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl ThemeStore for MemoryThemeStore {
    fn load(&self) -> Result<Option<ThemeSettings>, AppError> {
        Ok(self.saved.borrow().clone())
    }

    fn save(&self, settings: &ThemeSettings) -> Result<(), AppError> {
        *self.saved.borrow_mut() = Some(settings.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

/// Changes requested by `theme set`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ThemeUpdate {
    pub mode: Option<Mode>,
    pub color_scheme: Option<String>,
    pub border_radius: Option<u32>,
    pub font_family: Option<String>,
}

impl ThemeUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn known_scheme(name: &str) -> Result<&'static Scheme, AppError> {
    find_scheme(name).ok_or_else(|| {
        let known: Vec<_> = scheme_names().collect();
        AppError::invalid_input(format!(
            "unknown color scheme '{}' (known: {})",
            name.trim(),
            known.join(", ")
        ))
    })
}

/// Holds the active settings and writes every change through its store.
pub struct ThemeController<S: ThemeStore> {
    store: S,
    settings: ThemeSettings,
}

impl<S: ThemeStore> ThemeController<S> {
    /// Starts from the saved settings, or `fallback` when none are saved.
    pub fn load(store: S, fallback: ThemeSettings) -> Result<Self, AppError> {
        let settings = store.load()?.unwrap_or(fallback);
        Ok(Self { store, settings })
    }

    pub fn settings(&self) -> &ThemeSettings {
        &self.settings
    }

    pub fn tokens(&self) -> ThemeTokens {
        self.settings.resolve()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Applies per-run overrides without saving them.
    pub fn apply_overrides(&mut self, overrides: &ThemeOverrides) {
        overrides.apply(&mut self.settings);
    }

    pub fn toggle_mode(&mut self) -> Result<Mode, AppError> {
        let mode = self.settings.mode.toggled();
        self.update(ThemeUpdate {
            mode: Some(mode),
            ..ThemeUpdate::default()
        })?;
        Ok(mode)
    }

    /// Validates every field first; one save, or nothing changes.
    pub fn update(&mut self, update: ThemeUpdate) -> Result<(), AppError> {
        if update.is_empty() {
            return Err(AppError::invalid_input("nothing to update"));
        }

        let mut next = self.settings.clone();
        if let Some(mode) = update.mode {
            next.mode = mode;
        }
        if let Some(name) = update.color_scheme.as_deref() {
            next.color_scheme = known_scheme(name)?.name.to_string();
        }
        if let Some(radius) = update.border_radius {
            if radius > MAX_BORDER_RADIUS {
                return Err(AppError::invalid_input(format!(
                    "border radius must be between 0 and {MAX_BORDER_RADIUS}"
                )));
            }
            next.border_radius = radius;
        }
        if let Some(font) = update.font_family.as_deref() {
            let font = font.trim();
            if font.is_empty() {
                return Err(AppError::invalid_input("font family must not be empty"));
            }
            next.font_family = font.to_string();
        }

        self.store.save(&next)?;
        self.settings = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        JsonThemeStore, MemoryThemeStore, Mode, SCHEMES, ThemeController, ThemeOverrides,
        ThemeSettings, ThemeStore, ThemeUpdate, canonical_scheme_key, find_scheme,
    };
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("taskboard-{nanos}-{file_name}"))
    }

    #[test]
    fn defaults_resolve_to_atom_one_dark_light() {
        let tokens = ThemeSettings::default().resolve();

        assert_eq!(tokens.mode, Mode::Light);
        assert_eq!(tokens.color_scheme, "Atom One Dark");
        assert_eq!(tokens.primary, "#61AFEF");
        assert_eq!(tokens.background, "#f0f0f0");
        assert_eq!(tokens.border_radius, 8);
        assert_eq!(tokens.font_family, "Poppins");
    }

    #[test]
    fn dark_mode_picks_dark_colors() {
        let settings = ThemeSettings {
            mode: Mode::Dark,
            color_scheme: "gruvbox".to_string(),
            ..ThemeSettings::default()
        };
        let tokens = settings.resolve();

        assert_eq!(tokens.color_scheme, "Gruvbox");
        assert_eq!(tokens.primary, "#fe8019");
        assert_eq!(tokens.text, "#ebdbb2");
        assert_eq!(tokens.background, "#282828");
    }

    #[test]
    fn unknown_scheme_falls_back_to_default() {
        let settings = ThemeSettings {
            color_scheme: "Vaporwave".to_string(),
            ..ThemeSettings::default()
        };
        assert_eq!(settings.resolve().color_scheme, "Atom One Dark");
    }

    #[test]
    fn scheme_lookup_ignores_case_and_punctuation() {
        assert_eq!(find_scheme("monokai-pro").map(|s| s.name), Some("Monokai Pro"));
        assert_eq!(find_scheme("  NORD ").map(|s| s.name), Some("Nord"));
        assert!(find_scheme("").is_none());
        assert_eq!(canonical_scheme_key("Atom One Dark").as_deref(), Some("atom_one_dark"));
        assert_eq!(SCHEMES.len(), 12);
    }

    #[test]
    fn palette_uses_truecolor_primary() {
        let palette = ThemeSettings::default().resolve().palette();

        assert_eq!(palette.accent, "\x1b[38;2;97;175;239m");
        assert_eq!(palette.accentize("x"), "\x1b[38;2;97;175;239mx\x1b[0m");
        assert_eq!(super::Palette::plain().mutedize("x"), "x");
    }

    #[test]
    fn controller_falls_back_then_persists_changes() {
        let mut controller =
            ThemeController::load(MemoryThemeStore::new(), ThemeSettings::default()).unwrap();

        assert_eq!(controller.toggle_mode().unwrap(), Mode::Dark);
        controller
            .update(ThemeUpdate {
                color_scheme: Some("solarized".to_string()),
                ..ThemeUpdate::default()
            })
            .unwrap();

        let saved = controller.store().saved().unwrap();
        assert_eq!(saved.mode, Mode::Dark);
        assert_eq!(saved.color_scheme, "Solarized");
        assert_eq!(controller.store().save_count(), 2);
    }

    #[test]
    fn controller_prefers_saved_settings() {
        let saved = ThemeSettings {
            mode: Mode::Dark,
            font_family: "Inter".to_string(),
            ..ThemeSettings::default()
        };
        let controller =
            ThemeController::load(MemoryThemeStore::with(saved.clone()), ThemeSettings::default())
                .unwrap();
        assert_eq!(controller.settings(), &saved);
    }

    #[test]
    fn controller_rejects_bad_values_without_saving() {
        let mut controller =
            ThemeController::load(MemoryThemeStore::new(), ThemeSettings::default()).unwrap();

        let bad = [
            ThemeUpdate {
                color_scheme: Some("Vaporwave".to_string()),
                ..ThemeUpdate::default()
            },
            ThemeUpdate {
                border_radius: Some(99),
                ..ThemeUpdate::default()
            },
            ThemeUpdate {
                font_family: Some("  ".to_string()),
                ..ThemeUpdate::default()
            },
        ];
        for update in bad {
            assert_eq!(controller.update(update).unwrap_err().code(), "invalid_input");
        }
        assert_eq!(controller.store().save_count(), 0);
    }

    #[test]
    fn update_with_one_bad_field_changes_nothing() {
        let mut controller =
            ThemeController::load(MemoryThemeStore::new(), ThemeSettings::default()).unwrap();

        let err = controller
            .update(ThemeUpdate {
                mode: Some(Mode::Dark),
                color_scheme: Some("Vaporwave".to_string()),
                ..ThemeUpdate::default()
            })
            .unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert_eq!(controller.settings().mode, Mode::Light);
        assert_eq!(controller.store().save_count(), 0);
        assert!(controller.store().saved().is_none());
    }

    #[test]
    fn update_saves_all_fields_at_once() {
        let mut controller =
            ThemeController::load(MemoryThemeStore::new(), ThemeSettings::default()).unwrap();

        controller
            .update(ThemeUpdate {
                mode: Some(Mode::Dark),
                color_scheme: Some("nord".to_string()),
                border_radius: Some(12),
                font_family: Some(" Inter ".to_string()),
            })
            .unwrap();

        let saved = controller.store().saved().unwrap();
        assert_eq!(controller.store().save_count(), 1);
        assert_eq!(saved.mode, Mode::Dark);
        assert_eq!(saved.color_scheme, "Nord");
        assert_eq!(saved.border_radius, 12);
        assert_eq!(saved.font_family, "Inter");
        assert_eq!(
            controller.update(ThemeUpdate::default()).unwrap_err().code(),
            "invalid_input"
        );
    }

    #[test]
    fn overrides_apply_without_saving() {
        let mut controller =
            ThemeController::load(MemoryThemeStore::new(), ThemeSettings::default()).unwrap();
        let overrides = ThemeOverrides {
            mode: Some(Mode::Dark),
            border_radius: Some(0),
            ..ThemeOverrides::default()
        };

        controller.apply_overrides(&overrides);

        assert_eq!(controller.settings().mode, Mode::Dark);
        assert_eq!(controller.settings().border_radius, 0);
        assert!(controller.store().saved().is_none());
    }

    #[test]
    fn json_store_round_trips_through_file() {
        let path = temp_path("theme.json");
        let store = JsonThemeStore::new(path.clone());
        assert!(store.load().unwrap().is_none());

        let settings = ThemeSettings {
            mode: Mode::Dark,
            color_scheme: "Nord".to_string(),
            border_radius: 4,
            font_family: "Inter".to_string(),
        };
        store.save(&settings).unwrap();
        let loaded = store.load().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, Some(settings));
    }

    #[test]
    fn json_store_reports_invalid_file() {
        let path = temp_path("bad-theme.json");
        fs::write(&path, "{ nope").unwrap();

        let err = JsonThemeStore::new(path.clone()).load().unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn mode_parses_and_toggles() {
        assert_eq!("Dark".parse::<Mode>().unwrap(), Mode::Dark);
        assert_eq!(Mode::Dark.toggled(), Mode::Light);
        assert!("dim".parse::<Mode>().is_err());
    }
}
