//! Persisted UI preferences

use fleetdesk_storage::StateStore;
use fleetdesk_storage::keys::SETTINGS_KEY;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Unknown setting: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, ()> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }
    };
}

keyword_enum!(ThemeMode { Light => "light", Dark => "dark" });
keyword_enum!(ThemeDirection { Ltr => "ltr", Rtl => "rtl" });
keyword_enum!(ThemeContrast { Default => "default", Bold => "bold" });
keyword_enum!(
    /// Navigation placement
    ThemeLayout { Vertical => "vertical", Horizontal => "horizontal", Mini => "mini" }
);

pub const DEFAULT_PRIMARY_COLOR: &str = "default";
pub const DEFAULT_FONT_SIZE: u8 = 16;
pub const FONT_SIZE_RANGE: RangeInclusive<u8> = 8..=32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme_mode: ThemeMode,
    pub theme_direction: ThemeDirection,
    pub theme_contrast: ThemeContrast,
    pub theme_layout: ThemeLayout,
    /// Palette preset name
    pub primary_color: String,
    pub compact_layout: bool,
    pub font_size: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme_mode: ThemeMode::default(),
            theme_direction: ThemeDirection::default(),
            theme_contrast: ThemeContrast::default(),
            theme_layout: ThemeLayout::default(),
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            compact_layout: true,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl Settings {
    pub const FIELDS: [&'static str; 7] = [
        "themeMode",
        "themeDirection",
        "themeContrast",
        "themeLayout",
        "primaryColor",
        "compactLayout",
        "fontSize",
    ];

    /// Set a field from text, using its JSON name
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };

        match field {
            "themeMode" => self.theme_mode = value.parse().map_err(|_| invalid())?,
            "themeDirection" => self.theme_direction = value.parse().map_err(|_| invalid())?,
            "themeContrast" => self.theme_contrast = value.parse().map_err(|_| invalid())?,
            "themeLayout" => self.theme_layout = value.parse().map_err(|_| invalid())?,
            "primaryColor" => {
                let value = value.trim();
                if value.is_empty() {
                    return Err(invalid());
                }
                self.primary_color = value.to_string();
            }
            "compactLayout" => self.compact_layout = value.trim().parse().map_err(|_| invalid())?,
            "fontSize" => {
                self.font_size = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|size| FONT_SIZE_RANGE.contains(size))
                    .ok_or_else(invalid)?
            }
            other => return Err(SettingsError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

/// Holds the current [`Settings`] and writes every change through to storage.
///
/// Storage trouble never surfaces as an error: reads fall back to defaults
/// and failed writes keep the in-memory value.
pub struct SettingsContext {
    store: Arc<dyn StateStore>,
    settings: watch::Sender<Settings>,
}

impl SettingsContext {
    pub async fn load(store: Arc<dyn StateStore>) -> Self {
        let settings = match store.get(SETTINGS_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Failed to parse stored settings, using defaults: {}", e);
                Settings::default()
            }),
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Failed to read stored settings, using defaults: {}", e);
                Settings::default()
            }
        };

        let (settings, _) = watch::channel(settings);
        Self { store, settings }
    }

    pub fn current(&self) -> Settings {
        self.settings.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.settings.subscribe()
    }

    /// Whether anything differs from the defaults
    pub fn can_reset(&self) -> bool {
        *self.settings.borrow() != Settings::default()
    }

    pub async fn update(&self, f: impl FnOnce(&mut Settings)) {
        let mut next = self.current();
        f(&mut next);
        self.store_settings(next).await;
    }

    pub async fn set_field(&self, field: &str, value: &str) -> Result<(), SettingsError> {
        let mut next = self.current();
        next.set_field(field, value)?;
        self.store_settings(next).await;
        Ok(())
    }

    pub async fn set_theme_mode(&self, mode: ThemeMode) {
        self.update(|s| s.theme_mode = mode).await
    }

    pub async fn set_theme_direction(&self, direction: ThemeDirection) {
        self.update(|s| s.theme_direction = direction).await
    }

    pub async fn set_theme_contrast(&self, contrast: ThemeContrast) {
        self.update(|s| s.theme_contrast = contrast).await
    }

    pub async fn set_theme_layout(&self, layout: ThemeLayout) {
        self.update(|s| s.theme_layout = layout).await
    }

    pub async fn set_primary_color(&self, color: impl Into<String>) {
        let color = color.into();
        self.update(|s| s.primary_color = color).await
    }

    pub async fn set_compact_layout(&self, compact: bool) {
        self.update(|s| s.compact_layout = compact).await
    }

    pub async fn set_font_size(&self, size: u8) -> Result<(), SettingsError> {
        if !FONT_SIZE_RANGE.contains(&size) {
            return Err(SettingsError::InvalidValue {
                field: "fontSize".to_string(),
                value: size.to_string(),
            });
        }
        self.update(|s| s.font_size = size).await;
        Ok(())
    }

    pub async fn reset(&self) {
        self.store_settings(Settings::default()).await
    }

    async fn store_settings(&self, settings: Settings) {
        self.settings.send_replace(settings.clone());

        let raw = match serde_json::to_string(&settings) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize settings: {}", e);
                return;
            }
        };
        match self.store.set(SETTINGS_KEY, raw).await {
            Ok(()) => debug!("Settings saved"),
            Err(e) => warn!("Failed to save settings: {}", e),
        }
    }
}
