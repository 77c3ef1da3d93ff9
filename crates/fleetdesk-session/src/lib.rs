//! Fleetdesk Session
//!
//! App-wide contexts built on top of the API client and state store:
//! - `SessionContext`: who is signed in and what they may do
//! - `TenantContext`: the signed-in user's organization
//! - `SettingsContext`: UI preferences persisted under `app-settings`

pub mod context;
pub mod settings;
pub mod tenant;
pub mod token;

pub use context::SessionContext;
pub use settings::{
    Settings, SettingsContext, SettingsError, ThemeContrast, ThemeDirection, ThemeLayout,
    ThemeMode,
};
pub use tenant::TenantContext;
pub use token::is_token_expired;
