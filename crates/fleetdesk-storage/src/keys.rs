//! Fixed storage keys

/// Bearer token of the signed-in user
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Display preferences blob
pub const SETTINGS_KEY: &str = "app-settings";
