//! Storage key constants.

/// Keys written by the session layer.
pub struct StorageKeys;

impl StorageKeys {
    /// JSON-serialized identity
    pub const USER: &'static str = "user";

    /// Opaque access token
    pub const ACCESS_TOKEN: &'static str = "accessToken";

    /// Opaque refresh token
    pub const REFRESH_TOKEN: &'static str = "refreshToken";

    /// Last login identifier, kept only when "remember me" was chosen
    pub const REMEMBERED_USERNAME: &'static str = "rememberedUsername";

    /// Stable per-device identifier provided by the device fingerprint collaborator
    pub const DEVICE_ID: &'static str = "deviceId";

    /// Sentinel written and removed by the writability probe
    pub const PROBE_SENTINEL: &'static str = "__portal_storage_probe__";

    /// Keys that together make up a persisted session.
    pub const SESSION_KEYS: [&'static str; 3] =
        [Self::USER, Self::ACCESS_TOKEN, Self::REFRESH_TOKEN];
}
