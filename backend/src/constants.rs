pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Listing page size when the `limit` query param is absent or unparsable.
pub const DEFAULT_LIST_LIMIT: i64 = 5;

/// Access tokens are valid for 24 hours from issuance.
pub const TOKEN_TTL_HOURS: i64 = 24;
