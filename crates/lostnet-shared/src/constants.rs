/// Storage key under which the bearer token is persisted locally.
/// The backend issues it at login; its presence is the sole signal of an
/// authenticated session.
pub const CREDENTIAL_KEY: &str = "accessToken";

/// Claim names that may carry the user id inside the token payload,
/// in precedence order.
pub const USER_ID_CLAIMS: [&str; 2] = ["userId", "id"];

/// Default base URL of the lostnet backend.
pub const DEFAULT_SERVER_URL: &str = "https://lostnet-server.onrender.com";

/// Path prefix shared by every API route.
pub const API_PREFIX: &str = "/api/v1";

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default upper bound on cache entries kept without any subscriber.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;
