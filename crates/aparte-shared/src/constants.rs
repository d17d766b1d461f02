use std::time::Duration;

/// Application name
pub const APP_NAME: &str = "Aparté";

/// Separator between the two participant ids in a room key
pub const ROOM_KEY_SEPARATOR: char = '_';

/// Delay before a sent message is best-effort marked as delivered
pub const DELIVERY_CONFIRM_DELAY: Duration = Duration::from_secs(1);

/// Idle time after the last keystroke before the typing flag is cleared
pub const TYPING_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Age past which a typing timestamp is treated as stale at read time
pub const TYPING_FRESH_WINDOW_SECS: i64 = 3;

/// A user with a last-seen timestamp newer than this still counts as online
pub const ONLINE_GRACE_SECS: i64 = 5 * 60;

/// Number of attempts for credential-service calls
pub const AUTH_ATTEMPTS: u32 = 3;

/// Pause between credential-service attempts
pub const AUTH_RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Maximum message text size in bytes (10 KiB)
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024;
