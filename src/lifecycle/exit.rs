//! Process exit codes.

/// Transfer completed (or the user declined it).
pub const EXIT_SUCCESS: u8 = 0;

/// A classified fatal error ended the flow.
pub const EXIT_FATAL: u8 = 1;

/// The configuration file could not be loaded or failed validation.
pub const EXIT_CONFIG: u8 = 2;

/// The user pressed Ctrl-C while input was requested.
pub const EXIT_INTERRUPTED: u8 = 130;
