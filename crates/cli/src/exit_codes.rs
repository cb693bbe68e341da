//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 1       | Universal | General error (unspecified)              |
//! | 2       | Universal | CLI usage error (bad args, missing file) |
//! | 40-49   | service   | Auth, transport, backend and export      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into [`refusal_exit_code`]

use riskview_cli::Refusal;
use riskview_client::ApiError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing files, local validation.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Service (40-49)
// =============================================================================

/// No saved login.
pub const EXIT_NOT_AUTH: u8 = 40;

/// Saved login rejected by the service (HTTP 401); it has been cleared.
pub const EXIT_AUTH_EXPIRED: u8 = 41;

/// Service unreachable or the connection failed.
pub const EXIT_NETWORK: u8 = 42;

/// Service answered with an error, or an answer we could not read.
pub const EXIT_BACKEND: u8 = 43;

/// A download could not be written.
pub const EXIT_EXPORT: u8 = 44;

/// Map a refused intent to its exit code.
pub fn refusal_exit_code(refusal: &Refusal) -> u8 {
    match refusal {
        Refusal::NotAuthenticated => EXIT_NOT_AUTH,
        Refusal::AuthExpired => EXIT_AUTH_EXPIRED,
        Refusal::Invalid(_) => EXIT_USAGE,
        Refusal::Busy(_) => EXIT_ERROR,
        Refusal::Backend(err) => match err {
            ApiError::NotAuthenticated => EXIT_NOT_AUTH,
            ApiError::Unauthorized => EXIT_AUTH_EXPIRED,
            ApiError::Network(_) => EXIT_NETWORK,
            ApiError::Io(_) => EXIT_USAGE,
            ApiError::Http(..) | ApiError::Validation(_) | ApiError::Parse(_) => EXIT_BACKEND,
        },
        Refusal::Export(_) => EXIT_EXPORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskview_io::ExportError;

    #[test]
    fn service_codes() {
        assert_eq!(refusal_exit_code(&Refusal::NotAuthenticated), 40);
        assert_eq!(refusal_exit_code(&Refusal::AuthExpired), 41);
        assert_eq!(refusal_exit_code(&Refusal::Backend(ApiError::Network("refused".into()))), 42);
        assert_eq!(refusal_exit_code(&Refusal::Backend(ApiError::Http(500, "분석 오류".into()))), 43);
        assert_eq!(refusal_exit_code(&Refusal::Export(ExportError::Io("disk full".into()))), 44);
    }

    #[test]
    fn validation_is_usage() {
        assert_eq!(refusal_exit_code(&Refusal::Invalid("이미지를 선택하세요.".into())), EXIT_USAGE);
    }
}
