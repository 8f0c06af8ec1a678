//! Credential model, validation policy, and the token guard run before every request.

pub mod credential;
pub mod guard;

pub use credential::*;
pub use guard::*;

/// Endpoints that authenticate the user and therefore skip credential validation and
/// `Authorization` injection.
pub const AUTH_EXEMPT_PATHS: [&str; 5] = [
	"/auth/login",
	"/auth/register",
	"/auth/send-code",
	"/auth/request-password-reset",
	"/auth/reset-password-with-code",
];

/// Returns `true` if `path` targets an authentication endpoint.
pub fn is_auth_endpoint(path: &str) -> bool {
	AUTH_EXEMPT_PATHS.iter().any(|exempt| path.contains(exempt))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn auth_endpoints_are_exempt_except_change_password() {
		assert!(is_auth_endpoint("/auth/login/"));
		assert!(is_auth_endpoint("https://www.cooltrade.xyz/api/auth/send-code/"));
		assert!(is_auth_endpoint("/auth/reset-password-with-code/"));
		assert!(!is_auth_endpoint("/auth/change-password/"));
		assert!(!is_auth_endpoint("/crypto/get_report/BTCUSDT/"));
	}
}
