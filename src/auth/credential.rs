//! Bearer credential wrapper that keeps the scheme explicit and the secret out of logs.

// self
use crate::_prelude::*;

/// Authorization schemes the API accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScheme {
	/// `Token <secret>`, issued by the login endpoint.
	#[default]
	Token,
	/// `Bearer <secret>`.
	Bearer,
}
impl TokenScheme {
	/// Header prefix including the trailing space.
	pub const fn prefix(self) -> &'static str {
		match self {
			Self::Token => "Token ",
			Self::Bearer => "Bearer ",
		}
	}

	const ALL: [Self; 2] = [Self::Token, Self::Bearer];
}

/// Stored credential with a recognized scheme prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
	scheme: TokenScheme,
	secret: String,
}
impl Credential {
	/// Builds a credential from its parts.
	pub fn new(scheme: TokenScheme, secret: impl Into<String>) -> Self {
		Self { scheme, secret: secret.into() }
	}

	/// Parses a raw stored value, returning `None` when no recognized prefix is present.
	pub fn parse(raw: &str) -> Option<Self> {
		TokenScheme::ALL.into_iter().find_map(|scheme| {
			raw.strip_prefix(scheme.prefix()).map(|secret| Self::new(scheme, secret))
		})
	}

	/// Parses `raw`, prefixing it with `canonical` when the scheme is missing.
	///
	/// The boolean is `true` when a prefix had to be added.
	pub fn repair(raw: &str, canonical: TokenScheme) -> (Self, bool) {
		let trimmed = raw.trim();

		// A bare prefix is a credential with an empty secret, not a secret named "Token".
		if let Some(scheme) =
			TokenScheme::ALL.into_iter().find(|scheme| trimmed == scheme.prefix().trim_end())
		{
			return (Self::new(scheme, ""), false);
		}

		match Self::parse(trimmed) {
			Some(credential) => (credential, false),
			None => (Self::new(canonical, trimmed), true),
		}
	}

	/// Scheme carried by the credential.
	pub fn scheme(&self) -> TokenScheme {
		self.scheme
	}

	/// Returns the secret without its prefix. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.secret
	}

	/// Full `Authorization` header value (`"<Scheme> <secret>"`).
	pub fn header_value(&self) -> String {
		format!("{}{}", self.scheme.prefix(), self.secret)
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("scheme", &self.scheme)
			.field("secret", &"<redacted>")
			.finish()
	}
}
impl Display for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}<redacted>", self.scheme.prefix())
	}
}
