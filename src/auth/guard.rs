//! Token guard: validates and self-heals the stored credential before each request.

// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenScheme},
	obs,
	store::{CredentialStore, TOKEN_KEY, USER_INFO_KEY},
};

/// Length requirement applied to the secret after its scheme prefix is stripped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenLengthRule {
	/// Any non-empty secret.
	#[default]
	NonEmpty,
	/// At least `n` characters.
	MinLength(usize),
	/// Exactly `n` characters (the API issues 40-character tokens).
	Exact(usize),
}
impl TokenLengthRule {
	/// Returns `true` if `secret` satisfies the rule.
	pub fn accepts(self, secret: &str) -> bool {
		let len = secret.chars().count();

		match self {
			Self::NonEmpty => len > 0,
			Self::MinLength(min) => len > 0 && len >= min,
			Self::Exact(exact) => len == exact,
		}
	}
}
impl Display for TokenLengthRule {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::NonEmpty => f.write_str("non-empty"),
			Self::MinLength(min) => write!(f, "minimum length {min}"),
			Self::Exact(exact) => write!(f, "exact length {exact}"),
		}
	}
}

/// Credential validation policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenPolicy {
	/// Scheme prepended when the stored value has none.
	pub scheme: TokenScheme,
	/// Length requirement for the secret.
	pub length_rule: TokenLengthRule,
}

/// Reads, repairs, and validates the credential held in a [`CredentialStore`].
#[derive(Clone)]
pub struct TokenGuard {
	store: Arc<dyn CredentialStore>,
	policy: TokenPolicy,
}
impl TokenGuard {
	/// Creates a guard over `store`.
	pub fn new(store: Arc<dyn CredentialStore>, policy: TokenPolicy) -> Self {
		Self { store, policy }
	}

	/// Policy enforced by this guard.
	pub fn policy(&self) -> TokenPolicy {
		self.policy
	}

	/// Loads the stored credential, persisting a prefixed copy if the scheme was missing.
	///
	/// Returns `None` when nothing (or only whitespace) is stored.
	pub async fn normalize(&self) -> Result<Option<Credential>> {
		let Some(raw) = self.store.get(TOKEN_KEY).await? else {
			return Ok(None);
		};

		if raw.trim().is_empty() {
			return Ok(None);
		}

		let (credential, repaired) = Credential::repair(&raw, self.policy.scheme);

		if repaired {
			self.store.set(TOKEN_KEY, credential.header_value()).await?;

			obs::credential_repaired(credential.scheme());
		}

		Ok(Some(credential))
	}

	/// Returns `true` if a usable credential is stored, repairing its format on the way.
	pub async fn validate(&self) -> Result<bool> {
		match self.require().await {
			Ok(_) => Ok(true),
			Err(Error::AuthInvalid { .. }) => Ok(false),
			Err(e) => Err(e),
		}
	}

	/// Returns the normalized credential or [`Error::AuthInvalid`].
	pub async fn require(&self) -> Result<Credential> {
		let credential = self
			.normalize()
			.await?
			.ok_or_else(|| Error::AuthInvalid { reason: "no credential is stored".into() })?;

		if !self.policy.length_rule.accepts(credential.expose()) {
			return Err(Error::AuthInvalid {
				reason: format!("credential violates the {} rule", self.policy.length_rule),
			});
		}

		Ok(credential)
	}

	/// Persists a freshly issued credential, adding the canonical scheme if needed.
	pub async fn store_credential(&self, raw: &str) -> Result<Credential> {
		let (credential, _) = Credential::repair(raw, self.policy.scheme);

		self.store.set(TOKEN_KEY, credential.header_value()).await?;

		Ok(credential)
	}

	/// Removes the credential and the cached user profile.
	pub async fn clear(&self) -> Result<()> {
		self.store.remove(TOKEN_KEY).await?;
		self.store.remove(USER_INFO_KEY).await?;

		Ok(())
	}
}
impl Debug for TokenGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGuard").field("policy", &self.policy).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn guard_with(token: Option<&str>, policy: TokenPolicy) -> (TokenGuard, MemoryStore) {
		let store = match token {
			Some(value) => MemoryStore::with_entries([(TOKEN_KEY, value)]),
			None => MemoryStore::default(),
		};

		(TokenGuard::new(Arc::new(store.clone()), policy), store)
	}

	#[tokio::test]
	async fn normalize_persists_prefixed_credential() {
		let (guard, store) = guard_with(Some("abc123"), TokenPolicy::default());

		guard.normalize().await.expect("Normalize should succeed.");

		assert_eq!(store.peek(TOKEN_KEY).as_deref(), Some("Token abc123"));
		assert!(guard.validate().await.expect("Validate should succeed."));
	}

	#[tokio::test]
	async fn missing_credential_fails_validation() {
		let (guard, _) = guard_with(None, TokenPolicy::default());

		assert!(!guard.validate().await.expect("Validate should succeed."));
		assert!(matches!(guard.require().await, Err(Error::AuthInvalid { .. })));

		let (blank, _) = guard_with(Some("   "), TokenPolicy::default());

		assert!(!blank.validate().await.expect("Validate should succeed."));
	}

	#[tokio::test]
	async fn exact_length_rule_is_enforced_after_prefix() {
		let policy = TokenPolicy { length_rule: TokenLengthRule::Exact(40), ..TokenPolicy::default() };
		let forty = "3c40be432b414963c4a07d375ae4091f1756304d";
		let (accepted, _) = guard_with(Some(format!("Token {forty}").as_str()), policy);
		let (rejected, _) = guard_with(Some("Token short"), policy);

		assert!(accepted.validate().await.expect("Validate should succeed."));
		assert!(!rejected.validate().await.expect("Validate should succeed."));
	}

	#[tokio::test]
	async fn empty_secret_after_prefix_is_rejected() {
		let (guard, _) = guard_with(Some("Token "), TokenPolicy::default());

		assert!(!guard.validate().await.expect("Validate should succeed."));
	}

	#[tokio::test]
	async fn clear_removes_session_keys() {
		let store = MemoryStore::with_entries([(TOKEN_KEY, "Token abc"), (USER_INFO_KEY, "{}")]);
		let guard = TokenGuard::new(Arc::new(store.clone()), TokenPolicy::default());

		guard.clear().await.expect("Clear should succeed.");

		assert!(store.peek(TOKEN_KEY).is_none());
		assert!(store.peek(USER_INFO_KEY).is_none());
	}

	#[test]
	fn length_rules_deserialize_from_snake_case() {
		let rule: TokenLengthRule =
			serde_json::from_str(r#"{"min_length":5}"#).expect("Rule should deserialize.");

		assert_eq!(rule, TokenLengthRule::MinLength(5));
		assert!(!rule.accepts("abcd"));
		assert!(rule.accepts("abcde"));
	}
}
