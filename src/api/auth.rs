//! Account endpoints: login, registration, verification codes, and password management.
//!
//! Every string input is trimmed before it is sent. Envelopes with `status: "error"` surface as
//! [`Error::Rejected`].

// crates.io
use serde_json::json;
// self
use crate::{
	_prelude::*,
	ApiClient,
	http::{ApiRequest, Envelope},
	obs::CallKind,
	store::{StoreError, USER_INFO_KEY},
};

/// Profile returned at login and cached under `userInfo`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Account id.
	pub id: u64,
	/// Account email.
	pub email: String,
	/// Display name.
	#[serde(default)]
	pub username: String,
	/// Whether the account is active.
	#[serde(default)]
	pub is_active: bool,
	/// Fields not modeled above (e.g. `language`), preserved in the cache.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

/// `data` of a successful login.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoginData {
	/// Raw token without scheme.
	pub token: String,
	/// Logged-in user.
	pub user: UserProfile,
}

/// Registration form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
	/// Account email.
	pub email: String,
	/// Chosen password.
	pub password: String,
	/// Emailed verification code.
	pub code: String,
	/// Invitation code.
	pub invitation_code: String,
}

/// Password reset with an emailed code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordReset {
	/// Account email.
	pub email: String,
	/// Emailed verification code.
	pub code: String,
	/// New password.
	pub new_password: String,
	/// Confirmation of the new password.
	pub confirm_password: String,
}

/// Password change for the logged-in user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordChange {
	/// Current password.
	pub current_password: String,
	/// New password.
	pub new_password: String,
	/// Confirmation of the new password.
	pub confirm_password: String,
}

impl ApiClient {
	/// Logs in, storing the credential as `Token <token>` and caching the profile.
	pub async fn login(&self, email: &str, password: &str) -> Result<LoginData> {
		let body = json!({ "email": email.trim(), "password": password.trim() });
		let envelope = self.auth_call("login", ApiRequest::post("/auth/login/", body)).await?;
		let login: LoginData = serde_path_to_error::deserialize(envelope.data).map_err(|e| {
			Error::MalformedResponse { reason: format!("login response is invalid: {e}") }
		})?;
		let profile = serde_json::to_string(&login.user)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

		self.guard().store_credential(&login.token).await?;
		self.store().set(USER_INFO_KEY, profile).await?;

		Ok(login)
	}

	/// Creates an account.
	pub async fn register(&self, form: &Registration) -> Result<Envelope> {
		let body = json!({
			"email": form.email.trim(),
			"password": form.password.trim(),
			"code": form.code.trim(),
			"invitation_code": form.invitation_code.trim(),
		});

		self.auth_call("register", ApiRequest::post("/auth/register/", body)).await
	}

	/// Emails a verification code.
	pub async fn send_code(&self, email: &str) -> Result<Envelope> {
		let body = json!({ "email": email.trim() });

		self.auth_call("send_code", ApiRequest::post("/auth/send-code/", body)).await
	}

	/// Emails a password reset code.
	pub async fn request_password_reset(&self, email: &str) -> Result<Envelope> {
		let body = json!({ "email": email.trim() });

		self.auth_call("request_password_reset", ApiRequest::post("/auth/request-password-reset/", body))
			.await
	}

	/// Resets the password with an emailed code.
	pub async fn reset_password_with_code(&self, form: &PasswordReset) -> Result<Envelope> {
		let body = json!({
			"email": form.email.trim(),
			"code": form.code.trim(),
			"new_password": form.new_password.trim(),
			"confirm_password": form.confirm_password.trim(),
		});

		self.auth_call(
			"reset_password_with_code",
			ApiRequest::post("/auth/reset-password-with-code/", body),
		)
		.await
	}

	/// Changes the password of the logged-in user; requires a valid credential.
	pub async fn change_password(&self, form: &PasswordChange) -> Result<Envelope> {
		let body = json!({
			"current_password": form.current_password.trim(),
			"new_password": form.new_password.trim(),
			"confirm_password": form.confirm_password.trim(),
		});

		self.auth_call("change_password", ApiRequest::post("/auth/change-password/", body)).await
	}

	/// Clears the local session (credential and cached profile).
	pub async fn logout(&self) -> Result<()> {
		self.guard().clear().await
	}

	async fn auth_call(&self, stage: &'static str, request: ApiRequest) -> Result<Envelope> {
		self.call(CallKind::Auth, stage, &request, &CancellationToken::new()).await?.into_result()
	}
}
