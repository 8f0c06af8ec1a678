//! Report language selection.

// self
use crate::{
	_prelude::*,
	store::{CredentialStore, LANGUAGE_KEY, USER_INFO_KEY},
};

/// Languages the report endpoints can produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
	/// Simplified Chinese.
	#[default]
	#[serde(rename = "zh-CN")]
	ZhCn,
	/// English.
	#[serde(rename = "en-US")]
	EnUs,
	/// Japanese.
	#[serde(rename = "ja-JP")]
	JaJp,
	/// Korean.
	#[serde(rename = "ko-KR")]
	KoKr,
}
impl Language {
	/// BCP 47 tag sent as the `language` query parameter.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ZhCn => "zh-CN",
			Self::EnUs => "en-US",
			Self::JaJp => "ja-JP",
			Self::KoKr => "ko-KR",
		}
	}

	/// Resolves the preferred language: the stored `language` key, then the cached profile's
	/// `language` field, then `default`.
	///
	/// Unsupported or unreadable values are skipped rather than reported.
	pub async fn resolve(store: &dyn CredentialStore, default: Self) -> Result<Self> {
		if let Some(language) = store.get(LANGUAGE_KEY).await?.and_then(|raw| raw.parse().ok()) {
			return Ok(language);
		}

		let from_profile = store.get(USER_INFO_KEY).await?.and_then(|raw| {
			serde_json::from_str::<Value>(&raw)
				.ok()?
				.get("language")?
				.as_str()?
				.parse()
				.ok()
		});

		Ok(from_profile.unwrap_or(default))
	}
}
impl FromStr for Language {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"zh-CN" => Ok(Self::ZhCn),
			"en-US" => Ok(Self::EnUs),
			"ja-JP" => Ok(Self::JaJp),
			"ko-KR" => Ok(Self::KoKr),
			_ => Err(Error::MalformedResponse { reason: format!("unsupported language `{s}`") }),
		}
	}
}
impl Display for Language {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
