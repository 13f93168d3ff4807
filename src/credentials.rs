//! Gemini API key handling
//!
//! The key comes from `GOOGLE_API_KEY`, the config file, or the system
//! keyring (written by `aizen auth`), in that order of precedence. A key that
//! is empty, whitespace, or the sample placeholder counts as missing.

use crate::config::Config;
use crate::error::{AizenError, Result};

const KEYRING_SERVICE: &str = "aizen";
const KEYRING_USER: &str = "gemini_api_key";

/// Placeholder value shipped in the sample configuration
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Fixed message shown whenever the key is missing or rejected
pub const API_KEY_ERROR_MESSAGE: &str = "The GOOGLE_API_KEY is missing or invalid. Please \
ensure it is correctly set in your configuration or environment and restart Aizen.";

/// Whether a key is unusable
///
/// # Examples
///
/// ```
/// use aizen::credentials::is_placeholder_key;
///
/// assert!(is_placeholder_key(""));
/// assert!(is_placeholder_key("   "));
/// assert!(is_placeholder_key("YOUR_API_KEY_HERE"));
/// assert!(!is_placeholder_key("AIzaSyExample"));
/// ```
pub fn is_placeholder_key(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || key == PLACEHOLDER_API_KEY
}

/// Whether the configured provider has the credential it needs
pub fn has_usable_credential(config: &Config) -> bool {
    if !crate::providers::requires_credential(&config.provider.provider_type) {
        return true;
    }
    config
        .provider
        .gemini
        .api_key
        .as_deref()
        .is_some_and(|key| !is_placeholder_key(key))
}

/// Fill in the Gemini key from the keyring when neither the environment nor
/// the config file supplied one
///
/// Keyring failures are logged and leave the config unchanged.
pub fn resolve_api_key(config: &mut Config) {
    if config.provider.gemini.api_key.is_some()
        || !crate::providers::requires_credential(&config.provider.provider_type)
    {
        return;
    }

    match load_api_key() {
        Ok(Some(key)) => {
            tracing::debug!("Using Gemini API key from keyring");
            config.provider.gemini.api_key = Some(key);
        }
        Ok(None) => tracing::debug!("No Gemini API key in keyring"),
        Err(e) => tracing::warn!("Keyring not available: {}", e),
    }
}

/// Store the Gemini key in the system keyring
///
/// # Errors
///
/// Returns `AizenError::Config` for a placeholder key, or the keyring error.
pub fn store_api_key(key: &str) -> Result<()> {
    if is_placeholder_key(key) {
        return Err(AizenError::Config("Refusing to store an empty API key".to_string()).into());
    }
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    entry.set_password(key.trim())?;
    tracing::info!("Stored Gemini API key in keyring");
    Ok(())
}

/// Read the Gemini key from the system keyring
///
/// Returns `Ok(None)` when no entry exists or the stored value is unusable.
pub fn load_api_key() -> Result<Option<String>> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    match entry.get_password() {
        Ok(key) if !is_placeholder_key(&key) => Ok(Some(key)),
        Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(AizenError::Keyring(e).into()),
    }
}

/// Whether an error means the key is missing or was rejected
///
/// True for `MissingCredentials` and for provider errors whose text names the
/// key or reports it invalid.
pub fn is_credential_error(error: &anyhow::Error) -> bool {
    if matches!(
        error.downcast_ref::<AizenError>(),
        Some(AizenError::MissingCredentials(_))
    ) {
        return true;
    }
    mentions_credential(&error.to_string())
}

/// Text check behind [`is_credential_error`]
///
/// Tool failures reach the orchestrator only as a detail string, so this is
/// also how a rejected key is recognized inside a failed search.
pub fn mentions_credential(text: &str) -> bool {
    text.contains("GOOGLE_API_KEY")
        || text.contains("GEMINI_API_KEY")
        || text.contains("API_KEY_INVALID")
        || text.contains("API key not valid")
        || text.starts_with("Missing credentials for provider")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_detection_trims() {
        assert!(is_placeholder_key("  YOUR_API_KEY_HERE \n"));
        assert!(!is_placeholder_key("real"));
    }

    #[test]
    fn test_has_usable_credential() {
        let mut config = Config::default();
        config.provider.provider_type = "gemini".to_string();
        config.provider.gemini.api_key = None;
        assert!(!has_usable_credential(&config));

        config.provider.gemini.api_key = Some(PLACEHOLDER_API_KEY.to_string());
        assert!(!has_usable_credential(&config));

        config.provider.gemini.api_key = Some("abc".to_string());
        assert!(has_usable_credential(&config));

        config.provider.provider_type = "ollama".to_string();
        config.provider.gemini.api_key = None;
        assert!(has_usable_credential(&config));
    }

    #[test]
    fn test_resolve_keeps_supplied_key() {
        let mut config = Config::default();
        config.provider.provider_type = "gemini".to_string();
        config.provider.gemini.api_key = Some(String::new());
        resolve_api_key(&mut config);
        assert_eq!(config.provider.gemini.api_key.as_deref(), Some(""));
    }

    #[test]
    fn test_store_rejects_placeholder() {
        assert!(store_api_key(" ").is_err());
        assert!(store_api_key(PLACEHOLDER_API_KEY).is_err());
    }

    #[test]
    fn test_credential_error_detection() {
        let missing: anyhow::Error = AizenError::MissingCredentials("gemini".to_string()).into();
        assert!(is_credential_error(&missing));

        let rejected: anyhow::Error = AizenError::Provider(
            "Gemini returned error 400 Bad Request: API key not valid. Please pass a valid API key."
                .to_string(),
        )
        .into();
        assert!(is_credential_error(&rejected));

        let other: anyhow::Error = AizenError::Provider("timeout".to_string()).into();
        assert!(!is_credential_error(&other));
    }

    #[test]
    fn test_mentions_credential_in_tool_detail() {
        let missing = AizenError::MissingCredentials("gemini".to_string()).to_string();
        assert!(mentions_credential(&missing));
        assert!(mentions_credential("Provider error: API key not valid."));
        assert!(!mentions_credential("Provider error: 503 Service Unavailable"));
    }
}
