use std::sync::{PoisonError, RwLock};

const MIN_API_KEY_LENGTH: usize = 5;

/// Session-scoped holder of the user's API key.
///
/// The key is only ever kept in memory. An empty key means "missing", which
/// blocks chatting without being an error. Nothing here checks whether the
/// key is valid; the completion backend is the judge of that.
#[derive(Default)]
pub struct CredentialHolder {
    api_key: RwLock<String>,
}

impl CredentialHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: RwLock::new(api_key.into()),
        }
    }

    pub fn api_key(&self) -> String {
        self.api_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_api_key(&self, api_key: impl Into<String>) {
        *self.api_key.write().unwrap_or_else(PoisonError::into_inner) = api_key.into();
    }

    /// Forget the key so the user is asked for a new one.
    pub fn clear(&self) {
        self.set_api_key(String::new());
    }

    pub fn is_missing(&self) -> bool {
        self.api_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// Form-level check for a key typed into the API key prompt.
pub fn validate_api_key_input(input: &str) -> Result<(), String> {
    if input.trim().chars().count() < MIN_API_KEY_LENGTH {
        return Err(format!(
            "The API key must be at least {MIN_API_KEY_LENGTH} characters."
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_missing_until_a_key_is_set() {
        let holder = CredentialHolder::new();
        assert!(holder.is_missing());
        assert_eq!(holder.api_key(), "");

        holder.set_api_key("sk-test");
        assert!(!holder.is_missing());
        assert_eq!(holder.api_key(), "sk-test");

        holder.clear();
        assert!(holder.is_missing());
    }

    #[test]
    fn setting_an_empty_key_counts_as_missing() {
        let holder = CredentialHolder::with_api_key("sk-test");
        holder.set_api_key("");
        assert!(holder.is_missing());
    }

    #[test]
    fn api_key_input_needs_five_characters() {
        assert!(validate_api_key_input("sk-1").is_err());
        assert!(validate_api_key_input("   sk-1  ").is_err());
        assert!(validate_api_key_input("sk-12").is_ok());
    }
}
