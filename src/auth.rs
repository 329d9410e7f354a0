use std::fmt;

/// Personal access token used to authenticate against the build server.
///
/// The value never shows up in `Debug` output so it cannot leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `None` for blank values, which are treated as "not provided".
    pub fn non_empty(value: &str) -> Option<Self> {
        let value = value.trim();
        (!value.is_empty()).then(|| Self(value.to_string()))
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_value() {
        let token = Token::from("super-secret");
        assert_eq!(format!("{token:?}"), "Token(***)");
        assert_eq!(token.as_str(), "super-secret");
    }

    #[test]
    fn test_blank_token_is_none() {
        assert!(Token::non_empty("   ").is_none());
        assert_eq!(Token::non_empty(" pat ").unwrap().as_str(), "pat");
    }
}
