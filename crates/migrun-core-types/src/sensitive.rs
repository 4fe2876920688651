//! Sensitive data marker for automatic redaction
//!
//! Database passwords travel inside connection parameters that are logged
//! and printed in several places. Wrapping them in `Sensitive<T>` keeps them
//! out of `Debug` and `Display` output.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Wrapper for sensitive data that redacts itself in Debug and Display
///
/// # Example
///
/// ```
/// use migrun_core_types::Sensitive;
///
/// let password = Sensitive::new("supersecret");
/// println!("{:?}", password); // Prints: ***REDACTED***
/// println!("{}", password);   // Prints: ***REDACTED***
///
/// assert_eq!(password.expose(), &"supersecret");
/// ```
#[derive(Default, PartialEq, Eq)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the underlying sensitive value
    ///
    /// Use this only where the secret must actually be sent, such as the
    /// authentication handshake.
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume the wrapper and return the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T: Clone> Clone for Sensitive<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Sensitive<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Sensitive)
    }
}

impl From<String> for Sensitive<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_debug_redaction() {
        let secret = Sensitive::new("supersecret");
        let debug_str = format!("{:?}", secret);
        assert_eq!(debug_str, "***REDACTED***");
        assert!(!debug_str.contains("supersecret"));
    }

    #[test]
    fn test_sensitive_display_redaction() {
        let secret = Sensitive::new("hunter2");
        assert_eq!(format!("{}", secret), "***REDACTED***");
    }

    #[test]
    fn test_sensitive_into_inner() {
        let secret = Sensitive::new(String::from("test"));
        assert_eq!(secret.into_inner(), "test");
    }

    #[test]
    fn test_sensitive_deserialize_is_transparent() {
        #[derive(Deserialize)]
        struct Creds {
            password: Sensitive<String>,
        }

        let creds: Creds = serde_json::from_str(r#"{"password":"pw"}"#).unwrap();
        assert_eq!(creds.password.expose(), "pw");
    }

    #[test]
    fn test_sensitive_with_struct() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct Login {
            user: String,
            password: Sensitive<String>,
        }

        let login = Login {
            user: "localuser".to_string(),
            password: Sensitive::new("supersecret".to_string()),
        };

        let debug_str = format!("{:?}", login);
        assert!(debug_str.contains("localuser"));
        assert!(debug_str.contains("***REDACTED***"));
        assert!(!debug_str.contains("supersecret"));
    }
}
