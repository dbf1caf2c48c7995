use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps personal data (emails) so it never shows up in `Debug` or `Display` output.
///
/// Serialization is transparent: API responses still carry the real value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Masked(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_value() {
        let email = Masked("alice@example.com".to_string());
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(email.to_string(), "********");
    }

    #[test]
    fn test_serialize_is_transparent() {
        let email = Masked("alice@example.com".to_string());
        let json = serde_json::to_string(&email).unwrap();
        assert_eq!(json, "\"alice@example.com\"");
    }
}
