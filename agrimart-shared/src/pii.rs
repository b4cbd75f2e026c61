use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps contact details so they never show up in `{:?}` or `{}` output.
///
/// Serialization writes the real value: documents and API responses need it,
/// log lines do not.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl fmt::Display for Masked<String> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keep the domain of an email address, hide the mailbox
        match self.0.split_once('@') {
            Some((_, domain)) => write!(f, "****@{}", domain),
            None => write!(f, "********"),
        }
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
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_email_output() {
        let email = Masked::new("ravi@farmco.in".to_string());
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(format!("{}", email), "****@farmco.in");
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"ravi@farmco.in\"");
    }
}
