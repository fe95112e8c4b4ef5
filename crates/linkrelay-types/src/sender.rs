use serde::{Deserialize, Serialize};

/// Display name used when a sender cannot be resolved
pub const UNKNOWN_SENDER: &str = "unknown";

/// Author of a source message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl Sender {
    pub fn with_profile(id: i64, username: Option<String>, first_name: Option<String>) -> Self {
        Self {
            id,
            username,
            first_name,
        }
    }

    /// First name, else username, else the numeric id
    pub fn display_name(&self) -> String {
        let non_empty = |s: &Option<String>| {
            s.as_deref()
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        non_empty(&self.first_name)
            .or_else(|| non_empty(&self.username))
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Display name for an optional sender, falling back to [`UNKNOWN_SENDER`]
pub fn display_name(sender: Option<&Sender>) -> String {
    sender
        .map(Sender::display_name)
        .unwrap_or_else(|| UNKNOWN_SENDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_first_name() {
        let sender = Sender::with_profile(7, Some("alice_u".into()), Some("Alice".into()));
        assert_eq!(sender.display_name(), "Alice");
    }

    #[test]
    fn test_falls_back_to_username() {
        let sender = Sender::with_profile(7, Some("alice_u".into()), None);
        assert_eq!(sender.display_name(), "alice_u");
    }

    #[test]
    fn test_empty_first_name_is_skipped() {
        let sender = Sender::with_profile(7, Some("alice_u".into()), Some(String::new()));
        assert_eq!(sender.display_name(), "alice_u");
    }

    #[test]
    fn test_falls_back_to_id() {
        assert_eq!(Sender::with_profile(4242, None, None).display_name(), "4242");
    }

    #[test]
    fn test_missing_sender_is_unknown() {
        assert_eq!(display_name(None), UNKNOWN_SENDER);
    }
}
