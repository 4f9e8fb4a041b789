//! Authenticated caller identity

use std::fmt;

/// The authenticated user an operation runs as
///
/// Built once at the request boundary and passed explicitly into every
/// operation that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    user_id: String,
}

impl Identity {
    /// `None` for a missing or blank user id
    pub fn new(user_id: &str) -> Option<Self> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            None
        } else {
            Some(Self {
                user_id: user_id.to_string(),
            })
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_user_id_is_no_identity() {
        assert!(Identity::new("").is_none());
        assert!(Identity::new("   ").is_none());
    }

    #[test]
    fn test_user_id_is_trimmed() {
        assert_eq!(Identity::new(" user-a ").unwrap().user_id(), "user-a");
    }
}
