//! Share token format

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

static TOKEN_RE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    RegexBuilder::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .case_insensitive(true)
        .build()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed share token")]
pub struct MalformedToken;

/// A share token that has passed the UUID format check
///
/// Construction is the only gate; holding a `ShareToken` says nothing about
/// whether a trip with that token exists or is shareable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShareToken(String);

impl ShareToken {
    /// Check format only. Normalizes to lowercase, the form tokens are stored in.
    pub fn parse(raw: &str) -> Result<Self, MalformedToken> {
        let raw = raw.trim();
        match TOKEN_RE.as_ref() {
            Ok(re) if re.is_match(raw) => Ok(Self(raw.to_ascii_lowercase())),
            _ => Err(MalformedToken),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ShareToken {
    type Err = MalformedToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
