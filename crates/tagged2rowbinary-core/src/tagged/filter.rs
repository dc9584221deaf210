// Malformed identifier filter
//
// Runs before parsing. Rejections are logged and skipped; they never fail
// the file.

use tracing::warn;

/// Identifiers longer than this are skipped.
pub const MAX_IDENTIFIER_LEN: usize = 1000;

/// Why an identifier was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooLong,
    BadLeadingByte,
    InvalidUtf8,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooLong => "name too long, skipping",
            Self::BadLeadingByte => "name starts with wrong char, skipping",
            Self::InvalidUtf8 => "name is not valid UTF-8, skipping",
        }
    }
}

pub fn check_identifier(name: &[u8]) -> Result<&str, Rejection> {
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Rejection::TooLong);
    }
    if let Some(first) = name.first() {
        if !first.is_ascii_alphabetic() {
            return Err(Rejection::BadLeadingByte);
        }
    }
    std::str::from_utf8(name).map_err(|_| Rejection::InvalidUtf8)
}

/// Check `name` and log the rejection, if any.
pub fn admit(name: &[u8]) -> Option<&str> {
    match check_identifier(name) {
        Ok(identifier) => Some(identifier),
        Err(rejection) => {
            warn!(
                target: "tagged::malformed",
                name = %String::from_utf8_lossy(name),
                len = name.len(),
                "{}",
                rejection.as_str()
            );
            None
        }
    }
}
