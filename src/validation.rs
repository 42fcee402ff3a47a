use crate::error::{IdrecError, IdrecResult};

/// Trims an optional string, returning None if blank.
pub fn trim_optional(value: Option<&str>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Normalizes the identifying fields of a request. At least one of them must
/// survive trimming.
pub fn require_identifier(
    email: Option<&str>,
    phone_number: Option<&str>,
) -> IdrecResult<(Option<String>, Option<String>)> {
    let email = trim_optional(email);
    let phone_number = trim_optional(phone_number);
    if email.is_none() && phone_number.is_none() {
        return Err(IdrecError::InvalidRequest {
            reason: "Either email or phoneNumber must be provided".into(),
        });
    }
    Ok((email, phone_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_optional_trims() {
        assert_eq!(trim_optional(Some("  hi  ")), Some("hi".to_string()));
    }

    #[test]
    fn trim_optional_returns_none_for_blank() {
        assert_eq!(trim_optional(Some("   ")), None);
    }

    #[test]
    fn trim_optional_returns_none_for_none() {
        assert_eq!(trim_optional(None), None);
    }

    #[test]
    fn require_identifier_accepts_email_only() {
        let (email, phone) = require_identifier(Some(" a@x.com "), None).unwrap();
        assert_eq!(email.as_deref(), Some("a@x.com"));
        assert_eq!(phone, None);
    }

    #[test]
    fn require_identifier_drops_blank_phone() {
        let (email, phone) = require_identifier(Some("a@x.com"), Some("  ")).unwrap();
        assert_eq!(email.as_deref(), Some("a@x.com"));
        assert_eq!(phone, None);
    }

    #[test]
    fn require_identifier_rejects_both_missing() {
        let err = require_identifier(None, None).unwrap_err();
        assert!(matches!(err, IdrecError::InvalidRequest { .. }));
    }

    #[test]
    fn require_identifier_rejects_both_blank() {
        assert!(require_identifier(Some(""), Some("   ")).is_err());
    }
}
