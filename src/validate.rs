//! Synchronous input validation — runs before any network call.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;

/// Minimum password length accepted by the backend.
const MIN_PASSWORD_LEN: usize = 8;

/// Street-address shape: a house number followed by at least one word.
fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\d+[A-Za-z]?\s+\S+").expect("address pattern compiles")
    })
}

/// Validate the address a user typed into the address widget.
pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "address".to_string(),
        });
    }
    if !address_re().is_match(trimmed) {
        return Err(ValidationError::Invalid {
            field: "address".to_string(),
            message: "Enter a street address starting with a house number".to_string(),
        });
    }
    Ok(())
}

/// Validate a change-password request: all fields present, the new
/// password confirmed and long enough.
pub fn validate_change_password(
    current: &str,
    new: &str,
    confirm: &str,
) -> Result<(), ValidationError> {
    if current.is_empty() {
        return Err(ValidationError::Required {
            field: "current_password".to_string(),
        });
    }
    if new.is_empty() {
        return Err(ValidationError::Required {
            field: "new_password".to_string(),
        });
    }
    if new != confirm {
        return Err(ValidationError::Mismatch {
            first: "new_password".to_string(),
            second: "confirm_password".to_string(),
        });
    }
    if new.len() < MIN_PASSWORD_LEN {
        return Err(ValidationError::Invalid {
            field: "new_password".to_string(),
            message: format!("Must be at least {MIN_PASSWORD_LEN} characters"),
        });
    }
    Ok(())
}

/// Validate an upload submission before it leaves the browser: a file
/// must actually be attached.
pub fn validate_upload(filename: Option<&str>, size: usize) -> Result<(), ValidationError> {
    let Some(name) = filename else {
        return Err(ValidationError::NoFileSelected);
    };
    if name.trim().is_empty() || size == 0 {
        return Err(ValidationError::NoFileSelected);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_requires_house_number() {
        assert!(validate_address("1427 Sycamore Ln, Austin, TX").is_ok());
        assert!(validate_address("9 Elm St").is_ok());
        assert!(validate_address("12B Baker Street").is_ok());

        assert!(matches!(
            validate_address(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_address("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_address("Sycamore Lane"),
            Err(ValidationError::Invalid { .. })
        ));
    }

    #[test]
    fn change_password_field_rules() {
        assert!(validate_change_password("old-secret", "new-secret-1", "new-secret-1").is_ok());

        assert!(matches!(
            validate_change_password("", "new-secret-1", "new-secret-1"),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_change_password("old", "", ""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_change_password("old", "new-secret-1", "different"),
            Err(ValidationError::Mismatch { .. })
        ));
        assert!(matches!(
            validate_change_password("old", "short", "short"),
            Err(ValidationError::Invalid { .. })
        ));
    }

    #[test]
    fn upload_requires_a_file() {
        assert!(validate_upload(Some("kitchen.jpg"), 120_000).is_ok());

        assert_eq!(
            validate_upload(None, 0),
            Err(ValidationError::NoFileSelected)
        );
        assert_eq!(
            validate_upload(Some(""), 100),
            Err(ValidationError::NoFileSelected)
        );
        assert_eq!(
            validate_upload(Some("empty.png"), 0),
            Err(ValidationError::NoFileSelected)
        );
    }
}
