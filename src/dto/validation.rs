//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dto::gamejam::SaveGameJamRequest;

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 32;

/// Validates that a username is 3 to 32 ASCII letters, digits or underscores.
///
/// # Examples
///
/// ```ignore
/// validate_username("pixel_witch") // Ok
/// validate_username("ab")          // Err - too short
/// validate_username("no spaces")   // Err - invalid character
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username.len()) {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!(
                "Username must be {USERNAME_MIN_LEN} to {USERNAME_MAX_LEN} characters (got {})",
                username.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        let mut err = ValidationError::new("username_format");
        err.message = Some("Username must contain only letters, digits or underscores".into());
        return Err(err);
    }

    Ok(())
}

/// Rejects game jams ending before they start.
pub fn validate_date_range(request: &SaveGameJamRequest) -> Result<(), ValidationError> {
    if request.start_date <= request.end_date {
        return Ok(());
    }

    let mut err = ValidationError::new("date_range");
    err.message = Some("start_date must not be after end_date".into());
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn jam(start: time::OffsetDateTime, end: time::OffsetDateTime) -> SaveGameJamRequest {
        SaveGameJamRequest {
            id: None,
            name: "Ludum Dare".into(),
            description: None,
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn test_validate_username_valid() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("Pixel_Witch_42").is_ok());
        assert!(validate_username("abc").is_ok());
    }

    #[test]
    fn test_validate_username_invalid() {
        assert!(validate_username("ab").is_err()); // too short
        assert!(validate_username(&"a".repeat(33)).is_err()); // too long
        assert!(validate_username("no spaces").is_err());
        assert!(validate_username("@alice").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let start = datetime!(2024-01-01 00:00 UTC);
        let end = datetime!(2024-01-03 00:00 UTC);

        assert!(validate_date_range(&jam(start, end)).is_ok());
        assert!(validate_date_range(&jam(start, start)).is_ok()); // zero duration
        assert!(validate_date_range(&jam(end, start)).is_err());
    }
}
