// Validation utilities module
// Domain rules that the validator derive cannot express declaratively

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use validator::ValidationError;

use crate::error::{ServiceError, ServiceResult};

pub const MINIMUM_AGE_YEARS: i32 = 18;

/// Rejects strings that are empty once trimmed
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

/// Event dates must lie in the future
pub fn ensure_future(starts_at: DateTime<Utc>, now: DateTime<Utc>) -> ServiceResult<()> {
    if starts_at <= now {
        return Err(ServiceError::invalid_input(
            "Event date must be in the future",
        ));
    }
    Ok(())
}

/// Users must be born in the past and be at least 18 years old
pub fn ensure_adult(date_of_birth: NaiveDate, today: NaiveDate) -> ServiceResult<()> {
    if date_of_birth >= today {
        return Err(ServiceError::invalid_input(
            "Date of birth must be in the past",
        ));
    }

    if years_between(date_of_birth, today) < MINIMUM_AGE_YEARS {
        return Err(ServiceError::invalid_input(format!(
            "User must be at least {} years old",
            MINIMUM_AGE_YEARS
        )));
    }

    Ok(())
}

/// Lower-cases and trims an email so uniqueness is case-insensitive
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn years_between(from: NaiveDate, to: NaiveDate) -> i32 {
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    years
}
