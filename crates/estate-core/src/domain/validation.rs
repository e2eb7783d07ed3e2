//! Field validators shared by the input payloads

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 \-()]{5,19}$").expect("valid phone pattern"));

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(error("positive", "must be greater than zero"))
    }
}

pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        Err(error("non_negative", "must not be negative"))
    }
}

pub fn percent(value: &Decimal) -> Result<(), ValidationError> {
    if (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(value) {
        Ok(())
    } else {
        Err(error("percent", "must be between 0 and 100"))
    }
}

pub fn phone(value: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(value.trim()) {
        Ok(())
    } else {
        Err(error("phone", "is not a valid phone number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_validators() {
        assert!(positive(&dec!(0.01)).is_ok());
        assert!(positive(&Decimal::ZERO).is_err());
        assert!(non_negative(&Decimal::ZERO).is_ok());
        assert!(non_negative(&dec!(-1)).is_err());
        assert!(percent(&dec!(100)).is_ok());
        assert!(percent(&dec!(100.01)).is_err());
    }

    #[test]
    fn test_phone() {
        assert!(phone("+1 555-0100").is_ok());
        assert!(phone("09121234567").is_ok());
        assert!(phone("call me").is_err());
        assert!(phone("12").is_err());
    }
}
