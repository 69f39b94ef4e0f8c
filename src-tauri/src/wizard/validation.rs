use serde::{Deserialize, Serialize};

use super::template::{Sex, Unit};
use crate::error::{CkStyleError, Result};

pub const MSG_INCOMPLETE_INTRO: &str = "Please complete all fields";
pub const MSG_INVALID_MEASUREMENT: &str = "Please enter a valid positive number";

/// Raw intro form as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntroForm {
    pub subject_name: String,
    pub profile_label: String,
    pub sex: String,
    pub unit: String,
}

/// Intro form after the presence check.
#[derive(Debug, Clone, PartialEq)]
pub struct IntroDetails {
    pub subject_name: String,
    pub profile_label: String,
    pub sex: Sex,
    pub unit: Unit,
}

impl From<&IntroDetails> for IntroForm {
    fn from(details: &IntroDetails) -> Self {
        Self {
            subject_name: details.subject_name.clone(),
            profile_label: details.profile_label.clone(),
            sex: details.sex.to_string(),
            unit: details.unit.to_string(),
        }
    }
}

pub fn validate_intro(form: &IntroForm) -> Result<IntroDetails> {
    let subject_name = form.subject_name.trim();
    let profile_label = form.profile_label.trim();
    let sex = form.sex.trim();
    let unit = form.unit.trim();

    if subject_name.is_empty() || profile_label.is_empty() || sex.is_empty() || unit.is_empty() {
        return Err(CkStyleError::Validation(MSG_INCOMPLETE_INTRO.to_string()));
    }

    let sex: Sex = sex.parse().map_err(CkStyleError::Validation)?;
    let unit: Unit = unit.parse().map_err(CkStyleError::Validation)?;

    Ok(IntroDetails {
        subject_name: subject_name.to_string(),
        profile_label: profile_label.to_string(),
        sex,
        unit,
    })
}

/// Parse a measurement entry. Must be finite and strictly positive.
pub fn parse_measurement(input: &str) -> Result<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| CkStyleError::Validation(MSG_INVALID_MEASUREMENT.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, label: &str, sex: &str, unit: &str) -> IntroForm {
        IntroForm {
            subject_name: name.to_string(),
            profile_label: label.to_string(),
            sex: sex.to_string(),
            unit: unit.to_string(),
        }
    }

    #[test]
    fn test_parse_positive_values() {
        assert_eq!(parse_measurement("10").unwrap(), 10.0);
        assert_eq!(parse_measurement(" 32.5 ").unwrap(), 32.5);
        assert_eq!(parse_measurement("0.1").unwrap(), 0.1);
    }

    #[test]
    fn test_reject_zero_negative_and_garbage() {
        for bad in ["0", "0.0", "-3", "", "   ", "abc", "NaN", "inf", "-inf", "1e400"] {
            let err = parse_measurement(bad).unwrap_err();
            assert_eq!(err.to_string(), MSG_INVALID_MEASUREMENT, "input {:?}", bad);
        }
    }

    #[test]
    fn test_intro_requires_every_field() {
        let cases = [
            form("", "Wedding", "male", "cm"),
            form("John", "  ", "male", "cm"),
            form("John", "Wedding", "", "cm"),
            form("John", "Wedding", "male", ""),
        ];
        for case in cases {
            let err = validate_intro(&case).unwrap_err();
            assert_eq!(err.to_string(), MSG_INCOMPLETE_INTRO);
        }
    }

    #[test]
    fn test_intro_trims_and_parses() {
        let details = validate_intro(&form("  Mr. John ", " Wedding Suit", "female", "inch")).unwrap();
        assert_eq!(details.subject_name, "Mr. John");
        assert_eq!(details.profile_label, "Wedding Suit");
        assert_eq!(details.sex, Sex::Female);
        assert_eq!(details.unit, Unit::Inch);
    }

    #[test]
    fn test_intro_rejects_unknown_enum() {
        let err = validate_intro(&form("John", "Suit", "other", "cm")).unwrap_err();
        assert!(matches!(err, CkStyleError::Validation(_)));
    }
}
