//! One-time passcode field heuristic.
//!
//! Sites do not standardize OTP markup, so detection is a flat allow-list of
//! vendor fingerprints plus a numeric `maxlength` band. A generic text field
//! is never promoted to an OTP field without one of those signals: filling a
//! passcode into a username box is worse than missing a passcode box.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OtpConfig;
use crate::dom::Element;

/// Attribute a fingerprint is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintAttribute {
    Id,
    Name,
    Class,
    Placeholder,
    Autocomplete,
}

impl FingerprintAttribute {
    fn attr_name(self) -> &'static str {
        match self {
            FingerprintAttribute::Id => "id",
            FingerprintAttribute::Name => "name",
            FingerprintAttribute::Class => "class",
            FingerprintAttribute::Placeholder => "placeholder",
            FingerprintAttribute::Autocomplete => "autocomplete",
        }
    }
}

/// Lowercase substring that identifies an OTP input on a known login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub attribute: FingerprintAttribute,
    pub needle: String,
}

impl Fingerprint {
    pub fn new(attribute: FingerprintAttribute, needle: &str) -> Self {
        Self {
            attribute,
            needle: needle.to_ascii_lowercase(),
        }
    }

    pub fn matches(&self, element: &Element) -> bool {
        element
            .lower_attr(self.attribute.attr_name())
            .is_some_and(|value| value.contains(&self.needle))
    }
}

/// Fingerprints observed on third-party login forms.
const BUILTIN_FINGERPRINTS: &[(FingerprintAttribute, &str)] = &[
    // HTML standard hint
    (FingerprintAttribute::Autocomplete, "one-time-code"),
    // Proton
    (FingerprintAttribute::Id, "twofactorcode"),
    (FingerprintAttribute::Class, "twofa-input"),
    (FingerprintAttribute::Placeholder, "two-factor passcode"),
    // Nextcloud
    (FingerprintAttribute::Name, "challenge"),
    (FingerprintAttribute::Placeholder, "authentication code"),
    // Amazon
    (FingerprintAttribute::Id, "auth-mfa-otpcode"),
    (FingerprintAttribute::Name, "otpcode"),
    // Google
    (FingerprintAttribute::Id, "idvpin"),
    (FingerprintAttribute::Name, "idvpin"),
    // Microsoft
    (FingerprintAttribute::Id, "saotcc_otc"),
    (FingerprintAttribute::Placeholder, "verification code"),
];

const ACCEPTED_TYPES: &[&str] = &["text", "tel"];

/// `autocomplete` hints that mark a field as something other than a passcode.
const CONFLICTING_AUTOCOMPLETE: &[&str] = &["username", "email", "current-password", "new-password"];

pub const DEFAULT_MIN_MAX_LENGTH: u32 = 6;
pub const DEFAULT_MAX_MAX_LENGTH: u32 = 8;

#[derive(Debug, Clone)]
pub struct OtpHeuristic {
    max_length_band: RangeInclusive<u32>,
    fingerprints: Vec<Fingerprint>,
}

impl Default for OtpHeuristic {
    fn default() -> Self {
        Self::new(&OtpConfig::default())
    }
}

impl OtpHeuristic {
    pub fn new(config: &OtpConfig) -> Self {
        let fingerprints = BUILTIN_FINGERPRINTS
            .iter()
            .map(|(attribute, needle)| Fingerprint::new(*attribute, needle))
            .chain(
                config
                    .extra_fingerprints
                    .iter()
                    .map(|f| Fingerprint::new(f.attribute, &f.needle)),
            )
            .collect();

        Self {
            max_length_band: config.min_max_length..=config.max_max_length,
            fingerprints,
        }
    }

    pub fn max_length_band(&self) -> &RangeInclusive<u32> {
        &self.max_length_band
    }

    /// First fingerprint matching the element, if any.
    pub fn fingerprint_for(&self, element: &Element) -> Option<&Fingerprint> {
        self.fingerprints.iter().find(|f| f.matches(element))
    }

    /// Input type is `text`/`tel` and at least one corroborating signal is
    /// present: a `maxlength` inside the band, or a vendor fingerprint.
    pub fn is_accepted_kind(&self, element: &Element) -> bool {
        if !element.is("input") || !ACCEPTED_TYPES.contains(&element.input_type().as_str()) {
            return false;
        }

        if let Some(autocomplete) = element.lower_attr("autocomplete") {
            if CONFLICTING_AUTOCOMPLETE.contains(&autocomplete.trim()) {
                return false;
            }
        }

        if element
            .max_length()
            .is_some_and(|len| self.max_length_band.contains(&len))
        {
            return true;
        }

        match self.fingerprint_for(element) {
            Some(fingerprint) => {
                debug!(
                    attribute = ?fingerprint.attribute,
                    needle = %fingerprint.needle,
                    "otp fingerprint matched"
                );
                true
            }
            None => false,
        }
    }

    /// Enabled and rendered. Ancestor visibility is checked by the field
    /// classifier before candidates reach this heuristic.
    pub fn is_valid(&self, element: &Element) -> bool {
        !element.is_disabled()
            && element.is_rendered()
            && element.style.visibility_override() != Some(false)
    }

    pub fn is_otp_field(&self, element: &Element) -> bool {
        self.is_accepted_kind(element) && self.is_valid(element)
    }
}
