//! Core record types for frbvault.
//!
//! This module defines the FRB observation record, its workflow status and
//! the JSON shape it takes when stored in the key-value contract.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::payload;

/// Alphabet for the random part of a record id.
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random part of a record id.
const ID_SUFFIX_LEN: usize = 7;

/// Observatories accepted when no list is configured.
pub const DEFAULT_OBSERVATORIES: &[&str] = &["CHIME", "FAST", "ASKAP", "Arecibo", "GBT", "VLA"];

/// Workflow stage of a record.
///
/// Records only ever move forward: `raw` to `processed` to `analyzed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Freshly submitted observation.
    #[default]
    Raw,
    /// Signal processing has run.
    Processed,
    /// Analysis has run. Terminal.
    Analyzed,
}

impl Status {
    /// All statuses in workflow order.
    pub const ALL: [Status; 3] = [Self::Raw, Self::Processed, Self::Analyzed];

    /// The single status this one may advance to, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Raw => Some(Self::Processed),
            Self::Processed => Some(Self::Analyzed),
            Self::Analyzed => None,
        }
    }

    /// Check whether moving to `to` is a legal forward step.
    #[must_use]
    pub fn can_advance_to(self, to: Self) -> bool {
        self.next() == Some(to)
    }

    /// Validate a transition and return the new status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] for skips, repeats and backward moves.
    pub fn advance_to(self, to: Self) -> Result<Self> {
        if self.can_advance_to(to) {
            Ok(to)
        } else {
            Err(Error::InvalidTransition { from: self, to })
        }
    }

    /// The lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Processed => "processed",
            Self::Analyzed => "analyzed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(Self::Raw),
            "processed" => Ok(Self::Processed),
            "analyzed" => Ok(Self::Analyzed),
            other => Err(Error::validation("status", format!("unknown status '{other}'"))),
        }
    }
}

/// A record as held in application state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Identifier, `<unix-millis>-<random>`.
    pub id: String,
    /// Opaque "encrypted" payload.
    pub encrypted_data: String,
    /// Creation time in unix seconds.
    pub timestamp: i64,
    /// Nominal owner of the record.
    pub observatory: String,
    /// Observed frequency, as entered.
    pub frequency: String,
    /// Workflow stage.
    pub status: Status,
    /// Signal strength.
    pub signal_strength: i64,
    /// Free-text sky location, may be empty.
    pub location: String,
}

impl Record {
    /// Build a record from its stored form.
    #[must_use]
    pub fn from_stored(id: impl Into<String>, stored: StoredRecord) -> Self {
        Self {
            id: id.into(),
            encrypted_data: stored.data,
            timestamp: stored.timestamp,
            observatory: stored.observatory,
            frequency: stored.frequency,
            status: stored.status,
            signal_strength: stored.signal_strength,
            location: stored.location,
        }
    }

    /// Check whether `account` nominally owns this record.
    ///
    /// Advisory only. The contract accepts writes from anyone.
    #[must_use]
    pub fn is_owned_by(&self, account: &str) -> bool {
        self.observatory.to_lowercase() == account.to_lowercase()
    }

    /// Decode the payload back into the draft it was built from.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not one this crate produced.
    pub fn decode_draft(&self) -> Result<Draft> {
        payload::decode(&self.encrypted_data)
    }
}

/// The JSON object stored under `<prefix>_<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Opaque payload.
    #[serde(default)]
    pub data: String,
    /// Creation time in unix seconds.
    #[serde(default)]
    pub timestamp: i64,
    /// Nominal owner.
    #[serde(default)]
    pub observatory: String,
    /// Observed frequency.
    #[serde(default)]
    pub frequency: String,
    /// Workflow stage, `raw` when absent.
    #[serde(default)]
    pub status: Status,
    /// Signal strength. Floats are truncated; null and junk read as 0.
    #[serde(default, deserialize_with = "lenient_strength")]
    pub signal_strength: i64,
    /// Sky location.
    #[serde(default)]
    pub location: String,
    /// Fields written by other clients, kept as-is on rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StoredRecord {
    /// Parse a stored blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a JSON record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// User input for a new record, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Observatory name.
    pub observatory: String,
    /// Frequency.
    pub frequency: String,
    /// Signal strength, still unparsed.
    pub signal_strength: String,
    /// Optional location.
    #[serde(default)]
    pub location: String,
}

impl Draft {
    /// Check required fields and return the parsed signal strength.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first offending field.
    pub fn validate(&self, observatories: &[String]) -> Result<i64> {
        let observatory = self.observatory.trim();
        if observatory.is_empty() {
            return Err(Error::validation("observatory", "please select an observatory"));
        }
        if !observatories.iter().any(|o| o == observatory) {
            return Err(Error::validation(
                "observatory",
                format!("'{observatory}' is not a known observatory"),
            ));
        }
        if self.frequency.trim().is_empty() {
            return Err(Error::validation("frequency", "must not be empty"));
        }
        let strength = self.signal_strength.trim();
        if strength.is_empty() {
            return Err(Error::validation("signalStrength", "must not be empty"));
        }
        parse_strength(strength).ok_or_else(|| {
            Error::validation("signalStrength", format!("'{strength}' is not a number"))
        })
    }

    /// Build the stored form of a new record.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft fails validation.
    pub fn into_stored(self, observatories: &[String], timestamp: i64) -> Result<StoredRecord> {
        let signal_strength = self.validate(observatories)?;
        let data = payload::encode(&self)?;
        Ok(StoredRecord {
            data,
            timestamp,
            observatory: self.observatory.trim().to_string(),
            frequency: self.frequency,
            status: Status::Raw,
            signal_strength,
            location: self.location,
            extra: serde_json::Map::new(),
        })
    }
}

/// Parse a signal strength, truncating any fraction toward zero.
///
/// Returns `None` for non-numeric or non-finite input.
fn parse_strength(text: &str) -> Option<i64> {
    text.parse::<f64>().ok().and_then(truncate_strength)
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_strength(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.trunc() as i64)
}

fn lenient_strength<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let strength = match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(truncate_strength)),
        Some(serde_json::Value::String(s)) => parse_strength(s.trim()),
        _ => None,
    };
    Ok(strength.unwrap_or_default())
}

/// Generate a fresh record id: `<unix-millis>-<7 base36 chars>`.
#[must_use]
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect();
    format!("{}-{suffix}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observatories() -> Vec<String> {
        DEFAULT_OBSERVATORIES.iter().map(ToString::to_string).collect()
    }

    fn chime_draft() -> Draft {
        Draft {
            observatory: "CHIME".to_string(),
            frequency: "1400".to_string(),
            signal_strength: "3".to_string(),
            location: "RA 05h Dec +22".to_string(),
        }
    }

    #[test]
    fn test_status_next() {
        assert_eq!(Status::Raw.next(), Some(Status::Processed));
        assert_eq!(Status::Processed.next(), Some(Status::Analyzed));
        assert_eq!(Status::Analyzed.next(), None);
    }

    #[test]
    fn test_status_advance_forward_only() {
        assert_eq!(Status::Raw.advance_to(Status::Processed).unwrap(), Status::Processed);
        assert!(Status::Raw.advance_to(Status::Analyzed).is_err());
        assert!(Status::Processed.advance_to(Status::Raw).is_err());
        assert!(Status::Processed.advance_to(Status::Processed).is_err());
        assert!(Status::Analyzed.advance_to(Status::Analyzed).is_err());
    }

    #[test]
    fn test_status_display_and_parse() {
        for status in Status::ALL {
            assert_eq!(status.to_string().parse::<Status>().unwrap(), status);
        }
        assert!("archived".parse::<Status>().is_err());
    }

    #[test]
    fn test_stored_record_missing_status_defaults_to_raw() {
        let json = br#"{"data":"FHE-e30=","timestamp":10,"observatory":"FAST","frequency":"1250","signalStrength":7,"location":""}"#;
        let stored = StoredRecord::from_bytes(json).unwrap();
        assert_eq!(stored.status, Status::Raw);
        assert_eq!(stored.signal_strength, 7);
    }

    #[test]
    fn test_stored_record_uses_camel_case_keys() {
        let stored = chime_draft().into_stored(&observatories(), 1_700_000_000).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&stored.to_bytes().unwrap()).unwrap();
        assert_eq!(value["signalStrength"], 3);
        assert_eq!(value["status"], "raw");
        assert_eq!(value["timestamp"], 1_700_000_000);
        assert!(value.get("signal_strength").is_none());
    }

    #[test]
    fn test_stored_record_keeps_unknown_fields() {
        let json = br#"{"data":"x","timestamp":1,"observatory":"VLA","status":"raw","pipeline":"v2"}"#;
        let mut stored = StoredRecord::from_bytes(json).unwrap();
        stored.status = Status::Processed;
        let value: serde_json::Value = serde_json::from_slice(&stored.to_bytes().unwrap()).unwrap();
        assert_eq!(value["pipeline"], "v2");
        assert_eq!(value["status"], "processed");
    }

    #[test]
    fn test_stored_record_rejects_garbage() {
        assert!(StoredRecord::from_bytes(b"{not json").is_err());
        assert!(StoredRecord::from_bytes(b"[1,2,3]").is_err());
    }

    #[test]
    fn test_draft_validate_ok() {
        assert_eq!(chime_draft().validate(&observatories()).unwrap(), 3);
    }

    #[test]
    fn test_draft_validate_missing_observatory() {
        let draft = Draft {
            observatory: String::new(),
            ..chime_draft()
        };
        let err = draft.validate(&observatories()).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "observatory", .. }));
    }

    #[test]
    fn test_draft_validate_unknown_observatory() {
        let draft = Draft {
            observatory: "Parkes".to_string(),
            ..chime_draft()
        };
        assert!(draft.validate(&observatories()).is_err());
    }

    #[test]
    fn test_draft_validate_empty_frequency() {
        let draft = Draft {
            frequency: "  ".to_string(),
            ..chime_draft()
        };
        let err = draft.validate(&observatories()).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "frequency", .. }));
    }

    #[test]
    fn test_draft_validate_non_numeric_strength() {
        let draft = Draft {
            signal_strength: "strong".to_string(),
            ..chime_draft()
        };
        let err = draft.validate(&observatories()).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "signalStrength", .. }));
    }

    #[test]
    fn test_draft_validate_truncates_fractional_strength() {
        let draft = Draft {
            signal_strength: "2.5".to_string(),
            ..chime_draft()
        };
        assert_eq!(draft.validate(&observatories()).unwrap(), 2);

        let negative = Draft {
            signal_strength: " -7.9 ".to_string(),
            ..chime_draft()
        };
        assert_eq!(negative.validate(&observatories()).unwrap(), -7);
    }

    #[test]
    fn test_draft_validate_rejects_non_finite_strength() {
        for text in ["NaN", "inf", "1e400"] {
            let draft = Draft {
                signal_strength: text.to_string(),
                ..chime_draft()
            };
            assert!(draft.validate(&observatories()).is_err(), "{text} accepted");
        }
    }

    #[test]
    fn test_stored_record_lenient_strength() {
        let cases: [(&[u8], i64); 4] = [
            (br#"{"signalStrength":2.5}"#, 2),
            (br#"{"signalStrength":null}"#, 0),
            (br#"{"signalStrength":"12"}"#, 12),
            (br#"{"signalStrength":{"x":1}}"#, 0),
        ];
        for (json, expected) in cases {
            let stored = StoredRecord::from_bytes(json).unwrap();
            assert_eq!(stored.signal_strength, expected);
            assert_eq!(stored.status, Status::Raw);
            assert!(stored.observatory.is_empty());
        }
    }

    #[test]
    fn test_draft_location_is_optional() {
        let draft = Draft {
            location: String::new(),
            ..chime_draft()
        };
        assert!(draft.validate(&observatories()).is_ok());
    }

    #[test]
    fn test_into_stored_round_trips_draft() {
        let draft = chime_draft();
        let stored = draft.clone().into_stored(&observatories(), 42).unwrap();
        let record = Record::from_stored("1-abcdefg", stored);
        assert_eq!(record.status, Status::Raw);
        assert_eq!(record.signal_strength, 3);
        assert_eq!(record.decode_draft().unwrap(), draft);
    }

    #[test]
    fn test_is_owned_by_ignores_case() {
        let stored = chime_draft().into_stored(&observatories(), 1).unwrap();
        let record = Record::from_stored("1-abcdefg", stored);
        assert!(record.is_owned_by("chime"));
        assert!(record.is_owned_by("CHIME"));
        assert!(!record.is_owned_by("0xdeadbeef"));
    }

    #[test]
    fn test_generate_id_format() {
        let id = generate_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_generate_id_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
    }
}
