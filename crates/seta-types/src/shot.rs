//! Shot records.
//!
//! A shot travels through three shapes:
//!
//! - [`ShotSubmission`] -- the untrusted request body, every field optional
//! - [`StoredShot`] -- the durable record; raw impact data only
//! - [`ScoredShot`] -- a stored shot plus the score derived at read time
//!
//! The score is never persisted. Re-scoring history after a formula change
//! only needs a new [`ScoredShot`] projection, not a rewrite of the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::{PartitionKey, RaceId, ShooterId};

/// Impact data for one shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotData {
    /// Horizontal offset from the target center, in meters.
    pub x: f64,
    /// Vertical offset from the target center, in meters.
    pub y: f64,
    /// Client-supplied timing value, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<serde_json::Value>,
}

impl ShotData {
    /// Reject coordinates that are not finite numbers.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.x.is_finite() {
            return Err(ValidationError::NonFinite("x"));
        }
        if !self.y.is_finite() {
            return Err(ValidationError::NonFinite("y"));
        }
        Ok(())
    }
}

/// `shot_data` as it arrives on the wire, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawShotData {
    /// Horizontal offset in meters.
    pub x: Option<f64>,
    /// Vertical offset in meters.
    pub y: Option<f64>,
    /// Optional timing value.
    pub time: Option<serde_json::Value>,
}

/// Body of `POST /shots`.
///
/// All fields are optional at the serde level so a missing field is
/// reported as [`ValidationError::Missing`] instead of a generic decode
/// failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShotSubmission {
    /// The shooter submitting the shot.
    pub user_id: Option<String>,
    /// The race the shot belongs to.
    pub race_id: Option<String>,
    /// Impact coordinates and timing.
    pub shot_data: Option<RawShotData>,
}

impl ShotSubmission {
    /// Decode a submission from raw JSON bytes.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Validate every field and split into a partition key and shot data.
    pub fn validate(self) -> Result<(PartitionKey, ShotData), ValidationError> {
        let shooter = ShooterId::parse(self.user_id.unwrap_or_default())?;
        let race = RaceId::parse(self.race_id.unwrap_or_default())?;
        let raw = self
            .shot_data
            .ok_or(ValidationError::Missing("shot_data"))?;

        let data = ShotData {
            x: raw.x.ok_or(ValidationError::Missing("shot_data.x"))?,
            y: raw.y.ok_or(ValidationError::Missing("shot_data.y"))?,
            time: raw.time,
        };
        data.validate()?;

        Ok((PartitionKey::new(shooter, race), data))
    }
}

/// A durably stored shot.
///
/// `timestamp` is assigned by the store, is strictly increasing within a
/// partition, and identifies the shot inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredShot {
    /// The shooter. Serialized as `user_id` to match the submission body.
    #[serde(rename = "user_id", alias = "shooter_id")]
    pub shooter_id: ShooterId,
    /// The race.
    pub race_id: RaceId,
    /// Store-assigned creation instant.
    pub timestamp: DateTime<Utc>,
    /// Raw impact data exactly as submitted.
    pub shot_data: ShotData,
}

impl StoredShot {
    /// The partition this shot belongs to.
    pub fn partition(&self) -> PartitionKey {
        PartitionKey::new(self.shooter_id.clone(), self.race_id.clone())
    }
}

/// A stored shot together with its derived score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredShot {
    /// The stored record.
    #[serde(flatten)]
    pub shot: StoredShot,
    /// Score derived from the impact coordinates, one decimal place.
    pub score: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn submission_with_all_fields_validates() {
        let body = br#"{"user_id":"alice","race_id":"r1","shot_data":{"x":0.001,"y":-0.002,"time":"12:00:01.5"}}"#;
        let (key, data) = ShotSubmission::from_slice(body).unwrap().validate().unwrap();
        assert_eq!(key.shooter.as_str(), "alice");
        assert_eq!(key.race.as_str(), "r1");
        assert_eq!(data.time, Some(serde_json::json!("12:00:01.5")));
    }

    #[test]
    fn time_is_optional() {
        let body = br#"{"user_id":"alice","race_id":"r1","shot_data":{"x":0,"y":0}}"#;
        let (_, data) = ShotSubmission::from_slice(body).unwrap().validate().unwrap();
        assert!(data.time.is_none());
    }

    #[test]
    fn missing_fields_are_reported_by_name() {
        let cases: [(&[u8], ValidationError); 4] = [
            (
                br#"{"race_id":"r1","shot_data":{"x":0,"y":0}}"#,
                ValidationError::Missing("user_id"),
            ),
            (
                br#"{"user_id":"a","shot_data":{"x":0,"y":0}}"#,
                ValidationError::Missing("race_id"),
            ),
            (
                br#"{"user_id":"a","race_id":"r1"}"#,
                ValidationError::Missing("shot_data"),
            ),
            (
                br#"{"user_id":"a","race_id":"r1","shot_data":{"x":0}}"#,
                ValidationError::Missing("shot_data.y"),
            ),
        ];
        for (body, expected) in cases {
            let err = ShotSubmission::from_slice(body)
                .unwrap()
                .validate()
                .unwrap_err();
            assert_eq!(err, expected);
        }
    }

    #[test]
    fn wrong_types_are_malformed() {
        let err = ShotSubmission::from_slice(br#"{"user_id":"a","race_id":"r","shot_data":{"x":"left","y":0}}"#)
            .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
        assert!(matches!(
            ShotSubmission::from_slice(b"not json"),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn stored_shot_uses_user_id_on_the_wire() {
        let shot = StoredShot {
            shooter_id: ShooterId::parse("alice").unwrap(),
            race_id: RaceId::parse("r1").unwrap(),
            timestamp: Utc::now(),
            shot_data: ShotData {
                x: 0.0,
                y: 0.0,
                time: None,
            },
        };
        let json = serde_json::to_value(&shot).unwrap();
        assert_eq!(json["user_id"], "alice");
        assert!(json["shot_data"].get("time").is_none());

        let scored = ScoredShot { shot, score: 10.9 };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["user_id"], "alice");
        assert_eq!(json["score"], 10.9);
    }
}
