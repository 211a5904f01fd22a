//! Evidence bundle assembly and verification.

use crate::canonical::{Map, Value};
use crate::errors::{EvtrailError, Result};
use crate::evidence::digest::hash;
use chrono::{DateTime, SecondsFormat, Utc};
use evtrail_core_types::schema::{
    FIELD_CORRELATION_ID, FIELD_EVENT_TYPE, FIELD_EVIDENCE_HASH, FIELD_TIMESTAMP, HASH_PREFIX,
    RESERVED_FIELDS,
};
use evtrail_core_types::{CorrelationId, EventType};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Hashed, timestamped record of one instrumented event
///
/// Bundles are only created through [`build_bundle`] / [`build_bundle_at`]
/// and expose no mutators, so the stored hash always describes the fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceBundle {
    timestamp: String,
    event_type: EventType,
    correlation_id: CorrelationId,
    payload: Map,
    evidence_hash: String,
}

impl EvidenceBundle {
    /// RFC3339 UTC timestamp with a trailing `Z`
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Payload fields in insertion order
    pub fn payload(&self) -> &Map {
        &self.payload
    }

    /// `sha256:` followed by 64 lowercase hex characters
    pub fn evidence_hash(&self) -> &str {
        &self.evidence_hash
    }

    /// The map the hash was computed over (everything but `evidence_hash`)
    pub fn hash_input(&self) -> Value {
        Value::Object(envelope(
            &self.timestamp,
            &self.event_type,
            &self.correlation_id,
            &self.payload,
        ))
    }

    /// The full record in wire order, hash last
    pub fn to_value(&self) -> Value {
        let mut map = envelope(
            &self.timestamp,
            &self.event_type,
            &self.correlation_id,
            &self.payload,
        );
        map.insert(FIELD_EVIDENCE_HASH, self.evidence_hash.clone());
        Value::Object(map)
    }

    /// Recompute the hash and compare it with the stored one.
    ///
    /// ## Errors
    ///
    /// Returns `EvtrailError::UnencodableValue` if the payload cannot be
    /// canonicalized.
    pub fn verify(&self) -> Result<bool> {
        let digest = hash(&self.hash_input())?;
        Ok(self.evidence_hash == format!("{}{}", HASH_PREFIX, digest))
    }
}

impl Serialize for EvidenceBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.payload.len() + 4))?;
        map.serialize_entry(FIELD_TIMESTAMP, &self.timestamp)?;
        map.serialize_entry(FIELD_EVENT_TYPE, &self.event_type)?;
        map.serialize_entry(FIELD_CORRELATION_ID, &self.correlation_id)?;
        for (k, v) in self.payload.iter() {
            map.serialize_entry(k, v)?;
        }
        map.serialize_entry(FIELD_EVIDENCE_HASH, &self.evidence_hash)?;
        map.end()
    }
}

/// Build a bundle stamped with the current time.
///
/// ## Errors
///
/// - `EvtrailError::ReservedField` if the payload uses an envelope field name
/// - `EvtrailError::UnencodableValue` if the payload cannot be canonicalized
pub fn build_bundle(
    event_type: EventType,
    correlation_id: &CorrelationId,
    payload: Map,
) -> Result<EvidenceBundle> {
    build_bundle_at(Utc::now(), event_type, correlation_id, payload)
}

/// Build a bundle with an explicit timestamp.
///
/// The hash covers `{timestamp, event_type, correlation_id, ...payload}`;
/// `evidence_hash` is added afterwards and is never part of its own input.
///
/// ## Errors
///
/// Same as [`build_bundle`].
pub fn build_bundle_at(
    at: DateTime<Utc>,
    event_type: EventType,
    correlation_id: &CorrelationId,
    payload: Map,
) -> Result<EvidenceBundle> {
    if let Some(field) = payload
        .keys()
        .find(|k| RESERVED_FIELDS.iter().any(|r| r == k))
    {
        return Err(EvtrailError::ReservedField {
            field: field.to_string(),
        });
    }

    let timestamp = at.to_rfc3339_opts(SecondsFormat::Micros, true);
    let input = Value::Object(envelope(&timestamp, &event_type, correlation_id, &payload));
    let digest = hash(&input)?;

    Ok(EvidenceBundle {
        timestamp,
        event_type,
        correlation_id: correlation_id.clone(),
        payload,
        evidence_hash: format!("{}{}", HASH_PREFIX, digest),
    })
}

fn envelope(
    timestamp: &str,
    event_type: &EventType,
    correlation_id: &CorrelationId,
    payload: &Map,
) -> Map {
    let mut map = Map::new()
        .with(FIELD_TIMESTAMP, timestamp)
        .with(FIELD_EVENT_TYPE, event_type.as_str())
        .with(FIELD_CORRELATION_ID, correlation_id.as_str());
    for (k, v) in payload.iter() {
        map.insert(k, v.clone());
    }
    map
}
