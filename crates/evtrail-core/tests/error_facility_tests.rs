use evtrail_core::errors::{EvtrailError, ExError, ExErrorKind};
use evtrail_core::EvtrailConfig;
use evtrail_core_types::CorrelationId;

#[test]
fn test_invalid_correlation_id_verifiable_by_kind() {
    let err = EvtrailError::InvalidCorrelationId {
        reason: "blank".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::InvalidCorrelationId);
    assert_eq!(ex_err.code(), "ERR_INVALID_CORRELATION_ID");
    assert_eq!(ex_err.message(), "blank");
}

#[test]
fn test_reserved_field_structured_fields() {
    let err = EvtrailError::ReservedField {
        field: "timestamp".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::ReservedField);
    assert_eq!(ex_err.code(), "ERR_RESERVED_FIELD");
    assert_eq!(ex_err.field(), Some("timestamp"));
    assert!(ex_err.message().contains("reserved"));
}

#[test]
fn test_sink_unavailable_distinct_from_unencodable() {
    let sink: ExError = EvtrailError::SinkUnavailable {
        message: "closed".to_string(),
    }
    .into();
    let codec: ExError = EvtrailError::UnencodableValue {
        path: "$.ratio".to_string(),
        reason: "NaN is not encodable".to_string(),
    }
    .into();

    assert_eq!(sink.kind(), ExErrorKind::SinkUnavailable);
    assert_eq!(codec.kind(), ExErrorKind::UnencodableValue);
    assert_ne!(sink.code(), codec.code());
    assert_eq!(codec.field(), Some("$.ratio"));
}

#[test]
fn test_error_kind_code_mapping() {
    // Test that each kind has a stable, unique code
    let kinds = vec![
        (ExErrorKind::InvalidCorrelationId, "ERR_INVALID_CORRELATION_ID"),
        (ExErrorKind::UnencodableValue, "ERR_UNENCODABLE_VALUE"),
        (ExErrorKind::ReservedField, "ERR_RESERVED_FIELD"),
        (ExErrorKind::SinkUnavailable, "ERR_SINK_UNAVAILABLE"),
        (ExErrorKind::Serialization, "ERR_SERIALIZATION"),
        (ExErrorKind::Config, "ERR_CONFIG"),
    ];

    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
    }
}

#[test]
fn test_context_builders_render_in_display() {
    let ex_err = ExError::new(ExErrorKind::SinkUnavailable)
        .with_op("charge_card")
        .with_correlation_id(CorrelationId::parse("req-77").unwrap())
        .with_message("queue full");

    assert_eq!(ex_err.op(), Some("charge_card"));
    assert_eq!(ex_err.correlation_id().map(|c| c.as_str()), Some("req-77"));
    assert_eq!(
        ex_err.to_string(),
        "[ERR_SINK_UNAVAILABLE] in operation 'charge_card': queue full (correlation_id: req-77)"
    );
}

#[test]
fn test_serde_and_toml_errors_convert() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let ex_err: ExError = EvtrailError::from(json_err).into();
    assert_eq!(ex_err.kind(), ExErrorKind::Serialization);

    let config_err = EvtrailConfig::from_toml_str("[logging\n").unwrap_err();
    let ex_err: ExError = config_err.into();
    assert_eq!(ex_err.code(), "ERR_CONFIG");
}
