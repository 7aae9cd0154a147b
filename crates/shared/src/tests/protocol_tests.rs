use super::*;
use crate::domain::VerificationMode;

fn parse(json: &str) -> RawVerificationPayload {
    RawVerificationPayload::from_slice(json.as_bytes()).expect("valid payload json")
}

#[test]
fn forged_payload_normalizes_to_forged_judgment() {
    let result = parse(r#"{"is_forged": true, "confidence": 0.82}"#)
        .normalize()
        .expect("normalize");
    assert_eq!(result.judgment, Judgment::Forged);
    assert_eq!(result.score, 0.82);
    assert!(result.detail.is_none());
}

#[test]
fn genuine_payload_normalizes_to_authentic_judgment() {
    let result = parse(r#"{"is_forged": false, "confidence": 0.95}"#)
        .normalize()
        .expect("normalize");
    assert_eq!(result.judgment, Judgment::Authentic);
    assert_eq!(result.score, 0.95);
    assert!(result.judgment.is_positive());
}

#[test]
fn comparison_payload_normalizes_to_match_judgment() {
    let no_match = parse(r#"{"is_match": false, "similarity_score": 0.31}"#)
        .normalize()
        .expect("normalize");
    assert_eq!(no_match.judgment, Judgment::NoMatch);
    assert_eq!(no_match.score, 0.31);

    let matched = parse(r#"{"is_match": true, "similarity_score": 0.9}"#)
        .normalize()
        .expect("normalize");
    assert_eq!(matched.judgment, Judgment::Match);
    assert_eq!(matched.judgment.mode(), VerificationMode::Comparison);
}

#[test]
fn payload_without_discriminant_is_rejected() {
    let err = parse(r#"{"confidence": 0.5, "similarity_score": 0.4}"#)
        .normalize()
        .expect_err("must fail");
    assert_eq!(err, NormalizationError::MissingDiscriminant);
}

#[test]
fn optional_fields_are_carried_through() {
    let result = parse(
        r#"{
            "is_forged": false,
            "confidence": 0.7,
            "details": "stroke pressure consistent",
            "processing_time": 41.6,
            "model_version": "cnn-v2"
        }"#,
    )
    .normalize()
    .expect("normalize");
    assert_eq!(result.detail.as_deref(), Some("stroke pressure consistent"));
    assert_eq!(result.processing_time_ms, Some(42));
    assert_eq!(result.model_version.as_deref(), Some("cnn-v2"));
}

#[test]
fn legacy_match_and_verdict_aliases_are_accepted() {
    let result = parse(r#"{"match": true, "similarity_score": 0.88, "verdict": "Signatures Match"}"#)
        .normalize()
        .expect("normalize");
    assert_eq!(result.judgment, Judgment::Match);
    assert_eq!(result.detail.as_deref(), Some("Signatures Match"));
}

#[test]
fn missing_score_defaults_to_zero_and_out_of_range_is_clamped() {
    let missing = parse(r#"{"is_forged": true}"#).normalize().expect("normalize");
    assert_eq!(missing.score, 0.0);

    let high = parse(r#"{"is_match": true, "similarity_score": 1.7}"#)
        .normalize()
        .expect("normalize");
    assert_eq!(high.score, 1.0);

    let low = parse(r#"{"is_forged": false, "confidence": -0.2}"#)
        .normalize()
        .expect("normalize");
    assert_eq!(low.score, 0.0);
}

#[test]
fn non_finite_score_is_rejected() {
    let payload = RawVerificationPayload {
        is_forged: Some(true),
        confidence: Some(f64::NAN),
        ..Default::default()
    };
    assert_eq!(
        payload.normalize().expect_err("must fail"),
        NormalizationError::NonFiniteScore { field: "confidence" }
    );
}

#[test]
fn wrongly_typed_discriminant_fails_to_parse() {
    assert!(RawVerificationPayload::from_slice(br#"{"is_forged": "yes"}"#).is_err());
    assert!(RawVerificationPayload::from_slice(b"<html>oops</html>").is_err());
}

#[test]
fn alias_and_canonical_key_together_is_a_duplicate_field() {
    let err = RawVerificationPayload::from_slice(
        br#"{"is_match": true, "match": true, "similarity_score": 0.9}"#,
    )
    .expect_err("duplicate");
    assert!(err.to_string().contains("duplicate field"), "{err}");

    assert!(RawVerificationPayload::from_slice(
        br#"{"is_forged": false, "details": "a", "verdict": "b"}"#
    )
    .is_err());
}
