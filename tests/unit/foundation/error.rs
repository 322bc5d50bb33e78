use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        MasklineError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        MasklineError::not_found("x")
            .to_string()
            .contains("not found:")
    );
    assert!(
        MasklineError::external("x")
            .to_string()
            .contains("external service error:")
    );
    assert!(
        MasklineError::transient_io("x")
            .to_string()
            .contains("transient io error:")
    );
    assert!(
        MasklineError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = MasklineError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_cancelled_reports_cancelled() {
    assert!(MasklineError::Cancelled.is_cancelled());
    assert!(!MasklineError::validation("x").is_cancelled());
}
