use account_normalizer::core::error::{AppError, DefaultErrorReporter, ErrorReporter};
use account_normalizer::core::types::{ErrorCategory, ErrorSeverity};

#[test]
fn test_error_creation_all_categories() {
    let categories = vec![
        ErrorCategory::ValidationError,
        ErrorCategory::ConfigurationError,
        ErrorCategory::IntegrityError,
        ErrorCategory::SerializationError,
        ErrorCategory::IoError,
        ErrorCategory::InternalError,
        ErrorCategory::Unknown,
    ];

    for category in categories {
        let error = AppError::new(category, "test message");
        assert_eq!(error.category, category);
        assert_eq!(error.message, "test message");
        assert_eq!(error.context.len(), 0);
        assert_eq!(error.recovery_suggestions.len(), 0);
        assert!(error.occurred_at <= chrono::Utc::now());
        assert!(error.source.is_none());
    }
}

#[test]
fn test_error_severity_mapping() {
    let test_cases = vec![
        (ErrorCategory::ValidationError, ErrorSeverity::Error),
        (ErrorCategory::ConfigurationError, ErrorSeverity::Error),
        (ErrorCategory::IntegrityError, ErrorSeverity::Error),
        (ErrorCategory::SerializationError, ErrorSeverity::Error),
        (ErrorCategory::IoError, ErrorSeverity::Error),
        (ErrorCategory::InternalError, ErrorSeverity::Error),
        (ErrorCategory::Unknown, ErrorSeverity::Info),
    ];

    for (category, expected_severity) in test_cases {
        let error = AppError::new(category, "test");
        assert_eq!(error.severity(), expected_severity);
    }
}

#[test]
fn test_error_add_context() {
    let mut error = AppError::new(ErrorCategory::IntegrityError, "duplicate element id");

    error.add_context("element_id", "CON_001");
    error.add_context("resource_type", "connection");

    assert_eq!(error.context.len(), 2);
    assert_eq!(error.context.get("element_id"), Some(&"CON_001".to_string()));
    assert_eq!(
        error.context.get("resource_type"),
        Some(&"connection".to_string())
    );
}

#[test]
fn test_error_builder_chain() {
    let error = AppError::new(ErrorCategory::ConfigurationError, "bad policy")
        .with_code("CFG-VAL-002")
        .with_context("scope.mode")
        .with_suggestion("set scope.project_keys")
        .with_suggestion("or switch to all_projects");

    assert_eq!(error.code, "CFG-VAL-002");
    assert_eq!(error.context.get("context"), Some(&"scope.mode".to_string()));
    assert_eq!(error.recovery_suggestions.len(), 2);
}

#[test]
fn test_generated_codes_are_unique() {
    let first = AppError::new(ErrorCategory::InternalError, "a");
    let second = AppError::new(ErrorCategory::InternalError, "a");
    assert!(first.code.starts_with("ERR-"));
    assert_ne!(first.code, second.code);
}

#[test]
fn test_error_display_includes_code_category_and_cause() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "snapshot.json missing");
    let mut error = AppError::with_source(ErrorCategory::IoError, "could not read", Box::new(io))
        .with_code("SNAP-001");
    error.add_context("path", "snapshot.json");

    let text = error.to_string();
    assert!(text.starts_with("[SNAP-001] IoError: could not read"));
    assert!(text.contains("snapshot.json"));
    assert!(text.contains("Caused by: snapshot.json missing"));
}

#[test]
fn test_conversions_from_library_errors() {
    let io: AppError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
    assert_eq!(io.category, ErrorCategory::IoError);
    assert_eq!(io.code, "IO_ERROR");
    assert!(io.source.is_some());

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let json: AppError = json_err.into();
    assert_eq!(json.category, ErrorCategory::SerializationError);
    assert_eq!(json.code, "SERDE-JSON-001");

    let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("a: [").unwrap_err();
    let yaml: AppError = yaml_err.into();
    assert_eq!(yaml.code, "SERDE-YAML-001");

    let any: AppError = anyhow::anyhow!("boom").into();
    assert_eq!(any.category, ErrorCategory::InternalError);
    assert_eq!(any.message, "boom");
}

#[test]
fn test_app_error_round_trips_through_anyhow() {
    let error = AppError::new(ErrorCategory::IntegrityError, "dup").with_code("NORM-REG-001");
    let wrapped: anyhow::Error = error.into();
    let recovered = wrapped.downcast_ref::<AppError>().unwrap();
    assert_eq!(recovered.code, "NORM-REG-001");
}

#[test]
fn test_default_reporter_does_not_panic() {
    let reporter = DefaultErrorReporter::new();
    let error = AppError::new(ErrorCategory::ValidationError, "missing name")
        .with_code("NORM-FIELD-001")
        .with_suggestion("fill in the name");
    reporter.report_error(&error);
    reporter.report_warning("control file unreadable", Some("parse error".to_string()));
    reporter.report_warning("no context", None);
    reporter.report_info("done");
}
