use std::error::Error as _;
use std::io;

use ritual::error::Error;
use ritual::renderer::{MiniJinjaRenderer, TemplateRenderer};

#[test]
fn test_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();

    match err {
        Error::IoError(_) => (),
        _ => panic!("Expected IoError variant"),
    }
}

#[test]
fn test_error_display() {
    let err = Error::ConfigError("invalid manifest".to_string());
    assert_eq!(err.to_string(), "Configuration error: invalid manifest.");

    let err = Error::ValidationError {
        question: "port".to_string(),
        message: "expected a number, got string".to_string(),
    };
    assert_eq!(err.to_string(), "Invalid answer for 'port': expected a number, got string.");

    let err = Error::MigrationFailed {
        from: "1.0".to_string(),
        to: "1.1".to_string(),
        message: "no handler defined".to_string(),
    };
    assert_eq!(err.to_string(), "Migration 1.0 -> 1.1 failed: no handler defined.");
}

#[test]
fn test_only_validation_errors_are_recoverable() {
    let validation =
        Error::ValidationError { question: "a".to_string(), message: "bad".to_string() };
    assert!(validation.is_validation());
    assert!(!Error::QuestionNotFound("a".to_string()).is_validation());
    assert!(!Error::SourceNotFound { path: "x".to_string() }.is_validation());
}

#[test]
fn test_render_error_keeps_source() {
    let renderer = MiniJinjaRenderer::new();
    let err = renderer.render("index.html", "[[ missing ]]", &serde_json::json!({})).unwrap_err();

    assert!(err.to_string().starts_with("Template 'index.html' failed to render"));
    assert!(err.source().is_some());
}
