//! Tests for error types

use actix_web::ResponseError;
use mirada::Error;

#[test]
fn test_validation_error() {
    let error = Error::Validation("text must not be empty".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Validation error"));
    assert!(error_str.contains("text must not be empty"));
    assert_eq!(error.status_code().as_u16(), 400);
}

#[test]
fn test_unprocessable_error() {
    let error = Error::Unprocessable("multipart file field is required".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Unprocessable request"));
    assert_eq!(error.status_code().as_u16(), 422);
}

#[test]
fn test_provider_error() {
    let error = Error::Provider("ThrottlingException: rate exceeded".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Provider error"));
    assert!(error_str.contains("ThrottlingException"));
    assert_eq!(error.status_code().as_u16(), 500);
}

#[test]
fn test_tracking_error() {
    let error = Error::Tracking("connection refused".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Tracking backend error"));
    assert_eq!(error.status_code().as_u16(), 500);
}

#[test]
fn test_config_error() {
    let error = Error::Config("invalid value for MIRADA_PORT: abc".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Configuration error"));
    assert!(error_str.contains("MIRADA_PORT"));
}

#[test]
fn test_kind_labels_cover_taxonomy() {
    assert_eq!(Error::Validation(String::new()).kind(), "validation");
    assert_eq!(Error::Unprocessable(String::new()).kind(), "unprocessable");
    assert_eq!(Error::Provider(String::new()).kind(), "provider");
    assert_eq!(Error::Tracking(String::new()).kind(), "tracking");
    assert_eq!(Error::Config(String::new()).kind(), "config");
}
