#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// User-caused problem with the upload or its parameters.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A recognized option the service refuses to pass to the engine.
    #[error("Unsupported option: {0}")]
    UnsupportedOption(String),
}
