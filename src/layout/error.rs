use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("invalid layout config: `{field}` {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("invalid viewport {width}x{height}: both sides must be positive and finite")]
    InvalidViewport { width: f64, height: f64 },
}
