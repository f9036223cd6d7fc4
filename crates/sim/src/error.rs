/// Errors raised while running a simulated vehicle.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Vehicle thread panicked")]
    ThreadPanicked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
