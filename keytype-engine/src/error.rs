use thiserror::Error;

/// Failures reported by a platform backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("{call} failed (os error {code}): {message}")]
    Os {
        call: &'static str,
        code: i32,
        message: String,
    },

    #[error("selected window is no longer available")]
    WindowUnavailable,

    #[error("foreground hook installation failed: {0}")]
    HookInstall(String),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl PlatformError {
    /// Wraps the calling thread's last OS error.
    pub fn last_os_error(call: &'static str) -> Self {
        Self::from_io(call, std::io::Error::last_os_error())
    }

    pub fn from_io(call: &'static str, err: std::io::Error) -> Self {
        Self::Os {
            call,
            code: err.raw_os_error().unwrap_or(0),
            message: err.to_string(),
        }
    }
}
