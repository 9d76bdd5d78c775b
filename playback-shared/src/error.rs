use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("player: stopped")]
    ErrPlayerStopped,

    // raised by output surfaces
    #[error("surface: append rejected: {0}")]
    ErrAppendRejected(String),
    #[error("surface: removal of [{start}, {end}) rejected")]
    ErrRemovalRejected { start: f64, end: f64 },
    #[error("surface: seek to {0} rejected")]
    ErrSeekRejected(f64),
    #[error("surface: quota exceeded")]
    ErrQuotaExceeded,

    // Annex-B reading
    #[error("end of stream")]
    ErrIoEOF,
    #[error("data is not a H264 bitstream")]
    ErrDataIsNotH264Stream,

    #[error("{0}")]
    Io(#[source] IoError),
    #[error("{0}")]
    Std(#[source] StdError),
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wraps a backend-specific error, keeping its source chain.
    pub fn from_std<T>(error: T) -> Self
    where
        T: std::error::Error + Send + Sync + 'static,
    {
        Error::Std(StdError(Box::new(error)))
    }

    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        if let Error::Std(s) = self {
            return s.0.downcast_ref();
        }

        None
    }
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// io::Error has no PartialEq, compare kinds only.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

/// Error raised by an output surface implemented outside this workspace.
/// Never equal to anything, including itself.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StdError(pub Box<dyn std::error::Error + Send + Sync>);

impl PartialEq for StdError {
    fn eq(&self, _: &Self) -> bool {
        false
    }
}
