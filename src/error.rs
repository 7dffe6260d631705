/// Failure of the backing store itself. Always fatal for the current
/// operation: the engine surfaces it and never retries internally.
#[derive(Debug, ::thiserror::Error)]
pub enum StoreError {
    #[error("backing store i/o: {0}")]
    Io(#[from] ::redis::RedisError),
}

/// Recoverable, typed outcomes of engine operations. Every variant except
/// `Store` is an expected result returned to the caller; no partial state
/// mutation happens once one of these is produced.
#[derive(Debug, ::thiserror::Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no such {0}")]
    NotFound(&'static str),

    #[error("permission denied")]
    PermissionDenied,

    #[error("duplicated vote")]
    DuplicateVote,

    #[error("not enough karma")]
    InsufficientKarma,

    #[error("rate limited, retry later")]
    RateLimited,

    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = ::std::result::Result<T, Error>;
