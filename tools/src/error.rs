use diesel_async::pooled_connection::deadpool::{BuildError, PoolError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable `{0}` is required")]
    Missing(&'static str),

    #[error("Could not get the environment variable `{0}` due to unicode error")]
    NotUnicode(&'static str),

    #[error("Environment variable `{key}` has an invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("could not get a pooled connection: {0}")]
    Pool(#[from] PoolError),

    #[error("could not build the connection pool: {0}")]
    PoolBuild(#[from] BuildError),

    #[error("comment {0} does not exist")]
    CommentNotFound(i32),
}

/// Input-consistency errors. Any of these aborts the run before a single
/// row is written; the fix is to correct the data and rerun.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("comment {id} has no legacy id, so it cannot belong to a legacy thread")]
    MissingLegacyId { id: i32 },

    #[error("legacy id {old_id} is used by comments {first} and {second}")]
    DuplicateLegacyId { old_id: i32, first: i32, second: i32 },

    #[error("comment {id} points at legacy parent {parent_old_id}, which does not exist")]
    UnresolvedParent { id: i32, parent_old_id: i32 },

    #[error("the parent chain of comment {id} never reaches a thread root")]
    Cycle { id: i32 },

    #[error("order of comment {id} ({order}) relative to its parent ({parent_order}) does not fit in 64 bits")]
    OrderOverflow {
        id: i32,
        order: i64,
        parent_order: i64,
    },

    #[error("comment {id} already belongs to thread {thread_id}; threads were normalized before")]
    AlreadyNormalized { id: i32, thread_id: i32 },
}

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("could not read the legacy export: {0}")]
    Read(#[from] std::io::Error),

    #[error("could not parse the legacy export: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("comment {old_id} was written by legacy account {author}, which was never imported")]
    UnknownAuthor { old_id: i32, author: i32 },

    #[error("content type `{0}` does not exist")]
    UnknownContentType(&'static str),

    #[error("comment {old_id} has an invalid creation timestamp {timestamp}")]
    InvalidTimestamp { old_id: i32, timestamp: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}
