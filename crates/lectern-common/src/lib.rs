pub mod errors;
pub mod id;

pub use errors::{ConfigError, LecternError};
pub use id::{new_correlation_id, new_id};

pub type Result<T> = std::result::Result<T, LecternError>;
