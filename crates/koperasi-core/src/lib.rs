pub mod error;
pub mod money;
pub mod types;

#[cfg(feature = "loans")]
pub mod loans;

#[cfg(feature = "allocation")]
pub mod allocation;

pub use error::KoperasiError;
pub use types::*;

/// Standard result type for all koperasi calculations
pub type KoperasiResult<T> = Result<T, KoperasiError>;
