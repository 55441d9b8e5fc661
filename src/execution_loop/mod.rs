pub mod error_classifier;
pub mod error_recovery;
pub mod outcome;
pub mod retry_loop;

pub use error_classifier::*;
pub use error_recovery::*;
pub use outcome::*;
pub use retry_loop::*;
