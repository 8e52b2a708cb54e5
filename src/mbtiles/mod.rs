pub mod error;
pub mod reader;
pub mod summary;
pub mod types;

pub use self::error::*;
pub use self::reader::*;
pub use self::summary::*;
pub use self::types::*;
