pub mod bounds;
pub mod codec;
pub mod feature;

pub use self::bounds::*;
pub use self::codec::*;
pub use self::feature::*;
