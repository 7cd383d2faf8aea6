pub mod error;
pub mod frame;
pub mod stats;
pub mod traits;
pub mod types;

pub use error::*;
pub use frame::*;
pub use traits::*;
pub use types::*;
