pub mod types;
pub mod context;
pub mod cbc;

pub use types::*;
pub use context::*;
pub use cbc::*;
