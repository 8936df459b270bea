pub mod actuarial;
pub mod entities;
pub mod errors;
pub mod ports;
pub mod splitter;

pub use entities::*;
pub use errors::{DomainError, Result};
pub use splitter::TextSplitter;
