pub mod dimension;
pub mod errors;
pub mod precision;
pub mod report;

pub use dimension::*;
pub use errors::*;
pub use precision::*;
pub use report::*;
