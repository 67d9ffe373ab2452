pub mod cleaner;
pub mod docker;
pub mod error;
pub mod runner;
pub mod runtime;

pub use cleaner::*;
pub use docker::*;
pub use error::*;
pub use runner::*;
pub use runtime::*;
