pub mod asserts;
pub mod executors;
pub mod graphs;

pub use asserts::*;
pub use executors::*;
pub use graphs::*;
