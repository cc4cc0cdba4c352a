pub mod compare;
pub mod error;
pub mod export;
pub mod filter;
pub mod har;
pub mod sample;
pub mod stats;
pub mod testgen;

pub use error::{Error, Result};
pub use sample::{Sample, SampleOptions};
