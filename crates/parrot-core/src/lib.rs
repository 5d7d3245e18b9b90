pub mod accumulator;
pub mod error;
pub mod mode;
pub mod preprocess;
pub mod sample;
pub mod stats;
pub mod store;
pub mod trigger;
