pub mod analysis;
pub mod config;
pub mod numeric;
pub mod pipeline;
pub mod process;
pub mod quality;
pub mod tables;
