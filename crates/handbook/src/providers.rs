pub mod base;
pub mod configs;
pub mod mistral;
pub mod mock;
pub mod utils;
