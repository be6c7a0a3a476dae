pub mod chunking;
pub mod dispatch;
pub mod errors;
pub mod models;
pub mod providers;
pub mod retrieval;
pub mod stream;
pub mod tools;
