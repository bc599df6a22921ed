pub mod endpoint;
pub mod views;
