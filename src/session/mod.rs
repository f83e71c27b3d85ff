pub mod driver;
pub mod source;
pub mod state;
