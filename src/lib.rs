// App-specific modules
pub mod config;
pub mod jito;
pub mod submit;
