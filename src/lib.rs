pub mod actor;
pub mod entity;
pub mod error;
pub mod service;
pub mod store;
pub mod utils;
pub mod validate;
