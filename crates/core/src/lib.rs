pub mod domain;
pub mod error;
pub mod path;
pub mod service;
pub mod store;
pub mod tree;
pub mod types;
