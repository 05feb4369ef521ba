pub mod builtin;
pub mod catalog;
pub mod classify;
pub mod policy;
pub mod validate;
