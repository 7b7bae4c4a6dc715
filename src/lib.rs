pub mod api;
pub mod consts;
pub mod context;
pub mod error;
pub mod gate;
pub mod store;
pub mod verifier;

pub use error::{Error, Result};
