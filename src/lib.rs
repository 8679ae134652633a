pub mod aggregate;
pub mod cli;
pub mod collect;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod git;
pub mod identity;
pub mod membership;
pub mod model;
pub mod report;
pub mod store;
pub mod summary;
pub mod util;

pub use error::{GteamError, Result};
