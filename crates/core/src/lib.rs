#![forbid(unsafe_code)]

pub mod model;
pub mod normalize;
pub mod selector;
pub mod time;

pub use selector::{AdaptiveSelector, EmptyPoolError, SelectionPolicy};
pub use time::Clock;
