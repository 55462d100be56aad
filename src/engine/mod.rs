//! Engine implementation and its builder

mod builder;
mod completion;

pub use builder::{Muninn, MuninnBuilder};
pub use completion::CompletionEngine;
