pub mod backing;
pub mod compare;

pub use backing::resolve_backing;
pub use compare::{compare, compare_pair};
