//! Shared test utilities

pub mod fixtures;
pub mod mock_git_data;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_git_data::*;
