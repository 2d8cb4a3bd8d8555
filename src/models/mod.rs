pub mod signal;
pub mod verdict;
