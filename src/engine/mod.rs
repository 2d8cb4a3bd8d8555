pub mod classifier;
pub mod pipeline;
pub mod scorer;
pub mod tracker;
