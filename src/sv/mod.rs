pub mod activation;
pub mod audit;
pub mod batches;
pub mod codes;
pub mod stats;
#[cfg(test)]
pub mod test_utils;

pub use activation::Activation;
pub use audit::Audit;
pub use batches::Batches;
pub use codes::Codes;
pub use stats::Stats;
