pub mod clock;
pub mod extractor;
pub mod normalizer;
pub mod queue;
pub mod runner;
pub mod sweeper;
pub mod task_store;
pub mod tasks;
