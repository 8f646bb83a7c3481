pub mod api;
pub mod record;
pub mod task;
