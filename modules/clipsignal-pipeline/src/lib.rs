pub mod deals;
pub mod request;
pub mod reviews;
pub mod summary;
pub mod upsert;
pub mod workflows;

pub use request::PipelineRequest;
pub use summary::RunSummary;
