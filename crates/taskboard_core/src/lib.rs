pub mod board;
pub mod comments;
pub mod config;
pub mod dates;
pub mod deadline;
pub mod error;
pub mod model;
pub mod notify;
pub mod store;
pub mod task_api;
pub mod workflow;
