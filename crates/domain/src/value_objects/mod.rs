//! Value Objects - Immutable, identity-less domain primitives

mod task_id;
mod task_title;

pub use task_id::TaskId;
pub use task_title::TaskTitle;
