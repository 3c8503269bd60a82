//! Pull request reporting: output classification, comment templates, and
//! posting.

pub mod classify;
pub mod comment;
pub mod template;

pub use classify::Classifier;
pub use comment::{plan_comment, post_comment, read_output_file, CommentPlan};
