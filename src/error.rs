use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to read source {}: {reason}", .path.display())]
    SourceRead { path: PathBuf, reason: String },

    #[error("gazetteer unavailable ({path}): {reason}")]
    GazetteerUnavailable { path: String, reason: String },

    #[error("no records survived filtering ({records_read} read, {dropped} dropped)")]
    EmptyResult { records_read: usize, dropped: usize },
}
