use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MbtilesError {
    #[error("failed to open mbtiles {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("unrecognized .mbtiles format \"{0}\"")]
    UnsupportedFormat(String),
    #[error("mbtiles query failed: {0}")]
    Query(#[from] rusqlite::Error),
}
