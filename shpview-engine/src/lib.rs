pub mod command;
pub mod controller;
pub mod decoration;
pub mod document;
pub mod layer;
pub mod render;
pub mod viewport;

pub mod errors {
    use std::path::PathBuf;

    use shpview_core::dataset::{DatasetError, GeometryKind};
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum LayerError {
        #[error("failed to open layer {path:?}: {source}")]
        Open {
            path: PathBuf,
            #[source]
            source: DatasetError,
        },
        #[error("layer `{name}` has unsupported geometry kind `{kind}`")]
        UnsupportedKind { name: String, kind: GeometryKind },
    }

    #[derive(Debug, Clone, Copy, PartialEq, Error)]
    pub enum ViewportError {
        #[error("cannot zoom to degenerate bounds ({x_range} x {y_range})")]
        DegenerateBounds { x_range: f64, y_range: f64 },
        #[error("zoom factor must be finite and positive, got {0}")]
        InvalidZoomFactor(f64),
    }
}
