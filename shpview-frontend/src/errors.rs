use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("写出渲染结果 {path:?} 失败: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("画布尺寸无效: {width}x{height}")]
    InvalidCanvasSize { width: i32, height: i32 },
}
