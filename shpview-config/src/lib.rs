use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 自动发现配置文件：优先读取环境变量 `SHPVIEW_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("SHPVIEW_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 视图尺寸与交互参数。
#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "ViewConfig::default_width")]
    pub width: i32,
    #[serde(default = "ViewConfig::default_height")]
    pub height: i32,
    /// 点要素绘制半径（像素）。
    #[serde(default = "ViewConfig::default_point_radius")]
    pub point_radius: i32,
    /// 鼠标滚轮一格对应的增量单位。
    #[serde(default = "ViewConfig::default_wheel_step")]
    pub wheel_step: i32,
}

impl ViewConfig {
    fn default_width() -> i32 {
        800
    }

    fn default_height() -> i32 {
        600
    }

    fn default_point_radius() -> i32 {
        5
    }

    fn default_wheel_step() -> i32 {
        120
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            point_radius: Self::default_point_radius(),
            wheel_step: Self::default_wheel_step(),
        }
    }
}

/// 地图装饰元素预设。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapLayout {
    #[default]
    None,
    Full,
    NoGridLine,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapConfig {
    #[serde(default)]
    pub layout: MapLayout,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    #[serde(default = "FrontendConfig::default_output_path")]
    pub output_path: PathBuf,
    /// 启动时加载的图层，命令行参数优先。
    #[serde(default)]
    pub layers: Vec<PathBuf>,
}

impl FrontendConfig {
    fn default_output_path() -> PathBuf {
        PathBuf::from("shpview.svg")
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            output_path: Self::default_output_path(),
            layers: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
