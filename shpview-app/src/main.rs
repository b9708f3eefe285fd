use std::path::PathBuf;

use clap::Parser;
use shpview_config::{AppConfig, ConfigError};
use shpview_frontend::CliOptions;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 将 ESRI shapefile 图层渲染为 SVG
#[derive(Parser, Debug)]
#[command(name = "shpview")]
#[command(version, about, long_about = None)]
struct Args {
    /// 配置文件路径，缺省时按 SHPVIEW_CONFIG、./config/default.toml 查找
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 输出 SVG 路径
    #[arg(long, value_name = "SVG")]
    output: Option<PathBuf>,

    /// 加载后依次执行的命令，可重复
    #[arg(long = "command", value_name = "COMMAND")]
    commands: Vec<String>,

    /// 额外单独渲染的图层名
    #[arg(long, value_name = "LAYER")]
    isolate: Option<String>,

    /// 要加载的 shapefile
    #[arg(value_name = "SHAPEFILE")]
    layers: Vec<PathBuf>,
}

impl Args {
    fn into_options(self) -> (Option<PathBuf>, CliOptions) {
        let options = CliOptions {
            layers: self.layers,
            commands: self.commands,
            output: self.output,
            isolate: self.isolate,
        };
        (self.config, options)
    }
}

fn main() {
    let (config_override, options) = Args::parse().into_options();

    let config = load_configuration(config_override);
    init_logging(&config);
    info!("启动 shpview");

    if let Err(err) = shpview_frontend::run_cli(&options, &config) {
        error!(error = %err, "执行 CLI 前端失败");
        std::process::exit(1);
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_and_paths_fill_cli_options() {
        let args = Args::try_parse_from([
            "shpview",
            "--config",
            "custom.toml",
            "--command",
            "zoom_all",
            "roads.shp",
            "--command",
            "raise_layer roads",
            "--isolate",
            "roads",
            "--output",
            "out/map.svg",
            "parcels.shp",
        ])
        .expect("参数应能解析");

        let (config, options) = args.into_options();
        assert_eq!(config, Some(PathBuf::from("custom.toml")));
        assert_eq!(options.commands, vec!["zoom_all", "raise_layer roads"]);
        assert_eq!(
            options.layers,
            vec![PathBuf::from("roads.shp"), PathBuf::from("parcels.shp")]
        );
        assert_eq!(options.isolate.as_deref(), Some("roads"));
        assert_eq!(options.output, Some(PathBuf::from("out/map.svg")));
    }

    #[test]
    fn unknown_flags_and_missing_values_are_rejected() {
        assert!(Args::try_parse_from(["shpview", "--explode"]).is_err());
        assert!(Args::try_parse_from(["shpview", "--output"]).is_err());
    }

    #[test]
    fn no_arguments_means_no_layers() {
        let (config, options) = Args::try_parse_from(["shpview"])
            .expect("空参数应能解析")
            .into_options();
        assert!(config.is_none());
        assert!(options.layers.is_empty());
        assert!(options.commands.is_empty());
    }
}
