pub mod cli;
pub mod errors;
pub mod loader;
pub mod svg;

use errors::FrontendError;
use shpview_config::AppConfig;
use tracing::info;

pub use cli::CliOptions;

/// 运行命令行前端并打印摘要。
pub fn run_cli(options: &CliOptions, config: &AppConfig) -> Result<(), FrontendError> {
    info!(layers = options.layers.len(), commands = options.commands.len(), "启动 CLI 前端");
    let summary = cli::run(options, config)?;
    cli::print_summary(&summary);
    Ok(())
}
