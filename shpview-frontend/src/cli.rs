use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use shpview_config::{AppConfig, MapLayout as LayoutPreset};
use shpview_engine::command::{CommandBus, CommandContext, CommandRequest};
use shpview_engine::controller::{ViewObserver, ViewportController};
use shpview_engine::decoration::MapLayout;
use shpview_engine::document::RenderStats;
use shpview_engine::layer::LayerFactory;
use shpview_io::EsriFacade;
use tracing::{debug, info, warn};

use crate::errors::FrontendError;
use crate::loader::{LayerSource, load_layers};
use crate::svg::SvgCanvas;

/// 独立图层视图的固定尺寸（像素）。
pub const ISOLATED_VIEW_SIZE: i32 = 512;

/// 命令行宿主的运行参数。
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub layers: Vec<PathBuf>,
    pub commands: Vec<String>,
    pub output: Option<PathBuf>,
    pub isolate: Option<String>,
}

/// 记录最新状态文本的观察者。
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    status: RefCell<String>,
    invalidations: Cell<usize>,
}

impl ConsoleObserver {
    pub fn status(&self) -> String {
        self.status.borrow().clone()
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.get()
    }
}

impl ViewObserver for ConsoleObserver {
    fn on_display_invalidated(&self) {
        self.invalidations.set(self.invalidations.get() + 1);
        debug!("显示内容已失效");
    }

    fn on_status_text_changed(&self, text: &str) {
        *self.status.borrow_mut() = text.to_string();
    }
}

/// 一次运行的结果摘要。
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub source: LayerSource,
    pub layers: Vec<String>,
    pub stats: RenderStats,
    pub status: String,
    pub output: PathBuf,
    pub isolated_output: Option<PathBuf>,
}

pub fn layout_preset(preset: LayoutPreset) -> MapLayout {
    match preset {
        LayoutPreset::None => MapLayout::None,
        LayoutPreset::Full => MapLayout::Full,
        LayoutPreset::NoGridLine => MapLayout::NoGridLine,
    }
}

/// 加载图层、执行命令、渲染一帧 SVG。
pub fn run(options: &CliOptions, config: &AppConfig) -> Result<RunSummary, FrontendError> {
    let (width, height) = (config.view.width, config.view.height);
    if width <= 0 || height <= 0 {
        return Err(FrontendError::InvalidCanvasSize { width, height });
    }

    let observer = Rc::new(ConsoleObserver::default());
    let factory = LayerFactory::new(EsriFacade::new()).with_point_radius(config.view.point_radius);
    let mut controller = ViewportController::new(factory, observer.clone())
        .with_decorations(layout_preset(config.map.layout).decorations())
        .with_wheel_step(config.view.wheel_step);
    controller.set_screen_rect(SvgCanvas::new(width, height).screen_rect());

    let loaded = load_layers(&mut controller, &options.layers, &config.frontend);
    info!(source = ?loaded.source, layers = controller.document().len(), "图层就绪");

    let bus = CommandBus::new();
    for line in &options.commands {
        let Some(request) = CommandRequest::parse(line) else {
            continue;
        };
        let mut context = CommandContext {
            controller: &mut controller,
        };
        let response = bus.dispatch(&request, &mut context);
        let message = response.message.unwrap_or_default();
        if response.success {
            info!(command = %request.name, "{message}");
            println!("[{}] {}", request.name, message);
        } else {
            warn!(command = %request.name, "{message}");
            eprintln!("[{}] {}", request.name, message);
        }
    }

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| config.frontend.output_path.clone());
    let stats = render_to_file(&mut controller, width, height, &output)?;

    let isolated_output = match &options.isolate {
        Some(name) => render_isolated(&controller, name, &output)?,
        None => None,
    };

    Ok(RunSummary {
        source: loaded.source,
        layers: controller
            .document()
            .display_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        stats,
        status: observer.status(),
        output,
        isolated_output,
    })
}

fn render_to_file(
    controller: &mut ViewportController,
    width: i32,
    height: i32,
    output: &Path,
) -> Result<RenderStats, FrontendError> {
    let mut canvas = SvgCanvas::new(width, height);
    let screen = canvas.screen_rect();
    let stats = controller.render(&mut canvas, screen);
    canvas.write_to(output)?;
    info!(path = %output.display(), hits = stats.hits, total = stats.total, "已写出 SVG");
    Ok(stats)
}

/// 在主输出旁写出 `<stem>-<layer>.svg`。图层不存在时返回 `None`。
fn render_isolated(
    controller: &ViewportController,
    name: &str,
    output: &Path,
) -> Result<Option<PathBuf>, FrontendError> {
    let Some(mut isolated) = controller.isolate_layer(name, Rc::new(ConsoleObserver::default()))
    else {
        warn!(layer = name, "要隔离的图层不存在");
        return Ok(None);
    };
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "map".to_string());
    let path = output.with_file_name(format!("{stem}-{name}.svg"));
    render_to_file(&mut isolated, ISOLATED_VIEW_SIZE, ISOLATED_VIEW_SIZE, &path)?;
    Ok(Some(path))
}

/// 打印运行摘要。
pub fn print_summary(summary: &RunSummary) {
    let source = match summary.source {
        LayerSource::Arguments => "命令行参数",
        LayerSource::Config => "配置文件",
        LayerSource::Environment => "环境变量",
        LayerSource::Demo => "内置示例",
    };
    println!("图层来源：{source}");
    println!("图层（自顶向下）：");
    for name in &summary.layers {
        println!("  - {name}");
    }
    println!("{}", summary.status);
    println!("已写出：{}", summary.output.display());
    if let Some(path) = &summary.isolated_output {
        println!("独立视图：{}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.frontend.output_path = dir.join("out").join("map.svg");
        config.map.layout = LayoutPreset::Full;
        config
    }

    #[test]
    fn demo_run_writes_svg_and_status() {
        let dir = tempfile::tempdir().expect("创建临时目录");
        let config = config_in(dir.path());
        let options = CliOptions {
            layers: vec![dir.path().join("missing.shp")],
            commands: vec![
                "raise_layer parcels".to_string(),
                "zoom_all".to_string(),
                "unknown".to_string(),
            ],
            isolate: Some("streets".to_string()),
            ..CliOptions::default()
        };

        let summary = run(&options, &config).expect("运行 CLI");
        assert_eq!(summary.source, LayerSource::Demo);
        assert_eq!(summary.layers, vec!["hydrants", "parcels", "streets"]);
        assert_eq!(summary.stats.total, 23);
        assert_eq!(summary.stats.hits, 23);
        assert!(summary.status.starts_with("Records Hit: 23   Records Total: 23"));

        let svg = std::fs::read_to_string(&summary.output).expect("读取 SVG");
        assert!(svg.contains("<polygon"));
        assert!(svg.contains("<ellipse"));
        assert!(svg.contains("1 : "));

        let isolated = summary.isolated_output.expect("独立视图");
        assert!(isolated.ends_with("map-streets.svg"));
        let svg = std::fs::read_to_string(isolated).expect("读取独立视图");
        assert!(svg.contains(r#"width="512""#));
        assert!(!svg.contains("<ellipse"));
    }

    #[test]
    fn invalid_canvas_size_is_rejected() {
        let dir = tempfile::tempdir().expect("创建临时目录");
        let mut config = config_in(dir.path());
        config.view.width = 0;
        let err = run(&CliOptions::default(), &config).unwrap_err();
        assert!(matches!(err, FrontendError::InvalidCanvasSize { width: 0, .. }));
    }

    #[test]
    fn layout_presets_map_to_decorations() {
        assert!(layout_preset(LayoutPreset::None).decorations().is_empty());
        assert_eq!(layout_preset(LayoutPreset::Full), MapLayout::Full);
        assert_eq!(layout_preset(LayoutPreset::NoGridLine), MapLayout::NoGridLine);
    }
}
