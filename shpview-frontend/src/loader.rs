use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use shpview_config::FrontendConfig;
use shpview_core::dataset::{GeometryKind, MemoryDataset};
use shpview_core::geometry::MapPoint;
use shpview_core::style::LayerStyle;
use shpview_engine::controller::ViewportController;
use shpview_engine::layer::Shape;
use tracing::{info, warn};

/// 未通过参数或配置指定图层时读取的环境变量，值为平台路径列表。
pub const LAYERS_ENV: &str = "SHPVIEW_LAYERS";

/// 图层来源，便于前端呈现加载信息。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSource {
    Arguments,
    Config,
    Environment,
    Demo,
}

#[derive(Debug, Clone)]
pub struct LoadedLayers {
    pub source: LayerSource,
    pub requested: usize,
    pub loaded: usize,
}

/// 按命令行参数、配置、环境变量的优先级挑选图层路径。
pub fn resolve_layer_paths(
    arguments: &[PathBuf],
    config: &FrontendConfig,
    env_value: Option<OsString>,
) -> Option<(LayerSource, Vec<PathBuf>)> {
    if !arguments.is_empty() {
        return Some((LayerSource::Arguments, arguments.to_vec()));
    }
    if !config.layers.is_empty() {
        return Some((LayerSource::Config, config.layers.clone()));
    }
    let paths: Vec<PathBuf> = env_value
        .map(|value| {
            env::split_paths(&value)
                .filter(|path| !path.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default();
    if paths.is_empty() {
        None
    } else {
        Some((LayerSource::Environment, paths))
    }
}

/// 加载图层，若一个都没有成功则回退到内置示例。
pub fn load_layers(
    controller: &mut ViewportController,
    arguments: &[PathBuf],
    config: &FrontendConfig,
) -> LoadedLayers {
    if let Some((source, paths)) = resolve_layer_paths(arguments, config, env::var_os(LAYERS_ENV)) {
        let loaded = controller.add_layers(&paths);
        info!(?source, requested = paths.len(), loaded, "图层加载完成");
        if loaded > 0 {
            return LoadedLayers {
                source,
                requested: paths.len(),
                loaded,
            };
        }
        warn!(?source, "没有可用图层，回退到内置示例");
    }

    let loaded = populate_demo(controller);
    LoadedLayers {
        source: LayerSource::Demo,
        requested: 0,
        loaded,
    }
}

/// 向控制器加入示例图层，返回加入数量。
pub fn populate_demo(controller: &mut ViewportController) -> usize {
    let shapes = demo_shapes();
    let count = shapes.len();
    for shape in shapes {
        controller.add_shape(shape);
    }
    info!(count, "已加载内置示例图层");
    count
}

/// 自底向上：地块、街道、消防栓。
pub fn demo_shapes() -> Vec<Shape> {
    let mut parcels = MemoryDataset::new(GeometryKind::Polygon);
    for row in 0..3 {
        for column in 0..3 {
            let x = f64::from(column) * 10.0 + 1.0;
            let y = f64::from(row) * 10.0 + 1.0;
            parcels.push_path(ring(x, y, 8.0));
        }
    }
    let mut island: Vec<MapPoint> = ring(32.0, 2.0, 4.0).collect();
    island.extend(ring(32.0, 24.0, 4.0));
    parcels.push_record(island, vec![0, 5]);

    let mut streets = MemoryDataset::new(GeometryKind::Polyline);
    for offset in [0.0, 10.0, 20.0, 30.0] {
        streets.push_path([MapPoint::new(0.0, offset), MapPoint::new(36.0, offset)]);
        streets.push_path([MapPoint::new(offset, 0.0), MapPoint::new(offset, 30.0)]);
    }

    let mut hydrants = MemoryDataset::new(GeometryKind::Point);
    for (x, y) in [(0.0, 0.0), (10.0, 20.0), (20.0, 10.0), (30.0, 30.0), (34.0, 15.0)] {
        hydrants.push_point(MapPoint::new(x, y));
    }

    [
        ("parcels", parcels, 0x5eed_0001_u128),
        ("streets", streets, 0x5eed_0002_u128),
        ("hydrants", hydrants, 0x5eed_0003_u128),
    ]
    .into_iter()
    .filter_map(|(name, dataset, seed)| {
        Shape::new(name, dataset.into_shared(), LayerStyle::from_seed(seed))
            .map_err(|err| warn!(layer = name, error = %err, "示例图层构建失败"))
            .ok()
    })
    .collect()
}

/// 闭合正方形环，共五个顶点。
fn ring(x: f64, y: f64, size: f64) -> impl Iterator<Item = MapPoint> {
    [
        MapPoint::new(x, y),
        MapPoint::new(x + size, y),
        MapPoint::new(x + size, y + size),
        MapPoint::new(x, y + size),
        MapPoint::new(x, y),
    ]
    .into_iter()
}
