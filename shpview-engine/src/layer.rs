use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shpview_core::dataset::{DatasetOpener, GeometryKind, SharedDataset};
use shpview_core::geometry::{DisplayPoint, MapRect};
use shpview_core::style::LayerStyle;
use tracing::{debug, info, warn};

use crate::errors::LayerError;
use crate::render::{Canvas, Pen};
use crate::viewport::Viewport;

/// 点要素默认绘制半径（像素）。
pub const POINT_RADIUS: i32 = 5;

/// 文档内唯一的图层标识，删除后不会复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(u64);

impl LayerId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 可绘制的几何类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Point,
    Polyline,
    Polygon,
}

impl TryFrom<GeometryKind> for ShapeKind {
    type Error = GeometryKind;

    fn try_from(kind: GeometryKind) -> Result<Self, Self::Error> {
        match kind {
            GeometryKind::Point => Ok(ShapeKind::Point),
            GeometryKind::Polyline => Ok(ShapeKind::Polyline),
            GeometryKind::Polygon => Ok(ShapeKind::Polygon),
            other => Err(other),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShapeKind::Point => "point",
            ShapeKind::Polyline => "polyline",
            ShapeKind::Polygon => "polygon",
        };
        f.write_str(label)
    }
}

/// 一个已加载的图层：共享的数据集句柄加上固定样式。
///
/// 克隆得到的图层与原图层共享同一个数据集。
#[derive(Debug, Clone)]
pub struct Shape {
    name: String,
    kind: ShapeKind,
    dataset: SharedDataset,
    style: LayerStyle,
    point_radius: i32,
}

impl Shape {
    /// 包装数据集，几何类型无法绘制时返回错误。
    pub fn new(
        name: impl Into<String>,
        dataset: SharedDataset,
        style: LayerStyle,
    ) -> Result<Self, LayerError> {
        let name = name.into();
        let kind = ShapeKind::try_from(dataset.kind())
            .map_err(|kind| LayerError::UnsupportedKind { name: name.clone(), kind })?;
        Ok(Self {
            name,
            kind,
            dataset,
            style,
            point_radius: POINT_RADIUS,
        })
    }

    pub fn with_point_radius(mut self, radius: i32) -> Self {
        self.point_radius = radius.max(1);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    #[inline]
    pub fn style(&self) -> LayerStyle {
        self.style
    }

    #[inline]
    pub fn dataset(&self) -> &SharedDataset {
        &self.dataset
    }

    #[inline]
    pub fn bounds(&self) -> MapRect {
        self.dataset.bounds()
    }

    #[inline]
    pub fn record_count(&self) -> usize {
        self.dataset.record_count()
    }

    /// 绘制视口内的记录，返回空间索引预筛出的记录数。
    ///
    /// 读取失败的记录会被跳过，但仍计入返回值。
    pub fn draw(&self, canvas: &mut dyn Canvas, viewport: &Viewport) -> usize {
        let hit_bounds = viewport.map_hit_bounds();
        let hits = self.dataset.filter_records(&hit_bounds);

        canvas.save();
        canvas.set_pen(Pen::solid(self.style.border));
        canvas.set_brush(match self.kind {
            ShapeKind::Polyline => None,
            ShapeKind::Point | ShapeKind::Polygon => Some(self.style.fill),
        });

        let mut points: Vec<DisplayPoint> = Vec::new();
        for &index in &hits {
            let record = match self.dataset.read_record(index) {
                Ok(record) => record,
                Err(err) => {
                    warn!(layer = %self.name, index, error = %err, "读取记录失败，跳过绘制");
                    continue;
                }
            };

            match self.kind {
                ShapeKind::Point => {
                    if let Some(&vertex) = record.vertices().first() {
                        canvas.draw_ellipse(
                            viewport.map_to_display(vertex),
                            self.point_radius,
                            self.point_radius,
                        );
                    }
                }
                ShapeKind::Polyline | ShapeKind::Polygon => {
                    for part in record.parts().filter(|part| !part.is_empty()) {
                        points.clear();
                        points.extend(part.iter().map(|&vertex| viewport.map_to_display(vertex)));
                        if self.kind == ShapeKind::Polygon {
                            canvas.draw_polygon(&points);
                        } else {
                            canvas.draw_polyline(&points);
                        }
                    }
                }
            }
        }

        canvas.restore();
        debug!(layer = %self.name, hits = hits.len(), total = self.record_count(), "图层绘制完成");
        hits.len()
    }
}

/// 由路径创建正确类型的图层。
#[derive(Clone)]
pub struct LayerFactory {
    opener: Arc<dyn DatasetOpener>,
    point_radius: i32,
}

impl LayerFactory {
    pub fn new(opener: impl DatasetOpener + 'static) -> Self {
        Self {
            opener: Arc::new(opener),
            point_radius: POINT_RADIUS,
        }
    }

    pub fn with_point_radius(mut self, radius: i32) -> Self {
        self.point_radius = radius;
        self
    }

    /// 打开数据集并包装为图层，样式随机生成。图层名取文件名第一个 `.` 之前的部分。
    pub fn create(&self, path: &Path) -> Result<Shape, LayerError> {
        let dataset = self.opener.open(path).map_err(|source| LayerError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let shape = Shape::new(layer_name(path), dataset, LayerStyle::random())?
            .with_point_radius(self.point_radius);
        info!(
            path = %path.display(),
            layer = shape.name(),
            kind = %shape.kind(),
            records = shape.record_count(),
            "图层已创建"
        );
        Ok(shape)
    }
}

impl fmt::Debug for LayerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerFactory")
            .field("point_radius", &self.point_radius)
            .finish_non_exhaustive()
    }
}

fn layer_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split_once('.') {
        Some((base, _)) => base.to_string(),
        None => file_name,
    }
}
