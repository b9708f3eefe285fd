pub mod quadtree;
mod record_check;

use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use shapefile::{Point, PointM, PointZ, PolygonRing, Shape, ShapeReader, ShapeType};
use shpview_core::dataset::{
    DatasetError, DatasetOpener, GeometryKind, ShapeRecord, SharedDataset, SpatialDataset,
};
use shpview_core::geometry::{MapPoint, MapRect};
use tracing::{debug, warn};

use crate::quadtree::{DEFAULT_MAX_DEPTH, QuadTree};
use crate::record_check::first_oversized_record;

/// 将 ESRI 形状类型映射为核心几何类别；Z/M 变体按二维处理，多点与多面片视为未知。
pub fn geometry_kind(shape_type: ShapeType) -> GeometryKind {
    match shape_type {
        ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => GeometryKind::Point,
        ShapeType::Polyline | ShapeType::PolylineZ | ShapeType::PolylineM => {
            GeometryKind::Polyline
        }
        ShapeType::Polygon | ShapeType::PolygonZ | ShapeType::PolygonM => GeometryKind::Polygon,
        _ => GeometryKind::Unknown,
    }
}

/// `.shp` 打开入口，实现核心的 [`DatasetOpener`]。
#[derive(Debug, Clone, Copy)]
pub struct EsriFacade {
    max_depth: usize,
}

impl EsriFacade {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// 自定义空间索引的最大深度。
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Default for EsriFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetOpener for EsriFacade {
    fn open(&self, path: &Path) -> Result<SharedDataset, DatasetError> {
        let dataset = EsriDataset::open_with_depth(path, self.max_depth)?;
        Ok(Arc::new(dataset))
    }
}

/// 解码后的单条记录；无法解码的记录保留原因，读取时报告为无效记录。
#[derive(Debug)]
enum StoredRecord {
    Geometry {
        vertices: Vec<MapPoint>,
        part_starts: Vec<usize>,
    },
    Unreadable(String),
}

impl StoredRecord {
    fn bounds(&self) -> Option<MapRect> {
        match self {
            StoredRecord::Geometry { vertices, .. } => {
                MapRect::from_points(vertices.iter().copied())
            }
            StoredRecord::Unreadable(_) => None,
        }
    }
}

/// 已打开的 ESRI shapefile。记录在打开时由 `shapefile` 顺序解码，索引随之构建。
///
/// 损坏记录之后的内容无法再可靠定位：损坏记录本身保留为无效记录，
/// 其后的记录不再读取。
#[derive(Debug)]
pub struct EsriDataset {
    path: PathBuf,
    shape_type: ShapeType,
    kind: GeometryKind,
    bounds: MapRect,
    records: Vec<StoredRecord>,
    tree: QuadTree,
}

impl EsriDataset {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        Self::open_with_depth(path.as_ref(), DEFAULT_MAX_DEPTH)
    }

    fn open_with_depth(path: &Path, max_depth: usize) -> Result<Self, DatasetError> {
        let data = read_file(path)?;
        let mut reader = ShapeReader::new(Cursor::new(data.as_slice()))
            .map_err(|err| DatasetError::UnsupportedFormat(err.to_string()))?;
        let header = reader.header();
        let shape_type = header.shape_type;
        let bounds = MapRect::from_coords(
            header.bbox.min.x,
            header.bbox.min.y,
            header.bbox.max.x,
            header.bbox.max.y,
        );

        let oversized = first_oversized_record(&data);
        let records = decode_records(&mut reader, oversized, path);

        let items: Vec<(usize, MapRect)> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| record.bounds().map(|rect| (index, rect)))
            .collect();
        let tree = QuadTree::build(bounds, items, max_depth);

        let dataset = Self {
            path: path.to_path_buf(),
            shape_type,
            kind: geometry_kind(shape_type),
            bounds,
            records,
            tree,
        };
        debug!(
            path = %path.display(),
            shape_type = ?dataset.shape_type,
            kind = %dataset.kind,
            records = dataset.records.len(),
            nodes = dataset.tree.node_count(),
            "打开 shapefile"
        );
        Ok(dataset)
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件头中声明的形状类型。
    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        self.shape_type
    }
}

impl SpatialDataset for EsriDataset {
    fn kind(&self) -> GeometryKind {
        self.kind
    }

    fn bounds(&self) -> MapRect {
        self.bounds
    }

    fn record_count(&self) -> usize {
        self.records.len()
    }

    fn read_record(&self, index: usize) -> Result<ShapeRecord, DatasetError> {
        match self.records.get(index) {
            Some(StoredRecord::Geometry {
                vertices,
                part_starts,
            }) => Ok(ShapeRecord::new(index, vertices.clone(), part_starts.clone())),
            Some(StoredRecord::Unreadable(message)) => Err(DatasetError::InvalidRecord {
                index,
                message: message.clone(),
            }),
            None => Err(DatasetError::RecordOutOfRange {
                index,
                count: self.records.len(),
            }),
        }
    }

    fn filter_records(&self, bounds: &MapRect) -> Vec<usize> {
        self.tree.query(bounds)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, DatasetError> {
    fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => DatasetError::NotFound {
            path: path.to_path_buf(),
        },
        _ => DatasetError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// 顺序解码记录，直到文件结束或遇到第一条损坏记录。
fn decode_records(
    reader: &mut ShapeReader<Cursor<&[u8]>>,
    oversized: Option<(usize, String)>,
    path: &Path,
) -> Vec<StoredRecord> {
    let mut records = Vec::new();
    let mut shapes = reader.iter_shapes();
    loop {
        let index = records.len();
        if let Some((_, message)) = oversized.as_ref().filter(|(bad, _)| *bad == index) {
            warn!(path = %path.display(), index, reason = %message, "记录计数与长度不符，停止读取");
            records.push(StoredRecord::Unreadable(message.clone()));
            break;
        }
        match shapes.next() {
            None => break,
            Some(Ok(shape)) => records.push(convert_shape(&shape)),
            Some(Err(err)) => {
                warn!(path = %path.display(), index, error = %err, "记录解码失败，停止读取");
                records.push(StoredRecord::Unreadable(err.to_string()));
                break;
            }
        }
    }
    records
}

fn xy(point: &Point) -> MapPoint {
    MapPoint::new(point.x, point.y)
}

fn xy_m(point: &PointM) -> MapPoint {
    MapPoint::new(point.x, point.y)
}

fn xy_z(point: &PointZ) -> MapPoint {
    MapPoint::new(point.x, point.y)
}

/// 把若干顶点序列拼成扁平顶点数组与部件起点。
fn multi_part<'a, P: 'a>(
    parts: impl Iterator<Item = &'a [P]>,
    to_map: impl Fn(&P) -> MapPoint,
) -> StoredRecord {
    let mut vertices = Vec::new();
    let mut part_starts = Vec::new();
    for part in parts {
        part_starts.push(vertices.len());
        vertices.extend(part.iter().map(&to_map));
    }
    StoredRecord::Geometry {
        vertices,
        part_starts,
    }
}

fn single_part<P>(points: &[P], to_map: impl Fn(&P) -> MapPoint) -> StoredRecord {
    StoredRecord::Geometry {
        vertices: points.iter().map(to_map).collect(),
        part_starts: Vec::new(),
    }
}

fn rings<P>(rings: &[PolygonRing<P>]) -> impl Iterator<Item = &[P]> {
    rings.iter().map(|ring| ring.points())
}

fn convert_shape(shape: &Shape) -> StoredRecord {
    match shape {
        Shape::NullShape => StoredRecord::Geometry {
            vertices: Vec::new(),
            part_starts: Vec::new(),
        },
        Shape::Point(point) => single_part(std::slice::from_ref(point), xy),
        Shape::PointM(point) => single_part(std::slice::from_ref(point), xy_m),
        Shape::PointZ(point) => single_part(std::slice::from_ref(point), xy_z),
        Shape::Polyline(line) => multi_part(line.parts().iter().map(Vec::as_slice), xy),
        Shape::PolylineM(line) => multi_part(line.parts().iter().map(Vec::as_slice), xy_m),
        Shape::PolylineZ(line) => multi_part(line.parts().iter().map(Vec::as_slice), xy_z),
        Shape::Polygon(polygon) => multi_part(rings(polygon.rings()), xy),
        Shape::PolygonM(polygon) => multi_part(rings(polygon.rings()), xy_m),
        Shape::PolygonZ(polygon) => multi_part(rings(polygon.rings()), xy_z),
        Shape::Multipoint(points) => single_part(points.points(), xy),
        Shape::MultipointM(points) => single_part(points.points(), xy_m),
        Shape::MultipointZ(points) => single_part(points.points(), xy_z),
        _ => StoredRecord::Unreadable("不支持的记录类型".to_string()),
    }
}
