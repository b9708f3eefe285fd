pub mod geometry {
    use std::ops::{Add, Div, Mul, Sub};

    use glam::{DVec2, IVec2};
    use serde::{Deserialize, Serialize};

    /// 通用二维数值对。地图空间使用 `f64`，显示空间使用 `i32`，两者之间不提供隐式转换，
    /// 必须经由视口完成坐标换算。
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Point2<T> {
        pub x: T,
        pub y: T,
    }

    /// 地图空间坐标（双精度）。
    pub type MapPoint = Point2<f64>;
    /// 显示空间坐标（整数像素）。
    pub type DisplayPoint = Point2<i32>;

    impl<T: Copy> Point2<T> {
        #[inline]
        pub const fn new(x: T, y: T) -> Self {
            Self { x, y }
        }

        #[inline]
        pub fn x(self) -> T {
            self.x
        }

        #[inline]
        pub fn y(self) -> T {
            self.y
        }
    }

    impl<T: Copy + PartialOrd> Point2<T> {
        /// 返回两个分量中较小者。
        #[inline]
        pub fn smaller(self) -> T {
            if self.x < self.y { self.x } else { self.y }
        }

        #[inline]
        pub fn larger(self) -> T {
            if self.x > self.y { self.x } else { self.y }
        }
    }

    impl<T: Add<Output = T>> Add for Point2<T> {
        type Output = Self;

        #[inline]
        fn add(self, rhs: Self) -> Self {
            Self {
                x: self.x + rhs.x,
                y: self.y + rhs.y,
            }
        }
    }

    impl<T: Sub<Output = T>> Sub for Point2<T> {
        type Output = Self;

        #[inline]
        fn sub(self, rhs: Self) -> Self {
            Self {
                x: self.x - rhs.x,
                y: self.y - rhs.y,
            }
        }
    }

    impl<T: Mul<Output = T>> Mul for Point2<T> {
        type Output = Self;

        #[inline]
        fn mul(self, rhs: Self) -> Self {
            Self {
                x: self.x * rhs.x,
                y: self.y * rhs.y,
            }
        }
    }

    impl<T: Div<Output = T>> Div for Point2<T> {
        type Output = Self;

        #[inline]
        fn div(self, rhs: Self) -> Self {
            Self {
                x: self.x / rhs.x,
                y: self.y / rhs.y,
            }
        }
    }

    macro_rules! impl_scalar_ops {
        ($($scalar:ty),*) => {$(
            impl Mul<$scalar> for Point2<$scalar> {
                type Output = Self;

                #[inline]
                fn mul(self, rhs: $scalar) -> Self {
                    Self::new(self.x * rhs, self.y * rhs)
                }
            }

            impl Div<$scalar> for Point2<$scalar> {
                type Output = Self;

                #[inline]
                fn div(self, rhs: $scalar) -> Self {
                    Self::new(self.x / rhs, self.y / rhs)
                }
            }
        )*};
    }

    impl_scalar_ops!(f64, i32);

    impl MapPoint {
        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            DVec2::new(self.x, self.y)
        }
    }

    impl DisplayPoint {
        #[inline]
        pub fn as_ivec2(self) -> IVec2 {
            IVec2::new(self.x, self.y)
        }

        /// 按原值提升为双精度向量，仅用于视口内部运算。
        #[inline]
        pub fn as_dvec2(self) -> DVec2 {
            self.as_ivec2().as_dvec2()
        }
    }

    impl From<DVec2> for MapPoint {
        fn from(value: DVec2) -> Self {
            Self::new(value.x, value.y)
        }
    }

    impl From<IVec2> for DisplayPoint {
        fn from(value: IVec2) -> Self {
            Self::new(value.x, value.y)
        }
    }

    #[inline]
    fn partial_min<T: PartialOrd>(a: T, b: T) -> T {
        if b < a { b } else { a }
    }

    #[inline]
    fn partial_max<T: PartialOrd>(a: T, b: T) -> T {
        if b > a { b } else { a }
    }

    /// 轴对齐矩形，地图空间与显示空间共用。构造时会规范化角点，保证 `max >= min`。
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Rect<T> {
        min: Point2<T>,
        max: Point2<T>,
    }

    pub type MapRect = Rect<f64>;
    pub type DisplayRect = Rect<i32>;

    impl<T> Rect<T>
    where
        T: Copy + PartialOrd + Default + Sub<Output = T>,
    {
        pub fn new(a: Point2<T>, b: Point2<T>) -> Self {
            Self {
                min: Point2::new(partial_min(a.x, b.x), partial_min(a.y, b.y)),
                max: Point2::new(partial_max(a.x, b.x), partial_max(a.y, b.y)),
            }
        }

        #[inline]
        pub fn from_coords(x_min: T, y_min: T, x_max: T, y_max: T) -> Self {
            Self::new(Point2::new(x_min, y_min), Point2::new(x_max, y_max))
        }

        /// 零矩形哨兵，表示“没有任何图层”的文档范围。
        #[inline]
        pub fn zero() -> Self {
            Self::default()
        }

        #[inline]
        pub fn min(&self) -> Point2<T> {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2<T> {
            self.max
        }

        #[inline]
        pub fn x_min(&self) -> T {
            self.min.x
        }

        #[inline]
        pub fn y_min(&self) -> T {
            self.min.y
        }

        #[inline]
        pub fn x_max(&self) -> T {
            self.max.x
        }

        #[inline]
        pub fn y_max(&self) -> T {
            self.max.y
        }

        #[inline]
        pub fn x_range(&self) -> T {
            self.max.x - self.min.x
        }

        #[inline]
        pub fn y_range(&self) -> T {
            self.max.y - self.min.y
        }

        #[inline]
        pub fn range(&self) -> Point2<T> {
            Point2::new(self.x_range(), self.y_range())
        }

        /// 任一方向跨度为零即视为空（包括零矩形哨兵与单点范围）。
        #[inline]
        pub fn is_empty(&self) -> bool {
            let zero = T::default();
            !(self.x_range() > zero && self.y_range() > zero)
        }

        /// 闭区间相交判定，边界接触也算相交。
        pub fn intersects(&self, other: &Self) -> bool {
            self.min.x <= other.max.x
                && other.min.x <= self.max.x
                && self.min.y <= other.max.y
                && other.min.y <= self.max.y
        }

        pub fn contains_rect(&self, other: &Self) -> bool {
            self.min.x <= other.min.x
                && self.min.y <= other.min.y
                && other.max.x <= self.max.x
                && other.max.y <= self.max.y
        }

        pub fn contains_point(&self, point: Point2<T>) -> bool {
            self.min.x <= point.x
                && point.x <= self.max.x
                && self.min.y <= point.y
                && point.y <= self.max.y
        }

        /// 两个矩形的并集。
        pub fn union(&self, other: &Self) -> Self {
            Self {
                min: Point2::new(
                    partial_min(self.min.x, other.min.x),
                    partial_min(self.min.y, other.min.y),
                ),
                max: Point2::new(
                    partial_max(self.max.x, other.max.x),
                    partial_max(self.max.y, other.max.y),
                ),
            }
        }

        pub fn include_point(&mut self, point: Point2<T>) {
            self.min = Point2::new(partial_min(self.min.x, point.x), partial_min(self.min.y, point.y));
            self.max = Point2::new(partial_max(self.max.x, point.x), partial_max(self.max.y, point.y));
        }
    }

    impl MapRect {
        #[inline]
        pub fn center(&self) -> MapPoint {
            (self.min + self.max) * 0.5
        }

        /// 以点集计算包围盒，点集为空时返回 `None`。
        pub fn from_points(points: impl IntoIterator<Item = MapPoint>) -> Option<Self> {
            let mut points = points.into_iter();
            let first = points.next()?;
            let mut rect = Self::new(first, first);
            for point in points {
                rect.include_point(point);
            }
            Some(rect)
        }
    }

    impl DisplayRect {
        /// 以左上角与尺寸构造屏幕矩形。
        #[inline]
        pub fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
            Self::from_coords(x, y, x + width, y + height)
        }

        #[inline]
        pub fn width(&self) -> i32 {
            self.x_range()
        }

        #[inline]
        pub fn height(&self) -> i32 {
            self.y_range()
        }

        #[inline]
        pub fn center(&self) -> DisplayPoint {
            (self.min + self.max) / 2
        }
    }
}

pub mod style {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    /// RGBA 颜色。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Color {
        pub r: u8,
        pub g: u8,
        pub b: u8,
        pub a: u8,
    }

    impl Color {
        pub const BLACK: Color = Color::rgb(0, 0, 0);
        pub const WHITE: Color = Color::rgb(255, 255, 255);
        pub const RED: Color = Color::rgb(255, 0, 0);
        pub const GREEN: Color = Color::rgb(0, 255, 0);

        #[inline]
        pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
            Self { r, g, b, a: 255 }
        }

        /// 由 HSL 分量构造颜色：色相取值 `0..360`，饱和度与亮度取值 `0..=255`。
        pub fn from_hsl(hue: u16, saturation: u8, lightness: u8) -> Self {
            let h = f64::from(hue % 360) / 60.0;
            let s = f64::from(saturation) / 255.0;
            let l = f64::from(lightness) / 255.0;

            let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
            let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
            let (r, g, b) = match h as u32 {
                0 => (chroma, x, 0.0),
                1 => (x, chroma, 0.0),
                2 => (0.0, chroma, x),
                3 => (0.0, x, chroma),
                4 => (x, 0.0, chroma),
                _ => (chroma, 0.0, x),
            };
            let m = l - chroma / 2.0;
            let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
            Self::rgb(channel(r), channel(g), channel(b))
        }

        /// `#rrggbb` 形式，便于导出 SVG。
        pub fn to_hex(self) -> String {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        }
    }

    /// 图层样式：边框色与填充色，创建后在图层生命周期内保持不变。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LayerStyle {
        pub border: Color,
        pub fill: Color,
    }

    impl LayerStyle {
        /// 由 128 位种子派生样式。边框亮度限制在 200 以内，保证与填充色有区分度。
        pub fn from_seed(seed: u128) -> Self {
            let bytes = seed.to_le_bytes();
            let word = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
            let border = Color::from_hsl(word(0) % 360, bytes[2], bytes[3] % 200);
            let fill = Color::from_hsl(word(4) % 360, bytes[6], bytes[7]);
            Self { border, fill }
        }

        /// 随机样式，随机源为 v4 UUID。
        pub fn random() -> Self {
            Self::from_seed(Uuid::new_v4().as_u128())
        }
    }
}

pub mod dataset {
    use std::fmt;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use crate::geometry::{MapPoint, MapRect};

    /// 数据集的几何类型。多点等暂不支持的类型统一归为 `Unknown`。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum GeometryKind {
        Point,
        Polyline,
        Polygon,
        Unknown,
    }

    impl fmt::Display for GeometryKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let label = match self {
                GeometryKind::Point => "point",
                GeometryKind::Polyline => "polyline",
                GeometryKind::Polygon => "polygon",
                GeometryKind::Unknown => "unknown",
            };
            f.write_str(label)
        }
    }

    #[derive(Debug, Error)]
    pub enum DatasetError {
        #[error("dataset {path:?} not found")]
        NotFound { path: PathBuf },
        #[error("failed to read dataset {path:?}: {source}")]
        Io {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        #[error("unsupported dataset format: {0}")]
        UnsupportedFormat(String),
        #[error("record {index} is invalid: {message}")]
        InvalidRecord { index: usize, message: String },
        #[error("record {index} out of range (record count {count})")]
        RecordOutOfRange { index: usize, count: usize },
    }

    /// 单条几何记录。顶点以扁平数组存放，多部件几何通过 `part_starts` 划分；
    /// 最后一个部件的终点是顶点总数。记录只能移动，不能复制。
    #[derive(Debug)]
    pub struct ShapeRecord {
        index: usize,
        vertices: Vec<MapPoint>,
        part_starts: Vec<usize>,
    }

    impl ShapeRecord {
        pub fn new(index: usize, vertices: Vec<MapPoint>, part_starts: Vec<usize>) -> Self {
            Self {
                index,
                vertices,
                part_starts,
            }
        }

        #[inline]
        pub fn index(&self) -> usize {
            self.index
        }

        #[inline]
        pub fn vertices(&self) -> &[MapPoint] {
            &self.vertices
        }

        #[inline]
        pub fn part_starts(&self) -> &[usize] {
            &self.part_starts
        }

        #[inline]
        pub fn is_null(&self) -> bool {
            self.vertices.is_empty()
        }

        /// 部件数量；没有显式部件信息但存在顶点时视为单部件。
        pub fn part_count(&self) -> usize {
            if self.part_starts.is_empty() && !self.vertices.is_empty() {
                1
            } else {
                self.part_starts.len()
            }
        }

        /// 依次返回每个部件的顶点切片。越界或逆序的起点会被截断为空切片。
        pub fn parts(&self) -> impl Iterator<Item = &[MapPoint]> + '_ {
            let total = self.vertices.len();
            (0..self.part_count()).map(move |part| {
                let start = self.part_starts.get(part).copied().unwrap_or(0).min(total);
                let end = self
                    .part_starts
                    .get(part + 1)
                    .copied()
                    .unwrap_or(total)
                    .min(total);
                &self.vertices[start..end.max(start)]
            })
        }
    }

    /// 空间数据集契约：核心只通过该接口访问几何数据与空间索引。
    pub trait SpatialDataset: fmt::Debug + Send + Sync {
        fn kind(&self) -> GeometryKind;

        /// 全部记录的范围。
        fn bounds(&self) -> MapRect;

        fn record_count(&self) -> usize;

        fn read_record(&self, index: usize) -> Result<ShapeRecord, DatasetError>;

        /// 返回范围可能与 `bounds` 相交的记录索引（空间索引预筛，结果为超集）。
        fn filter_records(&self, bounds: &MapRect) -> Vec<usize>;
    }

    /// 多个图层可共享同一个已打开的数据集，最后一个引用释放时关闭。
    pub type SharedDataset = Arc<dyn SpatialDataset>;

    pub trait DatasetOpener {
        fn open(&self, path: &Path) -> Result<SharedDataset, DatasetError>;
    }

    /// 纯内存数据集，过滤时线性扫描每条记录的范围。用于演示场景与测试。
    #[derive(Debug, Clone)]
    pub struct MemoryDataset {
        kind: GeometryKind,
        records: Vec<MemoryRecord>,
        bounds: Option<MapRect>,
    }

    #[derive(Debug, Clone)]
    struct MemoryRecord {
        vertices: Vec<MapPoint>,
        part_starts: Vec<usize>,
        bounds: Option<MapRect>,
    }

    impl MemoryDataset {
        pub fn new(kind: GeometryKind) -> Self {
            Self {
                kind,
                records: Vec::new(),
                bounds: None,
            }
        }

        /// 追加一条记录，返回其索引。
        pub fn push_record(&mut self, vertices: Vec<MapPoint>, part_starts: Vec<usize>) -> usize {
            let bounds = MapRect::from_points(vertices.iter().copied());
            if let Some(record_bounds) = bounds {
                self.bounds = Some(match self.bounds {
                    Some(current) => current.union(&record_bounds),
                    None => record_bounds,
                });
            }
            self.records.push(MemoryRecord {
                vertices,
                part_starts,
                bounds,
            });
            self.records.len() - 1
        }

        pub fn push_point(&mut self, point: MapPoint) -> usize {
            self.push_record(vec![point], Vec::new())
        }

        /// 追加单部件记录。
        pub fn push_path(&mut self, vertices: impl IntoIterator<Item = MapPoint>) -> usize {
            self.push_record(vertices.into_iter().collect(), vec![0])
        }

        pub fn into_shared(self) -> SharedDataset {
            Arc::new(self)
        }
    }

    impl SpatialDataset for MemoryDataset {
        fn kind(&self) -> GeometryKind {
            self.kind
        }

        fn bounds(&self) -> MapRect {
            self.bounds.unwrap_or_else(MapRect::zero)
        }

        fn record_count(&self) -> usize {
            self.records.len()
        }

        fn read_record(&self, index: usize) -> Result<ShapeRecord, DatasetError> {
            let record = self
                .records
                .get(index)
                .ok_or(DatasetError::RecordOutOfRange {
                    index,
                    count: self.records.len(),
                })?;
            Ok(ShapeRecord::new(
                index,
                record.vertices.clone(),
                record.part_starts.clone(),
            ))
        }

        fn filter_records(&self, bounds: &MapRect) -> Vec<usize> {
            self.records
                .iter()
                .enumerate()
                .filter_map(|(index, record)| {
                    record
                        .bounds
                        .filter(|record_bounds| record_bounds.intersects(bounds))
                        .map(|_| index)
                })
                .collect()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn parts_use_trailing_vertex_count() {
            let record = ShapeRecord::new(
                3,
                vec![
                    MapPoint::new(0.0, 0.0),
                    MapPoint::new(1.0, 0.0),
                    MapPoint::new(1.0, 1.0),
                    MapPoint::new(5.0, 5.0),
                    MapPoint::new(6.0, 6.0),
                ],
                vec![0, 3],
            );
            let parts: Vec<usize> = record.parts().map(|part| part.len()).collect();
            assert_eq!(parts, vec![3, 2]);
            assert_eq!(record.index(), 3);
        }

        #[test]
        fn single_point_record_is_one_part() {
            let record = ShapeRecord::new(0, vec![MapPoint::new(2.0, 3.0)], Vec::new());
            assert_eq!(record.part_count(), 1);
            assert_eq!(record.parts().next().map(|p| p.len()), Some(1));

            let null = ShapeRecord::new(1, Vec::new(), Vec::new());
            assert!(null.is_null());
            assert_eq!(null.parts().count(), 0);
        }

        #[test]
        fn malformed_part_starts_do_not_panic() {
            let record = ShapeRecord::new(
                0,
                vec![MapPoint::new(0.0, 0.0), MapPoint::new(1.0, 1.0)],
                vec![1, 0, 9],
            );
            let lens: Vec<usize> = record.parts().map(|p| p.len()).collect();
            assert_eq!(lens, vec![0, 2, 0]);
        }

        #[test]
        fn memory_dataset_filters_by_record_bounds() {
            let mut dataset = MemoryDataset::new(GeometryKind::Polyline);
            dataset.push_path([MapPoint::new(0.0, 0.0), MapPoint::new(1.0, 1.0)]);
            dataset.push_path([MapPoint::new(10.0, 10.0), MapPoint::new(12.0, 11.0)]);

            let bounds = dataset.bounds();
            assert_eq!(bounds, MapRect::from_coords(0.0, 0.0, 12.0, 11.0));

            let hits = dataset.filter_records(&MapRect::from_coords(-1.0, -1.0, 0.5, 0.5));
            assert_eq!(hits, vec![0]);
            let hits = dataset.filter_records(&MapRect::from_coords(-5.0, -5.0, 50.0, 50.0));
            assert_eq!(hits, vec![0, 1]);

            let err = dataset.read_record(7).unwrap_err();
            assert!(matches!(
                err,
                DatasetError::RecordOutOfRange { index: 7, count: 2 }
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::geometry::{DisplayPoint, DisplayRect, MapPoint, MapRect};
    use super::style::{Color, LayerStyle};

    #[test]
    fn point_arithmetic_is_componentwise() {
        let a = MapPoint::new(1.0, 2.0);
        let b = MapPoint::new(3.0, -4.0);
        assert_eq!(a + b, MapPoint::new(4.0, -2.0));
        assert_eq!(a - b, MapPoint::new(-2.0, 6.0));
        assert_eq!(a * b, MapPoint::new(3.0, -8.0));
        assert_eq!(b / MapPoint::new(3.0, 2.0), MapPoint::new(1.0, -2.0));
        assert_eq!(a * 2.0, MapPoint::new(2.0, 4.0));
        assert_eq!(DisplayPoint::new(7, 9) / 2, DisplayPoint::new(3, 4));
        assert_eq!(MapPoint::new(3.0, 1.5).smaller(), 1.5);
        assert_eq!(DisplayPoint::new(3, 8).larger(), 8);
    }

    #[test]
    fn rect_normalizes_corners_and_unions() {
        let rect = MapRect::from_coords(10.0, 5.0, 0.0, -5.0);
        assert_eq!(rect.min(), MapPoint::new(0.0, -5.0));
        assert_eq!(rect.max(), MapPoint::new(10.0, 5.0));
        assert_eq!(rect.center(), MapPoint::new(5.0, 0.0));
        assert_eq!(rect.x_range(), 10.0);
        assert_eq!(rect.y_range(), 10.0);

        let other = MapRect::from_coords(-3.0, 0.0, 4.0, 20.0);
        let union = rect.union(&other);
        assert_eq!(union, MapRect::from_coords(-3.0, -5.0, 10.0, 20.0));
        assert!(rect.intersects(&other));
        assert!(!rect.intersects(&MapRect::from_coords(11.0, 0.0, 12.0, 1.0)));
        assert!(union.contains_rect(&rect));
    }

    #[test]
    fn zero_rect_and_degenerate_rect_are_empty() {
        assert!(MapRect::zero().is_empty());
        let point = MapRect::from_coords(1.0, 1.0, 1.0, 1.0);
        assert!(point.is_empty());
        assert!(!MapRect::from_coords(0.0, 0.0, 1.0, 1.0).is_empty());
        assert!(DisplayRect::from_origin_size(0, 0, 0, 600).is_empty());
    }

    #[test]
    fn display_rect_center_uses_exclusive_extent() {
        let rect = DisplayRect::from_origin_size(0, 0, 800, 600);
        assert_eq!(rect.width(), 800);
        assert_eq!(rect.height(), 600);
        assert_eq!(rect.center(), DisplayPoint::new(400, 300));
    }

    #[test]
    fn hsl_conversion_matches_reference_values() {
        assert_eq!(Color::from_hsl(0, 255, 128), Color::rgb(255, 1, 1));
        assert_eq!(Color::from_hsl(120, 255, 64), Color::rgb(0, 128, 0));
        assert_eq!(Color::from_hsl(240, 0, 255), Color::WHITE);
        assert_eq!(Color::rgb(255, 16, 0).to_hex(), "#ff1000");
    }

    #[test]
    fn layer_style_is_deterministic_per_seed() {
        let a = LayerStyle::from_seed(42);
        let b = LayerStyle::from_seed(42);
        assert_eq!(a, b);
        assert_ne!(LayerStyle::from_seed(1), LayerStyle::from_seed(u128::MAX - 7));
    }
}
