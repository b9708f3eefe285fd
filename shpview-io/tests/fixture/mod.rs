//! 测试用的最小 shapefile 写出工具，仅覆盖本仓库读取器需要的字段。

use std::fs;
use std::path::{Path, PathBuf};

pub const POINT: i32 = 1;
pub const POLYLINE: i32 = 3;
pub const POLYGON: i32 = 5;
pub const MULTIPOINT: i32 = 8;

/// 一条待写出的记录。
pub enum FixtureRecord {
    Null,
    Parts(Vec<Vec<(f64, f64)>>),
    /// 原样写出的记录内容，用于构造损坏记录。
    Raw(Vec<u8>),
}

pub struct ShapefileFixture {
    pub shape_type: i32,
    pub records: Vec<FixtureRecord>,
}

impl ShapefileFixture {
    pub fn new(shape_type: i32) -> Self {
        Self {
            shape_type,
            records: Vec::new(),
        }
    }

    pub fn point(mut self, x: f64, y: f64) -> Self {
        self.records.push(FixtureRecord::Parts(vec![vec![(x, y)]]));
        self
    }

    pub fn parts(mut self, parts: Vec<Vec<(f64, f64)>>) -> Self {
        self.records.push(FixtureRecord::Parts(parts));
        self
    }

    pub fn null(mut self) -> Self {
        self.records.push(FixtureRecord::Null);
        self
    }

    pub fn raw(mut self, content: Vec<u8>) -> Self {
        self.records.push(FixtureRecord::Raw(content));
        self
    }

    /// 写出 `<dir>/<name>.shp`，`with_shx` 为真时同时写出索引文件。
    pub fn write(&self, dir: &Path, name: &str, with_shx: bool) -> PathBuf {
        let mut body = Vec::new();
        let mut index = Vec::new();
        let mut all = Vec::new();

        for (i, record) in self.records.iter().enumerate() {
            let content = self.encode(record);
            if let FixtureRecord::Parts(parts) = record {
                all.extend(parts.iter().flatten().copied());
            }
            let offset_words = (100 + body.len()) / 2;
            index.extend_from_slice(&(offset_words as i32).to_be_bytes());
            index.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());

            body.extend_from_slice(&((i + 1) as i32).to_be_bytes());
            body.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
            body.extend_from_slice(&content);
        }

        let bbox = bbox_of(&all);
        let shp_path = dir.join(format!("{name}.shp"));
        let mut shp = header(self.shape_type, 100 + body.len(), bbox);
        shp.extend_from_slice(&body);
        fs::write(&shp_path, shp).expect("写出 .shp 失败");

        if with_shx {
            let mut shx = header(self.shape_type, 100 + index.len(), bbox);
            shx.extend_from_slice(&index);
            fs::write(dir.join(format!("{name}.shx")), shx).expect("写出 .shx 失败");
        }
        shp_path
    }

    fn encode(&self, record: &FixtureRecord) -> Vec<u8> {
        let mut out = Vec::new();
        let parts = match record {
            FixtureRecord::Null => {
                out.extend_from_slice(&0i32.to_le_bytes());
                return out;
            }
            FixtureRecord::Raw(content) => return content.clone(),
            FixtureRecord::Parts(parts) => parts,
        };
        out.extend_from_slice(&self.shape_type.to_le_bytes());
        let points: Vec<(f64, f64)> = parts.iter().flatten().copied().collect();
        match self.shape_type {
            POINT => {
                let (x, y) = points[0];
                out.extend_from_slice(&x.to_le_bytes());
                out.extend_from_slice(&y.to_le_bytes());
            }
            MULTIPOINT => {
                push_bbox(&mut out, bbox_of(&points));
                out.extend_from_slice(&(points.len() as i32).to_le_bytes());
                push_points(&mut out, &points);
            }
            _ => {
                push_bbox(&mut out, bbox_of(&points));
                out.extend_from_slice(&(parts.len() as i32).to_le_bytes());
                out.extend_from_slice(&(points.len() as i32).to_le_bytes());
                let mut start = 0i32;
                for part in parts {
                    out.extend_from_slice(&start.to_le_bytes());
                    start += part.len() as i32;
                }
                push_points(&mut out, &points);
            }
        }
        out
    }
}

fn header(shape_type: i32, file_len_bytes: usize, bbox: [f64; 4]) -> Vec<u8> {
    let mut out = vec![0u8; 100];
    out[0..4].copy_from_slice(&9994i32.to_be_bytes());
    out[24..28].copy_from_slice(&((file_len_bytes / 2) as i32).to_be_bytes());
    out[28..32].copy_from_slice(&1000i32.to_le_bytes());
    out[32..36].copy_from_slice(&shape_type.to_le_bytes());
    for (i, value) in bbox.iter().enumerate() {
        out[36 + i * 8..44 + i * 8].copy_from_slice(&value.to_le_bytes());
    }
    out
}

fn bbox_of(points: &[(f64, f64)]) -> [f64; 4] {
    if points.is_empty() {
        return [0.0; 4];
    }
    let mut bbox = [f64::MAX, f64::MAX, f64::MIN, f64::MIN];
    for (x, y) in points {
        bbox[0] = bbox[0].min(*x);
        bbox[1] = bbox[1].min(*y);
        bbox[2] = bbox[2].max(*x);
        bbox[3] = bbox[3].max(*y);
    }
    bbox
}

fn push_bbox(out: &mut Vec<u8>, bbox: [f64; 4]) {
    for value in bbox {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn push_points(out: &mut Vec<u8>, points: &[(f64, f64)]) {
    for (x, y) in points {
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
    }
}
