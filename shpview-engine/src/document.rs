use std::path::Path;

use serde::{Deserialize, Serialize};
use shpview_core::geometry::MapRect;
use tracing::{debug, info};

use crate::errors::LayerError;
use crate::layer::{LayerFactory, LayerId, Shape};
use crate::render::Canvas;
use crate::viewport::Viewport;

/// 命中率分母上的平滑项，避免零图层时除以零。
pub const EPS: f64 = 1e-4;

/// 一次绘制的记录统计。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderStats {
    pub hits: usize,
    pub total: usize,
}

impl RenderStats {
    /// 命中比例（0..=1），为预筛近似值。
    pub fn percentage(&self) -> f64 {
        self.hits as f64 / (self.total as f64 + EPS)
    }

    /// 状态栏文本。
    pub fn status_text(&self) -> String {
        format!(
            "Records Hit: {}   Records Total: {}   Percentage Hit: {:.2}%",
            self.hits,
            self.total,
            self.percentage() * 100.0
        )
    }
}

/// 有序图层集合。序列顺序即绘制顺序：索引 0 最先绘制，位于最底层。
#[derive(Debug, Clone, Default)]
pub struct Document {
    layers: Vec<(LayerId, Shape)>,
    next_id: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开并追加图层到序列末尾（最顶层）。失败时文档保持不变。
    pub fn add_layer(&mut self, factory: &LayerFactory, path: &Path) -> Result<LayerId, LayerError> {
        let shape = factory.create(path)?;
        Ok(self.push_shape(shape))
    }

    /// 追加已构建好的图层。
    pub fn push_shape(&mut self, shape: Shape) -> LayerId {
        self.next_id += 1;
        let id = LayerId::new(self.next_id);
        debug!(layer = shape.name(), id = id.get(), "图层加入文档");
        self.layers.push((id, shape));
        id
    }

    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        match self.position(id) {
            Some(index) => {
                let (_, shape) = self.layers.remove(index);
                info!(layer = shape.name(), "图层已移除");
                true
            }
            None => false,
        }
    }

    /// 将 `from` 移到 `before` 之前；`before` 为 `None` 时移到末尾。
    /// 任一引用不存在时不做修改并返回 `false`。
    pub fn rearrange_layer(&mut self, from: LayerId, before: Option<LayerId>) -> bool {
        let Some(from_index) = self.position(from) else {
            return false;
        };
        if let Some(target) = before {
            if self.position(target).is_none() {
                return false;
            }
            if target == from {
                return true;
            }
        }

        let entry = self.layers.remove(from_index);
        let insert_at = before
            .and_then(|target| self.position(target))
            .unwrap_or(self.layers.len());
        self.layers.insert(insert_at, entry);
        true
    }

    /// 在绘制栈中上移一层（序列中后移一位）。已在顶层时返回 `false`。
    pub fn raise_layer(&mut self, id: LayerId) -> bool {
        match self.position(id) {
            Some(index) if index + 1 < self.layers.len() => {
                self.layers.swap(index, index + 1);
                true
            }
            _ => false,
        }
    }

    /// 在绘制栈中下移一层。已在底层时返回 `false`。
    pub fn lower_layer(&mut self, id: LayerId) -> bool {
        match self.position(id) {
            Some(index) if index > 0 => {
                self.layers.swap(index, index - 1);
                true
            }
            _ => false,
        }
    }

    pub fn clear_all_layers(&mut self) {
        self.layers.clear();
    }

    /// 按序列顺序返回第一个同名图层。
    pub fn find_by_name(&self, name: &str) -> Option<LayerId> {
        self.layers
            .iter()
            .find(|(_, shape)| shape.name() == name)
            .map(|(id, _)| *id)
    }

    pub fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|(layer_id, _)| *layer_id == id)
    }

    pub fn layer(&self, id: LayerId) -> Option<&Shape> {
        self.layers
            .iter()
            .find(|(layer_id, _)| *layer_id == id)
            .map(|(_, shape)| shape)
    }

    /// 以绘制顺序（自底向上）遍历图层。
    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &Shape)> + '_ {
        self.layers.iter().map(|(id, shape)| (*id, shape))
    }

    /// 供列表界面使用的名称，自顶向下，即序列的逆序。
    pub fn display_names(&self) -> Vec<&str> {
        self.layers.iter().rev().map(|(_, shape)| shape.name()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// 所有图层范围的并集，没有图层时返回零矩形。
    pub fn compute_global_bounds(&self) -> MapRect {
        self.layers
            .iter()
            .map(|(_, shape)| shape.bounds())
            .reduce(|acc, bounds| acc.union(&bounds))
            .unwrap_or_else(MapRect::zero)
    }

    /// 自底向上绘制所有图层并累计统计。
    pub fn render_all(&self, canvas: &mut dyn Canvas, viewport: &Viewport) -> RenderStats {
        let mut stats = RenderStats::default();
        for (_, shape) in &self.layers {
            stats.hits += shape.draw(canvas, viewport);
            stats.total += shape.record_count();
        }
        debug!(hits = stats.hits, total = stats.total, "文档绘制完成");
        stats
    }

    /// 仅包含指定图层副本的新文档，副本与原图层共享数据集。
    pub fn isolate(&self, id: LayerId) -> Option<Document> {
        let shape = self.layer(id)?.clone();
        let mut document = Document::new();
        document.push_shape(shape);
        Some(document)
    }
}
