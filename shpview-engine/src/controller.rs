use std::path::Path;
use std::rc::Rc;

use shpview_core::geometry::{DisplayPoint, DisplayRect, MapRect};
use tracing::{debug, info, warn};

use crate::decoration::Decoration;
use crate::document::{Document, RenderStats};
use crate::layer::{LayerFactory, LayerId, Shape};
use crate::render::Canvas;
use crate::viewport::{Viewport, WHEEL_NOTCH, ZoomOutcome, wheel_zoom_factor};

/// 视图宿主需要实现的回调。
pub trait ViewObserver {
    /// 显示内容已失效，宿主应安排重绘。
    fn on_display_invalidated(&self);

    fn on_status_text_changed(&self, text: &str);
}

/// 不做任何事的观察者，适合一次性离屏渲染。
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ViewObserver for NullObserver {
    fn on_display_invalidated(&self) {}

    fn on_status_text_changed(&self, _text: &str) {}
}

/// 组合文档、视口与观察者，处理来自界面的操作。
pub struct ViewportController {
    document: Document,
    viewport: Viewport,
    factory: LayerFactory,
    observer: Rc<dyn ViewObserver>,
    decorations: Vec<Decoration>,
    pending_zoom: Option<MapRect>,
    wheel_step: i32,
}

impl ViewportController {
    pub fn new(factory: LayerFactory, observer: Rc<dyn ViewObserver>) -> Self {
        Self {
            document: Document::new(),
            viewport: Viewport::new(),
            factory,
            observer,
            decorations: Vec::new(),
            pending_zoom: None,
            wheel_step: WHEEL_NOTCH as i32,
        }
    }

    pub fn with_decorations(mut self, decorations: Vec<Decoration>) -> Self {
        self.decorations = decorations;
        self
    }

    /// 每次滚轮缩放命令使用的增量。
    pub fn with_wheel_step(mut self, step: i32) -> Self {
        self.wheel_step = step;
        self
    }

    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[inline]
    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    pub fn set_decorations(&mut self, decorations: Vec<Decoration>) {
        self.decorations = decorations;
        self.invalidate();
    }

    #[inline]
    pub fn wheel_step(&self) -> i32 {
        self.wheel_step
    }

    #[inline]
    pub fn has_pending_zoom(&self) -> bool {
        self.pending_zoom.is_some()
    }

    /// 宿主已知画布尺寸时可提前设置，推迟的缩放会立即生效。
    pub fn set_screen_rect(&mut self, screen_rect: DisplayRect) {
        self.viewport.set_screen_rect(screen_rect);
        self.apply_pending_zoom();
    }

    /// 加载图层，第一个图层加入时自动缩放到该图层。
    pub fn add_layer(&mut self, path: &Path) -> bool {
        match self.document.add_layer(&self.factory, path) {
            Ok(id) => {
                self.after_layer_added(id);
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "图层加载失败");
                false
            }
        }
    }

    /// 批量加载，返回成功数量。
    pub fn add_layers<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .filter(|path| self.add_layer(path.as_ref()))
            .count()
    }

    /// 加入已构建好的图层（例如内存数据集）。
    pub fn add_shape(&mut self, shape: Shape) -> LayerId {
        let id = self.document.push_shape(shape);
        self.after_layer_added(id);
        id
    }

    fn after_layer_added(&mut self, id: LayerId) {
        if self.document.len() == 1 {
            if let Some(bounds) = self.document.layer(id).map(Shape::bounds) {
                self.zoom_to(bounds);
            }
        }
        self.invalidate();
    }

    pub fn remove_layer(&mut self, name: &str) -> bool {
        let Some(id) = self.document.find_by_name(name) else {
            debug!(layer = name, "要移除的图层不存在");
            return false;
        };
        let removed = self.document.remove_layer(id);
        if removed {
            self.invalidate();
        }
        removed
    }

    /// 将 `from` 移到 `before` 之前，`before` 为 `None` 时移到最顶层。
    pub fn rearrange_layer(&mut self, from: &str, before: Option<&str>) -> bool {
        let Some(from_id) = self.document.find_by_name(from) else {
            return false;
        };
        let before_id = match before {
            Some(name) => match self.document.find_by_name(name) {
                Some(id) => Some(id),
                None => return false,
            },
            None => None,
        };
        let moved = self.document.rearrange_layer(from_id, before_id);
        if moved {
            self.invalidate();
        }
        moved
    }

    pub fn raise_layer(&mut self, name: &str) -> bool {
        let raised = self
            .document
            .find_by_name(name)
            .is_some_and(|id| self.document.raise_layer(id));
        if raised {
            self.invalidate();
        }
        raised
    }

    pub fn lower_layer(&mut self, name: &str) -> bool {
        let lowered = self
            .document
            .find_by_name(name)
            .is_some_and(|id| self.document.lower_layer(id));
        if lowered {
            self.invalidate();
        }
        lowered
    }

    pub fn clear_all_layers(&mut self) {
        self.document.clear_all_layers();
        self.pending_zoom = None;
        info!("已清空全部图层");
        self.invalidate();
    }

    /// 缩放到全部图层。没有图层或范围退化时返回 `false`。
    pub fn zoom_to_all(&mut self) -> bool {
        let bounds = self.document.compute_global_bounds();
        let zoomed = self.zoom_to(bounds);
        if zoomed {
            self.invalidate();
        }
        zoomed
    }

    pub fn zoom_to_layer(&mut self, name: &str) -> bool {
        let Some(bounds) = self
            .document
            .find_by_name(name)
            .and_then(|id| self.document.layer(id))
            .map(Shape::bounds)
        else {
            return false;
        };
        let zoomed = self.zoom_to(bounds);
        if zoomed {
            self.invalidate();
        }
        zoomed
    }

    pub fn zoom_at_cursor(&mut self, cursor: DisplayPoint, factor: f64) -> bool {
        match self.viewport.zoom_at_cursor(cursor, factor) {
            Ok(()) => {
                self.invalidate();
                true
            }
            Err(err) => {
                warn!(error = %err, "忽略无效缩放");
                false
            }
        }
    }

    /// 鼠标滚轮事件。
    pub fn wheel(&mut self, cursor: DisplayPoint, delta: i32) -> bool {
        self.zoom_at_cursor(cursor, wheel_zoom_factor(delta))
    }

    pub fn translation_start(&mut self, cursor: DisplayPoint) {
        self.viewport.translation_start(cursor);
    }

    pub fn translation_processing(&mut self, cursor: DisplayPoint) {
        self.viewport.translation_processing(cursor);
        self.invalidate();
    }

    /// 绘制一帧：刷新屏幕尺寸，执行推迟的缩放，依次绘制图层与装饰元素并更新状态文本。
    pub fn render(&mut self, canvas: &mut dyn Canvas, screen_rect: DisplayRect) -> RenderStats {
        self.viewport.set_screen_rect(screen_rect);
        self.apply_pending_zoom();

        let stats = self.document.render_all(canvas, &self.viewport);
        for decoration in &self.decorations {
            decoration.draw(canvas, &self.viewport);
        }
        self.observer.on_status_text_changed(&stats.status_text());
        stats
    }

    /// 以单个图层的副本构建独立视图，初次绘制时缩放到该图层。
    pub fn isolate_layer(
        &self,
        name: &str,
        observer: Rc<dyn ViewObserver>,
    ) -> Option<ViewportController> {
        let document = self
            .document
            .find_by_name(name)
            .and_then(|id| self.document.isolate(id))?;
        let mut isolated = ViewportController::new(self.factory.clone(), observer)
            .with_decorations(self.decorations.clone())
            .with_wheel_step(self.wheel_step);
        isolated.document = document;
        isolated.zoom_to_all();
        info!(layer = name, "已创建独立图层视图");
        Some(isolated)
    }

    /// 缩放成功或被推迟时返回 `true`。
    fn zoom_to(&mut self, bounds: MapRect) -> bool {
        match self.viewport.zoom_to_bounds(&bounds) {
            Ok(ZoomOutcome::Applied) => {
                self.pending_zoom = None;
                true
            }
            Ok(ZoomOutcome::Deferred) => {
                self.pending_zoom = Some(bounds);
                true
            }
            Err(err) => {
                debug!(error = %err, "跳过缩放");
                false
            }
        }
    }

    fn apply_pending_zoom(&mut self) {
        if let Some(bounds) = self.pending_zoom {
            if self.viewport.zoom_to_bounds(&bounds) != Ok(ZoomOutcome::Deferred) {
                self.pending_zoom = None;
            }
        }
    }

    fn invalidate(&self) {
        self.observer.on_display_invalidated();
    }
}
