use glam::DVec2;
use serde::{Deserialize, Serialize};
use shpview_core::geometry::{DisplayPoint, DisplayRect, MapPoint, MapRect};
use tracing::debug;

use crate::errors::ViewportError;

/// 缩放到范围时，目标范围占屏幕的比例。
pub const COVER: f64 = 0.9;

/// 鼠标滚轮一格的增量。
pub const WHEEL_NOTCH: f64 = 120.0;

/// 将滚轮增量换算为缩放因子：一格（120）放大 12.5%，反向滚动缩小。
#[inline]
pub fn wheel_zoom_factor(delta: i32) -> f64 {
    1.0 + f64::from(delta) / 8.0 / WHEEL_NOTCH
}

/// `zoom_to_bounds` 的结果。屏幕尺寸未知时缩放会被推迟，由调用方在下一次绘制前重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomOutcome {
    Applied,
    Deferred,
}

/// 地图空间与显示空间之间的双向变换。
///
/// 地图 y 轴向上，显示 y 轴向下：
/// `display = (map - map_origin) * (1, -1) * scale + display_origin`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    map_origin: MapPoint,
    display_origin: DisplayPoint,
    scale: f64,
    screen_rect: DisplayRect,
}

const FLIP_Y: DVec2 = DVec2::new(1.0, -1.0);

impl Viewport {
    pub fn new() -> Self {
        Self {
            map_origin: MapPoint::new(0.0, 0.0),
            display_origin: DisplayPoint::new(0, 0),
            scale: 1.0,
            screen_rect: DisplayRect::zero(),
        }
    }

    pub fn with_screen_rect(screen_rect: DisplayRect) -> Self {
        Self {
            screen_rect,
            ..Self::new()
        }
    }

    #[inline]
    pub fn map_origin(&self) -> MapPoint {
        self.map_origin
    }

    #[inline]
    pub fn display_origin(&self) -> DisplayPoint {
        self.display_origin
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn screen_rect(&self) -> DisplayRect {
        self.screen_rect
    }

    /// 每次绘制前由宿主刷新。
    #[inline]
    pub fn set_screen_rect(&mut self, screen_rect: DisplayRect) {
        self.screen_rect = screen_rect;
    }

    /// 不取整的显示坐标。
    pub fn map_to_display_f64(&self, point: MapPoint) -> DVec2 {
        (point.as_vec2() - self.map_origin.as_vec2()) * FLIP_Y * self.scale
            + self.display_origin.as_dvec2()
    }

    /// 显示坐标，四舍五入到整像素。
    pub fn map_to_display(&self, point: MapPoint) -> DisplayPoint {
        DisplayPoint::from(self.map_to_display_f64(point).round().as_ivec2())
    }

    pub fn display_to_map(&self, point: DisplayPoint) -> MapPoint {
        let map = (point.as_dvec2() - self.display_origin.as_dvec2()) / self.scale / FLIP_Y
            + self.map_origin.as_vec2();
        MapPoint::from(map)
    }

    /// 当前屏幕覆盖的地图范围：左下角与右上角分别换算回地图空间。
    pub fn map_hit_bounds(&self) -> MapRect {
        let rect = self.screen_rect;
        let bottom_left = self.display_to_map(DisplayPoint::new(rect.x_min(), rect.y_max()));
        let top_right = self.display_to_map(DisplayPoint::new(rect.x_max(), rect.y_min()));
        MapRect::new(bottom_left, top_right)
    }

    /// 使 `bounds` 居中并完整显示。
    ///
    /// 范围两个方向跨度均为零（或含非有限值）时返回错误且不修改状态；
    /// 屏幕尺寸为零时返回 [`ZoomOutcome::Deferred`]。
    pub fn zoom_to_bounds(&mut self, bounds: &MapRect) -> Result<ZoomOutcome, ViewportError> {
        let range = bounds.range();
        let finite = bounds.min().as_vec2().is_finite() && bounds.max().as_vec2().is_finite();
        if !finite || (range.x <= 0.0 && range.y <= 0.0) {
            return Err(ViewportError::DegenerateBounds {
                x_range: range.x,
                y_range: range.y,
            });
        }

        let rect = self.screen_rect;
        if rect.is_empty() {
            debug!(
                width = rect.width(),
                height = rect.height(),
                "屏幕尺寸未知，推迟缩放"
            );
            return Ok(ZoomOutcome::Deferred);
        }

        // 单方向跨度为零时该方向比例为无穷大，取较小值后自然落到另一方向。
        let fit = DVec2::new(
            f64::from(rect.width()) / range.x,
            f64::from(rect.height()) / range.y,
        );
        self.map_origin = bounds.center();
        self.display_origin = rect.center();
        self.scale = COVER * fit.min_element();
        debug!(
            scale = self.scale,
            origin_x = self.map_origin.x,
            origin_y = self.map_origin.y,
            "视口已缩放到范围"
        );
        Ok(ZoomOutcome::Applied)
    }

    /// 以光标为不动点缩放。
    pub fn zoom_at_cursor(&mut self, cursor: DisplayPoint, factor: f64) -> Result<(), ViewportError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ViewportError::InvalidZoomFactor(factor));
        }
        self.map_origin = self.display_to_map(cursor);
        self.display_origin = cursor;
        self.scale *= factor;
        Ok(())
    }

    /// 开始拖拽：把光标所在位置设为新的原点对，变换本身不变。
    pub fn translation_start(&mut self, cursor: DisplayPoint) {
        self.map_origin = self.display_to_map(cursor);
        self.display_origin = cursor;
    }

    /// 拖拽过程中让抓取点跟随光标。
    pub fn translation_processing(&mut self, cursor: DisplayPoint) {
        self.display_origin = cursor;
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}
