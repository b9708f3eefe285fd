use serde::{Deserialize, Serialize};
use shpview_core::geometry::{DisplayPoint, DisplayRect};
use shpview_core::style::Color;

/// 线型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineStyle {
    #[default]
    Solid,
    Dot,
}

/// 画笔：描边颜色、宽度与线型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pen {
    pub color: Color,
    pub width: u32,
    pub style: LineStyle,
}

impl Pen {
    pub const fn solid(color: Color) -> Self {
        Self {
            color,
            width: 1,
            style: LineStyle::Solid,
        }
    }

    pub const fn dotted(color: Color) -> Self {
        Self {
            color,
            width: 1,
            style: LineStyle::Dot,
        }
    }

    pub const fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }
}

impl Default for Pen {
    fn default() -> Self {
        Self::solid(Color::BLACK)
    }
}

/// 绘图目标。坐标均为显示空间像素，y 轴向下。
///
/// 画笔与画刷是有状态的：`save` 压栈当前状态，`restore` 弹出，
/// 调用方在修改状态前后应成对使用。
pub trait Canvas {
    fn set_pen(&mut self, pen: Pen);

    /// `None` 表示不填充。
    fn set_brush(&mut self, brush: Option<Color>);

    fn save(&mut self);

    fn restore(&mut self);

    fn draw_ellipse(&mut self, center: DisplayPoint, rx: i32, ry: i32);

    fn draw_polyline(&mut self, points: &[DisplayPoint]);

    /// 闭合多边形，首尾自动相连。
    fn draw_polygon(&mut self, points: &[DisplayPoint]);

    fn draw_line(&mut self, from: DisplayPoint, to: DisplayPoint);

    fn draw_rect(&mut self, rect: DisplayRect);

    fn draw_text(&mut self, rect: DisplayRect, text: &str);
}

/// 画笔、画刷以及 save/restore 状态栈，供各个画布实现复用。
#[derive(Debug, Clone, Default)]
pub struct PaintState {
    pub pen: Pen,
    pub brush: Option<Color>,
    stack: Vec<(Pen, Option<Color>)>,
}

impl PaintState {
    pub fn save(&mut self) {
        self.stack.push((self.pen, self.brush));
    }

    /// 栈为空时保持当前状态不变。
    pub fn restore(&mut self) {
        if let Some((pen, brush)) = self.stack.pop() {
            self.pen = pen;
            self.brush = brush;
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// 一次绘制调用及其生效时的画笔与画刷。
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Ellipse {
        center: DisplayPoint,
        rx: i32,
        ry: i32,
        pen: Pen,
        brush: Option<Color>,
    },
    Polyline {
        points: Vec<DisplayPoint>,
        pen: Pen,
    },
    Polygon {
        points: Vec<DisplayPoint>,
        pen: Pen,
        brush: Option<Color>,
    },
    Line {
        from: DisplayPoint,
        to: DisplayPoint,
        pen: Pen,
    },
    Rect {
        rect: DisplayRect,
        pen: Pen,
        brush: Option<Color>,
    },
    Text {
        rect: DisplayRect,
        text: String,
        pen: Pen,
    },
}

/// 只记录调用序列的画布，用于测试和无界面宿主。
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    state: PaintState,
    calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn state(&self) -> &PaintState {
        &self.state
    }
}

impl Canvas for RecordingCanvas {
    fn set_pen(&mut self, pen: Pen) {
        self.state.pen = pen;
    }

    fn set_brush(&mut self, brush: Option<Color>) {
        self.state.brush = brush;
    }

    fn save(&mut self) {
        self.state.save();
    }

    fn restore(&mut self) {
        self.state.restore();
    }

    fn draw_ellipse(&mut self, center: DisplayPoint, rx: i32, ry: i32) {
        self.calls.push(DrawCall::Ellipse {
            center,
            rx,
            ry,
            pen: self.state.pen,
            brush: self.state.brush,
        });
    }

    fn draw_polyline(&mut self, points: &[DisplayPoint]) {
        self.calls.push(DrawCall::Polyline {
            points: points.to_vec(),
            pen: self.state.pen,
        });
    }

    fn draw_polygon(&mut self, points: &[DisplayPoint]) {
        self.calls.push(DrawCall::Polygon {
            points: points.to_vec(),
            pen: self.state.pen,
            brush: self.state.brush,
        });
    }

    fn draw_line(&mut self, from: DisplayPoint, to: DisplayPoint) {
        self.calls.push(DrawCall::Line {
            from,
            to,
            pen: self.state.pen,
        });
    }

    fn draw_rect(&mut self, rect: DisplayRect) {
        self.calls.push(DrawCall::Rect {
            rect,
            pen: self.state.pen,
            brush: self.state.brush,
        });
    }

    fn draw_text(&mut self, rect: DisplayRect, text: &str) {
        self.calls.push(DrawCall::Text {
            rect,
            text: text.to_string(),
            pen: self.state.pen,
        });
    }
}
