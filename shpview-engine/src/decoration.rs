use serde::{Deserialize, Serialize};
use shpview_core::geometry::{DisplayPoint, DisplayRect};
use shpview_core::style::Color;

use crate::render::{Canvas, Pen};
use crate::viewport::Viewport;

/// 网格单元边长为屏幕高度的 1/15。
pub const GRID_DIVISIONS: i32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridLineStyle {
    Solid,
    Dot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NorthArrowStyle {
    Flat,
    Solid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleBarStyle {
    Text,
    Graphic,
}

/// 叠加在图层之上的地图装饰元素。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decoration {
    GridLine { style: GridLineStyle },
    NorthArrow { style: NorthArrowStyle },
    ScaleBar { style: ScaleBarStyle },
}

impl Decoration {
    /// 以屏幕矩形为参照绘制，调用前后画布状态不变。
    pub fn draw(&self, canvas: &mut dyn Canvas, viewport: &Viewport) {
        let rect = viewport.screen_rect();
        canvas.save();
        match *self {
            Decoration::GridLine { style } => draw_grid(canvas, rect, style),
            Decoration::NorthArrow { style } => draw_north_arrow(canvas, rect, style),
            Decoration::ScaleBar { style } => draw_scale_bar(canvas, rect, style, viewport.scale()),
        }
        canvas.restore();
    }
}

fn draw_grid(canvas: &mut dyn Canvas, rect: DisplayRect, style: GridLineStyle) {
    let gap = rect.height() / GRID_DIVISIONS;
    if gap <= 0 {
        return;
    }
    canvas.set_pen(match style {
        GridLineStyle::Solid => Pen::solid(Color::BLACK),
        GridLineStyle::Dot => Pen::dotted(Color::BLACK),
    });
    canvas.set_brush(None);

    let rows = rect.height() / gap - 1;
    let columns = rect.width() / gap - 1;
    for row in 0..rows {
        for column in 0..columns {
            canvas.draw_rect(DisplayRect::from_origin_size(
                rect.x_min() + gap * column,
                rect.y_min() + gap * row,
                gap,
                gap,
            ));
        }
    }
}

fn draw_north_arrow(canvas: &mut dyn Canvas, rect: DisplayRect, style: NorthArrowStyle) {
    let right = rect.x_max();
    let top = rect.y_min();
    let tip = DisplayPoint::new(right - 20, top + 10);

    match style {
        NorthArrowStyle::Flat => {
            canvas.set_pen(Pen::solid(Color::BLACK).with_width(3));
            canvas.draw_line(tip, DisplayPoint::new(right - 25, top + 15));
            canvas.draw_line(tip, DisplayPoint::new(right - 15, top + 15));
            canvas.draw_line(tip, DisplayPoint::new(right - 20, top + 30));
        }
        NorthArrowStyle::Solid => {
            canvas.set_pen(Pen::solid(Color::BLACK));
            canvas.set_brush(Some(Color::BLACK));
            let notch = DisplayPoint::new(right - 20, top + 15);
            canvas.draw_polygon(&[tip, notch, DisplayPoint::new(right - 25, top + 30)]);
            canvas.draw_polygon(&[tip, notch, DisplayPoint::new(right - 15, top + 30)]);
        }
    }
}

fn draw_scale_bar(canvas: &mut dyn Canvas, rect: DisplayRect, style: ScaleBarStyle, scale: f64) {
    let right = rect.x_max();
    let bottom = rect.y_max();
    canvas.set_pen(Pen::solid(Color::BLACK));

    match style {
        ScaleBarStyle::Text => {
            let cover = DisplayRect::from_origin_size(right - 50, bottom - 25, 50, 25);
            canvas.draw_text(cover, &scale_label(scale));
        }
        ScaleBarStyle::Graphic => {
            canvas.set_brush(Some(Color::RED));
            canvas.draw_rect(DisplayRect::from_origin_size(right - 30, bottom - 10, 10, 5));
            canvas.set_brush(Some(Color::GREEN));
            canvas.draw_rect(DisplayRect::from_origin_size(right - 20, bottom - 10, 10, 5));
        }
    }
}

/// 比例尺文本 `1 : N`，N 保留两位有效数字。
pub fn scale_label(scale: f64) -> String {
    format!("1 : {}", format_significant(1.0 / scale, 2))
}

/// `%g` 风格的有效数字格式化：指数小于 -4 或不小于有效位数时使用科学计数法，
/// 并去掉末尾多余的零。
fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let digits = digits.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// 装饰元素预设。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapLayout {
    #[default]
    None,
    /// 实线网格、平面指北针、文字比例尺。
    Full,
    /// 立体指北针、图形比例尺。
    NoGridLine,
}

impl MapLayout {
    /// 按绘制顺序展开为装饰列表。
    pub fn decorations(self) -> Vec<Decoration> {
        match self {
            MapLayout::None => Vec::new(),
            MapLayout::Full => vec![
                Decoration::GridLine {
                    style: GridLineStyle::Solid,
                },
                Decoration::NorthArrow {
                    style: NorthArrowStyle::Flat,
                },
                Decoration::ScaleBar {
                    style: ScaleBarStyle::Text,
                },
            ],
            MapLayout::NoGridLine => vec![
                Decoration::NorthArrow {
                    style: NorthArrowStyle::Solid,
                },
                Decoration::ScaleBar {
                    style: ScaleBarStyle::Graphic,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use shpview_core::geometry::MapRect;

    use super::*;
    use crate::render::{DrawCall, LineStyle, RecordingCanvas};

    fn viewport() -> Viewport {
        let mut viewport = Viewport::with_screen_rect(DisplayRect::from_origin_size(0, 0, 800, 600));
        viewport
            .zoom_to_bounds(&MapRect::from_coords(0.0, 0.0, 10.0, 10.0))
            .expect("缩放");
        viewport
    }

    fn render(decoration: Decoration) -> RecordingCanvas {
        let mut canvas = RecordingCanvas::new();
        decoration.draw(&mut canvas, &viewport());
        assert_eq!(canvas.state().depth(), 0);
        canvas
    }

    #[test]
    fn grid_uses_fifteenth_of_height_cells() {
        let canvas = render(Decoration::GridLine {
            style: GridLineStyle::Dot,
        });
        let calls = canvas.calls();
        // 600 / 40 - 1 = 14 行, 800 / 40 - 1 = 19 列
        assert_eq!(calls.len(), 14 * 19);
        match &calls[20] {
            DrawCall::Rect { rect, pen, brush } => {
                assert_eq!(*rect, DisplayRect::from_origin_size(40, 40, 40, 40));
                assert_eq!(pen.style, LineStyle::Dot);
                assert_eq!(*brush, None);
            }
            other => panic!("unexpected draw call {other:?}"),
        }
    }

    #[test]
    fn grid_is_skipped_on_tiny_screens() {
        let mut canvas = RecordingCanvas::new();
        let viewport = Viewport::with_screen_rect(DisplayRect::from_origin_size(0, 0, 100, 10));
        Decoration::GridLine {
            style: GridLineStyle::Solid,
        }
        .draw(&mut canvas, &viewport);
        assert!(canvas.calls().is_empty());
    }

    #[test]
    fn north_arrow_sits_in_top_right_corner() {
        let canvas = render(Decoration::NorthArrow {
            style: NorthArrowStyle::Flat,
        });
        let calls = canvas.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|call| matches!(
            call,
            DrawCall::Line { from, pen, .. } if *from == DisplayPoint::new(780, 10) && pen.width == 3
        )));

        let canvas = render(Decoration::NorthArrow {
            style: NorthArrowStyle::Solid,
        });
        assert_eq!(canvas.calls().len(), 2);
        assert!(matches!(
            &canvas.calls()[1],
            DrawCall::Polygon { points, brush: Some(Color::BLACK), .. }
                if points[2] == DisplayPoint::new(785, 30)
        ));
    }

    #[test]
    fn text_scale_bar_prints_reciprocal_scale() {
        let canvas = render(Decoration::ScaleBar {
            style: ScaleBarStyle::Text,
        });
        assert_eq!(
            canvas.calls(),
            &[DrawCall::Text {
                rect: DisplayRect::from_origin_size(750, 575, 50, 25),
                text: "1 : 0.019".to_string(),
                pen: Pen::solid(Color::BLACK),
            }]
        );
    }

    #[test]
    fn graphic_scale_bar_draws_two_blocks() {
        let canvas = render(Decoration::ScaleBar {
            style: ScaleBarStyle::Graphic,
        });
        let brushes: Vec<Option<Color>> = canvas
            .calls()
            .iter()
            .filter_map(|call| match call {
                DrawCall::Rect { brush, .. } => Some(*brush),
                _ => None,
            })
            .collect();
        assert_eq!(brushes, vec![Some(Color::RED), Some(Color::GREEN)]);
    }

    #[test]
    fn scale_label_uses_two_significant_digits() {
        assert_eq!(scale_label(54.0), "1 : 0.019");
        assert_eq!(scale_label(0.04), "1 : 25");
        assert_eq!(scale_label(0.5), "1 : 2");
        assert_eq!(scale_label(0.001), "1 : 1e+03");
        assert_eq!(scale_label(1.0e6), "1 : 1e-06");
        assert_eq!(scale_label(0.0001234), "1 : 8.1e+03");
    }

    #[test]
    fn layouts_expand_in_draw_order() {
        assert!(MapLayout::None.decorations().is_empty());
        assert_eq!(
            MapLayout::Full.decorations(),
            vec![
                Decoration::GridLine {
                    style: GridLineStyle::Solid
                },
                Decoration::NorthArrow {
                    style: NorthArrowStyle::Flat
                },
                Decoration::ScaleBar {
                    style: ScaleBarStyle::Text
                },
            ]
        );
        assert_eq!(MapLayout::NoGridLine.decorations().len(), 2);
    }
}
