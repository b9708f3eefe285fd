use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use shpview_core::geometry::{DisplayPoint, DisplayRect};
use shpview_core::style::Color;
use shpview_engine::render::{Canvas, LineStyle, PaintState, Pen};

use crate::errors::FrontendError;

/// 把绘制调用写成 SVG 文档的画布。
#[derive(Debug, Clone)]
pub struct SvgCanvas {
    width: i32,
    height: i32,
    state: PaintState,
    body: String,
}

impl SvgCanvas {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            state: PaintState::default(),
            body: String::new(),
        }
    }

    /// 与画布尺寸一致的屏幕矩形。
    pub fn screen_rect(&self) -> DisplayRect {
        DisplayRect::from_origin_size(0, 0, self.width, self.height)
    }

    /// 生成完整的 SVG 文本。
    pub fn finish(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 256);
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        let _ = writeln!(
            out,
            r#"<rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
            self.width,
            self.height,
            Color::WHITE.to_hex()
        );
        out.push_str(&self.body);
        out.push_str("</svg>\n");
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<(), FrontendError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| FrontendError::Output {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, self.finish()).map_err(|source| FrontendError::Output {
            path: path.to_path_buf(),
            source,
        })
    }

    fn stroke(&self) -> String {
        let Pen { color, width, style } = self.state.pen;
        let mut attrs = format!(r#"stroke="{}" stroke-width="{}""#, color.to_hex(), width);
        if color.a < u8::MAX {
            let _ = write!(attrs, r#" stroke-opacity="{:.3}""#, f64::from(color.a) / 255.0);
        }
        if style == LineStyle::Dot {
            let _ = write!(attrs, r#" stroke-dasharray="{w},{gap}""#, w = width, gap = width * 2);
        }
        attrs
    }

    fn fill(&self) -> String {
        match self.state.brush {
            Some(color) if color.a < u8::MAX => format!(
                r#"fill="{}" fill-opacity="{:.3}""#,
                color.to_hex(),
                f64::from(color.a) / 255.0
            ),
            Some(color) => format!(r#"fill="{}""#, color.to_hex()),
            None => r#"fill="none""#.to_string(),
        }
    }
}

fn points_attr(points: &[DisplayPoint]) -> String {
    points
        .iter()
        .map(|point| format!("{},{}", point.x, point.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

impl Canvas for SvgCanvas {
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
        let (stroke, fill) = (self.stroke(), self.fill());
        let _ = writeln!(
            self.body,
            r#"<ellipse cx="{}" cy="{}" rx="{}" ry="{}" {stroke} {fill}/>"#,
            center.x, center.y, rx, ry
        );
    }

    fn draw_polyline(&mut self, points: &[DisplayPoint]) {
        if points.is_empty() {
            return;
        }
        let stroke = self.stroke();
        let _ = writeln!(
            self.body,
            r#"<polyline points="{}" {stroke} fill="none"/>"#,
            points_attr(points)
        );
    }

    fn draw_polygon(&mut self, points: &[DisplayPoint]) {
        if points.is_empty() {
            return;
        }
        let (stroke, fill) = (self.stroke(), self.fill());
        let _ = writeln!(
            self.body,
            r#"<polygon points="{}" {stroke} {fill}/>"#,
            points_attr(points)
        );
    }

    fn draw_line(&mut self, from: DisplayPoint, to: DisplayPoint) {
        let stroke = self.stroke();
        let _ = writeln!(
            self.body,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" {stroke}/>"#,
            from.x, from.y, to.x, to.y
        );
    }

    fn draw_rect(&mut self, rect: DisplayRect) {
        let (stroke, fill) = (self.stroke(), self.fill());
        let _ = writeln!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" {stroke} {fill}/>"#,
            rect.x_min(),
            rect.y_min(),
            rect.width(),
            rect.height()
        );
    }

    fn draw_text(&mut self, rect: DisplayRect, text: &str) {
        let color = self.state.pen.color.to_hex();
        let _ = writeln!(
            self.body,
            r#"<text x="{}" y="{}" fill="{color}" font-size="12" dominant-baseline="middle">{}</text>"#,
            rect.x_min(),
            rect.y_min() + rect.height() / 2,
            escape(text)
        );
    }
}
