//! 渲染接口
//!
//! 模型输出与后端无关的显示列表 [`Drawable`]，
//! 由 [`render_drawable`] 回放到任意 [`RenderTarget`]。
//! 目标的输出类型（SVG 节点、绘制调用、代码字符串……）对内核不透明。

use crate::fields::{FillOptions, StrokeOptions, TextOptions};
use crate::math::{Point2, Transform};

/// 显示列表项
#[derive(Debug, Clone, PartialEq)]
pub enum Drawable {
    Polyline {
        points: Vec<Point2>,
        stroke: StrokeOptions,
    },
    Polygon {
        points: Vec<Point2>,
        stroke: Option<StrokeOptions>,
        fill: Option<FillOptions>,
    },
    /// 多条子路径（外轮廓 + 孔洞）
    Path {
        paths: Vec<Vec<Point2>>,
        stroke: Option<StrokeOptions>,
        fill: Option<FillOptions>,
    },
    Circle {
        center: Point2,
        radius: f64,
        stroke: Option<StrokeOptions>,
        fill: Option<FillOptions>,
    },
    Text {
        position: Point2,
        text: String,
        options: TextOptions,
    },
    /// 子项依次应用变换
    Group {
        children: Vec<Drawable>,
        transforms: Vec<Transform>,
    },
    Clip {
        target: Box<Drawable>,
        border: Vec<Point2>,
        reverse: bool,
    },
}

/// 渲染目标
pub trait RenderTarget {
    type Output;

    fn render_polyline(&mut self, points: &[Point2], stroke: &StrokeOptions) -> Self::Output;

    fn render_polygon(
        &mut self,
        points: &[Point2],
        stroke: Option<&StrokeOptions>,
        fill: Option<&FillOptions>,
    ) -> Self::Output;

    fn render_path(
        &mut self,
        paths: &[Vec<Point2>],
        stroke: Option<&StrokeOptions>,
        fill: Option<&FillOptions>,
    ) -> Self::Output;

    fn render_circle(
        &mut self,
        center: Point2,
        radius: f64,
        stroke: Option<&StrokeOptions>,
        fill: Option<&FillOptions>,
    ) -> Self::Output;

    fn render_text(&mut self, position: Point2, text: &str, options: &TextOptions) -> Self::Output;

    fn render_group(&mut self, children: Vec<Self::Output>, transforms: &[Transform]) -> Self::Output;

    /// 默认不支持裁剪，原样返回
    fn render_clip(&mut self, target: Self::Output, _border: &[Point2], _reverse: bool) -> Self::Output {
        target
    }
}

/// 把一个显示列表项回放到目标
pub fn render_drawable<T: RenderTarget>(target: &mut T, drawable: &Drawable) -> T::Output {
    match drawable {
        Drawable::Polyline { points, stroke } => target.render_polyline(points, stroke),
        Drawable::Polygon {
            points,
            stroke,
            fill,
        } => target.render_polygon(points, stroke.as_ref(), fill.as_ref()),
        Drawable::Path {
            paths,
            stroke,
            fill,
        } => target.render_path(paths, stroke.as_ref(), fill.as_ref()),
        Drawable::Circle {
            center,
            radius,
            stroke,
            fill,
        } => target.render_circle(*center, *radius, stroke.as_ref(), fill.as_ref()),
        Drawable::Text {
            position,
            text,
            options,
        } => target.render_text(*position, text, options),
        Drawable::Group {
            children,
            transforms,
        } => {
            let children = render_drawables(target, children);
            target.render_group(children, transforms)
        }
        Drawable::Clip {
            target: inner,
            border,
            reverse,
        } => {
            let output = render_drawable(target, inner);
            target.render_clip(output, border, *reverse)
        }
    }
}

pub fn render_drawables<T: RenderTarget>(target: &mut T, drawables: &[Drawable]) -> Vec<T::Output> {
    drawables.iter().map(|d| render_drawable(target, d)).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 输出简短文本的目标，便于断言
    pub(crate) struct TextTarget;

    impl RenderTarget for TextTarget {
        type Output = String;

        fn render_polyline(&mut self, points: &[Point2], _stroke: &StrokeOptions) -> String {
            format!("polyline({})", points.len())
        }

        fn render_polygon(
            &mut self,
            points: &[Point2],
            _stroke: Option<&StrokeOptions>,
            fill: Option<&FillOptions>,
        ) -> String {
            format!("polygon({}, filled={})", points.len(), fill.is_some())
        }

        fn render_path(
            &mut self,
            paths: &[Vec<Point2>],
            _stroke: Option<&StrokeOptions>,
            _fill: Option<&FillOptions>,
        ) -> String {
            format!("path({})", paths.len())
        }

        fn render_circle(
            &mut self,
            _center: Point2,
            radius: f64,
            _stroke: Option<&StrokeOptions>,
            _fill: Option<&FillOptions>,
        ) -> String {
            format!("circle({})", radius)
        }

        fn render_text(&mut self, _position: Point2, text: &str, _options: &TextOptions) -> String {
            format!("text({})", text)
        }

        fn render_group(&mut self, children: Vec<String>, transforms: &[Transform]) -> String {
            format!("group[{}; {}]", children.join(", "), transforms.len())
        }
    }

    #[test]
    fn test_render_nested_group() {
        let stroke = StrokeOptions {
            color: 0,
            width: 1.0,
            dash_array: Vec::new(),
        };
        let drawable = Drawable::Group {
            children: vec![
                Drawable::Polyline {
                    points: vec![Point2::origin(), Point2::new(1.0, 1.0)],
                    stroke: stroke.clone(),
                },
                Drawable::Clip {
                    target: Box::new(Drawable::Circle {
                        center: Point2::origin(),
                        radius: 2.0,
                        stroke: Some(stroke),
                        fill: None,
                    }),
                    border: vec![Point2::origin()],
                    reverse: false,
                },
            ],
            transforms: vec![Transform::Move(crate::math::Vector2::new(1.0, 0.0))],
        };
        assert_eq!(
            render_drawable(&mut TextTarget, &drawable),
            "group[polyline(2), circle(2); 1]"
        );
    }
}
