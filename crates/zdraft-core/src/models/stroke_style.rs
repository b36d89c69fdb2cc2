//! 线型样式
//!
//! 线型样式以一个带样例线的矩形显示在图纸上，其他内容通过 `strokeStyleId` 引用它。

use crate::content::{Content, ContentKind, StrokeStyleContent};
use crate::fields::StrokeOptions;
use crate::geometry::{dash_polyline, polyline_segments, Geometries, GeometryError, Region};
use crate::math::{BoundingBox2, Point2, Transform};
use crate::model::{Capabilities, Model, ModelContext};
use crate::render::Drawable;
use crate::validation::{
    check_finite, check_positive, check_stroke_fields, ValidationError, ValidationResult,
};

pub struct StrokeStyleModel;

/// 样例线距左右边框的比例
const SAMPLE_MARGIN: f64 = 0.1;

fn style_of(content: &Content) -> Option<&StrokeStyleContent> {
    match &content.kind {
        ContentKind::StrokeStyle(style) => Some(style),
        _ => None,
    }
}

fn style_of_mut(content: &mut Content) -> Option<&mut StrokeStyleContent> {
    match &mut content.kind {
        ContentKind::StrokeStyle(style) => Some(style),
        _ => None,
    }
}

fn frame(style: &StrokeStyleContent) -> BoundingBox2 {
    BoundingBox2::new(
        Point2::new(style.x, style.y),
        Point2::new(style.x + style.width, style.y + style.height),
    )
}

/// 矩形中线上的样例线段
fn sample_line(style: &StrokeStyleContent) -> [Point2; 2] {
    let margin = style.width * SAMPLE_MARGIN;
    let y = style.y + style.height / 2.0;
    [
        Point2::new(style.x + margin, y),
        Point2::new(style.x + style.width - margin, y),
    ]
}

/// 样式自身的线型，不经过引用解析
fn own_stroke(style: &StrokeStyleContent, ctx: &ModelContext) -> StrokeOptions {
    let config = ctx.config();
    StrokeOptions {
        color: style.stroke.stroke_color.unwrap_or(config.default_stroke_color),
        width: style.stroke.stroke_width.unwrap_or(config.default_stroke_width),
        dash_array: style.stroke.dash_array.clone().unwrap_or_default(),
    }
}

impl Model for StrokeStyleModel {
    fn type_name(&self) -> &'static str {
        "stroke style"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STROKE | Capabilities::MOVE
    }

    fn is_valid(&self, content: &Content) -> ValidationResult {
        let style = style_of(content).ok_or_else(|| ValidationError::new(["type"], "stroke style"))?;
        check_finite(style.x, "x")?;
        check_finite(style.y, "y")?;
        check_positive(style.width, "width")?;
        check_positive(style.height, "height")?;
        if style.stroke.stroke_style_id.is_some() {
            return Err(ValidationError::new(["strokeStyleId"], "none"));
        }
        check_stroke_fields(&style.stroke)
    }

    /// 只支持平移
    fn transform(&self, content: &mut Content, transform: &Transform) -> bool {
        let Transform::Move(offset) = transform else {
            return false;
        };
        let Some(style) = style_of_mut(content) else {
            return false;
        };
        style.x += offset.x;
        style.y += offset.y;
        true
    }

    fn get_geometries(&self, content: &Content, ctx: &ModelContext) -> Result<Geometries, GeometryError> {
        let style = style_of(content).ok_or(GeometryError::Degenerate("not a stroke style"))?;
        if !(style.x.is_finite() && style.y.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        let bbox = frame(style);
        let corners = bbox.corners().to_vec();
        let mut outline = corners.clone();
        outline.push(corners[0]);

        let mut rendering_lines = vec![outline];
        rendering_lines.extend(dash_polyline(&sample_line(style), &own_stroke(style, ctx).dash_array));
        Ok(Geometries {
            lines: polyline_segments(&corners, true),
            bounding: Some(bbox),
            regions: vec![Region {
                points: corners,
                holes: Vec::new(),
            }],
            rendering_lines,
        })
    }

    fn get_edit_points(&self, content: &Content, _ctx: &ModelContext) -> Vec<Point2> {
        style_of(content)
            .map(|s| vec![Point2::new(s.x, s.y)])
            .unwrap_or_default()
    }

    /// 边框用默认线型，样例线用样式自身线型
    fn render(&self, content: &Content, geometries: &Geometries, ctx: &ModelContext) -> Vec<Drawable> {
        let Some(style) = style_of(content) else {
            return Vec::new();
        };
        let config = ctx.config();
        let frame_stroke = StrokeOptions {
            color: config.default_stroke_color,
            width: config.default_stroke_width,
            dash_array: Vec::new(),
        };
        let sample_stroke = own_stroke(style, ctx);
        geometries
            .rendering_lines
            .iter()
            .enumerate()
            .map(|(i, points)| Drawable::Polyline {
                points: points.clone(),
                stroke: if i == 0 { frame_stroke.clone() } else { sample_stroke.clone() },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::content_array;
    use crate::fields::StrokeFields;
    use crate::kernel::Kernel;
    use crate::math::Vector2;
    use crate::refs::ContentRef;

    fn style(dash_array: Option<Vec<f64>>) -> StrokeStyleContent {
        StrokeStyleContent {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 20.0,
            stroke: StrokeFields {
                stroke_width: Some(3.0),
                dash_array,
                ..Default::default()
            },
            is_current: false,
        }
    }

    #[test]
    fn test_sample_line_is_dashed() {
        let kernel = Kernel::default();
        let contents = content_array([Content::from(style(Some(vec![10.0, 10.0])))]);
        let content = contents[0].clone().unwrap();
        let geometries = kernel.get_geometries(&content, &contents);
        // 边框 + 80 长样例线按 10/10 打断为 4 段
        assert_eq!(geometries.rendering_lines.len(), 5);

        let drawables = kernel.render(&content, &contents);
        match &drawables[1] {
            Drawable::Polyline { stroke, .. } => assert_eq!(stroke.width, 3.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_only_move() {
        let mut content = Content::from(style(None));
        assert!(StrokeStyleModel.transform(&mut content, &Transform::Move(Vector2::new(5.0, 1.0))));
        assert_eq!(style_of(&content).unwrap().x, 5.0);
        let rotate = Transform::Rotate {
            center: Point2::origin(),
            angle: 1.0,
        };
        assert!(!StrokeStyleModel.transform(&mut content, &rotate));
    }

    #[test]
    fn test_validate() {
        let mut invalid = style(None);
        invalid.height = 0.0;
        let err = StrokeStyleModel.is_valid(&Content::from(invalid)).unwrap_err();
        assert_eq!(err.path, vec!["height".into()]);

        let mut nested = style(None);
        nested.stroke.stroke_style_id = Some(ContentRef::Id(0));
        assert!(StrokeStyleModel.is_valid(&Content::from(nested)).is_err());
    }
}
