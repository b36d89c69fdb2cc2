//! 单行文本

use crate::content::{Content, ContentKind, TextContent};
use crate::fields::text_size;
use crate::geometry::{polyline_segments, Geometries, GeometryError, Region};
use crate::math::{BoundingBox2, Point2, Transform};
use crate::model::{Capabilities, Model, ModelContext};
use crate::render::Drawable;
use crate::snap::{SnapPoint, SnapType};
use crate::validation::{check_finite, check_text_fields, ValidationError, ValidationResult};

pub struct TextModel;

fn text_of(content: &Content) -> Option<&TextContent> {
    match &content.kind {
        ContentKind::Text(text) => Some(text),
        _ => None,
    }
}

fn text_of_mut(content: &mut Content) -> Option<&mut TextContent> {
    match &mut content.kind {
        ContentKind::Text(text) => Some(text),
        _ => None,
    }
}

impl Model for TextModel {
    fn type_name(&self) -> &'static str {
        "text"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TEXT | Capabilities::MOVE | Capabilities::ROTATE | Capabilities::SCALE
    }

    fn is_valid(&self, content: &Content) -> ValidationResult {
        let text = text_of(content).ok_or_else(|| ValidationError::new(["type"], "text"))?;
        check_finite(text.x, "x")?;
        check_finite(text.y, "y")?;
        check_text_fields(&text.font)
    }

    /// 文本没有方向，旋转只移动锚点；等比缩放同时缩放字号
    fn transform(&self, content: &mut Content, transform: &Transform) -> bool {
        if !transform.is_conformal() || transform.is_reflection() {
            return false;
        }
        let Some(text) = text_of_mut(content) else {
            return false;
        };
        let anchor = transform.apply(Point2::new(text.x, text.y));
        text.x = anchor.x;
        text.y = anchor.y;
        if let Some(size) = text.font.font_size.as_mut() {
            *size *= transform.length_scale();
        }
        true
    }

    /// 文本框（锚点为基线左端）
    fn get_geometries(&self, content: &Content, ctx: &ModelContext) -> Result<Geometries, GeometryError> {
        let text = text_of(content).ok_or(GeometryError::Degenerate("not a text"))?;
        if !(text.x.is_finite() && text.y.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        let options = ctx.text_options(&text.font);
        let (width, height) = text_size(&text.text, options.font_size);
        let bbox = BoundingBox2::new(
            Point2::new(text.x, text.y),
            Point2::new(text.x + width, text.y + height),
        );
        let corners = bbox.corners().to_vec();
        Ok(Geometries {
            lines: polyline_segments(&corners, true),
            bounding: Some(bbox),
            regions: vec![Region {
                points: corners,
                holes: Vec::new(),
            }],
            rendering_lines: Vec::new(),
        })
    }

    fn get_snap_points(&self, content: &Content, _geometries: &Geometries, _ctx: &ModelContext) -> Vec<SnapPoint> {
        text_of(content)
            .map(|t| vec![SnapPoint::new(Point2::new(t.x, t.y), SnapType::Endpoint)])
            .unwrap_or_default()
    }

    fn get_edit_points(&self, content: &Content, _ctx: &ModelContext) -> Vec<Point2> {
        text_of(content)
            .map(|t| vec![Point2::new(t.x, t.y)])
            .unwrap_or_default()
    }

    fn update_edit_point(&self, content: &mut Content, index: usize, to: Point2) -> bool {
        match (index, text_of_mut(content)) {
            (0, Some(text)) => {
                text.x = to.x;
                text.y = to.y;
                true
            }
            _ => false,
        }
    }

    fn render(&self, content: &Content, _geometries: &Geometries, ctx: &ModelContext) -> Vec<Drawable> {
        let Some(text) = text_of(content) else {
            return Vec::new();
        };
        vec![Drawable::Text {
            position: Point2::new(text.x, text.y),
            text: text.text.clone(),
            options: ctx.text_options(&text.font),
        }]
    }
}
