//! 对齐线性标注
//!
//! 两个测量点可以通过位置引用绑定到其他内容上的特征点，
//! 被绑定内容改变时标注随之更新；引用失效时退回保存的 `p1` / `p2`。

use crate::content::{Content, ContentKind, LinearDimensionContent, PositionRef};
use crate::fields::{
    delete_optional_ref, delete_stroke_ref_id, stroke_ref_ids, text_size, update_optional_ref,
    update_stroke_ref_id,
};
use crate::geometry::{check_finite_points, polyline_segments, Geometries, GeometryError};
use crate::math::{BoundingBox2, Point2, Transform, Vector2, EPSILON};
use crate::model::{Capabilities, Model, ModelContext};
use crate::refs::RefId;
use crate::render::Drawable;
use crate::snap::{SnapPoint, SnapType};
use crate::validation::{check_point, check_stroke_fields, check_text_fields, ValidationError, ValidationResult};
use std::collections::HashSet;

pub struct LinearDimensionModel;

/// 尺寸界线超出标注线的长度
const EXTENSION_OVERSHOOT: f64 = 2.0;
/// 箭头长度
const ARROW_SIZE: f64 = 3.0;

fn dimension_of(content: &Content) -> Option<&LinearDimensionContent> {
    match &content.kind {
        ContentKind::LinearDimension(dimension) => Some(dimension),
        _ => None,
    }
}

fn dimension_of_mut(content: &mut Content) -> Option<&mut LinearDimensionContent> {
    match &mut content.kind {
        ContentKind::LinearDimension(dimension) => Some(dimension),
        _ => None,
    }
}

/// 实际测量点：位置引用优先，其次保存的点
fn measured_points(dimension: &LinearDimensionContent, ctx: &ModelContext) -> (Point2, Point2) {
    let at = |r: &Option<PositionRef>, fallback: Point2| {
        r.as_ref()
            .and_then(|r| ctx.resolve_position(r))
            .unwrap_or(fallback)
    };
    (at(&dimension.ref1, dimension.p1), at(&dimension.ref2, dimension.p2))
}

/// 标注布局
struct Layout {
    /// 标注线两端
    a: Point2,
    b: Point2,
    p1: Point2,
    p2: Point2,
    perp: Vector2,
    dir: Vector2,
    text: String,
    /// 文字中心
    text_position: Point2,
}

fn layout(p1: Point2, p2: Point2, position: Point2, text_height: f64) -> Result<Layout, GeometryError> {
    check_finite_points(&[p1, p2, position])?;
    let delta = p2 - p1;
    let length = delta.norm();
    if length < EPSILON {
        return Err(GeometryError::Degenerate("dimension points coincide"));
    }
    let dir = delta / length;
    let perp = Vector2::new(-dir.y, dir.x);
    let dist = (position - p1).dot(&perp);
    let sign = if dist.abs() < EPSILON { 1.0 } else { dist.signum() };

    let a = p1 + perp * dist;
    let b = p2 + perp * dist;
    Ok(Layout {
        a,
        b,
        p1,
        p2,
        perp: perp * sign,
        dir,
        text: format!("{:.2}", length),
        text_position: p1 + delta * 0.5 + perp * (dist + sign * text_height * 0.8),
    })
}

impl Layout {
    /// 尺寸界线：从测量点延伸到标注线外侧
    fn extension_lines(&self) -> [[Point2; 2]; 2] {
        let overshoot = self.perp * EXTENSION_OVERSHOOT;
        [[self.p1, self.a + overshoot], [self.p2, self.b + overshoot]]
    }

    /// 两端的箭头折线，尖端在标注线端点上
    fn arrows(&self) -> [Vec<Point2>; 2] {
        let wing = self.perp * (ARROW_SIZE / 3.0);
        let back = self.dir * ARROW_SIZE;
        [
            vec![self.a + back + wing, self.a, self.a + back - wing],
            vec![self.b - back + wing, self.b, self.b - back - wing],
        ]
    }

    fn text_box(&self, font_size: f64) -> BoundingBox2 {
        let (width, height) = text_size(&self.text, font_size);
        let half = Vector2::new(width / 2.0, height / 2.0);
        BoundingBox2::new(self.text_position - half, self.text_position + half)
    }
}

fn layout_of(dimension: &LinearDimensionContent, ctx: &ModelContext) -> Result<(Layout, f64), GeometryError> {
    let (p1, p2) = measured_points(dimension, ctx);
    let font_size = ctx.text_options(&dimension.font).font_size;
    Ok((layout(p1, p2, dimension.position, font_size)?, font_size))
}

fn update_position_ref(slot: &mut Option<PositionRef>, update: &dyn Fn(usize) -> Option<usize>) -> bool {
    let Some(position) = slot else {
        return false;
    };
    let mut id = Some(position.id.clone());
    let changed = update_optional_ref(&mut id, update);
    if let Some(id) = id {
        position.id = id;
    }
    changed
}

fn delete_position_ref(slot: &mut Option<PositionRef>, ids: &HashSet<usize>) -> bool {
    let mut id = slot.as_ref().map(|p| p.id.clone());
    if delete_optional_ref(&mut id, ids) {
        *slot = None;
        return true;
    }
    false
}

impl Model for LinearDimensionModel {
    fn type_name(&self) -> &'static str {
        "linear dimension"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STROKE | Capabilities::TEXT | Capabilities::MOVE
    }

    fn is_valid(&self, content: &Content) -> ValidationResult {
        let dimension = dimension_of(content)
            .ok_or_else(|| ValidationError::new(["type"], "linear dimension"))?;
        check_point(&dimension.p1, "p1")?;
        check_point(&dimension.p2, "p2")?;
        check_point(&dimension.position, "position")?;
        check_stroke_fields(&dimension.stroke)?;
        check_text_fields(&dimension.font)
    }

    fn get_ref_ids(&self, content: &Content) -> Vec<RefId> {
        let Some(dimension) = dimension_of(content) else {
            return Vec::new();
        };
        let mut ids = stroke_ref_ids(&dimension.stroke);
        ids.extend(
            [&dimension.ref1, &dimension.ref2]
                .into_iter()
                .flatten()
                .map(|r| RefId::optional(r.id.clone())),
        );
        ids
    }

    fn update_ref_id(&self, content: &mut Content, update: &dyn Fn(usize) -> Option<usize>) -> bool {
        let Some(dimension) = dimension_of_mut(content) else {
            return false;
        };
        let stroke = update_stroke_ref_id(&mut dimension.stroke, update);
        let ref1 = update_position_ref(&mut dimension.ref1, update);
        let ref2 = update_position_ref(&mut dimension.ref2, update);
        stroke || ref1 || ref2
    }

    /// 被引用内容删除时解除绑定，保留保存的测量点
    fn delete_ref_id(&self, content: &mut Content, ids: &HashSet<usize>) -> bool {
        let Some(dimension) = dimension_of_mut(content) else {
            return false;
        };
        let stroke = delete_stroke_ref_id(&mut dimension.stroke, ids);
        let ref1 = delete_position_ref(&mut dimension.ref1, ids);
        let ref2 = delete_position_ref(&mut dimension.ref2, ids);
        stroke || ref1 || ref2
    }

    /// 只支持平移；平移会解除位置绑定
    fn transform(&self, content: &mut Content, transform: &Transform) -> bool {
        let Transform::Move(offset) = transform else {
            return false;
        };
        let Some(dimension) = dimension_of_mut(content) else {
            return false;
        };
        dimension.p1 += offset;
        dimension.p2 += offset;
        dimension.position += offset;
        dimension.ref1 = None;
        dimension.ref2 = None;
        true
    }

    fn get_geometries(&self, content: &Content, ctx: &ModelContext) -> Result<Geometries, GeometryError> {
        let dimension = dimension_of(content).ok_or(GeometryError::Degenerate("not a dimension"))?;
        let (layout, font_size) = layout_of(dimension, ctx)?;

        let mut lines = polyline_segments(&[layout.a, layout.b], false);
        let mut rendering_lines = vec![vec![layout.a, layout.b]];
        for extension in layout.extension_lines() {
            lines.extend(polyline_segments(&extension, false));
            rendering_lines.push(extension.to_vec());
        }
        rendering_lines.extend(layout.arrows());

        let bounding = BoundingBox2::from_points(rendering_lines.iter().flatten().copied())
            .union(&layout.text_box(font_size));
        Ok(Geometries {
            lines,
            bounding: Some(bounding),
            regions: Vec::new(),
            rendering_lines,
        })
    }

    fn get_snap_points(&self, content: &Content, geometries: &Geometries, _ctx: &ModelContext) -> Vec<SnapPoint> {
        let Some(dimension) = dimension_of(content) else {
            return Vec::new();
        };
        let mut points: Vec<SnapPoint> = geometries
            .lines
            .first()
            .map(|line| {
                vec![
                    SnapPoint::new(line.start_point(), SnapType::Endpoint),
                    SnapPoint::new(line.end_point(), SnapType::Endpoint),
                ]
            })
            .unwrap_or_default();
        points.push(SnapPoint::new(dimension.position, SnapType::Endpoint));
        points
    }

    fn get_edit_points(&self, content: &Content, _ctx: &ModelContext) -> Vec<Point2> {
        dimension_of(content).map(|d| vec![d.position]).unwrap_or_default()
    }

    fn update_edit_point(&self, content: &mut Content, index: usize, to: Point2) -> bool {
        match (index, dimension_of_mut(content)) {
            (0, Some(dimension)) => {
                dimension.position = to;
                true
            }
            _ => false,
        }
    }

    fn render(&self, content: &Content, geometries: &Geometries, ctx: &ModelContext) -> Vec<Drawable> {
        let Some(dimension) = dimension_of(content) else {
            return Vec::new();
        };
        let Ok((layout, font_size)) = layout_of(dimension, ctx) else {
            return Vec::new();
        };
        let stroke = ctx.stroke_options(&dimension.stroke);
        let mut drawables: Vec<Drawable> = geometries
            .rendering_lines
            .iter()
            .map(|points| Drawable::Polyline {
                points: points.clone(),
                stroke: stroke.clone(),
            })
            .collect();

        // 文字以左下角定位
        let text_box = layout.text_box(font_size);
        drawables.push(Drawable::Text {
            position: text_box.min,
            text: layout.text,
            options: ctx.text_options(&dimension.font),
        });
        drawables
    }
}
