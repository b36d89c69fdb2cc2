//! 多边形

use super::{break_polyline, stroke_drawables, transform_points};
use crate::content::{Content, ContentKind, LineContent, PolygonContent};
use crate::fields::{delete_stroke_ref_id, fill_options, stroke_ref_ids, update_stroke_ref_id};
use crate::geometry::{check_finite_points, offset_polyline, polygon_contains_point, Geometries, GeometryError};
use crate::math::{Point2, Transform, EPSILON};
use crate::model::{Capabilities, Model, ModelContext};
use crate::refs::RefId;
use crate::render::Drawable;
use crate::validation::{
    check_fill_fields, check_points, check_stroke_fields, ValidationError, ValidationResult,
};
use std::collections::HashSet;

pub struct PolygonModel;

fn polygon_of(content: &Content) -> Option<&PolygonContent> {
    match &content.kind {
        ContentKind::Polygon(polygon) => Some(polygon),
        _ => None,
    }
}

fn polygon_of_mut(content: &mut Content) -> Option<&mut PolygonContent> {
    match &mut content.kind {
        ContentKind::Polygon(polygon) => Some(polygon),
        _ => None,
    }
}

/// 有向面积（逆时针为正）
fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

fn as_line(content: &Content, polygon: &PolygonContent, points: Vec<Point2>) -> Content {
    let mut line = content.clone();
    line.kind = ContentKind::Line(LineContent {
        points,
        stroke: polygon.stroke.clone(),
    });
    line
}

impl Model for PolygonModel {
    fn type_name(&self) -> &'static str {
        "polygon"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STROKE
            | Capabilities::FILL
            | Capabilities::MOVE
            | Capabilities::ROTATE
            | Capabilities::SCALE
            | Capabilities::SKEW
            | Capabilities::MIRROR
            | Capabilities::EXPLODE
            | Capabilities::BREAK
            | Capabilities::OFFSET
    }

    fn is_valid(&self, content: &Content) -> ValidationResult {
        let polygon = polygon_of(content).ok_or_else(|| ValidationError::new(["type"], "polygon"))?;
        check_points(&polygon.points, 3, "points")?;
        check_stroke_fields(&polygon.stroke)?;
        check_fill_fields(&polygon.fill)
    }

    fn get_ref_ids(&self, content: &Content) -> Vec<RefId> {
        polygon_of(content).map(|p| stroke_ref_ids(&p.stroke)).unwrap_or_default()
    }

    fn update_ref_id(&self, content: &mut Content, update: &dyn Fn(usize) -> Option<usize>) -> bool {
        polygon_of_mut(content).is_some_and(|p| update_stroke_ref_id(&mut p.stroke, update))
    }

    fn delete_ref_id(&self, content: &mut Content, ids: &HashSet<usize>) -> bool {
        polygon_of_mut(content).is_some_and(|p| delete_stroke_ref_id(&mut p.stroke, ids))
    }

    fn transform(&self, content: &mut Content, transform: &Transform) -> bool {
        let Some(polygon) = polygon_of_mut(content) else {
            return false;
        };
        transform_points(&mut polygon.points, transform);
        true
    }

    /// 每条边成为一条线段
    fn explode(&self, content: &Content, _ctx: &ModelContext) -> Option<Vec<Content>> {
        let polygon = polygon_of(content)?;
        let n = polygon.points.len();
        Some(
            (0..n)
                .map(|i| as_line(content, polygon, vec![polygon.points[i], polygon.points[(i + 1) % n]]))
                .collect(),
        )
    }

    fn break_at(&self, content: &Content, points: &[Point2], _ctx: &ModelContext) -> Option<Vec<Content>> {
        let polygon = polygon_of(content)?;
        let pieces = break_polyline(&polygon.points, points, true)?;
        Some(
            pieces
                .into_iter()
                .map(|piece| as_line(content, polygon, piece))
                .collect(),
        )
    }

    /// 点在内部时向内收缩，否则向外扩张
    fn offset(&self, content: &Content, point: Point2, distance: f64, _ctx: &ModelContext) -> Option<Content> {
        let polygon = polygon_of(content)?;
        let area = signed_area(&polygon.points);
        if area.abs() < EPSILON || distance.abs() < EPSILON {
            return None;
        }
        let inside = polygon_contains_point(&polygon.points, &point);
        let signed = if inside == (area > 0.0) { distance } else { -distance };

        let mut result = content.clone();
        if let Some(p) = polygon_of_mut(&mut result) {
            p.points = offset_polyline(&polygon.points, signed, true);
        }
        Some(result)
    }

    fn get_geometries(&self, content: &Content, ctx: &ModelContext) -> Result<Geometries, GeometryError> {
        let polygon = polygon_of(content).ok_or(GeometryError::Degenerate("not a polygon"))?;
        check_finite_points(&polygon.points)?;
        if polygon.points.len() < 3 {
            return Err(GeometryError::Degenerate("polygon needs at least 3 points"));
        }
        let stroke = ctx.stroke_options(&polygon.stroke);
        Ok(Geometries::from_polyline(&polygon.points, true, Some(&stroke.dash_array)))
    }

    fn get_edit_points(&self, content: &Content, _ctx: &ModelContext) -> Vec<Point2> {
        polygon_of(content).map(|p| p.points.clone()).unwrap_or_default()
    }

    fn update_edit_point(&self, content: &mut Content, index: usize, to: Point2) -> bool {
        match polygon_of_mut(content).and_then(|p| p.points.get_mut(index)) {
            Some(point) => {
                *point = to;
                true
            }
            None => false,
        }
    }

    fn render(&self, content: &Content, geometries: &Geometries, ctx: &ModelContext) -> Vec<Drawable> {
        let Some(polygon) = polygon_of(content) else {
            return Vec::new();
        };
        let stroke = ctx.stroke_options(&polygon.stroke);
        let fill = fill_options(&polygon.fill);
        if stroke.dash_array.is_empty() {
            return vec![Drawable::Polygon {
                points: polygon.points.clone(),
                stroke: Some(stroke),
                fill,
            }];
        }

        // 虚线轮廓单独绘制
        let mut drawables = Vec::new();
        if fill.is_some() {
            drawables.push(Drawable::Polygon {
                points: polygon.points.clone(),
                stroke: None,
                fill,
            });
        }
        drawables.extend(stroke_drawables(geometries, &stroke));
        drawables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{content_array, ContentArray};
    use crate::kernel::Kernel;

    fn square() -> Content {
        Content::from(PolygonContent::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ]))
    }

    #[test]
    fn test_geometries_closed() {
        let kernel = Kernel::default();
        let contents = content_array([square()]);
        let content = contents[0].clone().unwrap();
        let geometries = kernel.get_geometries(&content, &contents);
        assert_eq!(geometries.lines.len(), 4);
        assert_eq!(geometries.regions.len(), 1);
    }

    #[test]
    fn test_offset_inside_and_outside() {
        let kernel = Kernel::default();
        let contents: ContentArray = Vec::new();
        let ctx = kernel.context(&contents);

        let inner = PolygonModel.offset(&square(), Point2::new(5.0, 5.0), 1.0, &ctx).unwrap();
        assert!((polygon_of(&inner).unwrap().points[0] - Point2::new(1.0, 1.0)).norm() < 1e-9);

        let outer = PolygonModel.offset(&square(), Point2::new(20.0, 5.0), 1.0, &ctx).unwrap();
        assert!((polygon_of(&outer).unwrap().points[0] - Point2::new(-1.0, -1.0)).norm() < 1e-9);
    }

    #[test]
    fn test_explode_to_lines() {
        let kernel = Kernel::default();
        let contents: ContentArray = Vec::new();
        let ctx = kernel.context(&contents);
        let lines = PolygonModel.explode(&square(), &ctx).unwrap();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.type_name() == "line"));
    }

    #[test]
    fn test_render_with_fill() {
        let kernel = Kernel::default();
        let mut polygon = PolygonContent::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ]);
        polygon.fill.fill_color = Some(0x00ff00);
        let contents = content_array([Content::from(polygon)]);
        let content = contents[0].clone().unwrap();
        let drawables = kernel.render(&content, &contents);
        assert!(matches!(&drawables[..], [Drawable::Polygon { fill: Some(_), .. }]));
    }
}
