//! 线段 / 多段线

use super::{break_polyline, side_of, stroke_drawables, transform_points};
use crate::content::{Content, ContentKind, LineContent};
use crate::fields::{delete_stroke_ref_id, stroke_ref_ids, update_stroke_ref_id};
use crate::geometry::{
    check_finite_points, nearest_on_lines, offset_polyline, polyline_segments, Geometries,
    GeometryError,
};
use crate::math::{points_equal, Point2, Transform, EPSILON};
use crate::model::{Capabilities, Model, ModelContext};
use crate::refs::RefId;
use crate::render::Drawable;
use crate::validation::{check_points, check_stroke_fields, ValidationError, ValidationResult};
use std::collections::HashSet;

pub struct LineModel;

fn line_of(content: &Content) -> Option<&LineContent> {
    match &content.kind {
        ContentKind::Line(line) => Some(line),
        _ => None,
    }
}

fn line_of_mut(content: &mut Content) -> Option<&mut LineContent> {
    match &mut content.kind {
        ContentKind::Line(line) => Some(line),
        _ => None,
    }
}

/// 保留原内容的公共字段和线型，替换点列
fn with_points(content: &Content, line: &LineContent, points: Vec<Point2>) -> Content {
    let mut result = content.clone();
    result.kind = ContentKind::Line(LineContent {
        points,
        stroke: line.stroke.clone(),
    });
    result
}

impl Model for LineModel {
    fn type_name(&self) -> &'static str {
        "line"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STROKE
            | Capabilities::MOVE
            | Capabilities::ROTATE
            | Capabilities::SCALE
            | Capabilities::SKEW
            | Capabilities::MIRROR
            | Capabilities::EXPLODE
            | Capabilities::BREAK
            | Capabilities::OFFSET
            | Capabilities::JOIN
            | Capabilities::REVERSE
    }

    fn is_valid(&self, content: &Content) -> ValidationResult {
        let line = line_of(content).ok_or_else(|| ValidationError::new(["type"], "line"))?;
        check_points(&line.points, 2, "points")?;
        check_stroke_fields(&line.stroke)
    }

    fn get_ref_ids(&self, content: &Content) -> Vec<RefId> {
        line_of(content).map(|l| stroke_ref_ids(&l.stroke)).unwrap_or_default()
    }

    fn update_ref_id(&self, content: &mut Content, update: &dyn Fn(usize) -> Option<usize>) -> bool {
        line_of_mut(content).is_some_and(|l| update_stroke_ref_id(&mut l.stroke, update))
    }

    fn delete_ref_id(&self, content: &mut Content, ids: &HashSet<usize>) -> bool {
        line_of_mut(content).is_some_and(|l| delete_stroke_ref_id(&mut l.stroke, ids))
    }

    fn transform(&self, content: &mut Content, transform: &Transform) -> bool {
        let Some(line) = line_of_mut(content) else {
            return false;
        };
        transform_points(&mut line.points, transform);
        true
    }

    /// 多段线拆成独立线段
    fn explode(&self, content: &Content, _ctx: &ModelContext) -> Option<Vec<Content>> {
        let line = line_of(content)?;
        if line.points.len() <= 2 {
            return None;
        }
        Some(
            line.points
                .windows(2)
                .map(|w| with_points(content, line, w.to_vec()))
                .collect(),
        )
    }

    fn break_at(&self, content: &Content, points: &[Point2], _ctx: &ModelContext) -> Option<Vec<Content>> {
        let line = line_of(content)?;
        let pieces = break_polyline(&line.points, points, false)?;
        Some(
            pieces
                .into_iter()
                .map(|piece| with_points(content, line, piece))
                .collect(),
        )
    }

    fn offset(&self, content: &Content, point: Point2, distance: f64, _ctx: &ModelContext) -> Option<Content> {
        let line = line_of(content)?;
        if distance.abs() < EPSILON {
            return None;
        }
        let segments = polyline_segments(&line.points, false);
        let (param, _, _) = nearest_on_lines(&segments, &point)?;
        let index = (param.floor() as usize).min(segments.len() - 1);
        let segment = &segments[index];
        let side = side_of(segment.start_point(), segment.end_point(), point);
        if side.abs() < EPSILON {
            return None;
        }
        let signed = if side > 0.0 { distance } else { -distance };
        Some(with_points(content, line, offset_polyline(&line.points, signed, false)))
    }

    /// 首尾相接的两条线合并为一条
    fn join(&self, content: &Content, target: &Content, _ctx: &ModelContext) -> Option<Content> {
        let a = line_of(content)?;
        let b = line_of(target)?;
        let (a_start, a_end) = (*a.points.first()?, *a.points.last()?);
        let (b_start, b_end) = (*b.points.first()?, *b.points.last()?);

        let joined: Vec<Point2> = if points_equal(&a_end, &b_start, EPSILON) {
            a.points.iter().chain(b.points.iter().skip(1)).copied().collect()
        } else if points_equal(&a_end, &b_end, EPSILON) {
            a.points.iter().chain(b.points.iter().rev().skip(1)).copied().collect()
        } else if points_equal(&a_start, &b_end, EPSILON) {
            b.points.iter().chain(a.points.iter().skip(1)).copied().collect()
        } else if points_equal(&a_start, &b_start, EPSILON) {
            b.points.iter().rev().chain(a.points.iter().skip(1)).copied().collect()
        } else {
            return None;
        };
        Some(with_points(content, a, joined))
    }

    fn reverse(&self, content: &Content) -> Option<Content> {
        let line = line_of(content)?;
        Some(with_points(content, line, line.points.iter().rev().copied().collect()))
    }

    fn get_geometries(&self, content: &Content, ctx: &ModelContext) -> Result<Geometries, GeometryError> {
        let line = line_of(content).ok_or(GeometryError::Degenerate("not a line"))?;
        check_finite_points(&line.points)?;
        let stroke = ctx.stroke_options(&line.stroke);
        Ok(Geometries::from_polyline(&line.points, false, Some(&stroke.dash_array)))
    }

    fn get_edit_points(&self, content: &Content, _ctx: &ModelContext) -> Vec<Point2> {
        line_of(content).map(|l| l.points.clone()).unwrap_or_default()
    }

    fn update_edit_point(&self, content: &mut Content, index: usize, to: Point2) -> bool {
        match line_of_mut(content).and_then(|l| l.points.get_mut(index)) {
            Some(point) => {
                *point = to;
                true
            }
            None => false,
        }
    }

    fn render(&self, content: &Content, geometries: &Geometries, ctx: &ModelContext) -> Vec<Drawable> {
        match line_of(content) {
            Some(line) => stroke_drawables(geometries, &ctx.stroke_options(&line.stroke)),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{content_array, ContentArray};
    use crate::kernel::Kernel;

    fn polyline(points: &[(f64, f64)]) -> Content {
        Content::from(LineContent::new(points.iter().map(|(x, y)| Point2::new(*x, *y)).collect()))
    }

    #[test]
    fn test_explode_polyline() {
        let kernel = Kernel::default();
        let contents: ContentArray = Vec::new();
        let ctx = kernel.context(&contents);
        let content = polyline(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let parts = LineModel.explode(&content, &ctx).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(LineModel.explode(&polyline(&[(0.0, 0.0), (1.0, 0.0)]), &ctx).is_none());
    }

    #[test]
    fn test_offset_side() {
        let kernel = Kernel::default();
        let contents: ContentArray = Vec::new();
        let ctx = kernel.context(&contents);
        let content = polyline(&[(0.0, 0.0), (10.0, 0.0)]);

        let above = LineModel.offset(&content, Point2::new(5.0, 3.0), 2.0, &ctx).unwrap();
        assert_eq!(line_of(&above).unwrap().points[0], Point2::new(0.0, 2.0));
        let below = LineModel.offset(&content, Point2::new(5.0, -3.0), 2.0, &ctx).unwrap();
        assert_eq!(line_of(&below).unwrap().points[1], Point2::new(10.0, -2.0));
    }

    #[test]
    fn test_join() {
        let kernel = Kernel::default();
        let contents: ContentArray = Vec::new();
        let ctx = kernel.context(&contents);
        let a = polyline(&[(0.0, 0.0), (1.0, 0.0)]);
        let b = polyline(&[(2.0, 0.0), (1.0, 0.0)]);
        let joined = LineModel.join(&a, &b, &ctx).unwrap();
        assert_eq!(
            line_of(&joined).unwrap().points,
            vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)]
        );
        let far = polyline(&[(5.0, 5.0), (6.0, 6.0)]);
        assert!(LineModel.join(&a, &far, &ctx).is_none());
    }

    #[test]
    fn test_reverse_and_edit_point() {
        let mut content = polyline(&[(0.0, 0.0), (1.0, 0.0)]);
        let reversed = LineModel.reverse(&content).unwrap();
        assert_eq!(line_of(&reversed).unwrap().points[0], Point2::new(1.0, 0.0));

        assert!(LineModel.update_edit_point(&mut content, 1, Point2::new(3.0, 3.0)));
        assert!(!LineModel.update_edit_point(&mut content, 5, Point2::origin()));
        assert_eq!(line_of(&content).unwrap().points[1], Point2::new(3.0, 3.0));
    }

    #[test]
    fn test_dashed_render() {
        let kernel = Kernel::default();
        let mut line = LineContent::new(vec![Point2::origin(), Point2::new(10.0, 0.0)]);
        line.stroke.dash_array = Some(vec![2.0, 3.0]);
        let contents = content_array([Content::from(line)]);
        let content = contents[0].clone().unwrap();
        assert_eq!(kernel.render(&content, &contents).len(), 2);
    }
}
