//! 圆与圆弧

use super::stroke_drawables;
use crate::content::{ArcContent, CircleContent, Content, ContentKind};
use crate::fields::{
    delete_stroke_ref_id, fill_options, stroke_ref_ids, update_stroke_ref_id, StrokeFields,
};
use crate::geometry::{
    dash_polyline, tessellate_arc, Arc, Geometries, GeometryError, GeometryLine, Region,
};
use crate::math::{normalize_angle, Point2, Transform, EPSILON};
use crate::model::{Capabilities, Model, ModelContext};
use crate::refs::RefId;
use crate::render::Drawable;
use crate::snap::{default_snap_points, SnapPoint, SnapType};
use crate::validation::{
    check_finite, check_fill_fields, check_positive, check_stroke_fields, ValidationError,
    ValidationResult,
};
use std::collections::HashSet;
use std::f64::consts::PI;

/// 打断点距离圆周的容差
const ON_CIRCLE_TOLERANCE: f64 = 1e-6;

pub struct CircleModel;

pub struct ArcModel;

fn circle_of(content: &Content) -> Option<&CircleContent> {
    match &content.kind {
        ContentKind::Circle(circle) => Some(circle),
        _ => None,
    }
}

fn circle_of_mut(content: &mut Content) -> Option<&mut CircleContent> {
    match &mut content.kind {
        ContentKind::Circle(circle) => Some(circle),
        _ => None,
    }
}

fn arc_of(content: &Content) -> Option<&ArcContent> {
    match &content.kind {
        ContentKind::Arc(arc) => Some(arc),
        _ => None,
    }
}

fn arc_of_mut(content: &mut Content) -> Option<&mut ArcContent> {
    match &mut content.kind {
        ContentKind::Arc(arc) => Some(arc),
        _ => None,
    }
}

fn check_radius(r: f64) -> Result<(), GeometryError> {
    if r.is_finite() && r > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidRadius(r))
    }
}

/// 圆弧几何：曲线、包围盒、离散化的显示折线
fn arc_geometries(arc: Arc, closed: bool, ctx: &ModelContext, stroke: &StrokeFields) -> Geometries {
    let points = tessellate_arc(&arc, ctx.config().arc_segment_count);
    let dash = ctx.stroke_options(stroke).dash_array;
    let regions = if closed {
        vec![Region {
            points: points[..points.len().saturating_sub(1)].to_vec(),
            holes: Vec::new(),
        }]
    } else {
        Vec::new()
    };
    Geometries {
        lines: vec![GeometryLine::Arc(arc)],
        bounding: Some(arc.bounding_box()),
        regions,
        rendering_lines: dash_polyline(&points, &dash),
    }
}

/// 落在圆周上的打断点的角度（已去重）
fn angles_on_circle(center: Point2, r: f64, points: &[Point2]) -> Vec<f64> {
    let mut angles: Vec<f64> = Vec::new();
    for p in points {
        if ((p - center).norm() - r).abs() > ON_CIRCLE_TOLERANCE {
            continue;
        }
        let angle = normalize_angle((p.y - center.y).atan2(p.x - center.x));
        if !angles.iter().any(|a| (a - angle).abs() < EPSILON) {
            angles.push(angle);
        }
    }
    angles
}

/// 偏移后的半径：点在圆内时收缩
fn offset_radius(center: Point2, r: f64, point: Point2, distance: f64) -> Option<f64> {
    let d = (point - center).norm();
    let new_r = if d < r { r - distance } else { r + distance };
    (new_r > EPSILON).then_some(new_r)
}

fn arc_content(content: &Content, stroke: &StrokeFields, arc: &Arc) -> Content {
    let mut result = content.clone();
    result.kind = ContentKind::Arc(ArcContent {
        x: arc.center.x,
        y: arc.center.y,
        r: arc.radius,
        start_angle: arc.start_angle,
        end_angle: arc.end_angle,
        stroke: stroke.clone(),
    });
    result
}

fn quadrant_points(center: Point2, r: f64) -> [Point2; 4] {
    [
        Point2::new(center.x + r, center.y),
        Point2::new(center.x, center.y + r),
        Point2::new(center.x - r, center.y),
        Point2::new(center.x, center.y - r),
    ]
}

impl Model for CircleModel {
    fn type_name(&self) -> &'static str {
        "circle"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STROKE
            | Capabilities::FILL
            | Capabilities::MOVE
            | Capabilities::ROTATE
            | Capabilities::SCALE
            | Capabilities::MIRROR
            | Capabilities::BREAK
            | Capabilities::OFFSET
    }

    fn is_valid(&self, content: &Content) -> ValidationResult {
        let circle = circle_of(content).ok_or_else(|| ValidationError::new(["type"], "circle"))?;
        check_finite(circle.x, "x")?;
        check_finite(circle.y, "y")?;
        check_positive(circle.r, "r")?;
        check_stroke_fields(&circle.stroke)?;
        check_fill_fields(&circle.fill)
    }

    fn get_ref_ids(&self, content: &Content) -> Vec<RefId> {
        circle_of(content).map(|c| stroke_ref_ids(&c.stroke)).unwrap_or_default()
    }

    fn update_ref_id(&self, content: &mut Content, update: &dyn Fn(usize) -> Option<usize>) -> bool {
        circle_of_mut(content).is_some_and(|c| update_stroke_ref_id(&mut c.stroke, update))
    }

    fn delete_ref_id(&self, content: &mut Content, ids: &HashSet<usize>) -> bool {
        circle_of_mut(content).is_some_and(|c| delete_stroke_ref_id(&mut c.stroke, ids))
    }

    /// 只接受保形变换
    fn transform(&self, content: &mut Content, transform: &Transform) -> bool {
        if !transform.is_conformal() {
            return false;
        }
        let Some(circle) = circle_of_mut(content) else {
            return false;
        };
        let center = transform.apply(circle.center());
        circle.x = center.x;
        circle.y = center.y;
        circle.r *= transform.length_scale();
        true
    }

    /// 圆上至少两个打断点，得到相应数量的圆弧
    fn break_at(&self, content: &Content, points: &[Point2], _ctx: &ModelContext) -> Option<Vec<Content>> {
        let circle = circle_of(content)?;
        let mut angles = angles_on_circle(circle.center(), circle.r, points);
        if angles.len() < 2 {
            return None;
        }
        angles.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = angles.len();
        Some(
            (0..n)
                .map(|i| {
                    let end = if i + 1 < n { angles[i + 1] } else { angles[0] + 2.0 * PI };
                    let arc = Arc::new(circle.center(), circle.r, angles[i], end);
                    arc_content(content, &circle.stroke, &arc)
                })
                .collect(),
        )
    }

    fn offset(&self, content: &Content, point: Point2, distance: f64, _ctx: &ModelContext) -> Option<Content> {
        let circle = circle_of(content)?;
        let r = offset_radius(circle.center(), circle.r, point, distance)?;
        let mut result = content.clone();
        if let Some(c) = circle_of_mut(&mut result) {
            c.r = r;
        }
        Some(result)
    }

    fn get_geometries(&self, content: &Content, ctx: &ModelContext) -> Result<Geometries, GeometryError> {
        let circle = circle_of(content).ok_or(GeometryError::Degenerate("not a circle"))?;
        check_radius(circle.r)?;
        if !(circle.x.is_finite() && circle.y.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        Ok(arc_geometries(
            Arc::full_circle(circle.center(), circle.r),
            true,
            ctx,
            &circle.stroke,
        ))
    }

    fn get_snap_points(&self, content: &Content, geometries: &Geometries, _ctx: &ModelContext) -> Vec<SnapPoint> {
        let mut points = default_snap_points(geometries);
        if let Some(circle) = circle_of(content) {
            points.extend(
                quadrant_points(circle.center(), circle.r)
                    .into_iter()
                    .map(|p| SnapPoint::new(p, SnapType::Quadrant)),
            );
        }
        points
    }

    /// 圆心 + 四个象限点
    fn get_edit_points(&self, content: &Content, _ctx: &ModelContext) -> Vec<Point2> {
        let Some(circle) = circle_of(content) else {
            return Vec::new();
        };
        let mut points = vec![circle.center()];
        points.extend(quadrant_points(circle.center(), circle.r));
        points
    }

    fn update_edit_point(&self, content: &mut Content, index: usize, to: Point2) -> bool {
        let Some(circle) = circle_of_mut(content) else {
            return false;
        };
        match index {
            0 => {
                circle.x = to.x;
                circle.y = to.y;
            }
            1..=4 => {
                let r = (to - circle.center()).norm();
                if r < EPSILON {
                    return false;
                }
                circle.r = r;
            }
            _ => return false,
        }
        true
    }

    fn render(&self, content: &Content, geometries: &Geometries, ctx: &ModelContext) -> Vec<Drawable> {
        let Some(circle) = circle_of(content) else {
            return Vec::new();
        };
        let stroke = ctx.stroke_options(&circle.stroke);
        let fill = fill_options(&circle.fill);
        if stroke.dash_array.is_empty() {
            return vec![Drawable::Circle {
                center: circle.center(),
                radius: circle.r,
                stroke: Some(stroke),
                fill,
            }];
        }
        let mut drawables = Vec::new();
        if fill.is_some() {
            drawables.push(Drawable::Circle {
                center: circle.center(),
                radius: circle.r,
                stroke: None,
                fill,
            });
        }
        drawables.extend(stroke_drawables(geometries, &stroke));
        drawables
    }
}

impl Model for ArcModel {
    fn type_name(&self) -> &'static str {
        "arc"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STROKE
            | Capabilities::MOVE
            | Capabilities::ROTATE
            | Capabilities::SCALE
            | Capabilities::MIRROR
            | Capabilities::BREAK
            | Capabilities::OFFSET
    }

    fn is_valid(&self, content: &Content) -> ValidationResult {
        let arc = arc_of(content).ok_or_else(|| ValidationError::new(["type"], "arc"))?;
        check_finite(arc.x, "x")?;
        check_finite(arc.y, "y")?;
        check_positive(arc.r, "r")?;
        check_finite(arc.start_angle, "startAngle")?;
        check_finite(arc.end_angle, "endAngle")?;
        check_stroke_fields(&arc.stroke)
    }

    fn get_ref_ids(&self, content: &Content) -> Vec<RefId> {
        arc_of(content).map(|a| stroke_ref_ids(&a.stroke)).unwrap_or_default()
    }

    fn update_ref_id(&self, content: &mut Content, update: &dyn Fn(usize) -> Option<usize>) -> bool {
        arc_of_mut(content).is_some_and(|a| update_stroke_ref_id(&mut a.stroke, update))
    }

    fn delete_ref_id(&self, content: &mut Content, ids: &HashSet<usize>) -> bool {
        arc_of_mut(content).is_some_and(|a| delete_stroke_ref_id(&mut a.stroke, ids))
    }

    fn transform(&self, content: &mut Content, transform: &Transform) -> bool {
        if !transform.is_conformal() {
            return false;
        }
        let Some(arc) = arc_of_mut(content) else {
            return false;
        };
        let line = GeometryLine::Arc(Arc::new(arc.center(), arc.r, arc.start_angle, arc.end_angle));
        let GeometryLine::Arc(moved) = line.transformed(transform) else {
            return false;
        };
        arc.x = moved.center.x;
        arc.y = moved.center.y;
        arc.r = moved.radius;
        arc.start_angle = moved.start_angle;
        arc.end_angle = moved.end_angle;
        true
    }

    /// 在弧内部的打断点处拆成多段圆弧
    fn break_at(&self, content: &Content, points: &[Point2], _ctx: &ModelContext) -> Option<Vec<Content>> {
        let content_arc = arc_of(content)?;
        let arc = Arc::new(
            content_arc.center(),
            content_arc.r,
            content_arc.start_angle,
            content_arc.end_angle,
        );
        let mut params: Vec<f64> = angles_on_circle(arc.center, arc.radius, points)
            .into_iter()
            .filter(|angle| arc.contains_angle(*angle))
            .map(|angle| arc.angle_param(angle))
            .filter(|t| *t > EPSILON && *t < 1.0 - EPSILON)
            .collect();
        if params.is_empty() {
            return None;
        }
        params.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let sweep = arc.sweep_angle();
        let mut bounds = vec![0.0];
        bounds.extend(params);
        bounds.push(1.0);
        Some(
            bounds
                .windows(2)
                .map(|w| {
                    let piece = Arc::new(
                        arc.center,
                        arc.radius,
                        arc.start_angle + sweep * w[0],
                        arc.start_angle + sweep * w[1],
                    );
                    arc_content(content, &content_arc.stroke, &piece)
                })
                .collect(),
        )
    }

    fn offset(&self, content: &Content, point: Point2, distance: f64, _ctx: &ModelContext) -> Option<Content> {
        let arc = arc_of(content)?;
        let r = offset_radius(arc.center(), arc.r, point, distance)?;
        let mut result = content.clone();
        if let Some(a) = arc_of_mut(&mut result) {
            a.r = r;
        }
        Some(result)
    }

    fn get_geometries(&self, content: &Content, ctx: &ModelContext) -> Result<Geometries, GeometryError> {
        let arc = arc_of(content).ok_or(GeometryError::Degenerate("not an arc"))?;
        check_radius(arc.r)?;
        if ![arc.x, arc.y, arc.start_angle, arc.end_angle]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(GeometryError::NonFinite);
        }
        Ok(arc_geometries(
            Arc::new(arc.center(), arc.r, arc.start_angle, arc.end_angle),
            false,
            ctx,
            &arc.stroke,
        ))
    }

    /// 圆心、起点、终点
    fn get_edit_points(&self, content: &Content, _ctx: &ModelContext) -> Vec<Point2> {
        let Some(arc) = arc_of(content) else {
            return Vec::new();
        };
        let geometry = Arc::new(arc.center(), arc.r, arc.start_angle, arc.end_angle);
        vec![arc.center(), geometry.start_point(), geometry.end_point()]
    }

    fn update_edit_point(&self, content: &mut Content, index: usize, to: Point2) -> bool {
        let Some(arc) = arc_of_mut(content) else {
            return false;
        };
        let angle = (to.y - arc.y).atan2(to.x - arc.x);
        match index {
            0 => {
                arc.x = to.x;
                arc.y = to.y;
            }
            1 => arc.start_angle = angle,
            2 => arc.end_angle = angle,
            _ => return false,
        }
        true
    }

    fn render(&self, content: &Content, geometries: &Geometries, ctx: &ModelContext) -> Vec<Drawable> {
        match arc_of(content) {
            Some(arc) => stroke_drawables(geometries, &ctx.stroke_options(&arc.stroke)),
            None => Vec::new(),
        }
    }
}
