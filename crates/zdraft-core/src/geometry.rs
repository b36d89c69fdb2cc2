//! 几何计算提供者
//!
//! 内容模型派生几何时使用的纯函数：
//! - 基本曲线：线段 (Line)、圆弧 (Arc)
//! - 求交、最近点、参数化取点
//! - 圆弧离散化、多段线偏移、虚线打断
//!
//! 这里的数值算法对内核其余部分是透明的，只通过 [`Geometries`] 交换结果。

use crate::math::{normalize_angle, BoundingBox2, Point2, Transform, Vector2, EPSILON};
use std::f64::consts::PI;
use thiserror::Error;

/// 参数化判断的容差
const PARAM_TOLERANCE: f64 = 1e-9;

/// 几何派生错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid radius: {0}")]
    InvalidRadius(f64),

    #[error("Degenerate geometry: {0}")]
    Degenerate(&'static str),

    #[error("Non-finite coordinate")]
    NonFinite,
}

/// 检查点列坐标均为有限值
pub fn check_finite_points(points: &[Point2]) -> Result<(), GeometryError> {
    if points.iter().all(|p| p.x.is_finite() && p.y.is_finite()) {
        Ok(())
    } else {
        Err(GeometryError::NonFinite)
    }
}

/// 线段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Point2,
    pub end: Point2,
}

impl Line {
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    /// 计算线段长度
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// 计算线段中点
    pub fn midpoint(&self) -> Point2 {
        Point2::new(
            (self.start.x + self.end.x) / 2.0,
            (self.start.y + self.end.y) / 2.0,
        )
    }

    /// 参数 t ∈ [0, 1] 处的点
    pub fn point_at(&self, t: f64) -> Point2 {
        self.start + (self.end - self.start) * t
    }

    /// 点在线段上的投影参数（已截断到 [0, 1]）
    pub fn nearest_param(&self, point: &Point2) -> f64 {
        let v = self.end - self.start;
        let c2 = v.dot(&v);
        if c2 < EPSILON {
            return 0.0;
        }
        ((point - self.start).dot(&v) / c2).clamp(0.0, 1.0)
    }

    /// 计算点到线段的距离
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        (point - self.point_at(self.nearest_param(point))).norm()
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points([self.start, self.end])
    }
}

/// 圆弧（逆时针，从 start_angle 到 end_angle，弧度）
///
/// 整圆用 start_angle = 0, end_angle = 2π 表示。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl Arc {
    pub fn new(center: Point2, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        Self {
            center,
            radius,
            start_angle,
            end_angle,
        }
    }

    pub fn full_circle(center: Point2, radius: f64) -> Self {
        Self::new(center, radius, 0.0, 2.0 * PI)
    }

    /// 计算扫过的角度，范围 [0, 2π]
    pub fn sweep_angle(&self) -> f64 {
        let mut sweep = self.end_angle - self.start_angle;
        while sweep < 0.0 {
            sweep += 2.0 * PI;
        }
        while sweep > 2.0 * PI {
            sweep -= 2.0 * PI;
        }
        sweep
    }

    pub fn is_full_circle(&self) -> bool {
        (self.sweep_angle() - 2.0 * PI).abs() < PARAM_TOLERANCE
    }

    /// 计算弧长
    pub fn length(&self) -> f64 {
        self.sweep_angle() * self.radius
    }

    pub fn point_at_angle(&self, angle: f64) -> Point2 {
        Point2::new(
            self.center.x + self.radius * angle.cos(),
            self.center.y + self.radius * angle.sin(),
        )
    }

    /// 参数 t ∈ [0, 1] 处的点
    pub fn point_at(&self, t: f64) -> Point2 {
        self.point_at_angle(self.start_angle + self.sweep_angle() * t)
    }

    pub fn start_point(&self) -> Point2 {
        self.point_at_angle(self.start_angle)
    }

    pub fn end_point(&self) -> Point2 {
        self.point_at_angle(self.end_angle)
    }

    pub fn midpoint(&self) -> Point2 {
        self.point_at(0.5)
    }

    /// 检查角度是否在弧的范围内
    pub fn contains_angle(&self, angle: f64) -> bool {
        let sweep = self.sweep_angle();
        let mut d = normalize_angle(angle - self.start_angle);
        if d > 2.0 * PI - PARAM_TOLERANCE {
            d = 0.0;
        }
        d <= sweep + PARAM_TOLERANCE
    }

    /// 检查点（已知在圆上）是否落在弧的角度范围内
    pub fn contains_point(&self, point: &Point2) -> bool {
        self.contains_angle((point.y - self.center.y).atan2(point.x - self.center.x))
    }

    /// 角度对应的参数 t ∈ [0, 1]
    pub fn angle_param(&self, angle: f64) -> f64 {
        let sweep = self.sweep_angle();
        if sweep < EPSILON {
            return 0.0;
        }
        let mut d = normalize_angle(angle - self.start_angle);
        if d > 2.0 * PI - PARAM_TOLERANCE {
            d = 0.0;
        }
        (d / sweep).clamp(0.0, 1.0)
    }

    /// 点在弧上的最近参数
    pub fn nearest_param(&self, point: &Point2) -> f64 {
        let angle = (point.y - self.center.y).atan2(point.x - self.center.x);
        if self.contains_angle(angle) {
            return self.angle_param(angle);
        }
        // 角度范围外取较近的端点
        let d1 = (point - self.start_point()).norm();
        let d2 = (point - self.end_point()).norm();
        if d1 <= d2 {
            0.0
        } else {
            1.0
        }
    }

    /// 计算点到圆弧的距离
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        (point - self.point_at(self.nearest_param(point))).norm()
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        let mut bbox = BoundingBox2::from_points([self.start_point(), self.end_point()]);

        // 检查象限点
        for angle in [0.0, PI / 2.0, PI, 3.0 * PI / 2.0] {
            if self.contains_angle(angle) {
                bbox.expand_to_include(&self.point_at_angle(angle));
            }
        }

        bbox
    }
}

/// 几何线：用于求交、点选和捕捉的有序曲线段
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryLine {
    Segment(Line),
    Arc(Arc),
}

impl GeometryLine {
    pub fn segment(start: Point2, end: Point2) -> Self {
        GeometryLine::Segment(Line::new(start, end))
    }

    pub fn start_point(&self) -> Point2 {
        match self {
            GeometryLine::Segment(l) => l.start,
            GeometryLine::Arc(a) => a.start_point(),
        }
    }

    pub fn end_point(&self) -> Point2 {
        match self {
            GeometryLine::Segment(l) => l.end,
            GeometryLine::Arc(a) => a.end_point(),
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            GeometryLine::Segment(l) => l.length(),
            GeometryLine::Arc(a) => a.length(),
        }
    }

    pub fn point_at(&self, t: f64) -> Point2 {
        match self {
            GeometryLine::Segment(l) => l.point_at(t),
            GeometryLine::Arc(a) => a.point_at(t),
        }
    }

    pub fn nearest_param(&self, point: &Point2) -> f64 {
        match self {
            GeometryLine::Segment(l) => l.nearest_param(point),
            GeometryLine::Arc(a) => a.nearest_param(point),
        }
    }

    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        match self {
            GeometryLine::Segment(l) => l.distance_to_point(point),
            GeometryLine::Arc(a) => a.distance_to_point(point),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        match self {
            GeometryLine::Segment(l) => l.bounding_box(),
            GeometryLine::Arc(a) => a.bounding_box(),
        }
    }

    /// 应用仿射变换；圆弧只接受保形变换，否则退化为离散折线的首尾线段
    pub fn transformed(&self, transform: &Transform) -> GeometryLine {
        match self {
            GeometryLine::Segment(l) => {
                GeometryLine::segment(transform.apply(l.start), transform.apply(l.end))
            }
            GeometryLine::Arc(a) if transform.is_conformal() => {
                let center = transform.apply(a.center);
                let radius = a.radius * transform.length_scale();
                let (start, end) = if transform.is_reflection() {
                    (transform.apply_angle(a.end_angle), transform.apply_angle(a.start_angle))
                } else {
                    (transform.apply_angle(a.start_angle), transform.apply_angle(a.end_angle))
                };
                // 保持整圆的扫角不被归一化吞掉
                let end = if a.is_full_circle() { start + 2.0 * PI } else { end };
                GeometryLine::Arc(Arc::new(center, radius, start, end))
            }
            GeometryLine::Arc(a) => GeometryLine::segment(
                transform.apply(a.start_point()),
                transform.apply(a.end_point()),
            ),
        }
    }
}

/// 带孔洞的封闭区域
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Region {
    pub points: Vec<Point2>,
    pub holes: Vec<Vec<Point2>>,
}

/// 内容的派生几何
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometries {
    /// 用于求交、点选、捕捉的曲线段
    pub lines: Vec<GeometryLine>,
    /// 包围盒
    pub bounding: Option<BoundingBox2>,
    /// 封闭区域（填充与点在区域内判断）
    pub regions: Vec<Region>,
    /// 显示用折线（可能已按虚线打断）
    pub rendering_lines: Vec<Vec<Point2>>,
}

impl Geometries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 由折线点构造：线段、包围盒、（闭合时）区域和显示折线
    pub fn from_polyline(points: &[Point2], closed: bool, dash_array: Option<&[f64]>) -> Self {
        let lines = polyline_segments(points, closed);
        let mut rendering = points.to_vec();
        if closed && !points.is_empty() {
            rendering.push(points[0]);
        }
        let regions = if closed && points.len() >= 3 {
            vec![Region {
                points: points.to_vec(),
                holes: Vec::new(),
            }]
        } else {
            Vec::new()
        };
        Self {
            bounding: bounding_of_lines(&lines),
            lines,
            regions,
            rendering_lines: dash_polyline(&rendering, dash_array.unwrap_or(&[])),
        }
    }

    /// 是否完全为空
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.rendering_lines.is_empty() && self.regions.is_empty()
    }

    /// 合并另一组几何（容器内容使用）
    pub fn extend(&mut self, other: &Geometries) {
        self.lines.extend(other.lines.iter().copied());
        self.regions.extend(other.regions.iter().cloned());
        self.rendering_lines.extend(other.rendering_lines.iter().cloned());
        self.bounding = match (self.bounding, other.bounding) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        };
    }
}

/// 计算一组曲线的包围盒
pub fn bounding_of_lines(lines: &[GeometryLine]) -> Option<BoundingBox2> {
    let bbox = lines
        .iter()
        .fold(BoundingBox2::empty(), |acc, l| acc.union(&l.bounding_box()));
    (!bbox.is_empty()).then_some(bbox)
}

/// 折线点 → 线段列表
pub fn polyline_segments(points: &[Point2], closed: bool) -> Vec<GeometryLine> {
    let mut lines: Vec<GeometryLine> = points
        .windows(2)
        .map(|w| GeometryLine::segment(w[0], w[1]))
        .collect();
    if closed && points.len() >= 3 {
        lines.push(GeometryLine::segment(points[points.len() - 1], points[0]));
    }
    lines
}

/// 圆弧离散化
///
/// `segment_count` 为整圆对应的段数，实际段数按扫角比例计算（至少 2 段）。
pub fn tessellate_arc(arc: &Arc, segment_count: usize) -> Vec<Point2> {
    let sweep = arc.sweep_angle();
    let n = ((sweep / (2.0 * PI)) * segment_count as f64).ceil().max(2.0) as usize;
    (0..=n)
        .map(|i| arc.point_at_angle(arc.start_angle + sweep * i as f64 / n as f64))
        .collect()
}

/// 按虚线模式打断折线
///
/// 模式为空或总长非正时返回原折线。
pub fn dash_polyline(points: &[Point2], dash_array: &[f64]) -> Vec<Vec<Point2>> {
    let total: f64 = dash_array.iter().sum();
    if points.len() < 2 || dash_array.is_empty() || total <= EPSILON {
        return if points.is_empty() { Vec::new() } else { vec![points.to_vec()] };
    }

    let mut result = Vec::new();
    let mut current = vec![points[0]];
    let mut dash_index = 0;
    let mut remaining = dash_array[0];
    let mut drawing = true;

    for w in points.windows(2) {
        let (mut from, to) = (w[0], w[1]);
        let mut seg_len = (to - from).norm();
        while seg_len > EPSILON {
            if remaining >= seg_len {
                remaining -= seg_len;
                if drawing {
                    current.push(to);
                }
                seg_len = 0.0;
            } else {
                let p = from + (to - from) * (remaining / seg_len);
                if drawing {
                    current.push(p);
                    result.push(std::mem::take(&mut current));
                } else {
                    current = vec![p];
                }
                seg_len -= remaining;
                from = p;
                drawing = !drawing;
                dash_index = (dash_index + 1) % dash_array.len();
                remaining = dash_array[dash_index];
            }
        }
    }
    if drawing && current.len() >= 2 {
        result.push(current);
    }
    result
}

/// 两条无限长直线的交点
fn infinite_line_intersection(p1: Point2, d1: Vector2, p2: Point2, d2: Vector2) -> Option<Point2> {
    let cross = d1.x * d2.y - d1.y * d2.x;
    if cross.abs() < EPSILON {
        return None;
    }
    let d = p2 - p1;
    let t = (d.x * d2.y - d.y * d2.x) / cross;
    Some(p1 + d1 * t)
}

/// 多段线偏移（正距离向左侧偏移）
pub fn offset_polyline(points: &[Point2], distance: f64, closed: bool) -> Vec<Point2> {
    let n = points.len();
    if n < 2 {
        return points.to_vec();
    }
    let segment_count = if closed { n } else { n - 1 };
    let normals: Vec<Vector2> = (0..segment_count)
        .map(|i| {
            let d = points[(i + 1) % n] - points[i];
            let len = d.norm();
            if len < EPSILON {
                Vector2::zeros()
            } else {
                Vector2::new(-d.y / len, d.x / len)
            }
        })
        .collect();

    (0..n)
        .map(|i| {
            let prev = if i > 0 {
                Some(i - 1)
            } else if closed {
                Some(segment_count - 1)
            } else {
                None
            };
            let next = (i < segment_count).then_some(i);
            match (prev, next) {
                (Some(a), Some(b)) => {
                    let pa = points[a] + normals[a] * distance;
                    let pb = points[b] + normals[b] * distance;
                    let da = points[(a + 1) % n] - points[a];
                    let db = points[(b + 1) % n] - points[b];
                    infinite_line_intersection(pa, da, pb, db)
                        .unwrap_or(points[i] + normals[b] * distance)
                }
                (Some(a), None) => points[i] + normals[a] * distance,
                (None, Some(b)) => points[i] + normals[b] * distance,
                (None, None) => points[i],
            }
        })
        .collect()
}

/// 点是否在多边形内（射线法）
pub fn polygon_contains_point(polygon: &[Point2], point: &Point2) -> bool {
    let mut inside = false;
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

// ========== 求交 ==========

/// 计算两条几何线的交点
pub fn intersect(a: &GeometryLine, b: &GeometryLine) -> Vec<Point2> {
    match (a, b) {
        (GeometryLine::Segment(l1), GeometryLine::Segment(l2)) => {
            line_line_intersection(l1, l2).into_iter().collect()
        }
        (GeometryLine::Segment(line), GeometryLine::Arc(arc))
        | (GeometryLine::Arc(arc), GeometryLine::Segment(line)) => line_arc_intersection(line, arc),
        (GeometryLine::Arc(a1), GeometryLine::Arc(a2)) => arc_arc_intersection(a1, a2),
    }
}

/// 两组几何线的全部交点（去重）
pub fn intersect_lines(a: &[GeometryLine], b: &[GeometryLine]) -> Vec<Point2> {
    let mut result: Vec<Point2> = Vec::new();
    for la in a {
        for lb in b {
            for p in intersect(la, lb) {
                if !result.iter().any(|q| (q - p).norm() < 1e-6) {
                    result.push(p);
                }
            }
        }
    }
    result
}

/// 线段-线段交点
fn line_line_intersection(l1: &Line, l2: &Line) -> Option<Point2> {
    let d1 = l1.end - l1.start;
    let d2 = l2.end - l2.start;

    let cross = d1.x * d2.y - d1.y * d2.x;

    // 平行
    if cross.abs() < EPSILON {
        return None;
    }

    let d = l2.start - l1.start;
    let t1 = (d.x * d2.y - d.y * d2.x) / cross;
    let t2 = (d.x * d1.y - d.y * d1.x) / cross;

    let on_segment = |t: f64| (-PARAM_TOLERANCE..=1.0 + PARAM_TOLERANCE).contains(&t);
    if on_segment(t1) && on_segment(t2) {
        Some(l1.start + d1 * t1)
    } else {
        None
    }
}

/// 线段-整圆交点
fn line_circle_intersection(line: &Line, center: Point2, radius: f64) -> Vec<Point2> {
    let d = line.end - line.start;
    let f = line.start - center;

    let a = d.dot(&d);
    if a < EPSILON {
        return vec![];
    }
    let b = 2.0 * f.dot(&d);
    let c = f.dot(&f) - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return vec![];
    }

    let on_segment = |t: f64| (-PARAM_TOLERANCE..=1.0 + PARAM_TOLERANCE).contains(&t);
    let sqrt_disc = discriminant.sqrt();
    let mut ts = vec![(-b - sqrt_disc) / (2.0 * a)];
    if sqrt_disc > EPSILON {
        ts.push((-b + sqrt_disc) / (2.0 * a));
    }
    ts.into_iter()
        .filter(|t| on_segment(*t))
        .map(|t| line.start + d * t)
        .collect()
}

/// 线段-圆弧交点
fn line_arc_intersection(line: &Line, arc: &Arc) -> Vec<Point2> {
    line_circle_intersection(line, arc.center, arc.radius)
        .into_iter()
        .filter(|p| arc.contains_point(p))
        .collect()
}

/// 圆弧-圆弧交点
fn arc_arc_intersection(a1: &Arc, a2: &Arc) -> Vec<Point2> {
    let d = (a2.center - a1.center).norm();

    // 不相交、内含或同心
    if d > a1.radius + a2.radius || d < (a1.radius - a2.radius).abs() || d < EPSILON {
        return vec![];
    }

    let a = (a1.radius * a1.radius - a2.radius * a2.radius + d * d) / (2.0 * d);
    let h = (a1.radius * a1.radius - a * a).max(0.0).sqrt();
    let p = a1.center + (a2.center - a1.center) * (a / d);
    let dir = (a2.center - a1.center) / d;
    let perp = Vector2::new(-dir.y, dir.x);

    let candidates = if h < EPSILON {
        vec![p]
    } else {
        vec![p + perp * h, p - perp * h]
    };
    candidates
        .into_iter()
        .filter(|p| a1.contains_point(p) && a2.contains_point(p))
        .collect()
}

// ========== 参数化 ==========

/// 按参数取点：整数部分为曲线序号，小数部分为曲线内参数
pub fn point_at_param(lines: &[GeometryLine], param: f64) -> Option<Point2> {
    if lines.is_empty() || !param.is_finite() || param < 0.0 {
        return None;
    }
    let index = (param.floor() as usize).min(lines.len() - 1);
    let t = (param - index as f64).clamp(0.0, 1.0);
    Some(lines[index].point_at(t))
}

/// 曲线列表上离给定点最近的位置：(参数, 点, 距离)
pub fn nearest_on_lines(lines: &[GeometryLine], point: &Point2) -> Option<(f64, Point2, f64)> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let t = line.nearest_param(point);
            let p = line.point_at(t);
            (i as f64 + t, p, (p - point).norm())
        })
        .min_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_length() {
        let line = Line::new(Point2::new(0.0, 0.0), Point2::new(3.0, 4.0));
        assert!((line.length() - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_line_intersection() {
        let l1 = GeometryLine::segment(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        let l2 = GeometryLine::segment(Point2::new(0.0, 10.0), Point2::new(10.0, 0.0));

        let points = intersect(&l1, &l2);
        assert_eq!(points.len(), 1);
        assert!((points[0].x - 5.0).abs() < 1e-9);
        assert!((points[0].y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_circle_intersection() {
        let line = GeometryLine::segment(Point2::new(-10.0, 0.0), Point2::new(10.0, 0.0));
        let circle = GeometryLine::Arc(Arc::full_circle(Point2::origin(), 5.0));
        let points = intersect(&line, &circle);
        assert_eq!(points.len(), 2);

        // 上半圆弧只与 x 轴交于两个端点
        let half = GeometryLine::Arc(Arc::new(Point2::origin(), 5.0, 0.0, PI));
        assert_eq!(intersect(&line, &half).len(), 2);
        let short = GeometryLine::segment(Point2::new(1.0, 0.0), Point2::new(2.0, 0.0));
        assert!(intersect(&short, &half).is_empty());
    }

    #[test]
    fn test_arc_contains_angle() {
        let arc = Arc::new(Point2::origin(), 1.0, 3.0 * PI / 2.0, PI / 2.0);
        assert!(arc.contains_angle(0.0));
        assert!(!arc.contains_angle(PI));
        assert!(Arc::full_circle(Point2::origin(), 1.0).contains_angle(2.5));
    }

    #[test]
    fn test_tessellate_arc() {
        let arc = Arc::new(Point2::origin(), 1.0, 0.0, PI);
        let points = tessellate_arc(&arc, 8);
        assert_eq!(points.len(), 5);
        assert!((points[4].x + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dash_polyline() {
        let points = [Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)];
        let dashed = dash_polyline(&points, &[2.0, 3.0]);
        assert_eq!(dashed.len(), 2);
        assert!((dashed[0][1].x - 2.0).abs() < 1e-9);
        assert!((dashed[1][0].x - 5.0).abs() < 1e-9);
        assert!((dashed[1][1].x - 7.0).abs() < 1e-9);

        assert_eq!(dash_polyline(&points, &[]).len(), 1);
    }

    #[test]
    fn test_offset_polyline() {
        let points = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ];
        let offset = offset_polyline(&points, 1.0, false);
        assert!((offset[0] - Point2::new(0.0, 1.0)).norm() < 1e-9);
        assert!((offset[1] - Point2::new(9.0, 1.0)).norm() < 1e-9);
        assert!((offset[2] - Point2::new(9.0, 10.0)).norm() < 1e-9);
    }

    #[test]
    fn test_point_at_param() {
        let lines = polyline_segments(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
            ],
            false,
        );
        let p = point_at_param(&lines, 1.5).unwrap();
        assert!((p - Point2::new(10.0, 5.0)).norm() < 1e-9);

        let (param, _, dist) = nearest_on_lines(&lines, &Point2::new(5.0, 1.0)).unwrap();
        assert!((param - 0.5).abs() < 1e-9);
        assert!((dist - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_contains_point() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        assert!(polygon_contains_point(&square, &Point2::new(5.0, 5.0)));
        assert!(!polygon_contains_point(&square, &Point2::new(15.0, 5.0)));
    }
}
