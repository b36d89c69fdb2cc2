//! 数学基础类型
//!
//! 基于 nalgebra 的二维点/向量，以及包围盒和仿射变换辅助函数。

use serde::{Deserialize, Serialize};

pub type Point2 = nalgebra::Point2<f64>;
pub type Vector2 = nalgebra::Vector2<f64>;

/// 浮点比较容差
pub const EPSILON: f64 = 1e-10;

/// 判断两点是否重合（考虑容差）
pub fn points_equal(a: &Point2, b: &Point2, tolerance: f64) -> bool {
    (a - b).norm() <= tolerance
}

/// 二维轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2 {
    pub min: Point2,
    pub max: Point2,
}

impl BoundingBox2 {
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    /// 空包围盒（min > max）
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::MAX, f64::MAX),
            max: Point2::new(f64::MIN, f64::MIN),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point2>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_to_include(&p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn expand_to_include(&mut self, point: &Point2) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// 合并另一个包围盒
    pub fn union(&self, other: &BoundingBox2) -> BoundingBox2 {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BoundingBox2::new(
            Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    pub fn contains(&self, point: &Point2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn intersects(&self, other: &BoundingBox2) -> bool {
        !(self.is_empty() || other.is_empty())
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// 四个角点（逆时针）
    pub fn corners(&self) -> [Point2; 4] {
        [
            self.min,
            Point2::new(self.max.x, self.min.y),
            self.max,
            Point2::new(self.min.x, self.max.y),
        ]
    }
}

/// 二维仿射变换
///
/// 所有内容模型的 move/rotate/scale/skew/mirror 都通过它作用到点上。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// 平移
    Move(Vector2),
    /// 绕中心旋转（弧度，逆时针为正）
    Rotate { center: Point2, angle: f64 },
    /// 以中心缩放
    Scale { center: Point2, sx: f64, sy: f64 },
    /// 以中心错切
    Skew { center: Point2, sx: f64, sy: f64 },
    /// 关于直线 (p1, p2) 镜像
    Mirror { p1: Point2, p2: Point2 },
}

impl Transform {
    /// 变换一个点
    pub fn apply(&self, p: Point2) -> Point2 {
        match *self {
            Transform::Move(offset) => p + offset,
            Transform::Rotate { center, angle } => rotate_point(p, center, angle),
            Transform::Scale { center, sx, sy } => Point2::new(
                center.x + (p.x - center.x) * sx,
                center.y + (p.y - center.y) * sy,
            ),
            Transform::Skew { center, sx, sy } => {
                let dx = p.x - center.x;
                let dy = p.y - center.y;
                Point2::new(center.x + dx + dy * sx, center.y + dy + dx * sy)
            }
            Transform::Mirror { p1, p2 } => mirror_point(p, p1, p2),
        }
    }

    /// 变换一个角度（用于圆弧、文本等带方向的内容）
    pub fn apply_angle(&self, angle: f64) -> f64 {
        match *self {
            Transform::Rotate { angle: delta, .. } => angle + delta,
            // 等比负缩放相当于旋转半周
            Transform::Scale { sx, sy, .. } if sx < 0.0 && sy < 0.0 => angle + std::f64::consts::PI,
            Transform::Mirror { p1, p2 } => {
                let axis = (p2.y - p1.y).atan2(p2.x - p1.x);
                2.0 * axis - angle
            }
            _ => angle,
        }
    }

    /// 是否保持圆形（圆、圆弧只能接受保形变换）
    pub fn is_conformal(&self) -> bool {
        match *self {
            Transform::Scale { sx, sy, .. } => (sx - sy).abs() < EPSILON,
            Transform::Skew { sx, sy, .. } => sx.abs() < EPSILON && sy.abs() < EPSILON,
            _ => true,
        }
    }

    /// 保形变换下的长度缩放系数
    pub fn length_scale(&self) -> f64 {
        match *self {
            Transform::Scale { sx, .. } => sx.abs(),
            _ => 1.0,
        }
    }

    /// 是否翻转方向（镜像或负缩放）
    pub fn is_reflection(&self) -> bool {
        match *self {
            Transform::Mirror { .. } => true,
            Transform::Scale { sx, sy, .. } => sx * sy < 0.0,
            _ => false,
        }
    }
}

/// 绕中心旋转点
pub fn rotate_point(p: Point2, center: Point2, angle: f64) -> Point2 {
    let (sin, cos) = angle.sin_cos();
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    Point2::new(center.x + dx * cos - dy * sin, center.y + dx * sin + dy * cos)
}

/// 关于直线 (p1, p2) 镜像点
pub fn mirror_point(p: Point2, p1: Point2, p2: Point2) -> Point2 {
    let d = p2 - p1;
    let len2 = d.dot(&d);
    if len2 < EPSILON {
        // 退化为点镜像
        return Point2::new(2.0 * p1.x - p.x, 2.0 * p1.y - p.y);
    }
    let t = (p - p1).dot(&d) / len2;
    let foot = p1 + d * t;
    Point2::new(2.0 * foot.x - p.x, 2.0 * foot.y - p.y)
}

/// 把角度归一化到 [0, 2π)
pub fn normalize_angle(angle: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let a = angle % two_pi;
    if a < 0.0 {
        a + two_pi
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rotate_point() {
        let p = rotate_point(Point2::new(1.0, 0.0), Point2::origin(), FRAC_PI_2);
        assert!(p.x.abs() < 1e-9);
        assert!((p.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mirror_point() {
        let p = mirror_point(
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
        );
        assert!((p.x - 1.0).abs() < 1e-9);
        assert!((p.y + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounding_box_union() {
        let a = BoundingBox2::from_points([Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)]);
        let b = BoundingBox2::from_points([Point2::new(2.0, -1.0)]);
        let u = a.union(&b);
        assert_eq!(u.min, Point2::new(0.0, -1.0));
        assert_eq!(u.max, Point2::new(2.0, 1.0));
        assert!(BoundingBox2::empty().is_empty());
    }
}
