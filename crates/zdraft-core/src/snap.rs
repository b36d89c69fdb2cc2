//! 对象捕捉与点选
//!
//! 特征点来自内容模型（`snap_points`），没有时由几何线推出端点、中点与圆心。
//! 交点、最近点与网格点在查询时计算。
//!
//! 捕捉结果带有 [`SnapTarget`]，命令可以据此建立指向其他内容的位置引用。

use crate::content::{Content, ContentArray};
use crate::geometry::{intersect_lines, nearest_on_lines, polygon_contains_point, Geometries, GeometryLine};
use crate::kernel::Kernel;
use crate::math::{BoundingBox2, Point2, Vector2};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// 捕捉类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapType {
    Endpoint,
    Midpoint,
    Center,
    /// 圆在 0°/90°/180°/270° 处的点
    Quadrant,
    Intersection,
    Nearest,
    Grid,
}

impl SnapType {
    /// (名称, 命令行缩写)
    fn labels(&self) -> (&'static str, &'static str) {
        match self {
            SnapType::Endpoint => ("端点", "END"),
            SnapType::Midpoint => ("中点", "MID"),
            SnapType::Center => ("圆心", "CEN"),
            SnapType::Quadrant => ("象限点", "QUA"),
            SnapType::Intersection => ("交点", "INT"),
            SnapType::Nearest => ("最近点", "NEA"),
            SnapType::Grid => ("网格点", "GRI"),
        }
    }

    pub fn name(&self) -> &'static str {
        self.labels().0
    }

    pub fn shortcut(&self) -> &'static str {
        self.labels().1
    }

    fn mask(&self) -> SnapMask {
        match self {
            SnapType::Endpoint => SnapMask::ENDPOINT,
            SnapType::Midpoint => SnapMask::MIDPOINT,
            SnapType::Center => SnapMask::CENTER,
            SnapType::Quadrant => SnapMask::QUADRANT,
            SnapType::Intersection => SnapMask::INTERSECTION,
            SnapType::Nearest => SnapMask::NEAREST,
            SnapType::Grid => SnapMask::GRID,
        }
    }

    /// 最近点、网格点只在没有其他特征点时使用
    fn is_fallback(&self) -> bool {
        matches!(self, SnapType::Nearest | SnapType::Grid)
    }
}

bitflags! {
    /// 捕捉掩码（位域，用于快速启用/禁用捕捉类型）
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SnapMask: u16 {
        const ENDPOINT = 1 << 0;
        const MIDPOINT = 1 << 1;
        const CENTER = 1 << 2;
        const INTERSECTION = 1 << 3;
        const NEAREST = 1 << 6;
        const GRID = 1 << 7;
        const QUADRANT = 1 << 8;
    }
}

impl SnapMask {
    pub fn is_enabled(&self, snap_type: SnapType) -> bool {
        self.contains(snap_type.mask())
    }

    pub fn set_type(&mut self, snap_type: SnapType, enabled: bool) {
        self.set(snap_type.mask(), enabled);
    }

    pub fn toggle_type(&mut self, snap_type: SnapType) {
        self.toggle(snap_type.mask());
    }
}

impl Default for SnapMask {
    fn default() -> Self {
        SnapMask::ENDPOINT | SnapMask::MIDPOINT | SnapMask::CENTER | SnapMask::INTERSECTION
    }
}

/// 内容自身的特征点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapPoint {
    pub point: Point2,
    pub snap_type: SnapType,
}

impl SnapPoint {
    pub fn new(point: Point2, snap_type: SnapType) -> Self {
        Self { point, snap_type }
    }
}

/// 捕捉到的内容位置：捕捉点序号，或几何线参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapTarget {
    pub id: usize,
    pub snap_index: Option<usize>,
    pub param: Option<f64>,
}

/// 捕捉结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// 捕捉到的世界坐标
    pub point: Point2,
    pub snap_type: SnapType,
    pub target: Option<SnapTarget>,
    /// 距离鼠标的距离（用于排序）
    pub distance: f64,
}

/// 捕捉配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// 拾取半径（屏幕像素，按缩放换算）
    pub tolerance: f64,
    pub enabled_types: SnapMask,
    pub grid_spacing: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            tolerance: 10.0,
            enabled_types: SnapMask::default(),
            grid_spacing: 10.0,
        }
    }
}

/// 由几何线得到的默认特征点：端点、中点，圆弧加圆心
pub fn default_snap_points(geometries: &Geometries) -> Vec<SnapPoint> {
    let mut points: Vec<SnapPoint> = Vec::new();
    let mut push = |p: Point2, t: SnapType| {
        if !points.iter().any(|s| s.snap_type == t && (s.point - p).norm() < 1e-9) {
            points.push(SnapPoint::new(p, t));
        }
    };
    for line in &geometries.lines {
        match line {
            GeometryLine::Segment(l) => {
                push(l.start, SnapType::Endpoint);
                push(l.end, SnapType::Endpoint);
                push(l.midpoint(), SnapType::Midpoint);
            }
            GeometryLine::Arc(a) => {
                push(a.center, SnapType::Center);
                if !a.is_full_circle() {
                    push(a.start_point(), SnapType::Endpoint);
                    push(a.end_point(), SnapType::Endpoint);
                    push(a.midpoint(), SnapType::Midpoint);
                }
            }
        }
    }
    points
}

/// 捕捉引擎
#[derive(Debug, Clone, Default)]
pub struct SnapEngine {
    config: SnapConfig,
}

impl SnapEngine {
    pub fn new(config: SnapConfig) -> Self {
        Self { config }
    }

    /// 获取配置
    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    /// 获取配置（可变）
    pub fn config_mut(&mut self) -> &mut SnapConfig {
        &mut self.config
    }

    /// 寻找最佳捕捉点
    ///
    /// # 参数
    /// - `mouse`: 鼠标的世界坐标
    /// - `zoom`: 当前缩放级别（用于把像素容差换算为世界坐标）
    /// - `filter`: 参与捕捉的顶层内容
    pub fn find_snap_point(
        &self,
        kernel: &Kernel,
        contents: &ContentArray,
        mouse: Point2,
        zoom: f64,
        filter: &dyn Fn(usize, &Content) -> bool,
    ) -> Option<SnapResult> {
        let enabled = self.config.enabled_types;
        let tolerance = self.config.tolerance / zoom.max(f64::EPSILON);
        let mut candidates: Vec<SnapResult> = Vec::new();

        // 1. 网格捕捉
        if enabled.is_enabled(SnapType::Grid) {
            let s = self.config.grid_spacing;
            let grid = Point2::new((mouse.x / s).round() * s, (mouse.y / s).round() * s);
            candidates.push(SnapResult {
                point: grid,
                snap_type: SnapType::Grid,
                target: None,
                distance: (grid - mouse).norm(),
            });
        }

        // 2. 各内容的特征点和最近点
        let mut nearby: Vec<Rc<Geometries>> = Vec::new();
        for (id, content) in live_contents(contents) {
            if !content.is_visible() || !filter(id, content) {
                continue;
            }
            let geometries = kernel.get_geometries(content, contents);
            if !near_bounding(&geometries, &mouse, tolerance) {
                continue;
            }

            let snap_points = kernel.get_snap_points(content, contents);
            for (index, snap) in snap_points.iter().enumerate() {
                if !enabled.is_enabled(snap.snap_type) {
                    continue;
                }
                candidates.push(SnapResult {
                    point: snap.point,
                    snap_type: snap.snap_type,
                    target: Some(SnapTarget {
                        id,
                        snap_index: Some(index),
                        param: None,
                    }),
                    distance: (snap.point - mouse).norm(),
                });
            }

            if enabled.is_enabled(SnapType::Nearest) {
                if let Some((param, point, distance)) = nearest_on_lines(&geometries.lines, &mouse) {
                    candidates.push(SnapResult {
                        point,
                        snap_type: SnapType::Nearest,
                        target: Some(SnapTarget {
                            id,
                            snap_index: None,
                            param: Some(param),
                        }),
                        distance,
                    });
                }
            }
            nearby.push(geometries);
        }

        // 3. 交点捕捉（需要成对的内容）
        if enabled.is_enabled(SnapType::Intersection) {
            for (i, a) in nearby.iter().enumerate() {
                for b in &nearby[i + 1..] {
                    for point in intersect_lines(&a.lines, &b.lines) {
                        candidates.push(SnapResult {
                            point,
                            snap_type: SnapType::Intersection,
                            target: None,
                            distance: (point - mouse).norm(),
                        });
                    }
                }
            }
        }

        // 4. 容差内，特征点优先，其次距离最近
        candidates
            .into_iter()
            .filter(|c| c.distance <= tolerance)
            .min_by(|a, b| {
                a.snap_type
                    .is_fallback()
                    .cmp(&b.snap_type.is_fallback())
                    .then(a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal))
            })
    }
}

fn live_contents(contents: &ContentArray) -> impl Iterator<Item = (usize, &Rc<Content>)> {
    contents
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| slot.as_ref().map(|c| (i, c)))
}

fn near_bounding(geometries: &Geometries, point: &Point2, tolerance: f64) -> bool {
    geometries.bounding.is_some_and(|b| {
        let margin = Vector2::new(tolerance, tolerance);
        BoundingBox2::new(b.min - margin, b.max + margin).contains(point)
    })
}

// ========== 点选 ==========

/// 点到内容几何的距离；落在封闭区域内时为 0
pub fn distance_to_geometries(geometries: &Geometries, point: &Point2) -> Option<f64> {
    if geometries
        .regions
        .iter()
        .any(|r| polygon_contains_point(&r.points, point) && !r.holes.iter().any(|h| polygon_contains_point(h, point)))
    {
        return Some(0.0);
    }
    geometries
        .lines
        .iter()
        .map(|l| l.distance_to_point(point))
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

/// 点选：容差内最近的可见内容；距离相同时取后绘制的（下标大的）
pub fn hit_test(
    kernel: &Kernel,
    contents: &ContentArray,
    point: Point2,
    tolerance: f64,
    filter: &dyn Fn(usize, &Content) -> bool,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (id, content) in live_contents(contents) {
        if !content.is_visible() || !filter(id, content) {
            continue;
        }
        let geometries = kernel.get_geometries(content, contents);
        if !near_bounding(&geometries, &point, tolerance) {
            continue;
        }
        let Some(distance) = distance_to_geometries(&geometries, &point) else {
            continue;
        };
        if distance <= tolerance && best.map_or(true, |(_, d)| distance <= d) {
            best = Some((id, distance));
        }
    }
    best.map(|(id, _)| id)
}

/// 框选：包围盒完全落在框内的可见内容
pub fn select_in_box(
    kernel: &Kernel,
    contents: &ContentArray,
    bbox: &BoundingBox2,
    filter: &dyn Fn(usize, &Content) -> bool,
) -> Vec<usize> {
    live_contents(contents)
        .filter(|(id, content)| content.is_visible() && filter(*id, content))
        .filter(|(_, content)| {
            kernel
                .get_geometries(content, contents)
                .bounding
                .is_some_and(|b| bbox.contains(&b.min) && bbox.contains(&b.max))
        })
        .map(|(id, _)| id)
        .collect()
}
