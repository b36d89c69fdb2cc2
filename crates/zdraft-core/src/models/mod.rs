//! 内置内容模型
//!
//! 每个文件实现一个或几个相近类型的 [`Model`]。
//! 横切行为（线型、填充、文字、裁剪）调用 [`crate::fields`] 中的自由函数。

mod circle;
mod dimension;
mod group;
mod line;
mod polygon;
mod stroke_style;
mod text;

pub use circle::{ArcModel, CircleModel};
pub use dimension::LinearDimensionModel;
pub use group::{BlockModel, BlockReferenceModel, GroupModel};
pub use line::LineModel;
pub use polygon::PolygonModel;
pub use stroke_style::StrokeStyleModel;
pub use text::TextModel;

use crate::fields::StrokeOptions;
use crate::geometry::{Geometries, Line};
use crate::math::{Point2, Transform, EPSILON};
use crate::model::Model;
use crate::registry::ContentRegistry;
use crate::render::Drawable;

/// 打断点距离曲线的容差
const BREAK_TOLERANCE: f64 = 1e-6;

/// 注册全部内置模型
pub fn register_default_models(registry: &mut ContentRegistry) {
    let models: Vec<Box<dyn Model>> = vec![
        Box::new(LineModel),
        Box::new(PolygonModel),
        Box::new(CircleModel),
        Box::new(ArcModel),
        Box::new(TextModel),
        Box::new(GroupModel),
        Box::new(BlockModel),
        Box::new(BlockReferenceModel),
        Box::new(StrokeStyleModel),
        Box::new(LinearDimensionModel),
    ];
    for model in models {
        registry.register(model);
    }
}

pub(crate) fn transform_points(points: &mut [Point2], transform: &Transform) {
    for p in points.iter_mut() {
        *p = transform.apply(*p);
    }
}

/// 显示折线 → 折线绘制项
pub(crate) fn stroke_drawables(geometries: &Geometries, stroke: &StrokeOptions) -> Vec<Drawable> {
    geometries
        .rendering_lines
        .iter()
        .map(|points| Drawable::Polyline {
            points: points.clone(),
            stroke: stroke.clone(),
        })
        .collect()
}

/// 在给定点处打断折线
///
/// 闭合折线在 k 个打断点处得到 k 段；开放折线端点上的打断点被忽略。
/// 没有有效打断点时返回 None。
pub(crate) fn break_polyline(
    points: &[Point2],
    break_points: &[Point2],
    closed: bool,
) -> Option<Vec<Vec<Point2>>> {
    let first = *points.first()?;
    let mut vertices = points.to_vec();
    if closed {
        vertices.push(first);
    }
    let segment_count = vertices.len().checked_sub(1).filter(|n| *n > 0)?;
    let total = segment_count as f64;

    let mut params: Vec<f64> = Vec::new();
    for p in break_points {
        let found = (0..segment_count).find_map(|i| {
            let line = Line::new(vertices[i], vertices[i + 1]);
            (line.distance_to_point(p) < BREAK_TOLERANCE).then(|| i as f64 + line.nearest_param(p))
        });
        let Some(mut param) = found else {
            continue;
        };
        if closed && (total - param).abs() < EPSILON {
            param = 0.0;
        }
        if !params.iter().any(|q| (q - param).abs() < EPSILON) {
            params.push(param);
        }
    }
    if !closed {
        params.retain(|p| *p > EPSILON && *p < total - EPSILON);
    }
    if params.is_empty() {
        return None;
    }
    params.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let at = |param: f64| {
        let i = (param.floor() as usize).min(segment_count - 1);
        Line::new(vertices[i], vertices[i + 1]).point_at(param - i as f64)
    };
    let slice = |a: f64, b: f64| {
        let mut piece = vec![at(a)];
        piece.extend(
            (1..segment_count)
                .filter(|k| (*k as f64) > a + EPSILON && (*k as f64) < b - EPSILON)
                .map(|k| vertices[k]),
        );
        piece.push(at(b));
        piece
    };

    let mut pieces: Vec<Vec<Point2>> = Vec::new();
    if closed {
        pieces.extend(params.windows(2).map(|w| slice(w[0], w[1])));
        let (head, tail) = (params[0], params[params.len() - 1]);
        let mut wrapped = slice(tail, total);
        wrapped.extend(slice(0.0, head));
        pieces.push(wrapped);
    } else {
        let mut bounds = vec![0.0];
        bounds.extend(params);
        bounds.push(total);
        pieces.extend(bounds.windows(2).map(|w| slice(w[0], w[1])));
    }

    for piece in &mut pieces {
        piece.dedup_by(|a, b| (*a - *b).norm() < EPSILON);
    }
    pieces.retain(|piece| piece.len() >= 2);
    Some(pieces)
}

/// 点在有向线段的哪一侧：左侧为正
pub(crate) fn side_of(start: Point2, end: Point2, point: Point2) -> f64 {
    let d = end - start;
    let v = point - start;
    d.x * v.y - d.y * v.x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_open_polyline() {
        let points = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ];
        let pieces = break_polyline(&points, &[Point2::new(5.0, 0.0)], false).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], vec![Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)]);
        assert_eq!(pieces[1].len(), 3);

        // 端点上的打断点无效
        assert!(break_polyline(&points, &[Point2::new(0.0, 0.0)], false).is_none());
        assert!(break_polyline(&points, &[Point2::new(3.0, 3.0)], false).is_none());
    }

    #[test]
    fn test_break_at_vertex() {
        let points = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ];
        let pieces = break_polyline(&points, &[Point2::new(10.0, 0.0)], false).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].len(), 2);
        assert_eq!(pieces[1].len(), 2);
    }

    #[test]
    fn test_break_closed_polyline() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let pieces = break_polyline(
            &square,
            &[Point2::new(5.0, 0.0), Point2::new(5.0, 10.0)],
            true,
        )
        .unwrap();
        assert_eq!(pieces.len(), 2);
        // 第二段跨过起点
        assert_eq!(pieces[1].first(), Some(&Point2::new(5.0, 10.0)));
        assert_eq!(pieces[1].last(), Some(&Point2::new(5.0, 0.0)));
        assert_eq!(pieces[1].len(), 4);

        let single = break_polyline(&square, &[Point2::new(5.0, 0.0)], true).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].len(), 6);
    }

    #[test]
    fn test_registered_types() {
        let mut registry = ContentRegistry::new();
        register_default_models(&mut registry);
        assert_eq!(
            registry.type_names(),
            vec![
                "arc",
                "block",
                "block reference",
                "circle",
                "group",
                "line",
                "linear dimension",
                "polygon",
                "stroke style",
                "text"
            ]
        );
    }
}
