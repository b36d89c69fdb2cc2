//! 组、块定义与块参照
//!
//! 组和块是容器：几何为子内容几何的并集。
//! 块参照以必需引用指向块定义，按 缩放 → 旋转 → 平移 的顺序放置块内容。

use crate::content::{BlockContent, BlockReferenceContent, Content, ContentArray, ContentKind, GroupContent};
use crate::fields::{clip_border, clip_ref_ids, ClipFields};
use crate::geometry::{bounding_of_lines, Geometries, GeometryError, Region};
use crate::math::{BoundingBox2, Point2, Transform};
use crate::model::{Capabilities, Model, ModelContext};
use crate::refs::{ContentRef, RefId};
use crate::render::Drawable;
use crate::snap::{default_snap_points, SnapPoint, SnapType};
use crate::validation::{check_finite, check_point, check_positive, ValidationError, ValidationResult};
use std::collections::HashSet;
use std::rc::Rc;

pub struct GroupModel;

pub struct BlockModel;

pub struct BlockReferenceModel;

/// 子内容几何的并集
fn children_geometries(children: &ContentArray, ctx: &ModelContext) -> Geometries {
    let mut geometries = Geometries::empty();
    for child in children.iter().flatten() {
        geometries.extend(&ctx.geometries(child));
    }
    geometries
}

fn children_drawables(children: &ContentArray, ctx: &ModelContext) -> Vec<Drawable> {
    children.iter().flatten().flat_map(|child| ctx.render(child)).collect()
}

/// 裁剪边界轮廓：优先取封闭区域，否则取第一条显示折线
fn border_outline(border: &Rc<Content>, ctx: &ModelContext) -> Option<Vec<Point2>> {
    let geometries = ctx.geometries(border);
    geometries
        .regions
        .first()
        .map(|r| r.points.clone())
        .or_else(|| geometries.rendering_lines.first().cloned())
}

// ========== 组 ==========

fn group_of(content: &Content) -> Option<&GroupContent> {
    match &content.kind {
        ContentKind::Group(group) => Some(group),
        _ => None,
    }
}

fn clip_of_mut(content: &mut Content) -> Option<&mut ClipFields> {
    content.kind.clip_fields_mut()
}

impl Model for GroupModel {
    fn type_name(&self) -> &'static str {
        "group"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::CONTAINER
            | Capabilities::CLIP
            | Capabilities::MOVE
            | Capabilities::ROTATE
            | Capabilities::SCALE
            | Capabilities::SKEW
            | Capabilities::MIRROR
            | Capabilities::EXPLODE
    }

    /// 子内容由注册表递归校验
    fn is_valid(&self, content: &Content) -> ValidationResult {
        group_of(content)
            .map(|_| ())
            .ok_or_else(|| ValidationError::new(["type"], "group"))
    }

    fn get_ref_ids(&self, content: &Content) -> Vec<RefId> {
        group_of(content).map(|g| clip_ref_ids(&g.clip)).unwrap_or_default()
    }

    fn update_ref_id(&self, content: &mut Content, update: &dyn Fn(usize) -> Option<usize>) -> bool {
        let Some(clip) = clip_of_mut(content).and_then(|c| c.clip.as_mut()) else {
            return false;
        };
        if let ContentRef::Id(id) = &mut clip.border {
            if let Some(new_id) = update(*id) {
                *id = new_id;
                return true;
            }
        }
        false
    }

    /// 边界被删除时取消裁剪
    fn delete_ref_id(&self, content: &mut Content, ids: &HashSet<usize>) -> bool {
        let Some(fields) = clip_of_mut(content) else {
            return false;
        };
        let dangling = matches!(
            fields.clip.as_ref().map(|c| &c.border),
            Some(ContentRef::Id(id)) if ids.contains(id)
        );
        if dangling {
            fields.clip = None;
        }
        dangling
    }

    /// 子内容和内联边界由注册表递归变换
    fn transform(&self, content: &mut Content, _transform: &Transform) -> bool {
        group_of(content).is_some()
    }

    fn explode(&self, content: &Content, _ctx: &ModelContext) -> Option<Vec<Content>> {
        let group = group_of(content)?;
        Some(group.contents.iter().flatten().map(|c| (**c).clone()).collect())
    }

    fn get_geometries(&self, content: &Content, ctx: &ModelContext) -> Result<Geometries, GeometryError> {
        let group = group_of(content).ok_or(GeometryError::Degenerate("not a group"))?;
        Ok(children_geometries(&group.contents, ctx))
    }

    fn render(&self, content: &Content, _geometries: &Geometries, ctx: &ModelContext) -> Vec<Drawable> {
        let Some(group) = group_of(content) else {
            return Vec::new();
        };
        let grouped = Drawable::Group {
            children: children_drawables(&group.contents, ctx),
            transforms: Vec::new(),
        };
        let clipped = clip_border(&group.clip, ctx.contents)
            .and_then(|(border, reverse)| border_outline(&border, ctx).map(|outline| (outline, reverse)));
        match clipped {
            Some((border, reverse)) => vec![Drawable::Clip {
                target: Box::new(grouped),
                border,
                reverse,
            }],
            None => vec![grouped],
        }
    }
}

// ========== 块定义 ==========

fn block_of(content: &Content) -> Option<&BlockContent> {
    match &content.kind {
        ContentKind::Block(block) => Some(block),
        _ => None,
    }
}

fn is_block(content: &Content) -> bool {
    matches!(content.kind, ContentKind::Block(_))
}

impl Model for BlockModel {
    fn type_name(&self) -> &'static str {
        "block"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::CONTAINER
    }

    fn is_valid(&self, content: &Content) -> ValidationResult {
        let block = block_of(content).ok_or_else(|| ValidationError::new(["type"], "block"))?;
        check_point(&block.base, "base")
    }

    fn get_geometries(&self, content: &Content, ctx: &ModelContext) -> Result<Geometries, GeometryError> {
        let block = block_of(content).ok_or(GeometryError::Degenerate("not a block"))?;
        Ok(children_geometries(&block.contents, ctx))
    }

    fn get_snap_points(&self, content: &Content, geometries: &Geometries, _ctx: &ModelContext) -> Vec<SnapPoint> {
        let mut points = default_snap_points(geometries);
        if let Some(block) = block_of(content) {
            points.push(SnapPoint::new(block.base, SnapType::Endpoint));
        }
        points
    }

    fn get_edit_points(&self, content: &Content, _ctx: &ModelContext) -> Vec<Point2> {
        block_of(content).map(|b| vec![b.base]).unwrap_or_default()
    }

    fn update_edit_point(&self, content: &mut Content, index: usize, to: Point2) -> bool {
        match (index, &mut content.kind) {
            (0, ContentKind::Block(block)) => {
                block.base = to;
                true
            }
            _ => false,
        }
    }

    fn render(&self, content: &Content, _geometries: &Geometries, ctx: &ModelContext) -> Vec<Drawable> {
        match block_of(content) {
            Some(block) => vec![Drawable::Group {
                children: children_drawables(&block.contents, ctx),
                transforms: Vec::new(),
            }],
            None => Vec::new(),
        }
    }
}

// ========== 块参照 ==========

fn reference_of(content: &Content) -> Option<&BlockReferenceContent> {
    match &content.kind {
        ContentKind::BlockReference(reference) => Some(reference),
        _ => None,
    }
}

fn reference_of_mut(content: &mut Content) -> Option<&mut BlockReferenceContent> {
    match &mut content.kind {
        ContentKind::BlockReference(reference) => Some(reference),
        _ => None,
    }
}

/// 块坐标 → 参照坐标的变换序列
fn placement(reference: &BlockReferenceContent, block: &BlockContent) -> [Transform; 3] {
    let base = block.base;
    [
        Transform::Scale {
            center: base,
            sx: reference.scale,
            sy: reference.scale,
        },
        Transform::Rotate {
            center: base,
            angle: reference.angle,
        },
        Transform::Move(Point2::new(reference.x, reference.y) - base),
    ]
}

fn place_point(p: Point2, transforms: &[Transform]) -> Point2 {
    transforms.iter().fold(p, |p, t| t.apply(p))
}

/// 解析块参照：(块定义, 放置变换)
fn resolve_block(content: &Content, ctx: &ModelContext) -> Option<(Rc<Content>, [Transform; 3])> {
    let reference = reference_of(content)?;
    let block = ctx.resolve(&reference.ref_id, is_block)?;
    let transforms = placement(reference, block_of(&block)?);
    Some((block, transforms))
}

impl Model for BlockReferenceModel {
    fn type_name(&self) -> &'static str {
        "block reference"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::MOVE | Capabilities::ROTATE | Capabilities::SCALE | Capabilities::EXPLODE
    }

    fn is_valid(&self, content: &Content) -> ValidationResult {
        let reference = reference_of(content)
            .ok_or_else(|| ValidationError::new(["type"], "block reference"))?;
        check_finite(reference.x, "x")?;
        check_finite(reference.y, "y")?;
        check_finite(reference.angle, "angle")?;
        check_positive(reference.scale, "scale")
    }

    fn get_ref_ids(&self, content: &Content) -> Vec<RefId> {
        reference_of(content)
            .map(|r| vec![RefId::required(r.ref_id.clone())])
            .unwrap_or_default()
    }

    fn update_ref_id(&self, content: &mut Content, update: &dyn Fn(usize) -> Option<usize>) -> bool {
        let Some(reference) = reference_of_mut(content) else {
            return false;
        };
        if let ContentRef::Id(id) = &mut reference.ref_id {
            if let Some(new_id) = update(*id) {
                *id = new_id;
                return true;
            }
        }
        false
    }

    /// 只接受不翻转的保形变换
    fn transform(&self, content: &mut Content, transform: &Transform) -> bool {
        if !transform.is_conformal() || transform.is_reflection() {
            return false;
        }
        let Some(reference) = reference_of_mut(content) else {
            return false;
        };
        let position = transform.apply(Point2::new(reference.x, reference.y));
        reference.x = position.x;
        reference.y = position.y;
        reference.angle = transform.apply_angle(reference.angle);
        reference.scale *= transform.length_scale();
        true
    }

    /// 块内容按放置变换复制出来
    fn explode(&self, content: &Content, ctx: &ModelContext) -> Option<Vec<Content>> {
        let (block, transforms) = resolve_block(content, ctx)?;
        let children = block.kind.children()?;
        let registry = ctx.registry();
        Some(
            children
                .iter()
                .flatten()
                .map(|child| {
                    let mut placed = (**child).clone();
                    for transform in &transforms {
                        registry.transform_content(&mut placed, transform);
                    }
                    placed
                })
                .collect(),
        )
    }

    /// 块定义缺失时几何为空
    fn get_geometries(&self, content: &Content, ctx: &ModelContext) -> Result<Geometries, GeometryError> {
        let Some((block, transforms)) = resolve_block(content, ctx) else {
            return Ok(Geometries::empty());
        };
        let source = ctx.geometries(&block);

        let lines: Vec<_> = source
            .lines
            .iter()
            .map(|line| transforms.iter().fold(*line, |l, t| l.transformed(t)))
            .collect();
        let place_all = |points: &[Point2]| -> Vec<Point2> {
            points.iter().map(|p| place_point(*p, &transforms)).collect()
        };
        let rendering_lines: Vec<Vec<Point2>> =
            source.rendering_lines.iter().map(|l| place_all(l)).collect();
        let regions = source
            .regions
            .iter()
            .map(|r| Region {
                points: place_all(&r.points),
                holes: r.holes.iter().map(|h| place_all(h)).collect(),
            })
            .collect();

        let bounding = bounding_of_lines(&lines).or_else(|| {
            let bbox = BoundingBox2::from_points(rendering_lines.iter().flatten().copied());
            (!bbox.is_empty()).then_some(bbox)
        });
        Ok(Geometries {
            lines,
            bounding,
            regions,
            rendering_lines,
        })
    }

    fn get_snap_points(&self, content: &Content, geometries: &Geometries, _ctx: &ModelContext) -> Vec<SnapPoint> {
        let mut points = default_snap_points(geometries);
        if let Some(reference) = reference_of(content) {
            points.push(SnapPoint::new(
                Point2::new(reference.x, reference.y),
                SnapType::Endpoint,
            ));
        }
        points
    }

    fn get_edit_points(&self, content: &Content, _ctx: &ModelContext) -> Vec<Point2> {
        reference_of(content)
            .map(|r| vec![Point2::new(r.x, r.y)])
            .unwrap_or_default()
    }

    fn update_edit_point(&self, content: &mut Content, index: usize, to: Point2) -> bool {
        match (index, reference_of_mut(content)) {
            (0, Some(reference)) => {
                reference.x = to.x;
                reference.y = to.y;
                true
            }
            _ => false,
        }
    }

    fn render(&self, content: &Content, _geometries: &Geometries, ctx: &ModelContext) -> Vec<Drawable> {
        let Some((block, transforms)) = resolve_block(content, ctx) else {
            return Vec::new();
        };
        let Some(children) = block.kind.children() else {
            return Vec::new();
        };
        vec![Drawable::Group {
            children: children_drawables(children, ctx),
            transforms: transforms.to_vec(),
        }]
    }
}
