//! 内容模型（能力记录）
//!
//! 每个内容类型注册一个 [`Model`]。能力由 [`Capabilities`] 标签声明，
//! 结构性的"是否支持填充/是否为容器"之类判断只看模型标签，不看内容形状。
//! 未实现的操作使用默认实现（返回"不支持"）。

use crate::config::KernelConfig;
use crate::content::{Content, ContentArray, PositionRef};
use crate::fields::{self, StrokeFields, StrokeOptions, TextFields, TextOptions};
use crate::geometry::{point_at_param, Geometries, GeometryError};
use crate::kernel::Kernel;
use crate::math::{Point2, Transform};
use crate::patch::Patch;
use crate::refs::{resolve, ContentRef, RefId};
use crate::registry::ContentRegistry;
use crate::render::Drawable;
use crate::snap::{default_snap_points, SnapPoint};
use crate::validation::ValidationResult;
use bitflags::bitflags;
use std::collections::HashSet;
use std::rc::Rc;

bitflags! {
    /// 能力标签与操作标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const STROKE = 1 << 0;
        const FILL = 1 << 1;
        const TEXT = 1 << 2;
        const CLIP = 1 << 3;
        const CONTAINER = 1 << 4;

        const MOVE = 1 << 8;
        const ROTATE = 1 << 9;
        const SCALE = 1 << 10;
        const SKEW = 1 << 11;
        const MIRROR = 1 << 12;
        const EXPLODE = 1 << 13;
        const BREAK = 1 << 14;
        const OFFSET = 1 << 15;
        const JOIN = 1 << 16;
        const REVERSE = 1 << 17;
    }
}

impl Capabilities {
    /// 执行某个变换所需的能力
    pub fn for_transform(transform: &Transform) -> Capabilities {
        match transform {
            Transform::Move(_) => Capabilities::MOVE,
            Transform::Rotate { .. } => Capabilities::ROTATE,
            Transform::Scale { .. } => Capabilities::SCALE,
            Transform::Skew { .. } => Capabilities::SKEW,
            Transform::Mirror { .. } => Capabilities::MIRROR,
        }
    }
}

/// 模型派生几何、渲染时可访问的上下文
#[derive(Clone, Copy)]
pub struct ModelContext<'a> {
    pub kernel: &'a Kernel,
    pub contents: &'a ContentArray,
    /// 进行中、尚未应用到 `contents` 的正向补丁
    pub pending: Option<&'a [Patch]>,
}

impl<'a> ModelContext<'a> {
    pub fn new(kernel: &'a Kernel, contents: &'a ContentArray) -> Self {
        Self {
            kernel,
            contents,
            pending: None,
        }
    }

    pub fn with_pending(mut self, pending: Option<&'a [Patch]>) -> Self {
        self.pending = pending;
        self
    }

    pub fn config(&self) -> &'a KernelConfig {
        self.kernel.config()
    }

    pub fn registry(&self) -> &'a ContentRegistry {
        self.kernel.registry()
    }

    pub fn resolve<F>(&self, content_ref: &ContentRef, filter: F) -> Option<Rc<Content>>
    where
        F: Fn(&Content) -> bool,
    {
        resolve(content_ref, self.contents, filter, self.pending)
    }

    /// 其他内容的几何（经过缓存）
    pub fn geometries(&self, content: &Rc<Content>) -> Rc<Geometries> {
        self.kernel.get_geometries(content, self.contents)
    }

    pub fn snap_points(&self, content: &Rc<Content>) -> Rc<Vec<SnapPoint>> {
        self.kernel.get_snap_points(content, self.contents)
    }

    pub fn render(&self, content: &Rc<Content>) -> Vec<Drawable> {
        self.kernel.render(content, self.contents)
    }

    pub fn stroke_options(&self, fields: &StrokeFields) -> StrokeOptions {
        fields::stroke_options(fields, self.contents, self.config())
    }

    pub fn text_options(&self, fields: &TextFields) -> TextOptions {
        fields::text_options(fields, self.config())
    }

    /// 解析位置引用：几何线参数优先，其次捕捉点序号
    pub fn resolve_position(&self, position: &PositionRef) -> Option<Point2> {
        let target = self.resolve(&position.id, |_| true)?;
        if let Some(param) = position.param {
            return point_at_param(&self.geometries(&target).lines, param);
        }
        let index = position.snap_index?;
        self.snap_points(&target).get(index).map(|s| s.point)
    }
}

/// 内容模型
pub trait Model {
    /// 类型标签
    fn type_name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// 结构校验
    fn is_valid(&self, content: &Content) -> ValidationResult;

    // ========== 引用 ==========

    fn get_ref_ids(&self, _content: &Content) -> Vec<RefId> {
        Vec::new()
    }

    /// 按 `update` 改写引用，返回是否改变
    fn update_ref_id(
        &self,
        _content: &mut Content,
        _update: &dyn Fn(usize) -> Option<usize>,
    ) -> bool {
        false
    }

    /// 清除指向已删除内容的非必需引用，返回是否改变
    fn delete_ref_id(&self, _content: &mut Content, _ids: &HashSet<usize>) -> bool {
        false
    }

    // ========== 编辑 ==========

    /// 原地变换；不支持该变换时返回 false 且不修改内容
    fn transform(&self, _content: &mut Content, _transform: &Transform) -> bool {
        false
    }

    fn explode(&self, _content: &Content, _ctx: &ModelContext) -> Option<Vec<Content>> {
        None
    }

    /// 在给定点处打断
    fn break_at(
        &self,
        _content: &Content,
        _points: &[Point2],
        _ctx: &ModelContext,
    ) -> Option<Vec<Content>> {
        None
    }

    /// 向 `point` 所在一侧偏移 `distance`
    fn offset(
        &self,
        _content: &Content,
        _point: Point2,
        _distance: f64,
        _ctx: &ModelContext,
    ) -> Option<Content> {
        None
    }

    fn join(&self, _content: &Content, _target: &Content, _ctx: &ModelContext) -> Option<Content> {
        None
    }

    fn reverse(&self, _content: &Content) -> Option<Content> {
        None
    }

    // ========== 派生数据 ==========

    fn get_geometries(
        &self,
        content: &Content,
        ctx: &ModelContext,
    ) -> Result<Geometries, GeometryError>;

    fn get_snap_points(
        &self,
        _content: &Content,
        geometries: &Geometries,
        _ctx: &ModelContext,
    ) -> Vec<SnapPoint> {
        default_snap_points(geometries)
    }

    fn get_edit_points(&self, _content: &Content, _ctx: &ModelContext) -> Vec<Point2> {
        Vec::new()
    }

    /// 拖动第 `index` 个编辑点到 `to`，返回是否改变
    fn update_edit_point(&self, _content: &mut Content, _index: usize, _to: Point2) -> bool {
        false
    }

    /// 渲染；`geometries` 为该内容的缓存几何
    fn render(&self, content: &Content, geometries: &Geometries, ctx: &ModelContext) -> Vec<Drawable>;
}
