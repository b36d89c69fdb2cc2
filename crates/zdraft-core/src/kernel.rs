//! 内核
//!
//! 持有注册表、配置和派生数据缓存，是模型派生几何、捕捉点、编辑点与渲染的唯一入口。
//! 缓存键为内容身份加上所有传递引用内容的身份。

use crate::cache::DerivedCaches;
use crate::config::KernelConfig;
use crate::content::{Content, ContentArray};
use crate::geometry::Geometries;
use crate::math::Point2;
use crate::model::ModelContext;
use crate::patch::{produce_with_patches, Patch, PatchError};
use crate::refs::iterate_ref_contents;
use crate::registry::ContentRegistry;
use crate::render::Drawable;
use crate::snap::SnapPoint;
use crate::validation::ValidationResult;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// 几何内核
pub struct Kernel {
    registry: ContentRegistry,
    config: KernelConfig,
    caches: DerivedCaches,
    /// 正在渲染的内容（块自引用时终止递归）
    rendering: RefCell<Vec<*const Content>>,
}

impl Kernel {
    /// 使用内置内容类型创建内核
    pub fn new(config: KernelConfig) -> Self {
        Self::with_registry(ContentRegistry::with_default_models(), config)
    }

    pub fn with_registry(registry: ContentRegistry, config: KernelConfig) -> Self {
        Self {
            registry,
            config,
            caches: DerivedCaches::default(),
            rendering: RefCell::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &ContentRegistry {
        &self.registry
    }

    /// 修改注册表会使所有派生数据失效
    pub fn registry_mut(&mut self) -> &mut ContentRegistry {
        self.caches.clear();
        &mut self.registry
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: KernelConfig) {
        self.caches.clear();
        self.config = config;
    }

    pub fn caches(&self) -> &DerivedCaches {
        &self.caches
    }

    pub fn context<'a>(&'a self, contents: &'a ContentArray) -> ModelContext<'a> {
        ModelContext::new(self, contents)
    }

    pub fn validate(&self, content: &Content) -> ValidationResult {
        self.registry.validate(content)
    }

    /// 内容传递引用到的全部内容（缓存键的一部分）
    pub fn dependencies(&self, content: &Rc<Content>, contents: &ContentArray) -> Vec<Rc<Content>> {
        let ref_ids = self.registry.content_ref_ids(content);
        if ref_ids.is_empty() {
            return Vec::new();
        }
        iterate_ref_contents(&self.registry, &ref_ids, contents, &[content.clone()])
    }

    /// 派生几何（缓存）
    ///
    /// 派生失败时记录警告并返回空几何，不会中断调用方。
    pub fn get_geometries(&self, content: &Rc<Content>, contents: &ContentArray) -> Rc<Geometries> {
        let deps = self.dependencies(content, contents);
        self.caches.geometries.get_or_compute(content, &deps, || {
            let Some(model) = self.registry.lookup(content) else {
                debug!("No model for content type {}", content.type_name());
                return Geometries::empty();
            };
            match model.get_geometries(content, &self.context(contents)) {
                Ok(geometries) => geometries,
                Err(e) => {
                    warn!("Failed to derive {} geometries: {}", content.type_name(), e);
                    Geometries::empty()
                }
            }
        })
    }

    /// 捕捉点（缓存）
    pub fn get_snap_points(&self, content: &Rc<Content>, contents: &ContentArray) -> Rc<Vec<SnapPoint>> {
        let deps = self.dependencies(content, contents);
        self.caches.snap_points.get_or_compute(content, &deps, || {
            let Some(model) = self.registry.lookup(content) else {
                return Vec::new();
            };
            let geometries = self.get_geometries(content, contents);
            model.get_snap_points(content, &geometries, &self.context(contents))
        })
    }

    /// 编辑点（缓存）
    pub fn get_edit_points(&self, content: &Rc<Content>, contents: &ContentArray) -> Rc<Vec<Point2>> {
        let deps = self.dependencies(content, contents);
        self.caches.edit_points.get_or_compute(content, &deps, || {
            self.registry
                .lookup(content)
                .map(|model| model.get_edit_points(content, &self.context(contents)))
                .unwrap_or_default()
        })
    }

    /// 拖动第 `index` 个编辑点到 `to`
    ///
    /// 返回新内容与相对内容本身的正向/反向补丁；编辑点无效时返回原内容和空补丁。
    pub fn update_edit_point(
        &self,
        content: &Rc<Content>,
        index: usize,
        to: Point2,
    ) -> Result<(Rc<Content>, Vec<Patch>, Vec<Patch>), PatchError> {
        let Some(model) = self.registry.lookup(content) else {
            return Ok((content.clone(), Vec::new(), Vec::new()));
        };
        produce_with_patches(content, |draft| {
            if !model.update_edit_point(draft, index, to) {
                debug!("Edit point {} not supported by {}", index, content.type_name());
            }
        })
    }

    /// 渲染为显示列表；不可见或正在渲染中的内容返回空
    pub fn render(&self, content: &Rc<Content>, contents: &ContentArray) -> Vec<Drawable> {
        if !content.is_visible() {
            return Vec::new();
        }
        let Some(model) = self.registry.lookup(content) else {
            return Vec::new();
        };

        let ptr = Rc::as_ptr(content);
        if self.rendering.borrow().contains(&ptr) {
            debug!("Reference cycle while rendering {}", content.type_name());
            return Vec::new();
        }
        let geometries = self.get_geometries(content, contents);
        self.rendering.borrow_mut().push(ptr);
        let drawables = model.render(content, &geometries, &self.context(contents));
        self.rendering.borrow_mut().pop();
        drawables
    }

    /// 按 z 排序渲染所有可见顶层内容
    pub fn render_all(&self, contents: &ContentArray) -> Vec<Drawable> {
        let mut live: Vec<&Rc<Content>> = contents.iter().flatten().collect();
        live.sort_by(|a, b| {
            a.z.unwrap_or(0.0)
                .partial_cmp(&b.z.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        live.into_iter()
            .flat_map(|content| self.render(content, contents))
            .collect()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{
        content_array, BlockContent, BlockReferenceContent, CircleContent, ContentKind,
        LineContent, LinearDimensionContent, PositionRef, StrokeStyleContent,
    };
    use crate::fields::{StrokeFields, TextFields};
    use crate::refs::ContentRef;

    fn line(from: Point2, to: Point2) -> Content {
        Content::from(LineContent::new(vec![from, to]))
    }

    #[test]
    fn test_geometries_cached_by_identity() {
        let kernel = Kernel::default();
        let contents = content_array([line(Point2::origin(), Point2::new(10.0, 0.0))]);
        let content = contents[0].clone().unwrap();

        let first = kernel.get_geometries(&content, &contents);
        let second = kernel.get_geometries(&content, &contents);
        assert!(Rc::ptr_eq(&first, &second));

        let (edited, _, _) = produce_with_patches(&content, |draft| {
            if let ContentKind::Line(l) = &mut draft.kind {
                l.points[1] = Point2::new(20.0, 0.0);
            }
        })
        .unwrap();
        let recomputed = kernel.get_geometries(&edited, &contents);
        assert!(!Rc::ptr_eq(&first, &recomputed));
        assert_ne!(first.bounding, recomputed.bounding);

        // 旧键仍可取回旧值
        let stale = kernel.caches().geometries.get(&content, &[]).unwrap();
        assert!(Rc::ptr_eq(&stale, &first));
    }

    #[test]
    fn test_dependency_change_recomputes() {
        let kernel = Kernel::default();
        let dimension = LinearDimensionContent {
            p1: Point2::origin(),
            p2: Point2::new(1.0, 0.0),
            position: Point2::new(0.0, 5.0),
            ref1: None,
            ref2: Some(PositionRef {
                id: ContentRef::Id(0),
                snap_index: None,
                param: Some(1.0),
            }),
            stroke: StrokeFields::default(),
            font: TextFields::default(),
        };
        let mut contents = content_array([
            line(Point2::origin(), Point2::new(10.0, 0.0)),
            Content::from(dimension),
        ]);
        let dim = contents[1].clone().unwrap();
        let before = kernel.get_geometries(&dim, &contents);
        assert!(Rc::ptr_eq(&before, &kernel.get_geometries(&dim, &contents)));

        contents[0] = Some(Rc::new(line(Point2::origin(), Point2::new(30.0, 0.0))));
        let after = kernel.get_geometries(&dim, &contents);
        assert!(!Rc::ptr_eq(&before, &after));
        let max_x = |g: &Geometries| g.bounding.map(|b| b.max.x).unwrap_or(0.0);
        assert!(max_x(&after) > max_x(&before));
    }

    #[test]
    fn test_stroke_style_is_dependency() {
        let kernel = Kernel::default();
        let style = |dash: Vec<f64>| {
            Content::from(StrokeStyleContent {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 2.0,
                stroke: StrokeFields {
                    dash_array: Some(dash),
                    ..Default::default()
                },
                is_current: false,
            })
        };
        let mut dashed = LineContent::new(vec![Point2::origin(), Point2::new(10.0, 0.0)]);
        dashed.stroke.stroke_style_id = Some(ContentRef::Id(0));
        let mut contents = content_array([style(vec![]), Content::from(dashed)]);
        let target = contents[1].clone().unwrap();
        assert_eq!(kernel.get_geometries(&target, &contents).rendering_lines.len(), 1);

        contents[0] = Some(Rc::new(style(vec![2.0, 3.0])));
        assert_eq!(kernel.get_geometries(&target, &contents).rendering_lines.len(), 2);
    }

    #[test]
    fn test_block_self_reference_terminates() {
        let kernel = Kernel::default();
        let block = BlockContent {
            contents: content_array([
                Content::from(CircleContent::new(Point2::origin(), 1.0)),
                Content::from(BlockReferenceContent::new(0, Point2::new(5.0, 0.0))),
            ]),
            base: Point2::origin(),
        };
        let contents = content_array([
            Content::from(block),
            Content::from(BlockReferenceContent::new(0, Point2::new(20.0, 0.0))),
        ]);
        let reference = contents[1].clone().unwrap();

        let geometries = kernel.get_geometries(&reference, &contents);
        assert!(!geometries.lines.is_empty());
        assert!(!kernel.render(&reference, &contents).is_empty());
        assert!(!kernel.get_snap_points(&reference, &contents).is_empty());
    }

    #[test]
    fn test_block_cycle_independent_of_query_order() {
        let block = BlockContent {
            contents: content_array([
                Content::from(CircleContent::new(Point2::origin(), 1.0)),
                Content::from(BlockReferenceContent::new(0, Point2::new(5.0, 0.0))),
            ]),
            base: Point2::origin(),
        };
        let contents = content_array([
            Content::from(block),
            Content::from(BlockReferenceContent::new(0, Point2::new(20.0, 0.0))),
        ]);
        let outer = contents[1].clone().unwrap();
        let inner = contents[0].as_ref().unwrap().kind.children().unwrap()[1]
            .clone()
            .unwrap();

        let inner_first = Kernel::default();
        let a_inner = inner_first.get_geometries(&inner, &contents).lines.len();
        let a_outer = inner_first.get_geometries(&outer, &contents).lines.len();

        let outer_first = Kernel::default();
        let b_outer = outer_first.get_geometries(&outer, &contents).lines.len();
        let b_inner = outer_first.get_geometries(&inner, &contents).lines.len();

        assert!(a_inner > 0);
        assert_eq!(a_inner, b_inner);
        assert_eq!(a_outer, b_outer);
    }

    #[test]
    fn test_invisible_content_not_rendered() {
        let kernel = Kernel::default();
        let mut hidden = line(Point2::origin(), Point2::new(1.0, 0.0));
        hidden.visible = Some(false);
        let contents = content_array([hidden, line(Point2::origin(), Point2::new(0.0, 1.0))]);
        assert_eq!(kernel.render_all(&contents).len(), 1);
    }

    #[test]
    fn test_geometry_error_degrades_to_empty() {
        let kernel = Kernel::default();
        let contents = content_array([Content::from(CircleContent::new(Point2::origin(), -1.0))]);
        let circle = contents[0].clone().unwrap();
        assert!(kernel.get_geometries(&circle, &contents).is_empty());
    }

    #[test]
    fn test_update_edit_point() {
        let kernel = Kernel::default();
        let contents = content_array([line(Point2::origin(), Point2::new(1.0, 0.0))]);
        let content = contents[0].clone().unwrap();

        let (moved, forward, reverse) = kernel
            .update_edit_point(&content, 1, Point2::new(4.0, 4.0))
            .unwrap();
        assert!(!forward.is_empty() && !reverse.is_empty());
        match &moved.kind {
            ContentKind::Line(l) => assert_eq!(l.points[1], Point2::new(4.0, 4.0)),
            other => panic!("unexpected {:?}", other),
        }

        let (same, forward, _) = kernel.update_edit_point(&content, 9, Point2::origin()).unwrap();
        assert!(Rc::ptr_eq(&same, &content));
        assert!(forward.is_empty());
    }

    #[test]
    fn test_edit_points_cached() {
        let kernel = Kernel::default();
        let contents = content_array([line(Point2::origin(), Point2::new(1.0, 0.0))]);
        let content = contents[0].clone().unwrap();
        let first = kernel.get_edit_points(&content, &contents);
        assert_eq!(first.len(), 2);
        assert!(Rc::ptr_eq(&first, &kernel.get_edit_points(&content, &contents)));
    }
}
