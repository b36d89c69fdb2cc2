//! 内容注册表
//!
//! 类型标签 → 模型。启动时显式构造一次，由 [`Kernel`](crate::kernel::Kernel) 持有，
//! 插件在编辑器运行前调用 [`ContentRegistry::register`] 注册新类型。
//!
//! 注册表层面的编辑操作会结构性地递归进入容器子内容。

use crate::content::{Content, ContentArray};
use crate::fields::ClipBorder;
use crate::math::{Point2, Transform, Vector2};
use crate::model::{Capabilities, Model, ModelContext};
use crate::patch::PathSegment;
use crate::refs::{ContentRef, RefId};
use crate::validation::{ValidationError, ValidationResult};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::debug;

/// 内容注册表
#[derive(Default)]
pub struct ContentRegistry {
    models: HashMap<&'static str, Box<dyn Model>>,
}

impl ContentRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册全部内置内容类型
    pub fn with_default_models() -> Self {
        let mut registry = Self::new();
        crate::models::register_default_models(&mut registry);
        registry
    }

    /// 注册模型；同名类型会被覆盖并返回旧模型
    pub fn register(&mut self, model: Box<dyn Model>) -> Option<Box<dyn Model>> {
        let name = model.type_name();
        debug!("Register content type: {}", name);
        self.models.insert(name, model)
    }

    pub fn lookup(&self, content: &Content) -> Option<&dyn Model> {
        self.lookup_type(content.type_name())
    }

    pub fn lookup_type(&self, type_name: &str) -> Option<&dyn Model> {
        self.models.get(type_name).map(|m| m.as_ref())
    }

    /// 已注册的类型标签（排序）
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.models.keys().copied().collect();
        names.sort_unstable();
        names
    }

    // ========== 校验 ==========

    /// 校验内容；容器子内容和内联裁剪边界一并校验
    pub fn validate(&self, content: &Content) -> ValidationResult {
        let Some(model) = self.lookup(content) else {
            return Err(ValidationError::new(["type"], "registered content type"));
        };
        model.is_valid(content)?;

        if let Some(children) = content.kind.children() {
            for (i, child) in children.iter().enumerate() {
                if let Some(child) = child {
                    self.validate(child).map_err(|e| {
                        e.prefixed(&[PathSegment::from("contents"), PathSegment::from(i)])
                    })?;
                }
            }
        }

        if let Some(ClipBorder {
            border: ContentRef::Inline(border),
            ..
        }) = content.kind.clip_fields().and_then(|f| f.clip.as_ref())
        {
            self.validate(border)
                .map_err(|e| e.prefixed(&[PathSegment::from("clip"), PathSegment::from("border")]))?;
        }
        Ok(())
    }

    /// 校验未定型的负载（例如粘贴的内容），成功时返回内容
    pub fn validate_value(&self, value: &Value) -> Result<Content, ValidationError> {
        let Some(object) = value.as_object() else {
            return Err(ValidationError::new(Vec::<PathSegment>::new(), "object"));
        };
        let Some(type_name) = object.get("type").and_then(Value::as_str) else {
            return Err(ValidationError::new(["type"], "string"));
        };
        if self.lookup_type(type_name).is_none() {
            return Err(ValidationError::new(["type"], "registered content type"));
        }
        let content: Content = serde_json::from_value(value.clone())
            .map_err(|e| ValidationError::new(Vec::<PathSegment>::new(), e.to_string()))?;
        self.validate(&content)?;
        Ok(content)
    }

    // ========== 能力查询 ==========

    pub fn capabilities(&self, content: &Content) -> Capabilities {
        self.lookup(content)
            .map(|m| m.capabilities())
            .unwrap_or_else(Capabilities::empty)
    }

    pub fn has_capability(&self, content: &Content, capability: Capabilities) -> bool {
        self.capabilities(content).contains(capability)
    }

    // ========== 变换 ==========

    /// 原地变换内容，递归进入容器子内容和内联裁剪边界
    pub fn transform_content(&self, content: &mut Content, transform: &Transform) -> bool {
        let Some(model) = self.lookup(content) else {
            return false;
        };
        if !model.capabilities().contains(Capabilities::for_transform(transform)) {
            return false;
        }
        if !model.transform(content, transform) {
            return false;
        }

        if let Some(children) = content.kind.children_mut() {
            for child in children.iter_mut().flatten() {
                self.transform_content(Rc::make_mut(child), transform);
            }
        }
        if let Some(ClipBorder {
            border: ContentRef::Inline(border),
            ..
        }) = content.kind.clip_fields_mut().and_then(|f| f.clip.as_mut())
        {
            self.transform_content(Rc::make_mut(border), transform);
        }
        true
    }

    pub fn move_content(&self, content: &mut Content, offset: Vector2) -> bool {
        self.transform_content(content, &Transform::Move(offset))
    }

    pub fn rotate_content(&self, content: &mut Content, center: Point2, angle: f64) -> bool {
        self.transform_content(content, &Transform::Rotate { center, angle })
    }

    pub fn scale_content(&self, content: &mut Content, center: Point2, sx: f64, sy: f64) -> bool {
        self.transform_content(content, &Transform::Scale { center, sx, sy })
    }

    pub fn skew_content(&self, content: &mut Content, center: Point2, sx: f64, sy: f64) -> bool {
        self.transform_content(content, &Transform::Skew { center, sx, sy })
    }

    pub fn mirror_content(&self, content: &mut Content, p1: Point2, p2: Point2) -> bool {
        self.transform_content(content, &Transform::Mirror { p1, p2 })
    }

    // ========== 拆分与组合 ==========

    fn model_with(&self, content: &Content, capability: Capabilities) -> Option<&dyn Model> {
        self.lookup(content)
            .filter(|m| m.capabilities().contains(capability))
    }

    pub fn explode(&self, content: &Content, ctx: &ModelContext) -> Option<Vec<Content>> {
        self.model_with(content, Capabilities::EXPLODE)?
            .explode(content, ctx)
    }

    pub fn break_content(
        &self,
        content: &Content,
        points: &[Point2],
        ctx: &ModelContext,
    ) -> Option<Vec<Content>> {
        self.model_with(content, Capabilities::BREAK)?
            .break_at(content, points, ctx)
    }

    pub fn offset(
        &self,
        content: &Content,
        point: Point2,
        distance: f64,
        ctx: &ModelContext,
    ) -> Option<Content> {
        self.model_with(content, Capabilities::OFFSET)?
            .offset(content, point, distance, ctx)
    }

    pub fn join(&self, content: &Content, target: &Content, ctx: &ModelContext) -> Option<Content> {
        self.model_with(content, Capabilities::JOIN)?
            .join(content, target, ctx)
    }

    pub fn reverse(&self, content: &Content) -> Option<Content> {
        self.model_with(content, Capabilities::REVERSE)?.reverse(content)
    }

    // ========== 引用 ==========

    /// 内容自身声明的引用，加上所有容器子内容的引用
    pub fn content_ref_ids(&self, content: &Content) -> Vec<RefId> {
        let mut ids = self
            .lookup(content)
            .map(|m| m.get_ref_ids(content))
            .unwrap_or_default();
        if let Some(children) = content.kind.children() {
            for child in children.iter().flatten() {
                ids.extend(self.content_ref_ids(child));
            }
        }
        ids
    }

    /// 改写引用（含子内容）；没有改变时返回 None，原内容保持共享
    pub fn update_ref_ids(
        &self,
        content: &Rc<Content>,
        update: &dyn Fn(usize) -> Option<usize>,
    ) -> Option<Rc<Content>> {
        self.rewrite_refs(
            content,
            &|r| r.id.as_id().and_then(update).is_some(),
            &|model, draft| model.update_ref_id(draft, update),
        )
    }

    /// 清除指向 `ids` 的非必需引用（含子内容）
    pub fn delete_ref_ids(&self, content: &Rc<Content>, ids: &HashSet<usize>) -> Option<Rc<Content>> {
        self.rewrite_refs(
            content,
            &|r| !r.required && r.id.as_id().is_some_and(|id| ids.contains(&id)),
            &|model, draft| model.delete_ref_id(draft, ids),
        )
    }

    fn rewrite_refs(
        &self,
        content: &Rc<Content>,
        touches: &dyn Fn(&RefId) -> bool,
        apply: &dyn Fn(&dyn Model, &mut Content) -> bool,
    ) -> Option<Rc<Content>> {
        let mut draft: Option<Content> = None;

        if let Some(model) = self.lookup(content) {
            if model.get_ref_ids(content).iter().any(touches) {
                let mut updated = (**content).clone();
                if apply(model, &mut updated) {
                    draft = Some(updated);
                }
            }
        }

        if let Some(children) = content.kind.children() {
            let mut new_children: Option<ContentArray> = None;
            for (i, child) in children.iter().enumerate() {
                let Some(child) = child else {
                    continue;
                };
                if let Some(updated) = self.rewrite_refs(child, touches, apply) {
                    new_children.get_or_insert_with(|| children.clone())[i] = Some(updated);
                }
            }
            if let Some(new_children) = new_children {
                let updated = draft.get_or_insert_with(|| (**content).clone());
                if let Some(slot) = updated.kind.children_mut() {
                    *slot = new_children;
                }
            }
        }

        draft.map(Rc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{content_array, CircleContent, ContentKind, GroupContent, LineContent};
    use serde_json::json;

    #[test]
    fn test_unregistered_type_fails_validation() {
        let registry = ContentRegistry::new();
        let content = Content::from(CircleContent::new(Point2::origin(), 1.0));
        let err = registry.validate(&content).unwrap_err();
        assert_eq!(err.path, vec![PathSegment::from("type")]);

        let registry = ContentRegistry::with_default_models();
        let err = registry
            .validate_value(&json!({ "type": "spline", "points": [] }))
            .unwrap_err();
        assert_eq!(err.path, vec![PathSegment::from("type")]);
    }

    #[test]
    fn test_validate_value() {
        let registry = ContentRegistry::with_default_models();
        let content = registry
            .validate_value(&json!({ "type": "circle", "x": 1, "y": 2, "r": 3 }))
            .unwrap();
        assert!(matches!(content.kind, ContentKind::Circle(_)));

        let err = registry
            .validate_value(&json!({ "type": "circle", "x": 1, "y": 2, "r": -3 }))
            .unwrap_err();
        assert_eq!(err.path, vec![PathSegment::from("r")]);

        assert!(registry.validate_value(&json!([1, 2])).is_err());
        assert!(registry.validate_value(&json!({ "type": "line" })).is_err());
    }

    #[test]
    fn test_nested_validation_path() {
        let registry = ContentRegistry::with_default_models();
        let group = GroupContent::new(content_array([
            Content::from(CircleContent::new(Point2::origin(), 1.0)),
            Content::from(LineContent::new(vec![Point2::origin()])),
        ]));
        let err = registry.validate(&Content::from(group)).unwrap_err();
        assert_eq!(
            err.path,
            vec![
                PathSegment::from("contents"),
                PathSegment::from(1),
                PathSegment::from("points")
            ]
        );
    }

    #[test]
    fn test_capability_queries() {
        let registry = ContentRegistry::with_default_models();
        let circle = Content::from(CircleContent::new(Point2::origin(), 1.0));
        assert!(registry.has_capability(&circle, Capabilities::FILL));
        assert!(!registry.has_capability(&circle, Capabilities::CONTAINER));
        assert!(!registry.has_capability(&circle, Capabilities::SKEW));

        let group = Content::from(GroupContent::new(Vec::new()));
        assert!(registry.has_capability(&group, Capabilities::CONTAINER | Capabilities::CLIP));
    }

    #[test]
    fn test_move_group_recurses() {
        let registry = ContentRegistry::with_default_models();
        let shared = Rc::new(Content::from(CircleContent::new(Point2::origin(), 1.0)));
        let mut group = Content::from(GroupContent::new(vec![Some(shared.clone())]));

        assert!(registry.move_content(&mut group, Vector2::new(5.0, 0.0)));
        let child = group.kind.children().unwrap()[0].as_ref().unwrap();
        assert!(matches!(&child.kind, ContentKind::Circle(c) if c.x == 5.0));
        // 原始子内容未被修改
        assert!(matches!(&shared.kind, ContentKind::Circle(c) if c.x == 0.0));
    }

    #[test]
    fn test_circle_rejects_skew() {
        let registry = ContentRegistry::with_default_models();
        let mut circle = Content::from(CircleContent::new(Point2::origin(), 1.0));
        let before = circle.clone();
        assert!(!registry.skew_content(&mut circle, Point2::origin(), 1.0, 0.0));
        assert!(!registry.scale_content(&mut circle, Point2::origin(), 2.0, 1.0));
        assert_eq!(circle, before);
        assert!(registry.scale_content(&mut circle, Point2::origin(), 2.0, 2.0));
        assert!(matches!(&circle.kind, ContentKind::Circle(c) if c.r == 2.0));
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = ContentRegistry::with_default_models();
        let count = registry.type_names().len();
        let previous = registry.register(Box::new(crate::models::CircleModel));
        assert!(previous.is_some());
        assert_eq!(registry.type_names().len(), count);
    }
}
