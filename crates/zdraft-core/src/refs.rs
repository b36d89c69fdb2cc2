//! 引用图
//!
//! 内容之间通过 [`ContentRef`] 互相引用：数组下标，或内联的内容值。
//! [`RefId`] 附带 `required` 标志，必需引用会阻止目标被删除。
//!
//! 所有遍历都携带祖先列表和已访问集合，引用成环时也能终止。

use crate::content::{Content, ContentArray, SelectionPath};
use crate::patch::{Patch, PatchOp, PathSegment};
use crate::registry::ContentRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::rc::Rc;

/// 内容引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentRef {
    /// 内容数组下标
    Id(usize),
    /// 内联内容（不持久化到数组中的临时边界等）
    Inline(Rc<Content>),
}

impl ContentRef {
    pub fn as_id(&self) -> Option<usize> {
        match self {
            ContentRef::Id(id) => Some(*id),
            ContentRef::Inline(_) => None,
        }
    }
}

impl From<usize> for ContentRef {
    fn from(value: usize) -> Self {
        ContentRef::Id(value)
    }
}

/// 内容声明的一个引用
#[derive(Debug, Clone, PartialEq)]
pub struct RefId {
    pub id: ContentRef,
    /// 必需引用：目标不可删除
    pub required: bool,
}

impl RefId {
    pub fn required(id: ContentRef) -> Self {
        Self { id, required: true }
    }

    pub fn optional(id: ContentRef) -> Self {
        Self {
            id,
            required: false,
        }
    }
}

/// 解析引用
///
/// - 内联引用返回自身
/// - 下标引用返回数组中存活的内容
/// - 以上都落空时，在进行中的补丁列表里查找 `[id]` 处最近的 add/replace
///
/// `filter` 不通过、已删除、越界都返回 None。
pub fn resolve<F>(
    content_ref: &ContentRef,
    contents: &ContentArray,
    filter: F,
    pending: Option<&[Patch]>,
) -> Option<Rc<Content>>
where
    F: Fn(&Content) -> bool,
{
    let id = match content_ref {
        ContentRef::Inline(content) => return filter(&**content).then(|| content.clone()),
        ContentRef::Id(id) => *id,
    };

    if let Some(Some(content)) = contents.get(id) {
        if filter(&**content) {
            return Some(content.clone());
        }
    }

    let patches = pending?;
    let patch = patches
        .iter()
        .rev()
        .find(|p| p.path.as_slice() == [PathSegment::Index(id)])?;
    match patch.op {
        PatchOp::Add | PatchOp::Replace => {
            let content: Content = serde_json::from_value(patch.value.clone()?).ok()?;
            filter(&content).then(|| Rc::new(content))
        }
        PatchOp::Remove => None,
    }
}

/// 内容直接声明的引用（含容器子内容的引用）
pub fn iterate_ref_ids(registry: &ContentRegistry, content: &Content) -> Vec<RefId> {
    registry.content_ref_ids(content)
}

/// 深度优先遍历引用到的内容及其传递引用
///
/// `parents` 为祖先列表，祖先不会被再次展开；每个内容最多出现一次。
pub fn iterate_ref_contents(
    registry: &ContentRegistry,
    ref_ids: &[RefId],
    contents: &ContentArray,
    parents: &[Rc<Content>],
) -> Vec<Rc<Content>> {
    let mut ancestors = parents.to_vec();
    let mut visited: HashSet<*const Content> = parents.iter().map(Rc::as_ptr).collect();
    let mut result = Vec::new();
    walk_refs(registry, ref_ids, contents, &mut ancestors, &mut visited, &mut result);
    result
}

fn walk_refs(
    registry: &ContentRegistry,
    ref_ids: &[RefId],
    contents: &ContentArray,
    ancestors: &mut Vec<Rc<Content>>,
    visited: &mut HashSet<*const Content>,
    result: &mut Vec<Rc<Content>>,
) {
    for ref_id in ref_ids {
        let Some(content) = resolve(&ref_id.id, contents, |_| true, None) else {
            continue;
        };
        if ancestors.iter().any(|a| Rc::ptr_eq(a, &content)) {
            continue;
        }
        if !visited.insert(Rc::as_ptr(&content)) {
            continue;
        }
        result.push(content.clone());

        let nested = registry.content_ref_ids(&content);
        ancestors.push(content);
        walk_refs(registry, &nested, contents, ancestors, visited, result);
        ancestors.pop();
    }
}

/// 遍历所有内容（递归进入容器），返回 (选择路径, 内容)
pub fn iterate_all_contents(
    registry: &ContentRegistry,
    contents: &ContentArray,
) -> Vec<(SelectionPath, Rc<Content>)> {
    let mut result = Vec::new();
    let mut visited = HashSet::new();
    walk_contents(
        registry,
        contents,
        &mut Vec::new(),
        &mut Vec::new(),
        &mut visited,
        &mut result,
    );
    result
}

fn walk_contents(
    registry: &ContentRegistry,
    contents: &ContentArray,
    path: &mut SelectionPath,
    ancestors: &mut Vec<Rc<Content>>,
    visited: &mut HashSet<*const Content>,
    result: &mut Vec<(SelectionPath, Rc<Content>)>,
) {
    for (index, slot) in contents.iter().enumerate() {
        let Some(content) = slot else {
            continue;
        };
        if ancestors.iter().any(|a| Rc::ptr_eq(a, content)) || !visited.insert(Rc::as_ptr(content)) {
            continue;
        }
        path.push(index);
        result.push((path.clone(), content.clone()));

        if registry.has_capability(content, crate::model::Capabilities::CONTAINER) {
            if let Some(children) = content.kind.children() {
                ancestors.push(content.clone());
                walk_contents(registry, children, path, ancestors, visited, result);
                ancestors.pop();
            }
        }
        path.pop();
    }
}

/// 按选择路径取内容
pub fn content_at_path(contents: &ContentArray, path: &[usize]) -> Option<Rc<Content>> {
    let (first, rest) = path.split_first()?;
    let content = contents.get(*first)?.clone()?;
    if rest.is_empty() {
        return Some(content);
    }
    content_at_path(content.kind.children()?, rest)
}

/// 内容是否可以删除：非只读，且没有其他存活内容对它持有必需引用
pub fn is_deletable(registry: &ContentRegistry, index: usize, contents: &ContentArray) -> bool {
    let Some(Some(target)) = contents.get(index) else {
        return false;
    };
    if target.is_readonly() {
        return false;
    }
    !contents.iter().enumerate().any(|(i, slot)| {
        i != index
            && slot.as_ref().is_some_and(|content| {
                registry
                    .content_ref_ids(content)
                    .iter()
                    .any(|r| r.required && r.id.as_id() == Some(index))
            })
    })
}

/// 删除选中的内容：置为墓碑，然后清除其余内容中指向它们的非必需引用
///
/// 返回被清除过引用的内容下标。
pub fn delete_selected(
    registry: &ContentRegistry,
    contents: &mut ContentArray,
    indexes: &[usize],
) -> Vec<usize> {
    let removed: HashSet<usize> = indexes.iter().copied().collect();
    for &index in indexes {
        if let Some(slot) = contents.get_mut(index) {
            *slot = None;
        }
    }

    let mut touched = Vec::new();
    for (i, slot) in contents.iter_mut().enumerate() {
        let Some(content) = slot else {
            continue;
        };
        if let Some(updated) = registry.delete_ref_ids(content, &removed) {
            *content = updated;
            touched.push(i);
        }
    }
    touched
}

/// 按 `update` 改写内容里的引用；没有改变时返回 None
pub fn update_ref_ids(
    registry: &ContentRegistry,
    content: &Rc<Content>,
    update: &dyn Fn(usize) -> Option<usize>,
) -> Option<Rc<Content>> {
    registry.update_ref_ids(content, update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{
        content_array, BlockContent, BlockReferenceContent, CircleContent, ContentKind,
        GroupContent, LineContent,
    };
    use crate::fields::StrokeFields;
    use crate::math::Point2;
    use crate::patch::Patch;

    fn registry() -> ContentRegistry {
        ContentRegistry::with_default_models()
    }

    fn block_with_reference_to(target: usize) -> Content {
        Content::from(BlockContent {
            contents: content_array([Content::from(BlockReferenceContent::new(
                target,
                Point2::origin(),
            ))]),
            base: Point2::origin(),
        })
    }

    #[test]
    fn test_resolve() {
        let contents: ContentArray = vec![
            Some(Rc::new(Content::from(CircleContent::new(Point2::origin(), 1.0)))),
            None,
        ];
        assert!(resolve(&ContentRef::Id(0), &contents, |_| true, None).is_some());
        assert!(resolve(&ContentRef::Id(1), &contents, |_| true, None).is_none());
        assert!(resolve(&ContentRef::Id(9), &contents, |_| true, None).is_none());
        assert!(resolve(
            &ContentRef::Id(0),
            &contents,
            |c| matches!(c.kind, ContentKind::Line(_)),
            None
        )
        .is_none());

        let inline = ContentRef::Inline(Rc::new(Content::from(CircleContent::new(
            Point2::origin(),
            2.0,
        ))));
        assert!(resolve(&inline, &contents, |_| true, None).is_some());
    }

    #[test]
    fn test_resolve_pending_patch() {
        let contents: ContentArray = vec![None];
        let added = Content::from(LineContent::new(vec![Point2::origin(), Point2::new(1.0, 1.0)]));
        let patches = vec![Patch::add(
            vec![PathSegment::Index(1)],
            serde_json::to_value(&added).unwrap(),
        )];
        let resolved = resolve(&ContentRef::Id(1), &contents, |_| true, Some(&patches)).unwrap();
        assert_eq!(*resolved, added);
    }

    #[test]
    fn test_reference_cycle_terminates() {
        // 0 和 1 互相引用
        let contents = content_array([block_with_reference_to(1), block_with_reference_to(0)]);
        let registry = registry();
        let first = contents[0].clone().unwrap();

        let refs = registry.content_ref_ids(&first);
        let visited = iterate_ref_contents(&registry, &refs, &contents, &[first.clone()]);
        assert_eq!(visited.len(), 1);
        assert!(Rc::ptr_eq(&visited[0], contents[1].as_ref().unwrap()));

        // 自引用
        let contents = content_array([block_with_reference_to(0)]);
        let only = contents[0].clone().unwrap();
        let refs = registry.content_ref_ids(&only);
        assert!(iterate_ref_contents(&registry, &refs, &contents, &[only]).is_empty());
    }

    #[test]
    fn test_iterate_all_contents() {
        let registry = registry();
        let inner = GroupContent::new(content_array([Content::from(CircleContent::new(
            Point2::origin(),
            1.0,
        ))]));
        let outer = GroupContent::new(content_array([
            Content::from(LineContent::new(vec![Point2::origin(), Point2::new(1.0, 0.0)])),
            Content::from(inner),
        ]));
        let contents: ContentArray = vec![None, Some(Rc::new(Content::from(outer)))];

        let paths: Vec<SelectionPath> = iterate_all_contents(&registry, &contents)
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(paths, vec![vec![1], vec![1, 0], vec![1, 1], vec![1, 1, 0]]);
    }

    #[test]
    fn test_required_reference_blocks_deletion() {
        let registry = registry();
        let block = Content::from(BlockContent {
            contents: content_array([Content::from(CircleContent::new(Point2::origin(), 1.0))]),
            base: Point2::origin(),
        });
        let contents = content_array([
            block,
            Content::from(BlockReferenceContent::new(0, Point2::new(10.0, 0.0))),
        ]);
        assert!(!is_deletable(&registry, 0, &contents));
        assert!(is_deletable(&registry, 1, &contents));
    }

    #[test]
    fn test_optional_reference_cleared_on_delete() {
        let registry = registry();
        let style = Content::from(crate::content::StrokeStyleContent {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 2.0,
            stroke: StrokeFields::default(),
            is_current: false,
        });
        let mut line = LineContent::new(vec![Point2::origin(), Point2::new(1.0, 0.0)]);
        line.stroke.stroke_style_id = Some(ContentRef::Id(0));
        let mut contents = content_array([style, Content::from(line)]);
        let before = contents[1].clone().unwrap();

        assert!(is_deletable(&registry, 0, &contents));
        let touched = delete_selected(&registry, &mut contents, &[0]);
        assert_eq!(touched, vec![1]);
        assert!(contents[0].is_none());

        let after = contents[1].as_ref().unwrap();
        assert!(!Rc::ptr_eq(&before, after));
        assert_eq!(after.kind.stroke_fields().unwrap().stroke_style_id, None);
    }

    #[test]
    fn test_readonly_not_deletable() {
        let registry = registry();
        let mut circle = Content::from(CircleContent::new(Point2::origin(), 1.0));
        circle.readonly = Some(true);
        let contents = content_array([circle]);
        assert!(!is_deletable(&registry, 0, &contents));
        assert!(!is_deletable(&registry, 3, &contents));
    }

    #[test]
    fn test_update_ref_ids() {
        let registry = registry();
        let reference = Rc::new(Content::from(BlockReferenceContent::new(2, Point2::origin())));
        let moved = update_ref_ids(&registry, &reference, &|id| (id == 2).then_some(5)).unwrap();
        match &moved.kind {
            ContentKind::BlockReference(r) => assert_eq!(r.ref_id, ContentRef::Id(5)),
            _ => unreachable!(),
        }
        assert!(update_ref_ids(&registry, &reference, &|_| None).is_none());
    }

    #[test]
    fn test_content_at_path() {
        let group = GroupContent::new(content_array([
            Content::from(CircleContent::new(Point2::origin(), 1.0)),
            Content::from(CircleContent::new(Point2::origin(), 2.0)),
        ]));
        let contents = content_array([Content::from(group)]);
        let child = content_at_path(&contents, &[0, 1]).unwrap();
        assert!(matches!(&child.kind, ContentKind::Circle(c) if c.r == 2.0));
        assert!(content_at_path(&contents, &[0, 5]).is_none());
    }
}
