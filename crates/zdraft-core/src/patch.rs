//! 补丁引擎
//!
//! 所有对内容数组的修改都在草稿上完成，然后生成正向/反向两组补丁：
//! - 正向补丁把旧值变为新值（重做）
//! - 反向补丁把新值恢复为旧值（撤销）
//!
//! 未改动的内容保持同一个 `Rc`，因此几何缓存只对真正改变的内容失效。
//! 补丁路径相对于内容数组；编辑嵌套在容器里的内容时，
//! 通过 [`prepend_patch_path`] 把补丁重定位到 `[i, "contents", j, ...]`。

use crate::content::{Content, ContentArray};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// 补丁路径的一段：对象键或数组下标
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value)
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::Key(value.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        PathSegment::Key(value)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{}", i),
            PathSegment::Key(k) => write!(f, "{}", k),
        }
    }
}

/// 路径的可读形式，如 `/3/contents/1/x`
pub fn format_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.iter().map(|s| format!("/{}", s)).collect()
}

/// 补丁操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

/// 单个结构增量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    pub path: Vec<PathSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Patch {
    pub fn add(path: Vec<PathSegment>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path,
            value: Some(value),
        }
    }

    pub fn replace(path: Vec<PathSegment>, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path,
            value: Some(value),
        }
    }

    pub fn remove(path: Vec<PathSegment>) -> Self {
        Self {
            op: PatchOp::Remove,
            path,
            value: None,
        }
    }
}

/// 一次编辑的正向/反向补丁
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatchPair {
    pub forward: Vec<Patch>,
    pub reverse: Vec<Patch>,
}

impl PatchPair {
    pub fn new(forward: Vec<Patch>, reverse: Vec<Patch>) -> Self {
        Self { forward, reverse }
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.reverse.is_empty()
    }

    /// 追加另一组补丁；反向补丁按相反顺序组合
    pub fn append(&mut self, other: PatchPair) {
        self.forward.extend(other.forward);
        let mut reverse = other.reverse;
        reverse.append(&mut self.reverse);
        self.reverse = reverse;
    }
}

/// 补丁错误
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Patch path not found: {0}")]
    PathNotFound(String),

    #[error("Patch value missing: {0}")]
    MissingValue(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ========== 值级别 ==========

/// 计算把 `old` 变为 `new` 的补丁
pub fn diff_values(old: &Value, new: &Value) -> Vec<Patch> {
    let mut patches = Vec::new();
    diff_into(old, new, &mut Vec::new(), &mut patches);
    patches
}

fn diff_into(old: &Value, new: &Value, path: &mut Vec<PathSegment>, out: &mut Vec<Patch>) {
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            for key in a.keys().filter(|k| !b.contains_key(*k)) {
                path.push(key.as_str().into());
                out.push(Patch::remove(path.clone()));
                path.pop();
            }
            for (key, value) in b {
                path.push(key.as_str().into());
                match a.get(key) {
                    Some(old_value) => diff_into(old_value, value, path, out),
                    None => out.push(Patch::add(path.clone(), value.clone())),
                }
                path.pop();
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            let common = a.len().min(b.len());
            for i in 0..common {
                path.push(i.into());
                diff_into(&a[i], &b[i], path, out);
                path.pop();
            }
            for (i, value) in b.iter().enumerate().skip(common) {
                path.push(i.into());
                out.push(Patch::add(path.clone(), value.clone()));
                path.pop();
            }
            // 从末尾删除，保证下标有效
            for i in (common..a.len()).rev() {
                path.push(i.into());
                out.push(Patch::remove(path.clone()));
                path.pop();
            }
        }
        _ => {
            if old != new {
                out.push(Patch::replace(path.clone(), new.clone()));
            }
        }
    }
}

fn patch_value(patch: &Patch) -> Result<Value, PatchError> {
    patch
        .value
        .clone()
        .ok_or_else(|| PatchError::MissingValue(format_path(&patch.path)))
}

/// 在 JSON 值上依次应用补丁
pub fn apply_patches(value: &mut Value, patches: &[Patch]) -> Result<(), PatchError> {
    for patch in patches {
        apply_patch_at(value, &patch.path, patch)?;
    }
    Ok(())
}

/// 以 `path`（补丁路径的某个后缀）为相对路径应用补丁
fn apply_patch_at(root: &mut Value, path: &[PathSegment], patch: &Patch) -> Result<(), PatchError> {
    let not_found = || PatchError::PathNotFound(format_path(&patch.path));

    let Some((last, parents)) = path.split_last() else {
        *root = match patch.op {
            PatchOp::Remove => Value::Null,
            _ => patch_value(patch)?,
        };
        return Ok(());
    };

    let mut target = root;
    for segment in parents {
        target = match (target, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key),
            (Value::Array(items), PathSegment::Index(i)) => items.get_mut(*i),
            _ => None,
        }
        .ok_or_else(not_found)?;
    }

    match (target, last) {
        (Value::Object(map), PathSegment::Key(key)) => match patch.op {
            PatchOp::Add | PatchOp::Replace => {
                map.insert(key.clone(), patch_value(patch)?);
            }
            PatchOp::Remove => {
                map.remove(key).ok_or_else(not_found)?;
            }
        },
        (Value::Array(items), PathSegment::Index(i)) => {
            let i = *i;
            match patch.op {
                PatchOp::Add if i <= items.len() => items.insert(i, patch_value(patch)?),
                PatchOp::Replace if i < items.len() => items[i] = patch_value(patch)?,
                PatchOp::Remove if i < items.len() => {
                    items.remove(i);
                }
                _ => return Err(not_found()),
            }
        }
        _ => return Err(not_found()),
    }
    Ok(())
}

// ========== 内容数组级别 ==========

fn slot_value(slot: &Option<Rc<Content>>) -> Result<Value, PatchError> {
    Ok(match slot {
        Some(content) => serde_json::to_value(&**content)?,
        None => Value::Null,
    })
}

fn slot_from_patch(patch: &Patch) -> Result<Option<Rc<Content>>, PatchError> {
    match &patch.value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(Rc::new(serde_json::from_value(value.clone())?))),
    }
}

/// 在内容数组上应用补丁，返回新数组
///
/// 未被补丁触及的内容保持原来的 `Rc`；
/// 路径经过容器的 `contents` 时逐层 `Rc::make_mut` 下降。
pub fn apply_patches_to_contents(
    contents: &ContentArray,
    patches: &[Patch],
) -> Result<ContentArray, PatchError> {
    let mut result = contents.clone();
    for patch in patches {
        apply_to_array(&mut result, &patch.path, patch)?;
    }
    Ok(result)
}

fn apply_to_array(
    array: &mut ContentArray,
    path: &[PathSegment],
    patch: &Patch,
) -> Result<(), PatchError> {
    let not_found = || PatchError::PathNotFound(format_path(&patch.path));

    let Some((PathSegment::Index(index), rest)) = path.split_first() else {
        return Err(not_found());
    };
    let index = *index;

    if rest.is_empty() {
        match patch.op {
            PatchOp::Add if index <= array.len() => array.insert(index, slot_from_patch(patch)?),
            PatchOp::Replace if index < array.len() => array[index] = slot_from_patch(patch)?,
            PatchOp::Remove if index < array.len() => {
                array.remove(index);
            }
            _ => return Err(not_found()),
        }
        return Ok(());
    }

    let slot = array
        .get_mut(index)
        .and_then(|s| s.as_mut())
        .ok_or_else(not_found)?;

    if let [PathSegment::Key(key), nested @ ..] = rest {
        if key == "contents" && !nested.is_empty() && slot.kind.children().is_some() {
            if let Some(children) = Rc::make_mut(slot).kind.children_mut() {
                return apply_to_array(children, nested, patch);
            }
        }
    }

    // 普通字段：经由 JSON 值往返
    let mut value = serde_json::to_value(&**slot)?;
    apply_patch_at(&mut value, rest, patch)?;
    *slot = Rc::new(serde_json::from_value(value)?);
    Ok(())
}

/// 在内容草稿上执行 recipe，返回新内容和正向/反向补丁
///
/// recipe 没有造成任何改变时返回同一个 `Rc` 和空补丁。
/// 补丁路径相对于内容本身（如 `["x"]`）。
pub fn produce_with_patches<F>(
    content: &Rc<Content>,
    recipe: F,
) -> Result<(Rc<Content>, Vec<Patch>, Vec<Patch>), PatchError>
where
    F: FnOnce(&mut Content),
{
    let mut draft = (**content).clone();
    recipe(&mut draft);
    if draft == **content {
        return Ok((content.clone(), Vec::new(), Vec::new()));
    }

    let old = serde_json::to_value(&**content)?;
    let new = serde_json::to_value(&draft)?;
    let forward = diff_values(&old, &new);
    let reverse = diff_values(&new, &old);
    Ok((Rc::new(draft), forward, reverse))
}

/// 在内容数组的暂存副本上执行 recipe
///
/// recipe 失败时原数组不受影响。补丁按改变的内容逐个计算。
pub fn produce_contents<E, F>(
    contents: &ContentArray,
    recipe: F,
) -> Result<(ContentArray, Vec<Patch>, Vec<Patch>), E>
where
    F: FnOnce(&mut ContentArray) -> Result<(), E>,
    E: From<PatchError>,
{
    let mut staged = contents.clone();
    recipe(&mut staged)?;
    let (forward, reverse) = diff_content_arrays(contents, &staged)?;
    Ok((staged, forward, reverse))
}

fn same_slot(a: &Option<Rc<Content>>, b: &Option<Rc<Content>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// 比较两个内容数组，生成正向/反向补丁
pub fn diff_content_arrays(
    old: &ContentArray,
    new: &ContentArray,
) -> Result<(Vec<Patch>, Vec<Patch>), PatchError> {
    let mut forward = Vec::new();
    let mut reverse = Vec::new();
    let mut forward_removes = Vec::new();
    let mut reverse_removes = Vec::new();

    for i in 0..old.len().max(new.len()) {
        match (old.get(i), new.get(i)) {
            (Some(a), Some(b)) if same_slot(a, b) => {}
            (Some(Some(a)), Some(Some(b))) => {
                let (av, bv) = (serde_json::to_value(&**a)?, serde_json::to_value(&**b)?);
                let prefix = [PathSegment::Index(i)];
                forward.extend(prepend_patch_path(diff_values(&av, &bv), &prefix));
                reverse.extend(prepend_patch_path(diff_values(&bv, &av), &prefix));
            }
            (Some(a), Some(b)) => {
                forward.push(Patch::replace(vec![i.into()], slot_value(b)?));
                reverse.push(Patch::replace(vec![i.into()], slot_value(a)?));
            }
            (None, Some(b)) => {
                forward.push(Patch::add(vec![i.into()], slot_value(b)?));
                reverse_removes.push(Patch::remove(vec![i.into()]));
            }
            (Some(a), None) => {
                forward_removes.push(Patch::remove(vec![i.into()]));
                reverse.push(Patch::add(vec![i.into()], slot_value(a)?));
            }
            (None, None) => {}
        }
    }

    forward.extend(forward_removes.into_iter().rev());
    reverse.extend(reverse_removes.into_iter().rev());
    Ok((forward, reverse))
}

// ========== 路径重定位 ==========

/// 给每个补丁路径加上前缀
pub fn prepend_patch_path(patches: Vec<Patch>, prefix: &[PathSegment]) -> Vec<Patch> {
    patches
        .into_iter()
        .map(|mut patch| {
            let mut path = prefix.to_vec();
            path.append(&mut patch.path);
            patch.path = path;
            patch
        })
        .collect()
}

/// 选择路径 → 补丁路径：`[3, 1]` → `[3, "contents", 1]`
pub fn selection_patch_path(path: &[usize]) -> Vec<PathSegment> {
    let mut result = Vec::with_capacity(path.len() * 2);
    for (i, index) in path.iter().enumerate() {
        if i > 0 {
            result.push("contents".into());
        }
        result.push((*index).into());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{content_array, CircleContent, ContentKind, GroupContent, LineContent};
    use crate::math::Point2;
    use serde_json::json;

    fn line(x: f64) -> Content {
        Content::from(LineContent::new(vec![Point2::new(x, 0.0), Point2::new(x, 10.0)]))
    }

    #[test]
    fn test_diff_and_apply_values() {
        let old = json!({ "a": 1, "b": [1, 2, 3], "c": { "d": true } });
        let new = json!({ "a": 2, "b": [1, 5], "e": "x", "c": {} });

        let forward = diff_values(&old, &new);
        let reverse = diff_values(&new, &old);

        let mut v = old.clone();
        apply_patches(&mut v, &forward).unwrap();
        assert_eq!(v, new);

        apply_patches(&mut v, &reverse).unwrap();
        assert_eq!(v, old);
    }

    #[test]
    fn test_patch_round_trip() {
        let original = Rc::new(line(0.0));
        let (updated, forward, reverse) = produce_with_patches(&original, |draft| {
            if let ContentKind::Line(l) = &mut draft.kind {
                l.points.push(Point2::new(5.0, 5.0));
                l.stroke.stroke_width = Some(3.0);
            }
            draft.z = Some(1.0);
        })
        .unwrap();

        let mut value = serde_json::to_value(&*original).unwrap();
        apply_patches(&mut value, &forward).unwrap();
        assert_eq!(serde_json::from_value::<Content>(value.clone()).unwrap(), *updated);

        apply_patches(&mut value, &reverse).unwrap();
        assert_eq!(serde_json::from_value::<Content>(value).unwrap(), *original);
    }

    #[test]
    fn test_unchanged_recipe_keeps_identity() {
        let original = Rc::new(line(0.0));
        let (updated, forward, reverse) = produce_with_patches(&original, |_| {}).unwrap();
        assert!(Rc::ptr_eq(&original, &updated));
        assert!(forward.is_empty());
        assert!(reverse.is_empty());
    }

    #[test]
    fn test_selection_patch_path() {
        assert_eq!(
            selection_patch_path(&[3, 1]),
            vec![
                PathSegment::Index(3),
                PathSegment::from("contents"),
                PathSegment::Index(1)
            ]
        );
        assert_eq!(selection_patch_path(&[2]), vec![PathSegment::Index(2)]);
    }

    #[test]
    fn test_patch_relocation() {
        let nested = Rc::new(Content::from(CircleContent::new(Point2::origin(), 5.0)));
        let group = Content::from(GroupContent::new(vec![
            Some(Rc::new(line(0.0))),
            Some(nested.clone()),
        ]));
        let contents = content_array([line(0.0), line(1.0), line(2.0), group]);

        let (direct, forward, reverse) = produce_with_patches(&nested, |draft| {
            if let ContentKind::Circle(c) = &mut draft.kind {
                c.x = 7.0;
            }
        })
        .unwrap();
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].path, vec![PathSegment::from("x")]);

        let prefix = selection_patch_path(&[3, 1]);
        let forward = prepend_patch_path(forward, &prefix);
        assert_eq!(
            forward[0].path,
            vec![
                PathSegment::from(3),
                PathSegment::from("contents"),
                PathSegment::from(1),
                PathSegment::from("x")
            ]
        );

        let updated = apply_patches_to_contents(&contents, &forward).unwrap();
        let group = updated[3].as_ref().unwrap();
        let child = group.kind.children().unwrap()[1].as_ref().unwrap();
        assert_eq!(**child, *direct);

        // 未触及的兄弟内容保持共享
        assert!(Rc::ptr_eq(
            updated[0].as_ref().unwrap(),
            contents[0].as_ref().unwrap()
        ));
        assert!(Rc::ptr_eq(
            group.kind.children().unwrap()[0].as_ref().unwrap(),
            contents[3].as_ref().unwrap().kind.children().unwrap()[0]
                .as_ref()
                .unwrap()
        ));

        let restored =
            apply_patches_to_contents(&updated, &prepend_patch_path(reverse, &prefix)).unwrap();
        assert_eq!(restored, contents);
    }

    #[test]
    fn test_produce_contents_append_and_tombstone() {
        let contents = content_array([line(0.0), line(1.0)]);
        let (updated, forward, reverse) =
            produce_contents::<PatchError, _>(&contents, |draft| {
                draft[0] = None;
                draft.push(Some(Rc::new(line(5.0))));
                draft.push(Some(Rc::new(line(6.0))));
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.len(), 4);
        assert_eq!(apply_patches_to_contents(&contents, &forward).unwrap(), updated);
        assert_eq!(apply_patches_to_contents(&updated, &reverse).unwrap(), contents);
    }

    #[test]
    fn test_failing_recipe_leaves_original() {
        let contents = content_array([line(0.0)]);
        let result = produce_contents(&contents, |draft| {
            draft[0] = None;
            Err(PatchError::PathNotFound("/0".to_string()))
        });
        assert!(result.is_err());
        assert!(contents[0].is_some());
    }

    #[test]
    fn test_invalid_path() {
        let contents = content_array([line(0.0)]);
        let patch = Patch::replace(vec![5.into(), "x".into()], json!(1));
        assert!(matches!(
            apply_patches_to_contents(&contents, &[patch]),
            Err(PatchError::PathNotFound(_))
        ));
    }
}
