//! 图纸文档：内容数组、选择集与撤销历史

use crate::command::CommandContext;
use crate::error::CommandError;
use tracing::{debug, warn};
use zdraft_core::content::{ContentArray, SelectionPath};
use zdraft_core::kernel::Kernel;
use zdraft_core::math::Point2;
use zdraft_core::patch::{
    apply_patches_to_contents, prepend_patch_path, produce_contents, selection_patch_path,
    PatchPair,
};
use zdraft_core::refs::content_at_path;

/// 线性撤销历史
///
/// 新记录截断重做分支。
#[derive(Debug, Clone)]
pub struct History<T> {
    items: Vec<T>,
    /// 已应用的记录数
    applied: usize,
}

impl<T> History<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            applied: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.truncate(self.applied);
        self.items.push(item);
        self.applied = self.items.len();
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.items.len()
    }

    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.applied -= 1;
        self.items.get(self.applied)
    }

    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.applied += 1;
        self.items.get(self.applied - 1)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.applied = 0;
    }
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 图纸
pub struct Drawing {
    kernel: Kernel,
    contents: ContentArray,
    selected: Vec<SelectionPath>,
    history: History<PatchPair>,
}

impl Drawing {
    pub fn new(kernel: Kernel) -> Self {
        Self::with_contents(kernel, ContentArray::new())
    }

    pub fn with_contents(kernel: Kernel, contents: ContentArray) -> Self {
        Self {
            kernel,
            contents,
            selected: Vec::new(),
            history: History::new(),
        }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn contents(&self) -> &ContentArray {
        &self.contents
    }

    pub fn selected(&self) -> &[SelectionPath] {
        &self.selected
    }

    /// 设置选择集；无法解析到存活内容的路径被丢弃
    pub fn set_selected(&mut self, selected: Vec<SelectionPath>) {
        self.selected = selected;
        self.prune_selection();
    }

    pub fn context(&self) -> CommandContext<'_> {
        CommandContext {
            kernel: &self.kernel,
            contents: &self.contents,
            selected: &self.selected,
            pending: None,
        }
    }

    fn prune_selection(&mut self) {
        let contents = &self.contents;
        self.selected
            .retain(|path| content_at_path(contents, path).is_some());
    }

    /// 在暂存副本上执行 recipe 并记录撤销补丁
    ///
    /// recipe 返回错误时内容数组保持不变；没有改变时不记录历史。
    pub fn update_contents<F>(&mut self, recipe: F) -> Result<PatchPair, CommandError>
    where
        F: FnOnce(&mut ContentArray, &Kernel) -> Result<(), CommandError>,
    {
        let kernel = &self.kernel;
        let (staged, forward, reverse) =
            produce_contents(&self.contents, |contents| recipe(contents, kernel))?;
        let pair = PatchPair::new(forward, reverse);
        if pair.is_empty() {
            return Ok(pair);
        }
        self.contents = staged;
        self.record(pair.clone());
        Ok(pair)
    }

    /// 应用一组补丁并记录撤销
    pub fn apply(&mut self, pair: PatchPair) -> Result<(), CommandError> {
        if pair.is_empty() {
            return Ok(());
        }
        self.contents = apply_patches_to_contents(&self.contents, &pair.forward)?;
        self.record(pair);
        Ok(())
    }

    /// 拖动 `path` 处内容的第 `index` 个编辑点，记录为一个撤销步
    ///
    /// 内容不存在或编辑点无效时返回 false。
    pub fn update_edit_point(
        &mut self,
        path: &[usize],
        index: usize,
        to: Point2,
    ) -> Result<bool, CommandError> {
        let Some(content) = content_at_path(&self.contents, path) else {
            return Ok(false);
        };
        let (_, forward, reverse) = self.kernel.update_edit_point(&content, index, to)?;
        if forward.is_empty() {
            return Ok(false);
        }
        let prefix = selection_patch_path(path);
        self.apply(PatchPair::new(
            prepend_patch_path(forward, &prefix),
            prepend_patch_path(reverse, &prefix),
        ))?;
        Ok(true)
    }

    fn record(&mut self, pair: PatchPair) {
        debug!(
            "Commit {} patches, {} contents",
            pair.forward.len(),
            self.contents.len()
        );
        self.history.push(pair);
        self.prune_selection();
        self.kernel.caches().purge();
    }

    /// 撤销；没有可撤销的记录时返回 false
    pub fn undo(&mut self) -> Result<bool, CommandError> {
        let result = match self.history.undo() {
            Some(pair) => apply_patches_to_contents(&self.contents, &pair.reverse),
            None => return Ok(false),
        };
        match result {
            Ok(contents) => {
                self.contents = contents;
                self.prune_selection();
                debug!("Undo, {} contents", self.contents.len());
                Ok(true)
            }
            Err(e) => {
                warn!("Undo failed: {}", e);
                self.history.redo();
                Err(e.into())
            }
        }
    }

    /// 重做；没有可重做的记录时返回 false
    pub fn redo(&mut self) -> Result<bool, CommandError> {
        let result = match self.history.redo() {
            Some(pair) => apply_patches_to_contents(&self.contents, &pair.forward),
            None => return Ok(false),
        };
        match result {
            Ok(contents) => {
                self.contents = contents;
                self.prune_selection();
                debug!("Redo, {} contents", self.contents.len());
                Ok(true)
            }
            Err(e) => {
                warn!("Redo failed: {}", e);
                self.history.undo();
                Err(e.into())
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History<PatchPair> {
        &self.history
    }
}

impl Default for Drawing {
    fn default() -> Self {
        Self::new(Kernel::default())
    }
}
