//! 命令引擎
//!
//! 持有当前激活的命令，把输入事件分发给激活上下文，
//! 代为保存挂起的获取请求，并把提交转换为图纸上的一次可撤销修改。

use crate::command::{
    AcquireKind, AcquireRequest, Acquired, ActivateOptions, Activation, Commit, CommitKind,
    CommandContext, CommandState, Key, MouseButton, ToolResponse,
};
use crate::command_registry::CommandRegistry;
use crate::drawing::Drawing;
use crate::error::CommandError;
use std::rc::Rc;
use tracing::{debug, info, warn};
use zdraft_core::content::{Content, SelectionPath};
use zdraft_core::math::Point2;
use zdraft_core::patch::{
    apply_patches_to_contents, prepend_patch_path, selection_patch_path, Patch, PatchError,
    PatchPair,
};
use zdraft_core::refs::{content_at_path, delete_selected, is_deletable};
use zdraft_core::snap::SnapTarget;

struct ActiveCommand {
    name: &'static str,
    repeatedly: bool,
    point_snap_disabled: bool,
    activation: Box<dyn Activation>,
}

/// 多内容提交的聚合结果
#[derive(Debug, Default)]
pub struct SelectedUpdates {
    /// 追加到内容数组末尾的新内容，批内引用已按最终 id 改写
    pub new_contents: Vec<Content>,
    pub assistent_contents: Vec<Content>,
    /// 已重定位到选择路径的修改补丁
    pub patches: PatchPair,
    /// 被置为墓碑的选择路径
    pub removed: Vec<SelectionPath>,
}

impl SelectedUpdates {
    /// 合并为一组补丁：先修改，再在 `base` 起追加新内容
    pub fn into_patch_pair(self, base: usize) -> Result<PatchPair, PatchError> {
        let mut pair = self.patches;
        let mut adds = PatchPair::default();
        for (i, content) in self.new_contents.iter().enumerate() {
            adds.forward
                .push(Patch::add(vec![(base + i).into()], serde_json::to_value(content)?));
            adds.reverse.insert(0, Patch::remove(vec![(base + i).into()]));
        }
        pair.append(adds);
        Ok(pair)
    }
}

/// 把每个选中内容交给 `update_selected_content`，聚合结果
///
/// 每个结果的新内容用 `contents.len() + 序号` 引用同批内容，
/// 这里按已聚合的新内容数量平移这些 id。
/// 后面的内容可以通过上下文的 `pending` 解析前面已产生的修改和新内容。
pub fn update_selected_contents(
    activation: &dyn Activation,
    paths: &[SelectionPath],
    ctx: &CommandContext,
) -> SelectedUpdates {
    let registry = ctx.kernel.registry();
    let base = ctx.contents.len();
    let mut result = SelectedUpdates::default();
    let mut in_flight: Vec<Patch> = ctx.pending.map(<[Patch]>::to_vec).unwrap_or_default();

    for path in paths {
        let Some(content) = content_at_path(ctx.contents, path) else {
            continue;
        };
        let step = CommandContext {
            pending: Some(in_flight.as_slice()),
            ..*ctx
        };
        let Some(update) = activation.update_selected_content(&content, &step) else {
            continue;
        };

        if update.removes {
            result.removed.push(path.clone());
        }
        if let Some(pair) = update.patches {
            let prefix = selection_patch_path(path);
            let forward = prepend_patch_path(pair.forward, &prefix);
            in_flight.extend(forward.iter().cloned());
            result.patches.append(PatchPair::new(
                forward,
                prepend_patch_path(pair.reverse, &prefix),
            ));
        }

        let offset = result.new_contents.len();
        for content in update.new_contents {
            let content = if offset == 0 {
                content
            } else {
                let content = Rc::new(content);
                let remapped = registry
                    .update_ref_ids(&content, &|id| (id >= base).then(|| id + offset))
                    .unwrap_or(content);
                Rc::try_unwrap(remapped).unwrap_or_else(|rc| (*rc).clone())
            };
            let id = base + result.new_contents.len();
            if let Ok(value) = serde_json::to_value(&content) {
                in_flight.push(Patch::add(vec![id.into()], value));
            }
            result.new_contents.push(content);
        }
        result.assistent_contents.extend(update.assistent_contents);
    }
    result
}

/// 命令引擎
pub struct CommandEngine {
    commands: CommandRegistry,
    active: Option<ActiveCommand>,
    state: CommandState,
    pending: Option<AcquireRequest>,
}

impl CommandEngine {
    pub fn new(commands: CommandRegistry) -> Self {
        Self {
            commands,
            active: None,
            state: CommandState::Inactive,
            pending: None,
        }
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandRegistry {
        &mut self.commands
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    pub fn active_command(&self) -> Option<&'static str> {
        self.active.as_ref().map(|a| a.name)
    }

    pub fn pending_acquisition(&self) -> Option<&AcquireRequest> {
        self.pending.as_ref()
    }

    /// 当前命令是否关闭点捕捉
    pub fn point_snap_disabled(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.point_snap_disabled)
    }

    /// 激活命令（名称、子类型名、快捷键或别名）
    ///
    /// 已有激活的命令先被取消。预选内容中不可用于该命令的被移出选择集。
    pub fn activate(&mut self, input: &str, drawing: &mut Drawing) -> Result<(), CommandError> {
        if self.commands.lookup(input).is_none() {
            return Err(CommandError::UnknownCommand(input.to_string()));
        }
        if self.active.is_some() {
            self.cancel();
        }

        let found = self
            .commands
            .lookup(input)
            .ok_or_else(|| CommandError::UnknownCommand(input.to_string()))?;
        let command = found.command;

        let selected: Vec<SelectionPath> = {
            let ctx = drawing.context();
            ctx.selected
                .iter()
                .filter(|path| {
                    content_at_path(ctx.contents, path)
                        .is_some_and(|content| command.selectable(&content, &ctx))
                })
                .cloned()
                .collect()
        };

        let active = ActiveCommand {
            name: command.name(),
            repeatedly: command.repeatedly(),
            point_snap_disabled: command.point_snap_disabled(),
            activation: command.activate(ActivateOptions {
                command_type: found.command_type,
            }),
        };
        info!("Activate command {}", active.name);

        drawing.set_selected(selected);
        self.active = Some(active);
        self.state = CommandState::AwaitingInput;

        self.dispatch(drawing, |activation, ctx| activation.on_activated(ctx))
    }

    /// 取消当前命令：重置子状态、丢弃挂起的获取并退出
    pub fn cancel(&mut self) {
        if let Some(mut active) = self.active.take() {
            debug!("Cancel command {}", active.name);
            active.activation.reset();
        }
        self.pending = None;
        self.state = CommandState::Inactive;
    }

    pub fn on_start(
        &mut self,
        point: Point2,
        target: Option<SnapTarget>,
        drawing: &mut Drawing,
    ) -> Result<(), CommandError> {
        let result = self.dispatch(drawing, |activation, ctx| activation.on_start(point, target, ctx));
        if self.state == CommandState::Previewing {
            self.state = CommandState::AwaitingInput;
        }
        result
    }

    pub fn on_move(&mut self, point: Point2, drawing: &mut Drawing) -> Result<(), CommandError> {
        if self.state == CommandState::AwaitingInput {
            self.state = CommandState::Previewing;
        }
        self.dispatch(drawing, |activation, ctx| activation.on_move(point, ctx))
    }

    pub fn on_mouse_down(
        &mut self,
        button: MouseButton,
        point: Point2,
        drawing: &mut Drawing,
    ) -> Result<(), CommandError> {
        self.dispatch(drawing, |activation, ctx| activation.on_mouse_down(button, point, ctx))
    }

    pub fn on_mouse_up(
        &mut self,
        button: MouseButton,
        point: Point2,
        drawing: &mut Drawing,
    ) -> Result<(), CommandError> {
        self.dispatch(drawing, |activation, ctx| activation.on_mouse_up(button, point, ctx))
    }

    /// Escape 总是取消当前命令，包括获取中
    pub fn on_key_down(&mut self, key: Key, drawing: &mut Drawing) -> Result<(), CommandError> {
        if key == Key::Escape {
            self.cancel();
            return Ok(());
        }
        self.dispatch(drawing, |activation, ctx| activation.on_key_down(key, ctx))
    }

    pub fn on_key_up(&mut self, key: Key, drawing: &mut Drawing) -> Result<(), CommandError> {
        self.dispatch(drawing, |activation, ctx| activation.on_key_up(key, ctx))
    }

    /// 以一个点完成挂起的获取
    pub fn resolve_point(
        &mut self,
        point: Point2,
        target: Option<SnapTarget>,
        drawing: &mut Drawing,
    ) -> Result<(), CommandError> {
        let request = self.pending.as_ref().ok_or(CommandError::NoPendingAcquisition)?;
        if !matches!(request.kind, AcquireKind::Point) {
            return Err(CommandError::AcquisitionMismatch {
                expected: "contents",
            });
        }
        self.resume(Acquired::Point { point, target }, drawing)
    }

    /// 以一组内容完成挂起的获取
    ///
    /// 数量不符或有候选不可选时拒绝，请求保持挂起。
    pub fn resolve_contents(
        &mut self,
        paths: Vec<SelectionPath>,
        drawing: &mut Drawing,
    ) -> Result<(), CommandError> {
        let request = self.pending.as_ref().ok_or(CommandError::NoPendingAcquisition)?;
        let AcquireKind::Contents { count, .. } = &request.kind else {
            return Err(CommandError::AcquisitionMismatch { expected: "point" });
        };
        if paths.len() != *count {
            warn!("Rejected acquisition: expected {} contents, got {}", count, paths.len());
            return Err(CommandError::WrongCount {
                expected: *count,
                actual: paths.len(),
            });
        }
        if let Some(rejected) = paths.iter().find(|path| !self.is_selectable(path, drawing)) {
            warn!("Rejected acquisition candidate {:?}", rejected);
            return Err(CommandError::NotSelectable(rejected.clone()));
        }
        self.resume(Acquired::Contents(paths), drawing)
    }

    /// 候选内容能否完成挂起的内容获取；没有挂起请求时只要求内容存活
    pub fn is_selectable(&self, path: &SelectionPath, drawing: &Drawing) -> bool {
        let ctx = drawing.context();
        let Some(content) = content_at_path(ctx.contents, path) else {
            return false;
        };
        match self.pending.as_ref().map(|r| &r.kind) {
            Some(AcquireKind::Contents { selectable, .. }) => selectable(path, &content, &ctx),
            _ => true,
        }
    }

    /// 当前预览内容
    pub fn assistent_contents(&self, drawing: &Drawing) -> Vec<Content> {
        self.active
            .as_ref()
            .map(|a| a.activation.assistent_contents(&drawing.context()))
            .unwrap_or_default()
    }

    pub fn prompt(&self) -> &str {
        self.active
            .as_ref()
            .map(|a| a.activation.prompt())
            .unwrap_or("命令:")
    }

    pub fn subcommands(&self) -> Vec<&str> {
        self.active
            .as_ref()
            .map(|a| a.activation.subcommands())
            .unwrap_or_default()
    }

    fn resume(&mut self, value: Acquired, drawing: &mut Drawing) -> Result<(), CommandError> {
        let request = self.pending.take().ok_or(CommandError::NoPendingAcquisition)?;
        self.state = CommandState::AwaitingInput;
        let active = self.active.as_mut().ok_or(CommandError::NoActiveCommand)?;
        let response = active
            .activation
            .on_acquired(request.token, value, &drawing.context());
        self.handle_response(response, drawing)
    }

    /// 获取中的普通输入事件被忽略
    fn dispatch<F>(&mut self, drawing: &mut Drawing, event: F) -> Result<(), CommandError>
    where
        F: FnOnce(&mut dyn Activation, &CommandContext) -> ToolResponse,
    {
        if self.state == CommandState::Acquiring {
            return Ok(());
        }
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        let response = event(active.activation.as_mut(), &drawing.context());
        self.handle_response(response, drawing)
    }

    fn handle_response(
        &mut self,
        response: ToolResponse,
        drawing: &mut Drawing,
    ) -> Result<(), CommandError> {
        match response {
            ToolResponse::Continue => Ok(()),
            ToolResponse::Acquire(request) => {
                debug!("Acquire {:?} (token {})", request.kind, request.token);
                self.pending = Some(request);
                self.state = CommandState::Acquiring;
                Ok(())
            }
            ToolResponse::Cancel => {
                self.cancel();
                Ok(())
            }
            ToolResponse::Commit(commit) => self.commit(commit, drawing),
        }
    }

    fn commit(&mut self, commit: Commit, drawing: &mut Drawing) -> Result<(), CommandError> {
        let Commit { kind, next_command } = commit;
        let result = match kind {
            CommitKind::UpdateContents(recipe) => drawing.update_contents(recipe).map(|_| ()),
            CommitKind::UpdateSelected(paths) => self.commit_selected(&paths, drawing),
        };

        let Some(active) = self.active.as_mut() else {
            return result;
        };
        if let Err(e) = result {
            warn!("Command {} failed: {}", active.name, e);
            self.cancel();
            return Err(e);
        }
        info!("Command {} committed", active.name);

        if let Some(next) = next_command {
            self.cancel();
            return self.activate(&next, drawing);
        }
        if active.repeatedly {
            active.activation.reset();
            self.pending = None;
            self.state = CommandState::AwaitingInput;
        } else {
            self.active = None;
            self.pending = None;
            self.state = CommandState::Inactive;
        }
        Ok(())
    }

    /// 多内容提交
    ///
    /// 被置为墓碑的内容按删除处理：顶层内容必须可删除，
    /// 其余内容指向它们的非必需引用随同一次提交清除。
    fn commit_selected(
        &self,
        paths: &[SelectionPath],
        drawing: &mut Drawing,
    ) -> Result<(), CommandError> {
        let active = self.active.as_ref().ok_or(CommandError::NoActiveCommand)?;
        let base = drawing.contents().len();
        let updates = update_selected_contents(active.activation.as_ref(), paths, &drawing.context());

        let mut removed = Vec::new();
        for path in &updates.removed {
            match path.as_slice() {
                [index] => removed.push(*index),
                [index, ..] => {
                    if content_at_path(drawing.contents(), path).is_some_and(|c| c.is_readonly()) {
                        return Err(CommandError::NotDeletable(*index));
                    }
                }
                [] => {}
            }
        }
        let pair = updates.into_patch_pair(base)?;

        drawing
            .update_contents(move |contents, kernel| {
                let registry = kernel.registry();
                if let Some(&index) = removed.iter().find(|&&i| !is_deletable(registry, i, contents)) {
                    return Err(CommandError::NotDeletable(index));
                }
                *contents = apply_patches_to_contents(contents, &pair.forward)?;
                if !removed.is_empty() {
                    let touched = delete_selected(registry, contents, &removed);
                    debug!("Cleared refs to {:?} on {:?}", removed, touched);
                }
                Ok(())
            })
            .map(|_| ())
    }
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new(CommandRegistry::with_default_commands())
    }
}
