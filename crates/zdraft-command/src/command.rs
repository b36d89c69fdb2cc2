//! 命令与激活上下文
//!
//! 每个交互工具是一个 [`Command`]；每次激活创建一个新的 [`Activation`]，
//! 保存该次交互的全部子状态。事件处理返回 [`ToolResponse`]，由引擎驱动状态机：
//!
//! ```text
//! Inactive → AwaitingInput ⇄ Previewing → (Commit) → Inactive / AwaitingInput
//!                   ↓ Acquire        ↑ resolve_point / resolve_contents
//!               Acquiring ───────────┘
//! ```

use crate::error::CommandError;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use zdraft_core::content::{Content, ContentArray, SelectionPath};
use zdraft_core::kernel::Kernel;
use zdraft_core::math::Point2;
use zdraft_core::model::ModelContext;
use zdraft_core::patch::{produce_with_patches, Patch, PatchError, PatchPair};
use zdraft_core::snap::SnapTarget;

/// 鼠标按钮
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// 按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    Backspace,
    Char(char),
}

/// 命令状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandState {
    #[default]
    Inactive,
    /// 等待输入
    AwaitingInput,
    /// 随鼠标预览
    Previewing,
    /// 等待宿主完成一次获取
    Acquiring,
}

/// 命令上下文 - 传递给激活上下文的运行时信息
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    pub kernel: &'a Kernel,
    pub contents: &'a ContentArray,
    /// 当前选中的内容
    pub selected: &'a [SelectionPath],
    /// 同一次提交中已产生、尚未应用的正向补丁
    pub pending: Option<&'a [Patch]>,
}

impl<'a> CommandContext<'a> {
    pub fn model_context(&self) -> ModelContext<'a> {
        self.kernel.context(self.contents).with_pending(self.pending)
    }
}

/// 获取候选过滤：(选择路径, 内容, 上下文) → 是否可选
pub type ContentFilter = Rc<dyn Fn(&SelectionPath, &Content, &CommandContext) -> bool>;

/// 获取类型
#[derive(Clone)]
pub enum AcquireKind {
    /// 一个点
    Point,
    /// 指定数量的内容，每个候选都要通过 `selectable`
    Contents {
        count: usize,
        selectable: ContentFilter,
    },
}

impl fmt::Debug for AcquireKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireKind::Point => write!(f, "Point"),
            AcquireKind::Contents { count, .. } => write!(f, "Contents {{ count: {} }}", count),
        }
    }
}

/// 获取请求：`token` 由工具指定，在 [`Activation::on_acquired`] 中原样返回
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    pub token: u32,
    pub kind: AcquireKind,
}

impl AcquireRequest {
    pub fn point(token: u32) -> Self {
        Self {
            token,
            kind: AcquireKind::Point,
        }
    }

    pub fn contents<F>(token: u32, count: usize, selectable: F) -> Self
    where
        F: Fn(&SelectionPath, &Content, &CommandContext) -> bool + 'static,
    {
        Self {
            token,
            kind: AcquireKind::Contents {
                count,
                selectable: Rc::new(selectable),
            },
        }
    }
}

/// 获取结果
#[derive(Debug, Clone, PartialEq)]
pub enum Acquired {
    Point {
        point: Point2,
        target: Option<SnapTarget>,
    },
    Contents(Vec<SelectionPath>),
}

/// 直接修改内容数组的提交
pub type ContentsRecipe = Box<dyn FnOnce(&mut ContentArray, &Kernel) -> Result<(), CommandError>>;

/// 提交方式
pub enum CommitKind {
    /// 在内容数组暂存副本上执行；失败时不产生任何修改
    UpdateContents(ContentsRecipe),
    /// 把每个路径上的内容交给 [`Activation::update_selected_content`]
    UpdateSelected(Vec<SelectionPath>),
}

/// 提交
pub struct Commit {
    pub kind: CommitKind,
    /// 提交后直接进入的命令
    pub next_command: Option<String>,
}

impl Commit {
    pub fn update_contents<F>(recipe: F) -> Self
    where
        F: FnOnce(&mut ContentArray, &Kernel) -> Result<(), CommandError> + 'static,
    {
        Self {
            kind: CommitKind::UpdateContents(Box::new(recipe)),
            next_command: None,
        }
    }

    pub fn update_selected(paths: Vec<SelectionPath>) -> Self {
        Self {
            kind: CommitKind::UpdateSelected(paths),
            next_command: None,
        }
    }

    pub fn then(mut self, command: impl Into<String>) -> Self {
        self.next_command = Some(command.into());
        self
    }
}

/// 事件处理结果
pub enum ToolResponse {
    /// 继续当前命令
    Continue,
    /// 挂起，等待宿主解析一次获取
    Acquire(AcquireRequest),
    /// 完成，修改内容数组
    Commit(Commit),
    /// 取消当前命令
    Cancel,
}

/// 对单个选中内容的修改
///
/// 补丁路径相对于内容本身，由引擎重定位到选择路径。
/// `new_contents` 之间的引用使用 `contents.len() + 序号` 作为 id。
#[derive(Debug, Clone, Default)]
pub struct ContentUpdate {
    pub patches: Option<PatchPair>,
    pub new_contents: Vec<Content>,
    /// 只用于预览，不会提交
    pub assistent_contents: Vec<Content>,
    /// 内容本身变为墓碑，提交时按删除处理
    pub removes: bool,
}

impl ContentUpdate {
    /// 在草稿上执行 recipe；修改后的内容同时作为预览
    pub fn edit<F>(content: &Rc<Content>, recipe: F) -> Result<Self, PatchError>
    where
        F: FnOnce(&mut Content),
    {
        let (updated, forward, reverse) = produce_with_patches(content, recipe)?;
        if forward.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            patches: Some(PatchPair::new(forward, reverse)),
            assistent_contents: vec![(*updated).clone()],
            ..Default::default()
        })
    }

    /// 删除内容（原位置变为墓碑）
    pub fn remove(content: &Rc<Content>) -> Result<Self, PatchError> {
        let old = serde_json::to_value(&**content)?;
        Ok(Self {
            patches: Some(PatchPair::new(
                vec![Patch::replace(Vec::new(), Value::Null)],
                vec![Patch::replace(Vec::new(), old)],
            )),
            removes: true,
            ..Default::default()
        })
    }

    pub fn with_new_contents(mut self, contents: Vec<Content>) -> Self {
        self.assistent_contents.extend(contents.iter().cloned());
        self.new_contents = contents;
        self
    }
}

/// 命令激活参数
#[derive(Debug, Clone, Default)]
pub struct ActivateOptions {
    /// 命令的子类型（如 `line` 命令的 `polyline`）
    pub command_type: Option<&'static str>,
}

/// 命令 trait - 所有绘图/编辑工具的注册接口
pub trait Command {
    fn name(&self) -> &'static str;

    /// 快捷键
    fn hotkey(&self) -> Option<&'static str> {
        None
    }

    /// 共享同一个激活实现的子类型名
    fn types(&self) -> &'static [&'static str] {
        &[]
    }

    /// 提交后是否保持激活
    fn repeatedly(&self) -> bool {
        false
    }

    fn point_snap_disabled(&self) -> bool {
        false
    }

    /// 预选内容是否可以被此命令使用
    fn selectable(&self, _content: &Content, _ctx: &CommandContext) -> bool {
        true
    }

    fn activate(&self, options: ActivateOptions) -> Box<dyn Activation>;
}

/// 每次激活的交互状态
///
/// 事件处理的默认实现忽略事件。
pub trait Activation {
    /// 激活后立即调用（此时已有预选内容）
    fn on_activated(&mut self, _ctx: &CommandContext) -> ToolResponse {
        ToolResponse::Continue
    }

    /// 主点击
    fn on_start(
        &mut self,
        _point: Point2,
        _target: Option<SnapTarget>,
        _ctx: &CommandContext,
    ) -> ToolResponse {
        ToolResponse::Continue
    }

    fn on_move(&mut self, _point: Point2, _ctx: &CommandContext) -> ToolResponse {
        ToolResponse::Continue
    }

    fn on_mouse_down(&mut self, _button: MouseButton, _point: Point2, _ctx: &CommandContext) -> ToolResponse {
        ToolResponse::Continue
    }

    fn on_mouse_up(&mut self, _button: MouseButton, _point: Point2, _ctx: &CommandContext) -> ToolResponse {
        ToolResponse::Continue
    }

    fn on_key_down(&mut self, _key: Key, _ctx: &CommandContext) -> ToolResponse {
        ToolResponse::Continue
    }

    fn on_key_up(&mut self, _key: Key, _ctx: &CommandContext) -> ToolResponse {
        ToolResponse::Continue
    }

    /// 宿主解析了 `token` 对应的获取请求，每个请求恰好调用一次
    fn on_acquired(&mut self, _token: u32, _value: Acquired, _ctx: &CommandContext) -> ToolResponse {
        ToolResponse::Continue
    }

    /// 预览内容，从不提交
    fn assistent_contents(&self, _ctx: &CommandContext) -> Vec<Content> {
        Vec::new()
    }

    /// 当前状态的提示文本
    fn prompt(&self) -> &str;

    /// 当前可用的子命令
    fn subcommands(&self) -> Vec<&str> {
        vec![]
    }

    /// 多内容提交时，对每个选中内容调用
    fn update_selected_content(
        &self,
        _content: &Rc<Content>,
        _ctx: &CommandContext,
    ) -> Option<ContentUpdate> {
        None
    }

    /// 回到初始子状态，不修改内容数组
    fn reset(&mut self);
}
