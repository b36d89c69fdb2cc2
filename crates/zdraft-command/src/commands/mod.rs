//! 内置命令
//!
//! 每个绘图/编辑工具对应一个 [`Command`] 实现

mod break_content;
mod circle;
mod clip;
mod delete;
mod explode;
mod line;
mod transform;

pub use break_content::BreakCommand;
pub use circle::CircleCommand;
pub use clip::ClipCommand;
pub use delete::DeleteCommand;
pub use explode::ExplodeCommand;
pub use line::LineCommand;
pub use transform::{TransformCommand, TransformKind};

use crate::command::{AcquireRequest, Command};
use crate::command_registry::CommandRegistry;
use crate::error::CommandError;
use std::rc::Rc;
use zdraft_core::content::{Content, ContentArray};
use zdraft_core::kernel::Kernel;
use zdraft_core::model::Capabilities;

/// 注册全部内置命令
pub fn register_default_commands(registry: &mut CommandRegistry) {
    let commands: Vec<Box<dyn Command>> = vec![
        Box::new(LineCommand),
        Box::new(CircleCommand),
        Box::new(TransformCommand::new(TransformKind::Move)),
        Box::new(TransformCommand::new(TransformKind::Rotate)),
        Box::new(TransformCommand::new(TransformKind::Scale)),
        Box::new(TransformCommand::new(TransformKind::Mirror)),
        Box::new(DeleteCommand),
        Box::new(BreakCommand),
        Box::new(ExplodeCommand),
        Box::new(ClipCommand),
    ];
    for command in commands {
        registry.register(command);
    }
}

/// 校验后追加到内容数组末尾
pub(crate) fn push_validated(
    contents: &mut ContentArray,
    kernel: &Kernel,
    content: Content,
) -> Result<(), CommandError> {
    kernel.validate(&content)?;
    contents.push(Some(Rc::new(content)));
    Ok(())
}

/// 获取 `count` 个具有指定能力的顶层内容
pub(crate) fn acquire_top_level(token: u32, count: usize, capability: Capabilities) -> AcquireRequest {
    AcquireRequest::contents(token, count, move |path, content, ctx| {
        path.len() == 1 && ctx.kernel.registry().has_capability(content, capability)
    })
}
