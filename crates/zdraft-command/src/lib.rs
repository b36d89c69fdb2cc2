//! ZDraft 命令引擎
//!
//! 交互工具的状态机：激活命令、获取点或内容、预览、提交。
//! 每次提交是图纸上的一次可撤销修改。
//!
//! ```rust
//! use zdraft_command::{CommandEngine, Drawing};
//! use zdraft_core::math::Point2;
//!
//! let mut engine = CommandEngine::default();
//! let mut drawing = Drawing::default();
//!
//! engine.activate("line", &mut drawing).unwrap();
//! engine.on_start(Point2::new(0.0, 0.0), None, &mut drawing).unwrap();
//! engine.on_start(Point2::new(10.0, 0.0), None, &mut drawing).unwrap();
//! assert_eq!(drawing.contents().len(), 1);
//!
//! drawing.undo().unwrap();
//! assert!(drawing.contents().is_empty());
//! ```

pub mod command;
pub mod command_registry;
pub mod commands;
pub mod drawing;
pub mod engine;
pub mod error;

pub use command::{
    AcquireKind, AcquireRequest, Acquired, ActivateOptions, Activation, Command, CommandContext,
    CommandState, Commit, CommitKind, ContentUpdate, Key, MouseButton, ToolResponse,
};
pub use command_registry::{CommandMatch, CommandRegistry};
pub use drawing::{Drawing, History};
pub use engine::{update_selected_contents, CommandEngine, SelectedUpdates};
pub use error::CommandError;
