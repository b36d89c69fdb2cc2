//! 删除选中的内容
//!
//! 顶层内容变为墓碑，其余内容指向它们的非必需引用被清除；
//! 容器中的子内容在容器内变为墓碑。被必需引用的内容不能删除。

use crate::command::{
    AcquireRequest, Acquired, ActivateOptions, Activation, Command, CommandContext, Commit,
    ToolResponse,
};
use crate::error::CommandError;
use std::rc::Rc;
use tracing::debug;
use zdraft_core::content::{Content, ContentArray, SelectionPath};
use zdraft_core::math::Point2;
use zdraft_core::refs::{delete_selected, is_deletable};
use zdraft_core::snap::SnapTarget;

const ACQUIRE_TARGETS: u32 = 1;

pub struct DeleteCommand;

impl Command for DeleteCommand {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn hotkey(&self) -> Option<&'static str> {
        Some("E")
    }

    fn selectable(&self, content: &Content, _ctx: &CommandContext) -> bool {
        !content.is_readonly()
    }

    fn activate(&self, _options: ActivateOptions) -> Box<dyn Activation> {
        Box::new(DeleteActivation)
    }
}

struct DeleteActivation;

fn acquire() -> ToolResponse {
    ToolResponse::Acquire(AcquireRequest::contents(
        ACQUIRE_TARGETS,
        1,
        |_, content, _| !content.is_readonly(),
    ))
}

/// 在容器内把子内容置为墓碑
fn tombstone_nested(contents: &mut ContentArray, path: &[usize]) -> bool {
    match path {
        [] => false,
        [index] => contents
            .get_mut(*index)
            .is_some_and(|slot| slot.take().is_some()),
        [index, rest @ ..] => {
            let Some(Some(slot)) = contents.get_mut(*index) else {
                return false;
            };
            if slot.kind.children().is_none() {
                return false;
            }
            Rc::make_mut(slot)
                .kind
                .children_mut()
                .is_some_and(|children| tombstone_nested(children, rest))
        }
    }
}

fn delete(paths: Vec<SelectionPath>) -> ToolResponse {
    ToolResponse::Commit(Commit::update_contents(move |contents, kernel| {
        let registry = kernel.registry();
        let top: Vec<usize> = paths
            .iter()
            .filter(|path| path.len() == 1)
            .map(|path| path[0])
            .collect();
        if let Some(&index) = top.iter().find(|&&i| !is_deletable(registry, i, contents)) {
            return Err(CommandError::NotDeletable(index));
        }

        for path in paths.iter().filter(|path| path.len() > 1) {
            tombstone_nested(contents, path);
        }
        let touched = delete_selected(registry, contents, &top);
        debug!("Deleted {} contents, cleared refs on {:?}", paths.len(), touched);
        Ok(())
    }))
}

impl Activation for DeleteActivation {
    fn on_activated(&mut self, ctx: &CommandContext) -> ToolResponse {
        if ctx.selected.is_empty() {
            return acquire();
        }
        delete(ctx.selected.to_vec())
    }

    fn on_start(&mut self, _point: Point2, _target: Option<SnapTarget>, _ctx: &CommandContext) -> ToolResponse {
        acquire()
    }

    fn on_acquired(&mut self, token: u32, value: Acquired, _ctx: &CommandContext) -> ToolResponse {
        match (token, value) {
            (ACQUIRE_TARGETS, Acquired::Contents(paths)) => delete(paths),
            _ => ToolResponse::Continue,
        }
    }

    fn prompt(&self) -> &str {
        "选择要删除的对象:"
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::Drawing;
    use crate::engine::CommandEngine;
    use zdraft_core::content::{
        content_array, BlockContent, BlockReferenceContent, CircleContent, ContentKind,
        GroupContent, LinearDimensionContent, LineContent,
    };
    use zdraft_core::kernel::Kernel;

    fn line(y: f64) -> Content {
        Content::from(LineContent::new(vec![Point2::new(0.0, y), Point2::new(10.0, y)]))
    }

    #[test]
    fn test_delete_clears_optional_refs() {
        let dimension = LinearDimensionContent::new(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(5.0, 5.0),
        )
        .bind(Some((0, 0.0)), Some((0, 1.0)));
        let mut drawing = Drawing::with_contents(
            Kernel::default(),
            content_array([line(0.0), Content::from(dimension)]),
        );
        drawing.set_selected(vec![vec![0]]);

        let mut engine = CommandEngine::default();
        engine.activate("delete", &mut drawing).unwrap();
        assert!(drawing.contents()[0].is_none());
        match &drawing.contents()[1].as_ref().unwrap().kind {
            ContentKind::LinearDimension(d) => assert!(d.ref1.is_none() && d.ref2.is_none()),
            other => panic!("unexpected {:?}", other),
        }

        // 一次撤销同时恢复内容和引用
        assert!(drawing.undo().unwrap());
        match &drawing.contents()[1].as_ref().unwrap().kind {
            ContentKind::LinearDimension(d) => assert!(d.ref1.is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_required_ref_blocks_delete() {
        let block = Content::from(BlockContent {
            contents: content_array([line(0.0)]),
            base: Point2::origin(),
        });
        let reference = Content::from(BlockReferenceContent::new(0, Point2::new(20.0, 0.0)));
        let mut drawing =
            Drawing::with_contents(Kernel::default(), content_array([block, reference]));
        drawing.set_selected(vec![vec![0]]);

        let mut engine = CommandEngine::default();
        let result = engine.activate("E", &mut drawing);
        assert!(matches!(result, Err(CommandError::NotDeletable(0))));
        assert!(drawing.contents()[0].is_some());
        assert!(!drawing.can_undo());
        assert!(engine.active_command().is_none());
    }

    #[test]
    fn test_delete_nested_child() {
        let group = Content::from(GroupContent::new(content_array([
            line(0.0),
            Content::from(CircleContent::new(Point2::origin(), 1.0)),
        ])));
        let mut drawing = Drawing::with_contents(Kernel::default(), content_array([group]));

        let mut engine = CommandEngine::default();
        engine.activate("delete", &mut drawing).unwrap();
        engine.resolve_contents(vec![vec![0, 1]], &mut drawing).unwrap();

        let children = drawing.contents()[0]
            .as_ref()
            .unwrap()
            .kind
            .children()
            .unwrap()
            .clone();
        assert_eq!(children.len(), 2);
        assert!(children[0].is_some());
        assert!(children[1].is_none());
    }
}
