//! 分解组、块参照和多段线

use crate::command::{
    AcquireRequest, Acquired, ActivateOptions, Activation, Command, CommandContext, Commit, ContentUpdate,
    ToolResponse,
};
use std::rc::Rc;
use zdraft_core::content::Content;
use zdraft_core::math::Point2;
use zdraft_core::model::Capabilities;
use zdraft_core::snap::SnapTarget;

const ACQUIRE_TARGETS: u32 = 1;

pub struct ExplodeCommand;

impl Command for ExplodeCommand {
    fn name(&self) -> &'static str {
        "explode"
    }

    fn hotkey(&self) -> Option<&'static str> {
        Some("X")
    }

    fn selectable(&self, content: &Content, ctx: &CommandContext) -> bool {
        explodable(content, ctx)
    }

    fn activate(&self, _options: ActivateOptions) -> Box<dyn Activation> {
        Box::new(ExplodeActivation)
    }
}

struct ExplodeActivation;

/// 分解会删除原内容，只读内容不能分解
fn explodable(content: &Content, ctx: &CommandContext) -> bool {
    !content.is_readonly() && ctx.kernel.registry().has_capability(content, Capabilities::EXPLODE)
}

fn acquire() -> ToolResponse {
    ToolResponse::Acquire(AcquireRequest::contents(ACQUIRE_TARGETS, 1, |path, content, ctx| {
        path.len() == 1 && explodable(content, ctx)
    }))
}

impl Activation for ExplodeActivation {
    fn on_activated(&mut self, ctx: &CommandContext) -> ToolResponse {
        if ctx.selected.is_empty() {
            return acquire();
        }
        ToolResponse::Commit(Commit::update_selected(ctx.selected.to_vec()))
    }

    fn on_start(&mut self, _point: Point2, _target: Option<SnapTarget>, _ctx: &CommandContext) -> ToolResponse {
        acquire()
    }

    fn on_acquired(&mut self, token: u32, value: Acquired, _ctx: &CommandContext) -> ToolResponse {
        match (token, value) {
            (ACQUIRE_TARGETS, Acquired::Contents(paths)) => {
                ToolResponse::Commit(Commit::update_selected(paths))
            }
            _ => ToolResponse::Continue,
        }
    }

    /// 原内容变为墓碑，分解结果追加为新内容
    fn update_selected_content(&self, content: &Rc<Content>, ctx: &CommandContext) -> Option<ContentUpdate> {
        let pieces = ctx
            .kernel
            .registry()
            .explode(content, &ctx.model_context())?;
        Some(ContentUpdate::remove(content).ok()?.with_new_contents(pieces))
    }

    fn prompt(&self) -> &str {
        "选择要分解的对象:"
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use crate::drawing::Drawing;
    use crate::engine::CommandEngine;
    use crate::error::CommandError;
    use zdraft_core::content::{
        content_array, BlockContent, BlockReferenceContent, Content, ContentKind, GroupContent,
        LineContent, LinearDimensionContent,
    };
    use zdraft_core::kernel::Kernel;
    use zdraft_core::math::Point2;

    fn line() -> Content {
        Content::from(LineContent::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]))
    }

    #[test]
    fn test_explode_group() {
        let group = Content::from(GroupContent::new(content_array([line(), line()])));
        let mut drawing = Drawing::with_contents(Kernel::default(), content_array([group]));
        drawing.set_selected(vec![vec![0]]);

        let mut engine = CommandEngine::default();
        engine.activate("explode", &mut drawing).unwrap();
        assert_eq!(drawing.contents().len(), 3);
        assert!(drawing.contents()[0].is_none());

        assert!(drawing.undo().unwrap());
        assert_eq!(drawing.contents().len(), 1);
        assert!(drawing.contents()[0].is_some());
    }

    #[test]
    fn test_explode_block_reference() {
        let block = Content::from(BlockContent {
            contents: content_array([line()]),
            base: Point2::origin(),
        });
        let reference = Content::from(BlockReferenceContent::new(0, Point2::new(10.0, 0.0)));
        let mut drawing =
            Drawing::with_contents(Kernel::default(), content_array([block, reference]));

        let mut engine = CommandEngine::default();
        engine.activate("X", &mut drawing).unwrap();
        // 块定义不能分解
        assert!(engine.resolve_contents(vec![vec![0]], &mut drawing).is_err());
        engine.resolve_contents(vec![vec![1]], &mut drawing).unwrap();

        let contents = drawing.contents();
        assert_eq!(contents.len(), 3);
        assert!(contents[1].is_none());
        match &contents[2].as_ref().unwrap().kind {
            ContentKind::Line(line) => assert_eq!(line.points[0], Point2::new(10.0, 0.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    /// 三点多段线 + 绑定到它的标注
    fn polyline_with_dimension(readonly: bool) -> Drawing {
        let mut polyline = Content::from(LineContent::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ]));
        if readonly {
            polyline.readonly = Some(true);
        }
        let dimension = LinearDimensionContent::new(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(5.0, -5.0),
        )
        .bind(Some((0, 0.0)), None);
        Drawing::with_contents(
            Kernel::default(),
            content_array([polyline, Content::from(dimension)]),
        )
    }

    fn dimension_ref1(drawing: &Drawing) -> bool {
        match &drawing.contents()[1].as_ref().unwrap().kind {
            ContentKind::LinearDimension(d) => d.ref1.is_some(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_explode_clears_optional_refs() {
        let mut drawing = polyline_with_dimension(false);
        let mut engine = CommandEngine::default();
        engine.activate("explode", &mut drawing).unwrap();
        engine.resolve_contents(vec![vec![0]], &mut drawing).unwrap();

        assert!(drawing.contents()[0].is_none());
        assert_eq!(drawing.contents().len(), 4);
        assert!(!dimension_ref1(&drawing));

        assert!(drawing.undo().unwrap());
        assert!(drawing.contents()[0].is_some());
        assert!(dimension_ref1(&drawing));
        assert!(!drawing.can_undo());
    }

    #[test]
    fn test_explode_readonly_rejected() {
        let mut drawing = polyline_with_dimension(true);
        drawing.set_selected(vec![vec![0]]);

        let mut engine = CommandEngine::default();
        engine.activate("explode", &mut drawing).unwrap();
        // 只读内容被移出选择集，转为获取
        assert!(drawing.selected().is_empty());
        assert!(matches!(
            engine.resolve_contents(vec![vec![0]], &mut drawing),
            Err(CommandError::NotSelectable(_))
        ));

        assert!(drawing.contents()[0].is_some());
        assert_eq!(drawing.contents().len(), 2);
        assert!(dimension_ref1(&drawing));
        assert!(!drawing.can_undo());
    }
}
