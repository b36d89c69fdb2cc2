//! 裁剪：把选中的顶层内容放进一个以边界内容裁剪的组
//!
//! 边界必须是有区域的顶层内容，且不在被裁剪的内容中。
//! 提交时重新解析边界；边界已不存在时不做任何修改。

use super::{acquire_top_level, push_validated};
use crate::command::{
    AcquireRequest, Acquired, ActivateOptions, Activation, Command, CommandContext, Commit, Key,
    ToolResponse,
};
use crate::error::CommandError;
use tracing::warn;
use zdraft_core::content::{Content, ContentArray, GroupContent};
use zdraft_core::fields::ClipBorder;
use zdraft_core::kernel::Kernel;
use zdraft_core::math::Point2;
use zdraft_core::model::Capabilities;
use zdraft_core::refs::{content_at_path, delete_selected, is_deletable, ContentRef};
use zdraft_core::snap::SnapTarget;

const ACQUIRE_TARGETS: u32 = 1;
const ACQUIRE_BORDER: u32 = 2;

pub struct ClipCommand;

impl Command for ClipCommand {
    fn name(&self) -> &'static str {
        "clip"
    }

    fn activate(&self, _options: ActivateOptions) -> Box<dyn Activation> {
        Box::new(ClipActivation::default())
    }
}

#[derive(Default)]
struct ClipActivation {
    targets: Vec<usize>,
    /// 保留边界外部
    reverse: bool,
}

impl ClipActivation {
    fn acquire_border(&self) -> ToolResponse {
        let targets = self.targets.clone();
        ToolResponse::Acquire(AcquireRequest::contents(
            ACQUIRE_BORDER,
            1,
            move |path, _, ctx| {
                path.len() == 1
                    && !targets.contains(&path[0])
                    && content_at_path(ctx.contents, path).is_some_and(|border| {
                        !ctx.kernel
                            .get_geometries(&border, ctx.contents)
                            .regions
                            .is_empty()
                    })
            },
        ))
    }
}

/// 以 `border` 裁剪 `targets`：目标移入新组，原位置变为墓碑
pub fn clip_contents(
    contents: &mut ContentArray,
    kernel: &Kernel,
    targets: &[usize],
    border: usize,
    reverse: bool,
) -> Result<(), CommandError> {
    let Some(border_content) = contents.get(border).cloned().flatten() else {
        warn!("Clip border {} no longer exists", border);
        return Ok(());
    };
    if kernel
        .get_geometries(&border_content, contents)
        .regions
        .is_empty()
    {
        warn!("Clip border {} has no region", border);
        return Ok(());
    }

    let registry = kernel.registry();
    if let Some(&id) = targets.iter().find(|&&id| !is_deletable(registry, id, contents)) {
        return Err(CommandError::NotDeletable(id));
    }
    let children: ContentArray = targets
        .iter()
        .filter(|&&id| id != border)
        .filter_map(|&id| contents.get(id).cloned().flatten())
        .map(Some)
        .collect();
    if children.is_empty() {
        return Ok(());
    }

    let mut group = GroupContent::new(children);
    group.clip.clip = Some(ClipBorder {
        border: ContentRef::Id(border),
        reverse,
    });
    delete_selected(registry, contents, targets);
    push_validated(contents, kernel, Content::from(group))
}

impl Activation for ClipActivation {
    fn on_activated(&mut self, ctx: &CommandContext) -> ToolResponse {
        self.targets = ctx
            .selected
            .iter()
            .filter(|path| path.len() == 1)
            .map(|path| path[0])
            .collect();
        if self.targets.is_empty() {
            return ToolResponse::Acquire(acquire_top_level(ACQUIRE_TARGETS, 1, Capabilities::empty()));
        }
        ToolResponse::Continue
    }

    /// 点击后选择边界
    fn on_start(&mut self, _point: Point2, _target: Option<SnapTarget>, _ctx: &CommandContext) -> ToolResponse {
        self.acquire_border()
    }

    fn on_key_down(&mut self, key: Key, _ctx: &CommandContext) -> ToolResponse {
        if matches!(key, Key::Char('r' | 'R')) {
            self.reverse = !self.reverse;
        }
        ToolResponse::Continue
    }

    fn on_acquired(&mut self, token: u32, value: Acquired, _ctx: &CommandContext) -> ToolResponse {
        let Acquired::Contents(paths) = value else {
            return ToolResponse::Continue;
        };
        match token {
            ACQUIRE_TARGETS => {
                self.targets = paths.iter().map(|path| path[0]).collect();
                ToolResponse::Continue
            }
            ACQUIRE_BORDER => {
                let Some(border) = paths.first().map(|path| path[0]) else {
                    return ToolResponse::Continue;
                };
                let targets = self.targets.clone();
                let reverse = self.reverse;
                ToolResponse::Commit(Commit::update_contents(move |contents, kernel| {
                    clip_contents(contents, kernel, &targets, border, reverse)
                }))
            }
            _ => ToolResponse::Continue,
        }
    }

    fn prompt(&self) -> &str {
        match (self.targets.is_empty(), self.reverse) {
            (true, _) => "选择要裁剪的对象:",
            (false, false) => "指定裁剪边界 或 [反向(R)]:",
            (false, true) => "指定裁剪边界（保留外部）或 [反向(R)]:",
        }
    }

    fn subcommands(&self) -> Vec<&str> {
        if self.targets.is_empty() {
            vec![]
        } else {
            vec!["R"]
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandState;
    use crate::drawing::Drawing;
    use crate::engine::CommandEngine;
    use zdraft_core::content::{content_array, CircleContent, ContentKind, LineContent, PolygonContent};
    use zdraft_core::render::Drawable;

    fn drawing() -> Drawing {
        Drawing::with_contents(
            Kernel::default(),
            content_array([
                Content::from(LineContent::new(vec![Point2::new(-5.0, 0.0), Point2::new(5.0, 0.0)])),
                Content::from(PolygonContent::new(vec![
                    Point2::new(-1.0, -1.0),
                    Point2::new(1.0, -1.0),
                    Point2::new(1.0, 1.0),
                ])),
                Content::from(LineContent::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)])),
            ]),
        )
    }

    #[test]
    fn test_clip_selected() {
        let mut drawing = drawing();
        drawing.set_selected(vec![vec![0]]);
        let mut engine = CommandEngine::default();

        engine.activate("clip", &mut drawing).unwrap();
        engine.on_key_down(Key::Char('R'), &mut drawing).unwrap();
        engine.on_start(Point2::origin(), None, &mut drawing).unwrap();
        assert_eq!(engine.state(), CommandState::Acquiring);

        // 目标自身和没有区域的内容不能作为边界
        assert!(engine.resolve_contents(vec![vec![0]], &mut drawing).is_err());
        assert!(engine.resolve_contents(vec![vec![2]], &mut drawing).is_err());
        engine.resolve_contents(vec![vec![1]], &mut drawing).unwrap();

        let contents = drawing.contents();
        assert_eq!(contents.len(), 4);
        assert!(contents[0].is_none());
        let group = contents[3].clone().unwrap();
        match &group.kind {
            ContentKind::Group(g) => {
                let clip = g.clip.clip.as_ref().unwrap();
                assert_eq!(clip.border, ContentRef::Id(1));
                assert!(clip.reverse);
            }
            other => panic!("unexpected {:?}", other),
        }
        let drawables = drawing.kernel().render(&group, contents);
        assert!(matches!(drawables[0], Drawable::Clip { reverse: true, .. }));
    }

    #[test]
    fn test_tombstoned_border_rejected() {
        let mut drawing = drawing();
        drawing
            .update_contents(|contents, _| {
                contents[1] = None;
                Ok(())
            })
            .unwrap();
        drawing.set_selected(vec![vec![0]]);

        let mut engine = CommandEngine::default();
        engine.activate("clip", &mut drawing).unwrap();
        engine.on_start(Point2::origin(), None, &mut drawing).unwrap();
        assert!(engine.resolve_contents(vec![vec![1]], &mut drawing).is_err());
        assert_eq!(engine.state(), CommandState::Acquiring);
    }

    #[test]
    fn test_vanished_border_applies_nothing() {
        let mut drawing = drawing();
        drawing
            .update_contents(|contents, _| {
                contents[1] = None;
                Ok(())
            })
            .unwrap();

        let pair = drawing
            .update_contents(|contents, kernel| clip_contents(contents, kernel, &[0], 1, false))
            .unwrap();
        assert!(pair.is_empty());
        assert!(drawing.contents()[0].is_some());
        assert_eq!(drawing.history().len(), 1);

        // 圆可以作为边界
        let mut drawing = drawing_with_circle();
        drawing
            .update_contents(|contents, kernel| clip_contents(contents, kernel, &[0], 1, false))
            .unwrap();
        assert_eq!(drawing.contents().len(), 3);
    }

    fn drawing_with_circle() -> Drawing {
        Drawing::with_contents(
            Kernel::default(),
            content_array([
                Content::from(LineContent::new(vec![Point2::new(-5.0, 0.0), Point2::new(5.0, 0.0)])),
                Content::from(CircleContent::new(Point2::origin(), 2.0)),
            ]),
        )
    }
}
