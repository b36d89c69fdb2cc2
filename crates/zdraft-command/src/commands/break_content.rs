//! 在相交处打断
//!
//! 选中的内容两两求交，每个内容在自身的交点处被拆开；
//! 拆开的内容被删除，碎片追加到内容数组末尾。

use super::{acquire_top_level, push_validated};
use crate::command::{
    Acquired, ActivateOptions, Activation, Command, CommandContext, Commit, ToolResponse,
};
use crate::error::CommandError;
use std::rc::Rc;
use tracing::debug;
use zdraft_core::content::{Content, ContentArray, SelectionPath};
use zdraft_core::geometry::intersect_lines;
use zdraft_core::kernel::Kernel;
use zdraft_core::math::Point2;
use zdraft_core::model::Capabilities;
use zdraft_core::refs::{delete_selected, is_deletable};
use zdraft_core::snap::SnapTarget;

const ACQUIRE_TARGETS: u32 = 1;

pub struct BreakCommand;

impl Command for BreakCommand {
    fn name(&self) -> &'static str {
        "break"
    }

    fn hotkey(&self) -> Option<&'static str> {
        Some("BR")
    }

    fn selectable(&self, content: &Content, ctx: &CommandContext) -> bool {
        ctx.kernel.registry().has_capability(content, Capabilities::BREAK)
    }

    fn activate(&self, _options: ActivateOptions) -> Box<dyn Activation> {
        Box::new(BreakActivation)
    }
}

struct BreakActivation;

fn acquire() -> ToolResponse {
    ToolResponse::Acquire(acquire_top_level(ACQUIRE_TARGETS, 2, Capabilities::BREAK))
}

/// 每个目标内容与其余目标的交点处拆开后的碎片
fn break_pieces(contents: &ContentArray, kernel: &Kernel, ids: &[usize]) -> Vec<(usize, Vec<Content>)> {
    let ctx = kernel.context(contents);
    let targets: Vec<(usize, Rc<Content>)> = ids
        .iter()
        .filter_map(|&id| contents.get(id).cloned().flatten().map(|c| (id, c)))
        .collect();

    targets
        .iter()
        .filter_map(|(id, content)| {
            let geometries = ctx.geometries(content);
            let points: Vec<Point2> = targets
                .iter()
                .filter(|(other, _)| other != id)
                .flat_map(|(_, other)| intersect_lines(&geometries.lines, &ctx.geometries(other).lines))
                .collect();
            let pieces = ctx.registry().break_content(content, &points, &ctx)?;
            (!pieces.is_empty()).then(|| (*id, pieces))
        })
        .collect()
}

fn commit(paths: Vec<SelectionPath>) -> ToolResponse {
    ToolResponse::Commit(Commit::update_contents(move |contents, kernel| {
        let ids: Vec<usize> = paths
            .iter()
            .filter(|path| path.len() == 1)
            .map(|path| path[0])
            .collect();
        let broken = break_pieces(contents, kernel, &ids);

        let registry = kernel.registry();
        let broken_ids: Vec<usize> = broken.iter().map(|(id, _)| *id).collect();
        if let Some(&id) = broken_ids.iter().find(|&&id| !is_deletable(registry, id, contents)) {
            return Err(CommandError::NotDeletable(id));
        }
        delete_selected(registry, contents, &broken_ids);

        for (id, pieces) in broken {
            debug!("Break content {} into {} pieces", id, pieces.len());
            for piece in pieces {
                push_validated(contents, kernel, piece)?;
            }
        }
        Ok(())
    }))
}

impl Activation for BreakActivation {
    fn on_activated(&mut self, ctx: &CommandContext) -> ToolResponse {
        if ctx.selected.len() < 2 {
            return acquire();
        }
        commit(ctx.selected.to_vec())
    }

    fn on_start(&mut self, _point: Point2, _target: Option<SnapTarget>, _ctx: &CommandContext) -> ToolResponse {
        acquire()
    }

    fn on_acquired(&mut self, token: u32, value: Acquired, _ctx: &CommandContext) -> ToolResponse {
        match (token, value) {
            (ACQUIRE_TARGETS, Acquired::Contents(paths)) => commit(paths),
            _ => ToolResponse::Continue,
        }
    }

    fn prompt(&self) -> &str {
        "选择要打断的对象:"
    }

    fn reset(&mut self) {}
}
