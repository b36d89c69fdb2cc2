//! 移动 / 旋转 / 缩放 / 镜像
//!
//! 四个命令共享一个激活实现，只在所需的点数和由点计算变换的方式上不同。
//! 没有预选内容时先获取一个具有相应能力的内容。

use super::acquire_top_level;
use crate::command::{
    Acquired, ActivateOptions, Activation, Command, CommandContext, Commit, ContentUpdate,
    ToolResponse,
};
use crate::engine::update_selected_contents;
use std::rc::Rc;
use zdraft_core::content::{Content, SelectionPath};
use zdraft_core::math::{Point2, Transform, EPSILON};
use zdraft_core::model::Capabilities;
use zdraft_core::snap::SnapTarget;

const ACQUIRE_TARGETS: u32 = 1;

/// 变换类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Move,
    Rotate,
    Scale,
    Mirror,
}

impl TransformKind {
    fn capability(self) -> Capabilities {
        match self {
            TransformKind::Move => Capabilities::MOVE,
            TransformKind::Rotate => Capabilities::ROTATE,
            TransformKind::Scale => Capabilities::SCALE,
            TransformKind::Mirror => Capabilities::MIRROR,
        }
    }

    /// 确定变换需要的点数
    fn point_count(self) -> usize {
        match self {
            TransformKind::Move | TransformKind::Mirror => 2,
            TransformKind::Rotate | TransformKind::Scale => 3,
        }
    }

    /// 由点序列计算变换；点数不足或退化时返回 None
    fn transform(self, points: &[Point2]) -> Option<Transform> {
        match (self, points) {
            (TransformKind::Move, [base, target]) => Some(Transform::Move(target - base)),
            (TransformKind::Rotate, [center, reference, target]) => {
                let from = reference - center;
                let to = target - center;
                if from.norm() < EPSILON || to.norm() < EPSILON {
                    return None;
                }
                Some(Transform::Rotate {
                    center: *center,
                    angle: to.y.atan2(to.x) - from.y.atan2(from.x),
                })
            }
            (TransformKind::Scale, [center, reference, target]) => {
                let from = (reference - center).norm();
                let to = (target - center).norm();
                if from < EPSILON || to < EPSILON {
                    return None;
                }
                let factor = to / from;
                Some(Transform::Scale {
                    center: *center,
                    sx: factor,
                    sy: factor,
                })
            }
            (TransformKind::Mirror, [p1, p2]) if (p2 - p1).norm() > EPSILON => {
                Some(Transform::Mirror { p1: *p1, p2: *p2 })
            }
            _ => None,
        }
    }
}

/// 变换命令
pub struct TransformCommand {
    kind: TransformKind,
}

impl TransformCommand {
    pub fn new(kind: TransformKind) -> Self {
        Self { kind }
    }
}

impl Command for TransformCommand {
    fn name(&self) -> &'static str {
        match self.kind {
            TransformKind::Move => "move",
            TransformKind::Rotate => "rotate",
            TransformKind::Scale => "scale",
            TransformKind::Mirror => "mirror",
        }
    }

    fn hotkey(&self) -> Option<&'static str> {
        Some(match self.kind {
            TransformKind::Move => "M",
            TransformKind::Rotate => "RO",
            TransformKind::Scale => "SC",
            TransformKind::Mirror => "MI",
        })
    }

    fn selectable(&self, content: &Content, ctx: &CommandContext) -> bool {
        ctx.kernel.registry().has_capability(content, self.kind.capability())
    }

    fn activate(&self, _options: ActivateOptions) -> Box<dyn Activation> {
        Box::new(TransformActivation {
            kind: self.kind,
            targets: Vec::new(),
            points: Vec::new(),
            transform: None,
        })
    }
}

struct TransformActivation {
    kind: TransformKind,
    targets: Vec<SelectionPath>,
    points: Vec<Point2>,
    /// 预览或提交使用的变换
    transform: Option<Transform>,
}

impl TransformActivation {
    fn acquire_targets(&self) -> ToolResponse {
        ToolResponse::Acquire(acquire_top_level(ACQUIRE_TARGETS, 1, self.kind.capability()))
    }
}

impl Activation for TransformActivation {
    fn on_activated(&mut self, ctx: &CommandContext) -> ToolResponse {
        if ctx.selected.is_empty() {
            return self.acquire_targets();
        }
        self.targets = ctx.selected.to_vec();
        ToolResponse::Continue
    }

    fn on_acquired(&mut self, token: u32, value: Acquired, _ctx: &CommandContext) -> ToolResponse {
        match (token, value) {
            (ACQUIRE_TARGETS, Acquired::Contents(paths)) => {
                self.targets = paths;
                ToolResponse::Continue
            }
            _ => ToolResponse::Continue,
        }
    }

    fn on_start(&mut self, point: Point2, _target: Option<SnapTarget>, _ctx: &CommandContext) -> ToolResponse {
        if self.targets.is_empty() {
            return self.acquire_targets();
        }

        let mut points = self.points.clone();
        points.push(point);
        if points.len() < self.kind.point_count() {
            self.points = points;
            return ToolResponse::Continue;
        }
        // 退化的最后一点被忽略
        let Some(transform) = self.kind.transform(&points) else {
            return ToolResponse::Continue;
        };
        self.transform = Some(transform);
        ToolResponse::Commit(Commit::update_selected(self.targets.clone()))
    }

    fn on_move(&mut self, point: Point2, _ctx: &CommandContext) -> ToolResponse {
        let mut points = self.points.clone();
        points.push(point);
        self.transform = self.kind.transform(&points);
        ToolResponse::Continue
    }

    fn assistent_contents(&self, ctx: &CommandContext) -> Vec<Content> {
        if self.transform.is_none() {
            return Vec::new();
        }
        update_selected_contents(self, &self.targets, ctx).assistent_contents
    }

    fn update_selected_content(&self, content: &Rc<Content>, ctx: &CommandContext) -> Option<ContentUpdate> {
        let transform = self.transform?;
        let registry = ctx.kernel.registry();
        ContentUpdate::edit(content, |draft| {
            registry.transform_content(draft, &transform);
        })
        .ok()
    }

    fn prompt(&self) -> &str {
        let step = if self.targets.is_empty() {
            0
        } else {
            self.points.len() + 1
        };
        match (self.kind, step) {
            (TransformKind::Move, 0) => "选择要移动的对象:",
            (TransformKind::Move, 1) => "指定基点:",
            (TransformKind::Move, _) => "指定第二点:",
            (TransformKind::Rotate, 0) => "选择要旋转的对象:",
            (TransformKind::Rotate, 1) => "指定旋转中心:",
            (TransformKind::Rotate, 2) => "指定参考点:",
            (TransformKind::Rotate, _) => "指定新角度:",
            (TransformKind::Scale, 0) => "选择要缩放的对象:",
            (TransformKind::Scale, 1) => "指定缩放中心:",
            (TransformKind::Scale, 2) => "指定参考点:",
            (TransformKind::Scale, _) => "指定第二点:",
            (TransformKind::Mirror, 0) => "选择要镜像的对象:",
            (TransformKind::Mirror, 1) => "指定镜像线的第一点:",
            (TransformKind::Mirror, _) => "指定镜像线的第二点:",
        }
    }

    fn reset(&mut self) {
        self.targets.clear();
        self.points.clear();
        self.transform = None;
    }
}
