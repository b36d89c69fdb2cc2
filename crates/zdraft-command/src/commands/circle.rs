//! 绘制圆：圆心 + 圆上一点

use super::push_validated;
use crate::command::{ActivateOptions, Activation, Command, CommandContext, Commit, ToolResponse};
use zdraft_core::content::{CircleContent, Content};
use zdraft_core::math::{Point2, EPSILON};
use zdraft_core::snap::SnapTarget;

pub struct CircleCommand;

impl Command for CircleCommand {
    fn name(&self) -> &'static str {
        "circle"
    }

    fn hotkey(&self) -> Option<&'static str> {
        Some("C")
    }

    fn repeatedly(&self) -> bool {
        true
    }

    fn activate(&self, _options: ActivateOptions) -> Box<dyn Activation> {
        Box::new(CircleActivation::default())
    }
}

#[derive(Default)]
struct CircleActivation {
    center: Option<Point2>,
    cursor: Option<Point2>,
}

impl Activation for CircleActivation {
    fn on_start(&mut self, point: Point2, _target: Option<SnapTarget>, _ctx: &CommandContext) -> ToolResponse {
        let Some(center) = self.center else {
            self.center = Some(point);
            return ToolResponse::Continue;
        };
        let radius = (point - center).norm();
        if radius < EPSILON {
            return ToolResponse::Continue;
        }
        let circle = CircleContent::new(center, radius);
        ToolResponse::Commit(Commit::update_contents(move |contents, kernel| {
            push_validated(contents, kernel, Content::from(circle))
        }))
    }

    fn on_move(&mut self, point: Point2, _ctx: &CommandContext) -> ToolResponse {
        self.cursor = Some(point);
        ToolResponse::Continue
    }

    fn assistent_contents(&self, _ctx: &CommandContext) -> Vec<Content> {
        match (self.center, self.cursor) {
            (Some(center), Some(cursor)) if (cursor - center).norm() > EPSILON => {
                vec![Content::from(CircleContent::new(center, (cursor - center).norm()))]
            }
            _ => Vec::new(),
        }
    }

    fn prompt(&self) -> &str {
        if self.center.is_none() {
            "指定圆心:"
        } else {
            "指定圆上一点:"
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use crate::drawing::Drawing;
    use crate::engine::CommandEngine;
    use zdraft_core::content::ContentKind;
    use zdraft_core::math::Point2;

    #[test]
    fn test_draw_circle() {
        let mut engine = CommandEngine::default();
        let mut drawing = Drawing::default();

        engine.activate("circle", &mut drawing).unwrap();
        engine.on_start(Point2::new(1.0, 1.0), None, &mut drawing).unwrap();
        // 与圆心重合的点被忽略
        engine.on_start(Point2::new(1.0, 1.0), None, &mut drawing).unwrap();
        assert!(drawing.contents().is_empty());

        engine.on_move(Point2::new(4.0, 1.0), &mut drawing).unwrap();
        assert_eq!(engine.assistent_contents(&drawing).len(), 1);

        engine.on_start(Point2::new(1.0, 5.0), None, &mut drawing).unwrap();
        match &drawing.contents()[0].as_ref().unwrap().kind {
            ContentKind::Circle(circle) => {
                assert_eq!(circle.center(), Point2::new(1.0, 1.0));
                assert!((circle.r - 4.0).abs() < 1e-12);
            }
            other => panic!("unexpected {:?}", other),
        }
        // 命令保持激活并回到初始状态
        assert_eq!(engine.prompt(), "指定圆心:");
    }
}
