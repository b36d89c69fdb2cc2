//! 绘制线段 / 多段线
//!
//! `line`：两次点击画一条线段，命令保持激活以继续绘制。
//! `polyline`：逐点添加，Enter 完成，Backspace 撤回上一个点。

use super::push_validated;
use crate::command::{
    ActivateOptions, Activation, Command, CommandContext, Commit, Key, ToolResponse,
};
use zdraft_core::content::{Content, LineContent};
use zdraft_core::math::{points_equal, Point2, EPSILON};
use zdraft_core::snap::SnapTarget;

pub struct LineCommand;

impl Command for LineCommand {
    fn name(&self) -> &'static str {
        "line"
    }

    fn hotkey(&self) -> Option<&'static str> {
        Some("L")
    }

    fn types(&self) -> &'static [&'static str] {
        &["line", "polyline"]
    }

    fn repeatedly(&self) -> bool {
        true
    }

    fn activate(&self, options: ActivateOptions) -> Box<dyn Activation> {
        Box::new(LineActivation {
            polyline: options.command_type == Some("polyline"),
            points: Vec::new(),
            cursor: None,
        })
    }
}

struct LineActivation {
    polyline: bool,
    /// 已确定的点
    points: Vec<Point2>,
    cursor: Option<Point2>,
}

impl LineActivation {
    fn commit(&self) -> ToolResponse {
        let line = LineContent::new(self.points.clone());
        ToolResponse::Commit(Commit::update_contents(move |contents, kernel| {
            push_validated(contents, kernel, Content::from(line))
        }))
    }
}

impl Activation for LineActivation {
    fn on_start(&mut self, point: Point2, _target: Option<SnapTarget>, _ctx: &CommandContext) -> ToolResponse {
        // 重复点无效
        if self
            .points
            .last()
            .is_some_and(|last| points_equal(last, &point, EPSILON))
        {
            return ToolResponse::Continue;
        }
        self.points.push(point);
        if !self.polyline && self.points.len() == 2 {
            return self.commit();
        }
        ToolResponse::Continue
    }

    fn on_move(&mut self, point: Point2, _ctx: &CommandContext) -> ToolResponse {
        self.cursor = Some(point);
        ToolResponse::Continue
    }

    fn on_key_down(&mut self, key: Key, _ctx: &CommandContext) -> ToolResponse {
        match key {
            Key::Enter if self.points.len() >= 2 => self.commit(),
            Key::Enter => ToolResponse::Cancel,
            Key::Backspace => {
                self.points.pop();
                ToolResponse::Continue
            }
            _ => ToolResponse::Continue,
        }
    }

    fn assistent_contents(&self, _ctx: &CommandContext) -> Vec<Content> {
        let mut points = self.points.clone();
        if points.is_empty() {
            return Vec::new();
        }
        points.extend(self.cursor);
        if points.len() < 2 {
            return Vec::new();
        }
        vec![Content::from(LineContent::new(points))]
    }

    fn prompt(&self) -> &str {
        match (self.polyline, self.points.len()) {
            (_, 0) => "指定第一点:",
            (false, _) => "指定下一点:",
            (true, 1) => "指定下一点:",
            (true, _) => "指定下一点 或 [完成(Enter)/回退(Backspace)]:",
        }
    }

    fn subcommands(&self) -> Vec<&str> {
        if self.polyline && self.points.len() >= 2 {
            vec!["Enter", "Backspace"]
        } else {
            vec![]
        }
    }

    fn reset(&mut self) {
        self.points.clear();
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use crate::command::{CommandState, Key};
    use crate::drawing::Drawing;
    use crate::engine::CommandEngine;
    use zdraft_core::content::ContentKind;
    use zdraft_core::math::Point2;

    #[test]
    fn test_line_repeats() {
        let mut engine = CommandEngine::default();
        let mut drawing = Drawing::default();

        engine.activate("L", &mut drawing).unwrap();
        engine.on_start(Point2::new(0.0, 0.0), None, &mut drawing).unwrap();
        engine.on_move(Point2::new(5.0, 5.0), &mut drawing).unwrap();
        assert_eq!(engine.state(), CommandState::Previewing);
        assert_eq!(engine.assistent_contents(&drawing).len(), 1);

        engine.on_start(Point2::new(10.0, 0.0), None, &mut drawing).unwrap();
        assert_eq!(drawing.contents().len(), 1);
        assert_eq!(engine.state(), CommandState::AwaitingInput);
        assert_eq!(engine.active_command(), Some("line"));

        engine.on_start(Point2::new(0.0, 5.0), None, &mut drawing).unwrap();
        engine.on_start(Point2::new(10.0, 5.0), None, &mut drawing).unwrap();
        assert_eq!(drawing.contents().len(), 2);
    }

    #[test]
    fn test_polyline_enter() {
        let mut engine = CommandEngine::default();
        let mut drawing = Drawing::default();

        engine.activate("polyline", &mut drawing).unwrap();
        for (x, y) in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (20.0, 10.0)] {
            engine.on_start(Point2::new(x, y), None, &mut drawing).unwrap();
        }
        engine.on_key_down(Key::Backspace, &mut drawing).unwrap();
        assert!(drawing.contents().is_empty());

        engine.on_key_down(Key::Enter, &mut drawing).unwrap();
        assert_eq!(drawing.contents().len(), 1);
        match &drawing.contents()[0].as_ref().unwrap().kind {
            ContentKind::Line(line) => assert_eq!(line.points.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }
}
