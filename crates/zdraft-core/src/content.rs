//! 内容数据模型
//!
//! 图纸中的每个图元都是一个 `Content`：带 `type` 标签的记录，
//! 公共字段 `z` / `visible` / `readonly`，其余字段由具体类型决定。
//!
//! 所有内容保存在一个只追加的内容数组中，下标即 id；
//! 删除时原位置为 `None`（墓碑），id 永不复用。
//! 内容以 `Rc` 共享，编辑总是产生新的 `Rc`，因此指针相等即"未改变"。

use crate::fields::{ClipFields, FillFields, StrokeFields, TextFields};
use crate::math::Point2;
use crate::refs::ContentRef;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// 内容数组：下标为 id，`None` 为已删除
pub type ContentArray = Vec<Option<Rc<Content>>>;

/// 选择路径：`[3, 1]` 表示顶层 3 号容器内的 1 号子内容
pub type SelectionPath = Vec<usize>;

/// 单个内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(flatten)]
    pub kind: ContentKind,
    /// 绘制顺序
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
}

impl Content {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            z: None,
            visible: None,
            readonly: None,
        }
    }

    pub fn into_rc(self) -> Rc<Content> {
        Rc::new(self)
    }

    /// 类型标签
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn is_visible(&self) -> bool {
        self.visible != Some(false)
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly == Some(true)
    }
}

/// 内容类型（闭合的标签联合）
///
/// 行为不挂在类型上，而是通过注册表中按标签查找的 [`Model`](crate::model::Model)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentKind {
    #[serde(rename = "line")]
    Line(LineContent),
    #[serde(rename = "polygon")]
    Polygon(PolygonContent),
    #[serde(rename = "circle")]
    Circle(CircleContent),
    #[serde(rename = "arc")]
    Arc(ArcContent),
    #[serde(rename = "text")]
    Text(TextContent),
    #[serde(rename = "group")]
    Group(GroupContent),
    #[serde(rename = "block")]
    Block(BlockContent),
    #[serde(rename = "block reference")]
    BlockReference(BlockReferenceContent),
    #[serde(rename = "stroke style")]
    StrokeStyle(StrokeStyleContent),
    #[serde(rename = "linear dimension")]
    LinearDimension(LinearDimensionContent),
}

impl ContentKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ContentKind::Line(_) => "line",
            ContentKind::Polygon(_) => "polygon",
            ContentKind::Circle(_) => "circle",
            ContentKind::Arc(_) => "arc",
            ContentKind::Text(_) => "text",
            ContentKind::Group(_) => "group",
            ContentKind::Block(_) => "block",
            ContentKind::BlockReference(_) => "block reference",
            ContentKind::StrokeStyle(_) => "stroke style",
            ContentKind::LinearDimension(_) => "linear dimension",
        }
    }

    // ========== 字段形状访问 ==========

    pub fn stroke_fields(&self) -> Option<&StrokeFields> {
        match self {
            ContentKind::Line(c) => Some(&c.stroke),
            ContentKind::Polygon(c) => Some(&c.stroke),
            ContentKind::Circle(c) => Some(&c.stroke),
            ContentKind::Arc(c) => Some(&c.stroke),
            ContentKind::StrokeStyle(c) => Some(&c.stroke),
            ContentKind::LinearDimension(c) => Some(&c.stroke),
            _ => None,
        }
    }

    pub fn stroke_fields_mut(&mut self) -> Option<&mut StrokeFields> {
        match self {
            ContentKind::Line(c) => Some(&mut c.stroke),
            ContentKind::Polygon(c) => Some(&mut c.stroke),
            ContentKind::Circle(c) => Some(&mut c.stroke),
            ContentKind::Arc(c) => Some(&mut c.stroke),
            ContentKind::StrokeStyle(c) => Some(&mut c.stroke),
            ContentKind::LinearDimension(c) => Some(&mut c.stroke),
            _ => None,
        }
    }

    pub fn fill_fields(&self) -> Option<&FillFields> {
        match self {
            ContentKind::Polygon(c) => Some(&c.fill),
            ContentKind::Circle(c) => Some(&c.fill),
            _ => None,
        }
    }

    pub fn text_fields(&self) -> Option<&TextFields> {
        match self {
            ContentKind::Text(c) => Some(&c.font),
            ContentKind::LinearDimension(c) => Some(&c.font),
            _ => None,
        }
    }

    pub fn clip_fields(&self) -> Option<&ClipFields> {
        match self {
            ContentKind::Group(c) => Some(&c.clip),
            _ => None,
        }
    }

    pub fn clip_fields_mut(&mut self) -> Option<&mut ClipFields> {
        match self {
            ContentKind::Group(c) => Some(&mut c.clip),
            _ => None,
        }
    }

    /// 容器的子内容数组
    pub fn children(&self) -> Option<&ContentArray> {
        match self {
            ContentKind::Group(c) => Some(&c.contents),
            ContentKind::Block(c) => Some(&c.contents),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut ContentArray> {
        match self {
            ContentKind::Group(c) => Some(&mut c.contents),
            ContentKind::Block(c) => Some(&mut c.contents),
            _ => None,
        }
    }
}

/// 线段 / 多段线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineContent {
    pub points: Vec<Point2>,
    #[serde(flatten)]
    pub stroke: StrokeFields,
}

/// 多边形
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonContent {
    pub points: Vec<Point2>,
    #[serde(flatten)]
    pub stroke: StrokeFields,
    #[serde(flatten)]
    pub fill: FillFields,
}

/// 圆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleContent {
    pub x: f64,
    pub y: f64,
    pub r: f64,
    #[serde(flatten)]
    pub stroke: StrokeFields,
    #[serde(flatten)]
    pub fill: FillFields,
}

/// 圆弧（弧度，逆时针）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcContent {
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    #[serde(flatten)]
    pub stroke: StrokeFields,
}

/// 单行文本，(x, y) 为基线左端点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub x: f64,
    pub y: f64,
    pub text: String,
    #[serde(flatten)]
    pub font: TextFields,
}

/// 组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupContent {
    pub contents: ContentArray,
    #[serde(flatten)]
    pub clip: ClipFields,
}

/// 块定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockContent {
    pub contents: ContentArray,
    pub base: Point2,
}

fn default_scale() -> f64 {
    1.0
}

/// 块参照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReferenceContent {
    pub ref_id: ContentRef,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

/// 线型样式，可被其他内容的 `strokeStyleId` 引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeStyleContent {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(flatten)]
    pub stroke: StrokeFields,
    #[serde(default)]
    pub is_current: bool,
}

/// 指向另一个内容上某个位置：捕捉点序号，或几何线参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRef {
    pub id: ContentRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<f64>,
}

/// 对齐线性标注
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearDimensionContent {
    pub p1: Point2,
    pub p2: Point2,
    /// 标注线经过的位置
    pub position: Point2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref1: Option<PositionRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref2: Option<PositionRef>,
    #[serde(flatten)]
    pub stroke: StrokeFields,
    #[serde(flatten)]
    pub font: TextFields,
}

macro_rules! impl_into_content {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Content {
                fn from(value: $ty) -> Self {
                    Content::new(ContentKind::$variant(value))
                }
            }
        )*
    };
}

impl_into_content! {
    LineContent => Line,
    PolygonContent => Polygon,
    CircleContent => Circle,
    ArcContent => Arc,
    TextContent => Text,
    GroupContent => Group,
    BlockContent => Block,
    BlockReferenceContent => BlockReference,
    StrokeStyleContent => StrokeStyle,
    LinearDimensionContent => LinearDimension,
}

// ========== 便捷构造 ==========

impl LineContent {
    pub fn new(points: Vec<Point2>) -> Self {
        Self {
            points,
            stroke: StrokeFields::default(),
        }
    }
}

impl PolygonContent {
    pub fn new(points: Vec<Point2>) -> Self {
        Self {
            points,
            stroke: StrokeFields::default(),
            fill: FillFields::default(),
        }
    }
}

impl CircleContent {
    pub fn new(center: Point2, r: f64) -> Self {
        Self {
            x: center.x,
            y: center.y,
            r,
            stroke: StrokeFields::default(),
            fill: FillFields::default(),
        }
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

impl ArcContent {
    pub fn new(center: Point2, r: f64, start_angle: f64, end_angle: f64) -> Self {
        Self {
            x: center.x,
            y: center.y,
            r,
            start_angle,
            end_angle,
            stroke: StrokeFields::default(),
        }
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

impl TextContent {
    pub fn new(position: Point2, text: impl Into<String>) -> Self {
        Self {
            x: position.x,
            y: position.y,
            text: text.into(),
            font: TextFields::default(),
        }
    }
}

impl GroupContent {
    pub fn new(contents: ContentArray) -> Self {
        Self {
            contents,
            clip: ClipFields::default(),
        }
    }
}

impl BlockReferenceContent {
    pub fn new(block: usize, position: Point2) -> Self {
        Self {
            ref_id: ContentRef::Id(block),
            x: position.x,
            y: position.y,
            angle: 0.0,
            scale: 1.0,
        }
    }
}

impl LinearDimensionContent {
    pub fn new(p1: Point2, p2: Point2, position: Point2) -> Self {
        Self {
            p1,
            p2,
            position,
            ref1: None,
            ref2: None,
            stroke: Default::default(),
            font: Default::default(),
        }
    }

    /// 把测量点绑定到其他内容的几何线参数上
    pub fn bind(mut self, ref1: Option<(usize, f64)>, ref2: Option<(usize, f64)>) -> Self {
        let position = |(id, param): (usize, f64)| PositionRef {
            id: ContentRef::Id(id),
            snap_index: None,
            param: Some(param),
        };
        self.ref1 = ref1.map(position);
        self.ref2 = ref2.map(position);
        self
    }
}

/// 把一组内容包装为内容数组
pub fn content_array(contents: impl IntoIterator<Item = Content>) -> ContentArray {
    contents.into_iter().map(|c| Some(Rc::new(c))).collect()
}
