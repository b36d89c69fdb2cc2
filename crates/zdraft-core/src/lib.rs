//! ZDraft 核心
//!
//! 2D 绘图内容的注册表、引用图、几何缓存与补丁引擎。
//!
//! # 架构设计
//!
//! - `Content`: 带 `type` 标签的不可变记录，以 `Rc` 共享
//! - `ContentArray`: 只追加的内容数组，下标即 id，删除留下墓碑
//! - `Model`: 每个类型一个能力记录，由 `ContentRegistry` 管理
//! - `Kernel`: 持有注册表和按内容身份缓存的派生数据（几何、捕捉点、编辑点）
//! - `patch`: 编辑产生正向/逆向补丁对，用于撤销与重做
//!
//! # 示例
//!
//! ```rust
//! use zdraft_core::prelude::*;
//!
//! let kernel = Kernel::default();
//! let contents = content_array([Content::from(LineContent::new(vec![
//!     Point2::origin(),
//!     Point2::new(100.0, 50.0),
//! ]))]);
//!
//! let line = contents[0].clone().unwrap();
//! let geometries = kernel.get_geometries(&line, &contents);
//! assert_eq!(geometries.lines.len(), 1);
//! ```

pub mod cache;
pub mod config;
pub mod content;
pub mod fields;
pub mod geometry;
pub mod kernel;
pub mod logging;
pub mod math;
pub mod model;
pub mod models;
pub mod patch;
pub mod refs;
pub mod registry;
pub mod render;
pub mod snap;
pub mod validation;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::config::KernelConfig;
    pub use crate::content::{
        content_array, ArcContent, BlockContent, BlockReferenceContent, CircleContent, Content,
        ContentArray, ContentKind, GroupContent, LineContent, LinearDimensionContent,
        PolygonContent, SelectionPath, StrokeStyleContent, TextContent,
    };
    pub use crate::geometry::{Geometries, GeometryError, GeometryLine};
    pub use crate::kernel::Kernel;
    pub use crate::math::{BoundingBox2, Point2, Transform, Vector2};
    pub use crate::model::{Capabilities, Model, ModelContext};
    pub use crate::patch::{Patch, PatchOp, PatchPair, PathSegment};
    pub use crate::refs::{ContentRef, RefId};
    pub use crate::registry::ContentRegistry;
    pub use crate::render::{Drawable, RenderTarget};
    pub use crate::snap::{SnapConfig, SnapEngine, SnapMask, SnapPoint, SnapType};
    pub use crate::validation::{ValidationError, ValidationResult};
}
