//! ZDraft 文件格式处理
//!
//! 支持：
//! - `.zdrf` 原生格式（Zstd 压缩的 MessagePack）
//! - JSON 内容数组（导入、粘贴）
//!
//! 两种格式都保存完整的内容数组，墓碑为 null，id 在保存后不变。

pub mod error;
pub mod json;
pub mod native;

pub use error::FileError;
pub use json::{from_json_str, load_json, save_json, to_json_string};
pub use native::{load, save};

use zdraft_core::content::ContentArray;
use zdraft_core::registry::ContentRegistry;

/// 逐个校验已加载的内容
pub(crate) fn validate_contents(
    contents: &ContentArray,
    registry: &ContentRegistry,
) -> Result<(), FileError> {
    for (index, content) in contents.iter().enumerate() {
        if let Some(content) = content {
            registry
                .validate(content)
                .map_err(|source| FileError::InvalidContent { index, source })?;
        }
    }
    Ok(())
}
