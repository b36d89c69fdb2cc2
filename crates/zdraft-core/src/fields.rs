//! 字段形状与能力混入
//!
//! 线型、填充、文字、裁剪这些横切行为只实现一次，
//! 以字段形状（`StrokeFields` 等）为参数，被所有混入该形状的内容模型复用。

use crate::config::KernelConfig;
use crate::content::{Content, ContentArray, ContentKind};
use crate::refs::{resolve, ContentRef, RefId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::rc::Rc;

/// 线型字段
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeFields {
    /// 0xRRGGBB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash_array: Option<Vec<f64>>,
    /// 引用一个 `stroke style` 内容，优先于内联字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_style_id: Option<ContentRef>,
}

/// 填充字段
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
}

/// 文字字段
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
}

/// 裁剪边界
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipBorder {
    pub border: ContentRef,
    /// 为真时保留边界外部
    #[serde(default)]
    pub reverse: bool,
}

/// 裁剪字段
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClipFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ClipBorder>,
}

/// 解析后的线型
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeOptions {
    pub color: u32,
    pub width: f64,
    pub dash_array: Vec<f64>,
}

/// 解析后的填充
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillOptions {
    pub color: u32,
    pub opacity: f64,
}

/// 解析后的文字样式
#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub font_size: f64,
    pub font_family: String,
    pub color: u32,
}

fn is_stroke_style(content: &Content) -> bool {
    matches!(content.kind, ContentKind::StrokeStyle(_))
}

/// 计算线型：引用的线型样式 > 内联字段 > 默认配置
pub fn stroke_options(
    fields: &StrokeFields,
    contents: &ContentArray,
    config: &KernelConfig,
) -> StrokeOptions {
    let style = fields
        .stroke_style_id
        .as_ref()
        .and_then(|r| resolve(r, contents, is_stroke_style, None));
    let source = match style.as_deref().map(|c| &c.kind) {
        Some(ContentKind::StrokeStyle(s)) => &s.stroke,
        _ => fields,
    };
    StrokeOptions {
        color: source.stroke_color.unwrap_or(config.default_stroke_color),
        width: source.stroke_width.unwrap_or(config.default_stroke_width),
        dash_array: source.dash_array.clone().unwrap_or_default(),
    }
}

/// 计算填充；未设置填充色时返回 None
pub fn fill_options(fields: &FillFields) -> Option<FillOptions> {
    fields.fill_color.map(|color| FillOptions {
        color,
        opacity: fields.fill_opacity.unwrap_or(1.0).clamp(0.0, 1.0),
    })
}

/// 计算文字样式
pub fn text_options(fields: &TextFields, config: &KernelConfig) -> TextOptions {
    TextOptions {
        font_size: fields.font_size.unwrap_or(config.default_font_size),
        font_family: fields
            .font_family
            .clone()
            .unwrap_or_else(|| config.default_font_family.clone()),
        color: fields.color.unwrap_or(config.default_text_color),
    }
}

/// 检查是否是CJK字符
fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

/// 估算单行文本的 (宽, 高)
///
/// 中文字符宽度接近字号，其余字符约为字号的 0.6 倍。
pub fn text_size(text: &str, font_size: f64) -> (f64, f64) {
    let char_count = text.chars().count();
    let cjk_count = text.chars().filter(|c| is_cjk(*c)).count();
    let ascii_count = char_count - cjk_count;

    let width = (cjk_count as f64 * font_size) + (ascii_count as f64 * font_size * 0.6);
    (width, font_size)
}

/// 解析裁剪边界内容，返回 (边界, 是否反向)
pub fn clip_border(fields: &ClipFields, contents: &ContentArray) -> Option<(Rc<Content>, bool)> {
    let clip = fields.clip.as_ref()?;
    resolve(&clip.border, contents, |_| true, None).map(|border| (border, clip.reverse))
}

// ========== 引用维护 ==========

/// 线型字段中的引用（非必需）
pub fn stroke_ref_ids(fields: &StrokeFields) -> Vec<RefId> {
    fields
        .stroke_style_id
        .iter()
        .map(|id| RefId::optional(id.clone()))
        .collect()
}

/// 改写线型引用，返回是否改变
pub fn update_stroke_ref_id(
    fields: &mut StrokeFields,
    update: &dyn Fn(usize) -> Option<usize>,
) -> bool {
    update_optional_ref(&mut fields.stroke_style_id, update)
}

/// 清除指向已删除内容的线型引用
pub fn delete_stroke_ref_id(fields: &mut StrokeFields, ids: &HashSet<usize>) -> bool {
    delete_optional_ref(&mut fields.stroke_style_id, ids)
}

/// 裁剪边界引用（非必需）
pub fn clip_ref_ids(fields: &ClipFields) -> Vec<RefId> {
    fields
        .clip
        .iter()
        .map(|clip| RefId::optional(clip.border.clone()))
        .collect()
}

pub(crate) fn update_optional_ref(
    slot: &mut Option<ContentRef>,
    update: &dyn Fn(usize) -> Option<usize>,
) -> bool {
    if let Some(ContentRef::Id(id)) = slot {
        if let Some(new_id) = update(*id) {
            *id = new_id;
            return true;
        }
    }
    false
}

pub(crate) fn delete_optional_ref(slot: &mut Option<ContentRef>, ids: &HashSet<usize>) -> bool {
    if matches!(slot, Some(ContentRef::Id(id)) if ids.contains(&*id)) {
        *slot = None;
        return true;
    }
    false
}
