//! 内容校验
//!
//! 校验失败返回带字段路径的结构化错误，从不 panic。

use crate::fields::{FillFields, StrokeFields, TextFields};
use crate::math::Point2;
use crate::patch::{format_path, PathSegment};
use thiserror::Error;

/// 校验错误：出错字段的路径和期望
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid content at {}: expected {}", format_path(.path), .expected)]
pub struct ValidationError {
    pub path: Vec<PathSegment>,
    pub expected: String,
}

impl ValidationError {
    pub fn new<P, S>(path: impl IntoIterator<Item = P>, expected: S) -> Self
    where
        P: Into<PathSegment>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            expected: expected.into(),
        }
    }

    /// 在路径前加上父级路径（容器子内容校验时使用）
    pub fn prefixed(mut self, prefix: &[PathSegment]) -> Self {
        let mut path = prefix.to_vec();
        path.append(&mut self.path);
        self.path = path;
        self
    }
}

pub type ValidationResult = Result<(), ValidationError>;

pub fn check_finite(value: f64, field: &str) -> ValidationResult {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new([field], "finite number"))
    }
}

pub fn check_positive(value: f64, field: &str) -> ValidationResult {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new([field], "positive number"))
    }
}

pub fn check_point(point: &Point2, field: &str) -> ValidationResult {
    if point.x.is_finite() && point.y.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new([field], "finite position"))
    }
}

/// 点列：数量至少为 `min`，坐标有限
pub fn check_points(points: &[Point2], min: usize, field: &str) -> ValidationResult {
    if points.len() < min {
        return Err(ValidationError::new(
            [field],
            format!("at least {} points", min),
        ));
    }
    for (i, p) in points.iter().enumerate() {
        if !(p.x.is_finite() && p.y.is_finite()) {
            return Err(ValidationError::new(
                [PathSegment::from(field), PathSegment::from(i)],
                "finite position",
            ));
        }
    }
    Ok(())
}

pub fn check_stroke_fields(fields: &StrokeFields) -> ValidationResult {
    if let Some(width) = fields.stroke_width {
        if !(width.is_finite() && width >= 0.0) {
            return Err(ValidationError::new(["strokeWidth"], "non-negative number"));
        }
    }
    if let Some(dash) = &fields.dash_array {
        if dash.iter().any(|d| !(d.is_finite() && *d >= 0.0)) {
            return Err(ValidationError::new(["dashArray"], "non-negative numbers"));
        }
    }
    Ok(())
}

pub fn check_fill_fields(fields: &FillFields) -> ValidationResult {
    if let Some(opacity) = fields.fill_opacity {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(ValidationError::new(["fillOpacity"], "number in [0, 1]"));
        }
    }
    Ok(())
}

pub fn check_text_fields(fields: &TextFields) -> ValidationResult {
    if let Some(size) = fields.font_size {
        check_positive(size, "fontSize")?;
    }
    Ok(())
}
