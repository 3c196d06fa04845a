#![forbid(unsafe_code)]

//! Data shapes exchanged with text layout and plot construction.
//!
//! These types only describe data; shaping, layout and recipe dispatch live
//! elsewhere. The one rule enforced here is length consistency: per-glyph
//! attributes are either a single broadcast value or exactly one value per
//! glyph.

use std::collections::BTreeMap;

use glam::{Quat, Vec2, Vec3};

use crate::error::InterfaceError;

/// A single value broadcast to every element, or one value per element.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ScalarOrVector<T> {
    Scalar(T),
    Vector(Vec<T>),
}

impl<T> ScalarOrVector<T> {
    /// Value for element `i`. A scalar answers every index.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&T> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Vector(values) => values.get(i),
        }
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// Number of stored values; `None` for a scalar.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Vector(values) => Some(values.len()),
        }
    }

    /// Whether this can describe `n` elements.
    #[must_use]
    pub fn fits(&self, n: usize) -> bool {
        self.len().is_none_or(|len| len == n)
    }

    fn check(&self, field: &'static str, expected: usize) -> Result<(), InterfaceError> {
        self.len()
            .map_or(Ok(()), |actual| check_len(field, expected, actual))
    }

    #[must_use]
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> ScalarOrVector<U> {
        match self {
            Self::Scalar(value) => ScalarOrVector::Scalar(f(value)),
            Self::Vector(values) => ScalarOrVector::Vector(values.iter().map(f).collect()),
        }
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), InterfaceError> {
    if actual == expected {
        Ok(())
    } else {
        Err(InterfaceError::LengthMismatch {
            field,
            expected,
            actual,
        })
    }
}

impl<T> From<T> for ScalarOrVector<T> {
    fn from(value: T) -> Self {
        Self::Scalar(value)
    }
}

impl<T> From<Vec<T>> for ScalarOrVector<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Vector(values)
    }
}

/// Metrics of one glyph, in units of the font size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphExtent {
    /// Lower-left corner of the inked area relative to the glyph origin.
    pub ink_origin: Vec2,
    pub ink_size: Vec2,
    pub ascender: f32,
    pub descender: f32,
    pub hadvance: f32,
    pub vadvance: f32,
}

/// RGBA in `0.0..=1.0`.
pub type Rgba = [f32; 4];

/// A laid-out run of glyphs ready for rendering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphCollection {
    glyphs: Vec<u32>,
    origins: Vec<Vec3>,
    extents: Vec<GlyphExtent>,
    fonts: ScalarOrVector<String>,
    scales: ScalarOrVector<Vec2>,
    rotations: ScalarOrVector<Quat>,
    colors: ScalarOrVector<Rgba>,
    stroke_colors: ScalarOrVector<Rgba>,
    stroke_widths: ScalarOrVector<f32>,
}

/// Per-glyph styling of a [`GlyphCollection`]; every field may broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphStyle {
    pub fonts: ScalarOrVector<String>,
    pub scales: ScalarOrVector<Vec2>,
    pub rotations: ScalarOrVector<Quat>,
    pub colors: ScalarOrVector<Rgba>,
    pub stroke_colors: ScalarOrVector<Rgba>,
    pub stroke_widths: ScalarOrVector<f32>,
}

impl Default for GlyphStyle {
    fn default() -> Self {
        Self {
            fonts: ScalarOrVector::Scalar(String::from("sans")),
            scales: ScalarOrVector::Scalar(Vec2::splat(12.0)),
            rotations: ScalarOrVector::Scalar(Quat::IDENTITY),
            colors: ScalarOrVector::Scalar([0.0, 0.0, 0.0, 1.0]),
            stroke_colors: ScalarOrVector::Scalar([0.0, 0.0, 0.0, 0.0]),
            stroke_widths: ScalarOrVector::Scalar(0.0),
        }
    }
}

impl GlyphCollection {
    /// Build a collection, checking that every per-glyph vector has one
    /// entry per glyph.
    ///
    /// # Errors
    ///
    /// [`InterfaceError::LengthMismatch`] naming the first bad field.
    pub fn new(
        glyphs: Vec<u32>,
        origins: Vec<Vec3>,
        extents: Vec<GlyphExtent>,
        style: GlyphStyle,
    ) -> Result<Self, InterfaceError> {
        let n = glyphs.len();
        check_len("origins", n, origins.len())?;
        check_len("extents", n, extents.len())?;
        style.fonts.check("fonts", n)?;
        style.scales.check("scales", n)?;
        style.rotations.check("rotations", n)?;
        style.colors.check("colors", n)?;
        style.stroke_colors.check("stroke_colors", n)?;
        style.stroke_widths.check("stroke_widths", n)?;
        Ok(Self {
            glyphs,
            origins,
            extents,
            fonts: style.fonts,
            scales: style.scales,
            rotations: style.rotations,
            colors: style.colors,
            stroke_colors: style.stroke_colors,
            stroke_widths: style.stroke_widths,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    #[must_use]
    pub fn glyphs(&self) -> &[u32] {
        &self.glyphs
    }

    #[must_use]
    pub fn origins(&self) -> &[Vec3] {
        &self.origins
    }

    #[must_use]
    pub fn extents(&self) -> &[GlyphExtent] {
        &self.extents
    }

    #[must_use]
    pub fn font(&self, i: usize) -> Option<&str> {
        self.fonts.get(i).map(String::as_str)
    }

    #[must_use]
    pub fn scale(&self, i: usize) -> Option<Vec2> {
        self.scales.get(i).copied()
    }

    #[must_use]
    pub fn rotation(&self, i: usize) -> Option<Quat> {
        self.rotations.get(i).copied()
    }

    #[must_use]
    pub fn color(&self, i: usize) -> Option<Rgba> {
        self.colors.get(i).copied()
    }

    #[must_use]
    pub fn stroke_color(&self, i: usize) -> Option<Rgba> {
        self.stroke_colors.get(i).copied()
    }

    #[must_use]
    pub fn stroke_width(&self, i: usize) -> Option<f32> {
        self.stroke_widths.get(i).copied()
    }
}

/// Value of a plot attribute or positional argument.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value", rename_all = "snake_case"))]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Color(Rgba),
    Point(Vec3),
    Floats(Vec<f64>),
    List(Vec<AttributeValue>),
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec3> for AttributeValue {
    fn from(v: Vec3) -> Self {
        Self::Point(v)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Floats(v)
    }
}

/// Declarative description of a plot: its type, positional arguments and
/// named attributes.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlotSpec {
    pub plot_type: String,
    pub args: Vec<AttributeValue>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl PlotSpec {
    #[must_use]
    pub fn new(plot_type: impl Into<String>) -> Self {
        Self {
            plot_type: plot_type.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<AttributeValue>) -> Self {
        self.args.push(value.into());
        self
    }

    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}
