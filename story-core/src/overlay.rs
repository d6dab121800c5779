//! Positionable text overlays rendered above the base media

use crate::geometry::{Point, Rect};
use crate::ValidationError;
use std::fmt;
use std::str::FromStr;

/// Smallest allowed overlay scale
pub const MIN_SCALE: f32 = 0.5;
/// Largest allowed overlay scale
pub const MAX_SCALE: f32 = 3.0;
/// Smallest base font size in unscaled pixels
pub const MIN_BASE_SIZE: f32 = 16.0;
/// Largest base font size in unscaled pixels
pub const MAX_BASE_SIZE: f32 = 72.0;
/// Maximum overlay text length in characters
pub const MAX_TEXT_LEN: usize = 100;

/// Approximate glyph width as a fraction of the font size
const GLYPH_WIDTH_RATIO: f32 = 0.6;
/// Approximate line height as a multiple of the font size
const LINE_HEIGHT_RATIO: f32 = 1.2;

/// Identifier of an overlay, unique within one editing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct OverlayId(pub u32);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns the color components as an array
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl FromStr for Color {
    type Err = ValidationError;

    /// Parses `#RRGGBB` or `#RRGGBBAA`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) || (hex.len() != 6 && hex.len() != 8) {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Color {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FontSlant {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
}

/// Visual style of an overlay. Fields are independent of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverlayStyle {
    pub color: Color,
    /// `None` renders the text without a background box
    pub background: Option<Color>,
    pub weight: FontWeight,
    pub slant: FontSlant,
    pub align: TextAlign,
    pub decoration: TextDecoration,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            background: None,
            weight: FontWeight::default(),
            slant: FontSlant::default(),
            align: TextAlign::default(),
            decoration: TextDecoration::default(),
        }
    }
}

impl OverlayStyle {
    /// Merges the fields set in `patch` into this style
    pub fn apply(&mut self, patch: &StylePatch) {
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(background) = patch.background {
            self.background = background;
        }
        if let Some(weight) = patch.weight {
            self.weight = weight;
        }
        if let Some(slant) = patch.slant {
            self.slant = slant;
        }
        if let Some(align) = patch.align {
            self.align = align;
        }
        if let Some(decoration) = patch.decoration {
            self.decoration = decoration;
        }
    }
}

/// Partial style update; unset fields are left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StylePatch {
    pub color: Option<Color>,
    /// `Some(None)` clears the background
    #[cfg_attr(
        feature = "serde",
        serde(
            deserialize_with = "explicit_null",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub background: Option<Option<Color>>,
    pub weight: Option<FontWeight>,
    pub slant: Option<FontSlant>,
    pub align: Option<TextAlign>,
    pub decoration: Option<TextDecoration>,
}

/// Distinguishes an explicit `null` (clear) from an absent field (keep)
#[cfg(feature = "serde")]
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<Color>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    Option::<Color>::deserialize(deserializer).map(Some)
}

/// A positionable text annotation rendered above the base media
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Overlay {
    id: OverlayId,
    text: String,
    position: Point,
    scale: f32,
    base_size: f32,
    style: OverlayStyle,
}

impl Overlay {
    /// Creates an overlay at scale 1.0. The base size is clamped to its bounds.
    pub fn new(
        id: OverlayId,
        text: impl Into<String>,
        position: Point,
        base_size: f32,
        style: OverlayStyle,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            position,
            scale: 1.0,
            base_size: clamp_base_size(base_size),
            style,
        }
    }

    /// Rebuilds an overlay from stored fields, clamping scale and base size
    pub fn restore(
        id: OverlayId,
        text: String,
        position: Point,
        scale: f32,
        base_size: f32,
        style: OverlayStyle,
    ) -> Self {
        Self {
            id,
            text,
            position,
            scale: clamp_scale(scale),
            base_size: clamp_base_size(base_size),
            style,
        }
    }

    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn base_size(&self) -> f32 {
        self.base_size
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Replaces the text after checking it is non-empty and within bounds
    pub fn set_text(&mut self, text: &str) -> Result<(), ValidationError> {
        validate_text(text)?;
        self.text = text.to_string();
        Ok(())
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    /// Sets the scale, silently clamped to `[MIN_SCALE, MAX_SCALE]`
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = clamp_scale(scale);
    }

    /// Sets the base size, silently clamped to `[MIN_BASE_SIZE, MAX_BASE_SIZE]`
    pub fn set_base_size(&mut self, base_size: f32) {
        self.base_size = clamp_base_size(base_size);
    }

    pub fn apply_style(&mut self, patch: &StylePatch) {
        self.style.apply(patch);
    }

    /// Approximate bounding box used for hit-testing.
    ///
    /// Width is estimated from the character count rather than real text
    /// metrics, which is close enough for a touch target.
    pub fn bounds(&self) -> Rect {
        let size = self.base_size * self.scale;
        let chars = self.text.chars().count() as f32;
        Rect::new(
            self.position.x,
            self.position.y,
            chars * size * GLYPH_WIDTH_RATIO,
            size * LINE_HEIGHT_RATIO,
        )
    }

    /// Checks whether `point` lies strictly inside the bounding box
    pub fn hit_test(&self, point: Point) -> bool {
        self.bounds().contains(point)
    }
}

/// Checks overlay text: non-empty after trimming and at most `MAX_TEXT_LEN` characters
pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    let len = text.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(ValidationError::TextTooLong {
            len,
            max: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

fn clamp_base_size(size: f32) -> f32 {
    if size.is_nan() {
        return MIN_BASE_SIZE;
    }
    size.clamp(MIN_BASE_SIZE, MAX_BASE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(text: &str) -> Overlay {
        Overlay::new(
            OverlayId(1),
            text,
            Point::new(100.0, 50.0),
            20.0,
            OverlayStyle::default(),
        )
    }

    #[test]
    fn test_scale_is_clamped() {
        let mut o = overlay("hi");
        o.set_scale(10.0);
        assert_eq!(o.scale(), MAX_SCALE);
        o.set_scale(0.01);
        assert_eq!(o.scale(), MIN_SCALE);
        o.set_scale(f32::NAN);
        assert_eq!(o.scale(), 1.0);
    }

    #[test]
    fn test_bounds_follow_text_size_and_scale() {
        let mut o = overlay("abcd");
        let b = o.bounds();
        assert_eq!((b.x, b.y), (100.0, 50.0));
        assert!((b.width - 48.0).abs() < 1e-4);
        assert!((b.height - 24.0).abs() < 1e-4);

        o.set_scale(2.0);
        let b = o.bounds();
        assert!((b.width - 96.0).abs() < 1e-4);
        assert!((b.height - 48.0).abs() < 1e-4);
    }

    #[test]
    fn test_bounds_count_characters_not_bytes() {
        // Devanagari letters are three bytes each in UTF-8
        let o = overlay("नमस्ते");
        assert_eq!(o.bounds().width, 6.0 * 20.0 * GLYPH_WIDTH_RATIO);
    }

    #[test]
    fn test_set_text_validation() {
        let mut o = overlay("hello");
        assert_eq!(o.set_text("   "), Err(ValidationError::EmptyText));
        assert_eq!(o.text(), "hello");

        let long = "x".repeat(MAX_TEXT_LEN + 1);
        assert!(matches!(
            o.set_text(&long),
            Err(ValidationError::TextTooLong { len: 101, max: 100 })
        ));
        o.set_text("world").unwrap();
        assert_eq!(o.text(), "world");
    }

    #[test]
    fn test_style_patch_merges_only_set_fields() {
        let mut style = OverlayStyle {
            background: Some(Color::BLACK),
            ..OverlayStyle::default()
        };
        style.apply(&StylePatch {
            weight: Some(FontWeight::Bold),
            ..StylePatch::default()
        });
        assert_eq!(style.weight, FontWeight::Bold);
        assert_eq!(style.background, Some(Color::BLACK));

        style.apply(&StylePatch {
            background: Some(None),
            ..StylePatch::default()
        });
        assert_eq!(style.background, None);
        assert_eq!(style.color, Color::WHITE);
    }

    #[test]
    fn test_color_parse_and_display() {
        let c: Color = "#ff8000".parse().unwrap();
        assert_eq!(c, Color::rgb(255, 128, 0));
        assert_eq!(c.to_string(), "#ff8000");

        let c: Color = "#00000080".parse().unwrap();
        assert_eq!(c.a, 0x80);
        assert_eq!(c.to_string(), "#00000080");

        assert!("ff8000".parse::<Color>().is_err());
        assert!("#ff80".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
    }
}
