//! Story bundle serialization and deserialization
//!
//! A bundle stores one author's published items in publish order, little
//! endian, with length-prefixed UTF-8 strings.

use crate::geometry::Point;
use crate::overlay::{
    Color, FontSlant, FontWeight, Overlay, OverlayId, OverlayStyle, TextAlign, TextDecoration,
};
use crate::story::{MediaSource, Privacy, StoryId, StoryItem};
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use std::io::{Read, Write};
use std::time::Duration;

/// Magic bytes for story bundles: "STY\0"
const MAGIC: [u8; 4] = [b'S', b'T', b'Y', 0];

/// Current bundle format version
const VERSION: u16 = 1;

/// Upper bound on capacity reserved from an untrusted count
const MAX_PREALLOC: u32 = 1024;

const MEDIA_IMAGE: u8 = 0;
const MEDIA_VIDEO: u8 = 1;
const MEDIA_GRADIENT: u8 = 2;

/// Story bundle header
#[derive(Debug, Clone)]
pub struct BundleHeader {
    /// Format version
    pub version: u16,
    /// Display name of the author all items belong to
    pub author: String,
    /// Number of items
    pub num_items: u32,
}

impl BundleHeader {
    /// Creates a new bundle header
    pub fn new(author: impl Into<String>, num_items: u32) -> Self {
        Self {
            version: VERSION,
            author: author.into(),
            num_items,
        }
    }

    /// Reads a header from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic);
        }

        let version = reader.read_u16::<LittleEndian>()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let author = read_string(reader)?;
        let num_items = reader.read_u32::<LittleEndian>()?;

        Ok(Self {
            version,
            author,
            num_items,
        })
    }

    /// Writes the header to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u16::<LittleEndian>(self.version)?;
        write_string(writer, &self.author)?;
        writer.write_u32::<LittleEndian>(self.num_items)?;
        Ok(())
    }
}

/// Complete story bundle
#[derive(Debug, Clone)]
pub struct StoryBundle {
    /// Bundle header
    pub header: BundleHeader,
    /// Items in publish order
    pub items: Vec<StoryItem>,
}

impl StoryBundle {
    /// Creates an empty bundle for `author`
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            header: BundleHeader::new(author, 0),
            items: Vec::new(),
        }
    }

    /// Appends a published item
    pub fn push(&mut self, item: StoryItem) {
        self.items.push(item);
        self.header.num_items = self.items.len() as u32;
    }

    /// Next free story id in this bundle
    pub fn next_id(&self) -> StoryId {
        let max = self.items.iter().map(|i| i.id().0).max();
        StoryId(max.map_or(1, |m| m + 1))
    }

    /// Reads a story bundle from a reader
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let header = BundleHeader::read(&mut reader)?;

        let mut items = Vec::with_capacity(header.num_items.min(MAX_PREALLOC) as usize);
        for _ in 0..header.num_items {
            items.push(read_item(&mut reader)?);
        }

        Ok(Self { header, items })
    }

    /// Writes the story bundle to a writer
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        let header = BundleHeader {
            num_items: self.items.len() as u32,
            ..self.header.clone()
        };
        header.write(&mut writer)?;

        for item in &self.items {
            write_item(&mut writer, item)?;
        }

        Ok(())
    }

    /// Gets an item by ID
    pub fn get_item(&self, id: StoryId) -> Result<&StoryItem> {
        self.items
            .iter()
            .find(|i| i.id() == id)
            .ok_or(Error::StoryNotFound(id.0))
    }

    /// Items still inside their retention window at `now`, in publish order
    pub fn active_items(&self, now: DateTime<Utc>, policy: &crate::Policy) -> Vec<StoryItem> {
        self.items
            .iter()
            .filter(|i| !i.is_expired(now, policy))
            .cloned()
            .collect()
    }
}

fn read_item<R: Read>(reader: &mut R) -> Result<StoryItem> {
    let id = StoryId(reader.read_u64::<LittleEndian>()?);

    let content = match reader.read_u8()? {
        MEDIA_IMAGE => MediaSource::Image {
            uri: read_string(reader)?,
        },
        MEDIA_VIDEO => MediaSource::Video {
            uri: read_string(reader)?,
        },
        MEDIA_GRADIENT => MediaSource::Gradient {
            from: read_color(reader)?,
            to: read_color(reader)?,
        },
        tag => return Err(Error::InvalidTag { field: "media", tag }),
    };

    let caption = read_string(reader)?;
    let created_ms = reader.read_i64::<LittleEndian>()?;
    let created_at =
        DateTime::<Utc>::from_timestamp_millis(created_ms).ok_or(Error::InvalidTimestamp(created_ms))?;
    let duration_ms = reader.read_u64::<LittleEndian>()?;
    let privacy = match reader.read_u8()? {
        0 => Privacy::Public,
        1 => Privacy::Friends,
        2 => Privacy::Private,
        tag => return Err(Error::InvalidTag { field: "privacy", tag }),
    };

    let num_overlays = reader.read_u32::<LittleEndian>()?;
    let mut overlays = Vec::with_capacity(num_overlays.min(MAX_PREALLOC) as usize);
    for _ in 0..num_overlays {
        overlays.push(read_overlay(reader)?);
    }

    Ok(StoryItem::new(
        id,
        content,
        overlays,
        caption,
        created_at,
        Duration::from_millis(duration_ms),
        privacy,
    ))
}

fn write_item<W: Write>(writer: &mut W, item: &StoryItem) -> Result<()> {
    writer.write_u64::<LittleEndian>(item.id().0)?;

    match item.content() {
        MediaSource::Image { uri } => {
            writer.write_u8(MEDIA_IMAGE)?;
            write_string(writer, uri)?;
        }
        MediaSource::Video { uri } => {
            writer.write_u8(MEDIA_VIDEO)?;
            write_string(writer, uri)?;
        }
        MediaSource::Gradient { from, to } => {
            writer.write_u8(MEDIA_GRADIENT)?;
            write_color(writer, *from)?;
            write_color(writer, *to)?;
        }
    }

    write_string(writer, item.caption())?;
    writer.write_i64::<LittleEndian>(item.created_at().timestamp_millis())?;
    writer.write_u64::<LittleEndian>(item.duration_hint().as_millis() as u64)?;
    writer.write_u8(match item.privacy() {
        Privacy::Public => 0,
        Privacy::Friends => 1,
        Privacy::Private => 2,
    })?;

    writer.write_u32::<LittleEndian>(item.overlays().len() as u32)?;
    for overlay in item.overlays() {
        write_overlay(writer, overlay)?;
    }

    Ok(())
}

fn read_overlay<R: Read>(reader: &mut R) -> Result<Overlay> {
    let id = OverlayId(reader.read_u32::<LittleEndian>()?);
    let text = read_string(reader)?;
    let x = reader.read_f32::<LittleEndian>()?;
    let y = reader.read_f32::<LittleEndian>()?;
    let scale = reader.read_f32::<LittleEndian>()?;
    let base_size = reader.read_f32::<LittleEndian>()?;

    let color = read_color(reader)?;
    let background = match reader.read_u8()? {
        0 => None,
        _ => Some(read_color(reader)?),
    };
    let weight = match reader.read_u8()? {
        0 => FontWeight::Normal,
        1 => FontWeight::Bold,
        tag => return Err(Error::InvalidTag { field: "weight", tag }),
    };
    let slant = match reader.read_u8()? {
        0 => FontSlant::Normal,
        1 => FontSlant::Italic,
        tag => return Err(Error::InvalidTag { field: "slant", tag }),
    };
    let align = match reader.read_u8()? {
        0 => TextAlign::Left,
        1 => TextAlign::Center,
        2 => TextAlign::Right,
        tag => return Err(Error::InvalidTag { field: "align", tag }),
    };
    let decoration = match reader.read_u8()? {
        0 => TextDecoration::None,
        1 => TextDecoration::Underline,
        2 => TextDecoration::LineThrough,
        tag => return Err(Error::InvalidTag { field: "decoration", tag }),
    };

    let style = OverlayStyle {
        color,
        background,
        weight,
        slant,
        align,
        decoration,
    };
    Ok(Overlay::restore(id, text, Point::new(x, y), scale, base_size, style))
}

fn write_overlay<W: Write>(writer: &mut W, overlay: &Overlay) -> Result<()> {
    writer.write_u32::<LittleEndian>(overlay.id().0)?;
    write_string(writer, overlay.text())?;
    writer.write_f32::<LittleEndian>(overlay.position().x)?;
    writer.write_f32::<LittleEndian>(overlay.position().y)?;
    writer.write_f32::<LittleEndian>(overlay.scale())?;
    writer.write_f32::<LittleEndian>(overlay.base_size())?;

    let style = overlay.style();
    write_color(writer, style.color)?;
    match style.background {
        Some(background) => {
            writer.write_u8(1)?;
            write_color(writer, background)?;
        }
        None => writer.write_u8(0)?,
    }
    writer.write_u8(match style.weight {
        FontWeight::Normal => 0,
        FontWeight::Bold => 1,
    })?;
    writer.write_u8(match style.slant {
        FontSlant::Normal => 0,
        FontSlant::Italic => 1,
    })?;
    writer.write_u8(match style.align {
        TextAlign::Left => 0,
        TextAlign::Center => 1,
        TextAlign::Right => 2,
    })?;
    writer.write_u8(match style.decoration {
        TextDecoration::None => 0,
        TextDecoration::Underline => 1,
        TextDecoration::LineThrough => 2,
    })?;
    Ok(())
}

fn read_color<R: Read>(reader: &mut R) -> Result<Color> {
    let mut rgba = [0u8; 4];
    reader.read_exact(&mut rgba)?;
    Ok(Color::rgba(rgba[0], rgba[1], rgba[2], rgba[3]))
}

fn write_color<W: Write>(writer: &mut W, color: Color) -> Result<()> {
    writer.write_all(&color.to_array())?;
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<LittleEndian>()?;
    let mut bytes = Vec::new();
    reader.by_ref().take(u64::from(len)).read_to_end(&mut bytes)?;
    if bytes.len() != len as usize {
        return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }
    Ok(String::from_utf8(bytes)?)
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    writer.write_u32::<LittleEndian>(value.len() as u32)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}
