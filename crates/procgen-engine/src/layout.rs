//! Editor layout persisted alongside a procedure
//!
//! The engine never interprets these values; it only keeps them so an
//! editor can restore its window and panel arrangement. Layout nodes are
//! written as polymorphic records keyed by type name, so an unknown name
//! fails the load instead of being skipped.

use serde::{Deserialize, Serialize};

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{ProcEngineError, Result};
use crate::types::Orientation;

const SPLIT_LAYOUT: &str = "SplitLayout";
const VIEW_LAYOUT: &str = "ViewLayout";
const SPLIT_LAYOUT_VERSION: u16 = 1;
const VIEW_LAYOUT_VERSION: u16 = 1;

/// Nesting limit when decoding a layout tree
const MAX_LAYOUT_DEPTH: usize = 64;

/// Editor window placement in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowBounds {
    pub(crate) fn encode(&self, w: &mut ByteWriter) {
        w.write_i32(self.x);
        w.write_i32(self.y);
        w.write_i32(self.width);
        w.write_i32(self.height);
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            x: r.read_i32()?,
            y: r.read_i32()?,
            width: r.read_i32()?,
            height: r.read_i32()?,
        })
    }
}

/// Panel arrangement of the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayoutNode {
    /// Two panes side by side or stacked
    #[serde(rename_all = "camelCase")]
    Split {
        orientation: Orientation,
        /// Share of the first pane, 0..1
        ratio: f64,
        first: Box<LayoutNode>,
        second: Box<LayoutNode>,
    },
    /// A single view, optionally previewing one module
    #[serde(rename_all = "camelCase")]
    View {
        title: String,
        preview_module: Option<usize>,
    },
}

impl LayoutNode {
    pub fn view(title: impl Into<String>) -> Self {
        Self::View {
            title: title.into(),
            preview_module: None,
        }
    }

    pub fn split(orientation: Orientation, ratio: f64, first: LayoutNode, second: LayoutNode) -> Self {
        Self::Split {
            orientation,
            ratio,
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    /// Number of views in the tree
    pub fn view_count(&self) -> usize {
        match self {
            Self::Split { first, second, .. } => first.view_count() + second.view_count(),
            Self::View { .. } => 1,
        }
    }

    pub(crate) fn encode(&self, w: &mut ByteWriter) {
        match self {
            Self::Split {
                orientation,
                ratio,
                first,
                second,
            } => {
                w.write_str(SPLIT_LAYOUT);
                w.write_u16(SPLIT_LAYOUT_VERSION);
                w.write_u8(orientation.to_u8());
                w.write_f64(*ratio);
                first.encode(w);
                second.encode(w);
            }
            Self::View { title, preview_module } => {
                w.write_str(VIEW_LAYOUT);
                w.write_u16(VIEW_LAYOUT_VERSION);
                w.write_str(title);
                match preview_module {
                    Some(module) => {
                        w.write_bool(true);
                        w.write_len(*module);
                    }
                    None => w.write_bool(false),
                }
            }
        }
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Self::decode_at(r, 0)
    }

    fn decode_at(r: &mut ByteReader<'_>, depth: usize) -> Result<Self> {
        if depth > MAX_LAYOUT_DEPTH {
            return Err(ProcEngineError::decode("layout tree nested too deeply"));
        }
        let type_name = r.read_str()?;
        match type_name.as_str() {
            SPLIT_LAYOUT => {
                r.read_version("split layout", SPLIT_LAYOUT_VERSION)?;
                let tag = r.read_u8()?;
                let orientation = Orientation::from_u8(tag)
                    .ok_or_else(|| ProcEngineError::decode(format!("invalid split orientation {}", tag)))?;
                let ratio = r.read_f64()?;
                let first = Self::decode_at(r, depth + 1)?;
                let second = Self::decode_at(r, depth + 1)?;
                Ok(Self::split(orientation, ratio, first, second))
            }
            VIEW_LAYOUT => {
                r.read_version("view layout", VIEW_LAYOUT_VERSION)?;
                let title = r.read_str()?;
                let preview_module = if r.read_bool()? { Some(r.read_len()?) } else { None };
                Ok(Self::View { title, preview_module })
            }
            _ => Err(ProcEngineError::UnknownLayoutType(type_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LayoutNode {
        LayoutNode::split(
            Orientation::Vertical,
            0.3,
            LayoutNode::view("graph"),
            LayoutNode::View {
                title: "preview".to_string(),
                preview_module: Some(2),
            },
        )
    }

    #[test]
    fn test_layout_encode_decode() {
        let layout = sample();
        let mut w = ByteWriter::new();
        layout.encode(&mut w);
        let bytes = w.into_bytes();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(LayoutNode::decode(&mut r).unwrap(), layout);
        assert!(r.is_exhausted());
        assert_eq!(layout.view_count(), 2);
    }

    #[test]
    fn test_unknown_layout_type_fails() {
        let mut w = ByteWriter::new();
        w.write_str("TabLayout");
        w.write_u16(1);
        let bytes = w.into_bytes();

        let err = LayoutNode::decode(&mut ByteReader::new(&bytes)).unwrap_err();
        assert!(matches!(err, ProcEngineError::UnknownLayoutType(name) if name == "TabLayout"));
    }

    #[test]
    fn test_future_layout_version_fails() {
        let mut w = ByteWriter::new();
        w.write_str(VIEW_LAYOUT);
        w.write_u16(VIEW_LAYOUT_VERSION + 1);
        let bytes = w.into_bytes();

        let err = LayoutNode::decode(&mut ByteReader::new(&bytes)).unwrap_err();
        assert!(matches!(err, ProcEngineError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_window_bounds_encode_decode() {
        let bounds = WindowBounds {
            x: -20,
            y: 40,
            width: 1280,
            height: 720,
        };
        let mut w = ByteWriter::new();
        bounds.encode(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(WindowBounds::decode(&mut ByteReader::new(&bytes)).unwrap(), bounds);
    }
}
