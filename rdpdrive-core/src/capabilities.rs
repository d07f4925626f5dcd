//! Drawing-order and GDI capability settings
//!
//! These values are advertised to the server during capability exchange.
//! The client does not decode orders itself; the table only records which
//! primary drawing orders the session announces as supported.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Number of slots in the order support table
pub const ORDER_SUPPORT_SLOTS: usize = 32;

/// Primary drawing orders a client can advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingOrder {
    DstBlt,
    PatBlt,
    ScrBlt,
    MemBlt,
    Mem3Blt,
    DrawNineGrid,
    LineTo,
    MultiDrawNineGrid,
    OpaqueRect,
    SaveBitmap,
    MultiDstBlt,
    MultiPatBlt,
    MultiScrBlt,
    MultiOpaqueRect,
    FastIndex,
    PolygonSc,
    PolygonCb,
    Polyline,
    FastGlyph,
    EllipseSc,
    EllipseCb,
    GlyphIndex,
}

impl DrawingOrder {
    /// All orders, in negotiation index order
    pub const ALL: [Self; 22] = [
        Self::DstBlt,
        Self::PatBlt,
        Self::ScrBlt,
        Self::MemBlt,
        Self::Mem3Blt,
        Self::DrawNineGrid,
        Self::LineTo,
        Self::MultiDrawNineGrid,
        Self::OpaqueRect,
        Self::SaveBitmap,
        Self::MultiDstBlt,
        Self::MultiPatBlt,
        Self::MultiScrBlt,
        Self::MultiOpaqueRect,
        Self::FastIndex,
        Self::PolygonSc,
        Self::PolygonCb,
        Self::Polyline,
        Self::FastGlyph,
        Self::EllipseSc,
        Self::EllipseCb,
        Self::GlyphIndex,
    ];

    /// Slot of this order in the order support table (MS-RDPBCGR 2.2.7.1.3)
    #[must_use]
    pub const fn negotiation_index(self) -> usize {
        match self {
            Self::DstBlt => 0x00,
            Self::PatBlt => 0x01,
            Self::ScrBlt => 0x02,
            Self::MemBlt => 0x03,
            Self::Mem3Blt => 0x04,
            Self::DrawNineGrid => 0x07,
            Self::LineTo => 0x08,
            Self::MultiDrawNineGrid => 0x09,
            Self::OpaqueRect => 0x0A,
            Self::SaveBitmap => 0x0B,
            Self::MultiDstBlt => 0x0F,
            Self::MultiPatBlt => 0x10,
            Self::MultiScrBlt => 0x11,
            Self::MultiOpaqueRect => 0x12,
            Self::FastIndex => 0x13,
            Self::PolygonSc => 0x14,
            Self::PolygonCb => 0x15,
            Self::Polyline => 0x16,
            Self::FastGlyph => 0x18,
            Self::EllipseSc => 0x19,
            Self::EllipseCb => 0x1A,
            Self::GlyphIndex => 0x1B,
        }
    }

    /// Settings name of the order, e.g. `multi_opaque_rect`
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DstBlt => "dst_blt",
            Self::PatBlt => "pat_blt",
            Self::ScrBlt => "scr_blt",
            Self::MemBlt => "mem_blt",
            Self::Mem3Blt => "mem3_blt",
            Self::DrawNineGrid => "draw_nine_grid",
            Self::LineTo => "line_to",
            Self::MultiDrawNineGrid => "multi_draw_nine_grid",
            Self::OpaqueRect => "opaque_rect",
            Self::SaveBitmap => "save_bitmap",
            Self::MultiDstBlt => "multi_dst_blt",
            Self::MultiPatBlt => "multi_pat_blt",
            Self::MultiScrBlt => "multi_scr_blt",
            Self::MultiOpaqueRect => "multi_opaque_rect",
            Self::FastIndex => "fast_index",
            Self::PolygonSc => "polygon_sc",
            Self::PolygonCb => "polygon_cb",
            Self::Polyline => "polyline",
            Self::FastGlyph => "fast_glyph",
            Self::EllipseSc => "ellipse_sc",
            Self::EllipseCb => "ellipse_cb",
            Self::GlyphIndex => "glyph_index",
        }
    }
}

impl fmt::Display for DrawingOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DrawingOrder {
    type Err = ConfigError;

    /// Parses an order name; case and `-`/`_` separators are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Self::ALL
            .into_iter()
            .find(|order| order.name().replace('_', "") == normalized)
            .ok_or_else(|| ConfigError::Parse(format!("Unknown drawing order: {s}")))
    }
}

/// Order support table advertised in the order capability set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DrawingOrder>", into = "Vec<DrawingOrder>")]
pub struct OrderSupport {
    slots: [bool; ORDER_SUPPORT_SLOTS],
}

impl OrderSupport {
    /// Table with no orders enabled
    #[must_use]
    pub const fn none() -> Self {
        Self {
            slots: [false; ORDER_SUPPORT_SLOTS],
        }
    }

    /// Table with every known primary order enabled
    #[must_use]
    pub fn all() -> Self {
        let mut support = Self::none();
        for order in DrawingOrder::ALL {
            support.enable(order);
        }
        support
    }

    pub fn enable(&mut self, order: DrawingOrder) {
        self.slots[order.negotiation_index()] = true;
    }

    pub fn disable(&mut self, order: DrawingOrder) {
        self.slots[order.negotiation_index()] = false;
    }

    #[must_use]
    pub const fn is_supported(&self, order: DrawingOrder) -> bool {
        self.slots[order.negotiation_index()]
    }

    /// Enabled orders, in negotiation index order
    #[must_use]
    pub fn enabled(&self) -> Vec<DrawingOrder> {
        DrawingOrder::ALL
            .into_iter()
            .filter(|order| self.is_supported(*order))
            .collect()
    }

    /// Raw table as sent on the wire (one byte per slot)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; ORDER_SUPPORT_SLOTS] {
        self.slots.map(u8::from)
    }
}

impl Default for OrderSupport {
    fn default() -> Self {
        Self::all()
    }
}

impl From<Vec<DrawingOrder>> for OrderSupport {
    fn from(orders: Vec<DrawingOrder>) -> Self {
        let mut support = Self::none();
        for order in orders {
            support.enable(order);
        }
        support
    }
}

impl From<OrderSupport> for Vec<DrawingOrder> {
    fn from(support: OrderSupport) -> Self {
        support.enabled()
    }
}

/// GDI color conversion and buffer flags
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GdiFlags {
    /// Preserve the alpha channel during color conversion
    pub alpha: bool,
    /// Invert color order (BGR instead of RGB)
    pub invert: bool,
    /// Allow a 16 bpp frame buffer
    pub buffer_16bpp: bool,
    /// Allow a 24 bpp frame buffer
    #[serde(default)]
    pub buffer_24bpp: bool,
    /// Allow a 32 bpp frame buffer
    pub buffer_32bpp: bool,
}

impl GdiFlags {
    pub const CLRCONV_ALPHA: u32 = 0x01;
    pub const CLRCONV_INVERT: u32 = 0x02;
    pub const CLRBUF_16BPP: u32 = 0x08;
    pub const CLRBUF_24BPP: u32 = 0x10;
    pub const CLRBUF_32BPP: u32 = 0x20;

    /// Packs the flags into their bitmask form
    #[must_use]
    pub const fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.alpha {
            bits |= Self::CLRCONV_ALPHA;
        }
        if self.invert {
            bits |= Self::CLRCONV_INVERT;
        }
        if self.buffer_16bpp {
            bits |= Self::CLRBUF_16BPP;
        }
        if self.buffer_24bpp {
            bits |= Self::CLRBUF_24BPP;
        }
        if self.buffer_32bpp {
            bits |= Self::CLRBUF_32BPP;
        }
        bits
    }
}

impl Default for GdiFlags {
    fn default() -> Self {
        Self {
            alpha: true,
            invert: true,
            buffer_16bpp: true,
            buffer_24bpp: false,
            buffer_32bpp: true,
        }
    }
}
