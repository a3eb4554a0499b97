//! Component definition box (`cmpd`).
//!
//! Lists the components of an uncompressed image item: standard types
//! (ISO 23001-17 Table 1) or custom types >= 0x8000, which carry a
//! NUL-terminated URI on the wire. `cmpd` is a plain box, not a FullBox.

use crate::bitstream::{BoxHeader, BoxReader, BoxWriter};
use crate::boxes::{apply_indent, dump_box_header};
use crate::errors::UncError;
use crate::fourcc::BoxType;
use crate::limits::SecurityLimits;

/// Standard component types (ISO 23001-17 Table 1).
pub mod component_type {
    pub const MONOCHROME: u16 = 0;
    pub const Y: u16 = 1;
    pub const CB: u16 = 2;
    pub const CR: u16 = 3;
    pub const RED: u16 = 4;
    pub const GREEN: u16 = 5;
    pub const BLUE: u16 = 6;
    pub const ALPHA: u16 = 7;
    pub const DEPTH: u16 = 8;
    pub const DISPARITY: u16 = 9;
    pub const PALETTE: u16 = 10;
    pub const FILTER_ARRAY: u16 = 11;
    pub const PADDED: u16 = 12;
    pub const CYAN: u16 = 13;
    pub const MAGENTA: u16 = 14;
    pub const YELLOW: u16 = 15;
    pub const KEY_BLACK: u16 = 16;

    /// Custom types start here and require a type URI.
    pub const CUSTOM_BASE: u16 = 0x8000;
}

/// Canonical name of a component type; custom types render as hex.
pub fn component_type_name(ty: u16) -> String {
    let name = match ty {
        component_type::MONOCHROME => "monochrome",
        component_type::Y => "Y",
        component_type::CB => "Cb",
        component_type::CR => "Cr",
        component_type::RED => "red",
        component_type::GREEN => "green",
        component_type::BLUE => "blue",
        component_type::ALPHA => "alpha",
        component_type::DEPTH => "depth",
        component_type::DISPARITY => "disparity",
        component_type::PALETTE => "palette",
        component_type::FILTER_ARRAY => "filter array",
        component_type::PADDED => "padded",
        component_type::CYAN => "cyan",
        component_type::MAGENTA => "magenta",
        component_type::YELLOW => "yellow",
        component_type::KEY_BLACK => "key (black)",
        other => return format!("0x{other:04x}"),
    };
    name.to_string()
}

/// One `cmpd` entry. The URI is non-empty exactly for custom types.
#[derive(Debug, Clone, Default)]
pub struct Component {
    pub component_type: u16,
    pub component_type_uri: String,
}

impl Component {
    pub fn component_type_name(&self) -> String {
        component_type_name(self.component_type)
    }
}

/// Component definition box (`cmpd`).
#[derive(Debug, Clone, Default)]
pub struct Cmpd {
    components: Vec<Component>,
    box_size: u64,
    header_size: u32,
}

impl Cmpd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_component(&mut self, component: Component) {
        self.components.push(component);
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub(crate) fn parse(
        payload: &[u8],
        header: &BoxHeader,
        limits: &SecurityLimits,
    ) -> Result<Self, UncError> {
        let mut r = BoxReader::new(payload);

        let count = r.read_u32()?;
        limits.check_components(count)?;
        if count as u64 * 2 > r.remaining() {
            return Err(UncError::InvalidParameterValue(format!(
                "cmpd declares {count} components but the box is too small"
            )));
        }

        let mut components = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let component_type = r.read_u16()?;
            let component_type_uri = if component_type >= component_type::CUSTOM_BASE {
                let uri = r.read_nul_string()?;
                if uri.is_empty() {
                    return Err(UncError::InvalidParameterValue(format!(
                        "custom component type 0x{component_type:04x} without a type URI"
                    )));
                }
                uri
            } else {
                String::new()
            };
            components.push(Component {
                component_type,
                component_type_uri,
            });
        }

        Ok(Self {
            components,
            box_size: header.box_size,
            header_size: header.header_size,
        })
    }

    pub fn write(&self, w: &mut BoxWriter) -> Result<(), UncError> {
        w.start_box(BoxType::Cmpd)?;
        w.write_u32(self.components.len() as u32)?;
        for component in &self.components {
            w.write_u16(component.component_type)?;
            if component.component_type >= component_type::CUSTOM_BASE {
                if component.component_type_uri.is_empty() {
                    return Err(UncError::Usage(format!(
                        "custom component type 0x{:04x} requires a type URI",
                        component.component_type
                    )));
                }
                w.write_nul_string(&component.component_type_uri)?;
            }
        }
        w.end_box()
    }

    pub fn dump(&self, indent: usize) -> String {
        let mut s = dump_box_header(&BoxType::Cmpd, self.box_size, self.header_size);
        for component in &self.components {
            s.push_str(&format!(
                "component_type: {}\n",
                component.component_type_name()
            ));
            if !component.component_type_uri.is_empty() {
                s.push_str(&format!(
                    "| component_type_uri: {}\n",
                    component.component_type_uri
                ));
            }
        }
        apply_indent(s, indent)
    }
}
