//! Typed property marshalling between the runtime and console surfaces.
//!
//! The runtime side speaks in dynamically tagged values
//! ([`ExternalValue`]); console attributes are statically typed. The bridge
//! between the two is a closed, enumerable schema: one
//! [`PropertyDescriptor`] per attribute, built once when the console kind is
//! registered and never mutated, replacing the original's live property
//! introspection.
//!
//! Reads and writes both go through [`PropertySchema::get_or_set`]. The
//! direction is picked by the external value's tag: [`ExternalValue::Unbound`]
//! queries, anything else writes. Incompatible tag/kind combinations raise
//! [`BridgeError::PropertyTypeMismatch`] and leave the property unchanged.
//!
//! Enumerated properties are integer-backed with a finite bidirectional
//! symbol table. Bitmask/flag-style enumerations are explicitly unsupported:
//! there is no way to declare one in a schema, and none is approximated.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::surface::{ConsoleState, LineWrapMode};

/// Dynamically tagged value as the runtime side represents it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExternalValue {
    /// Unbound query form; asks the bridge to produce the current value.
    Unbound,
    /// Integer term.
    Int(i64),
    /// Symbol / atom term.
    Atom(String),
    /// Floating-point term.
    Float(f64),
}

impl ExternalValue {
    /// Short tag name for diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            ExternalValue::Unbound => "unbound",
            ExternalValue::Int(_) => "integer",
            ExternalValue::Atom(_) => "atom",
            ExternalValue::Float(_) => "float",
        }
    }
}

/// Bidirectional symbol↔integer table of an enumerated property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnumTable {
    entries: &'static [(&'static str, i64)],
}

impl EnumTable {
    /// Table over a static entry list.
    pub const fn new(entries: &'static [(&'static str, i64)]) -> Self {
        Self { entries }
    }

    /// Symbol for a backing integer, if the value resolves.
    pub fn symbol_for(&self, value: i64) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(s, _)| *s)
    }

    /// Backing integer for a symbol, if the symbol resolves.
    pub fn value_for(&self, symbol: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, v)| *v)
    }
}

/// Declared kind of a console property.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertyKind {
    /// Boolean attribute; reads and writes as the `true`/`false` symbols.
    Bool,
    /// Signed integer attribute.
    Int,
    /// Unsigned integer attribute.
    UInt,
    /// Text attribute.
    Text,
    /// Floating-point attribute; write-only through the bridge.
    Float,
    /// Integer-backed attribute with a finite named symbol set.
    Enum(EnumTable),
}

impl PropertyKind {
    fn name(&self) -> &'static str {
        match self {
            PropertyKind::Bool => "boolean",
            PropertyKind::Int => "signed integer",
            PropertyKind::UInt => "unsigned integer",
            PropertyKind::Text => "text",
            PropertyKind::Float => "floating-point",
            PropertyKind::Enum(_) => "enumerated",
        }
    }
}

/// Statically typed value passed between descriptor accessors and the bridge.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// Boolean.
    Bool(bool),
    /// Signed integer; also the backing representation of enumerated kinds.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Text.
    Text(String),
    /// Floating point.
    Float(f64),
}

/// Static metadata and accessors of one console attribute.
pub struct PropertyDescriptor {
    /// Property name as the runtime addresses it.
    pub name: &'static str,
    /// Declared kind.
    pub kind: PropertyKind,
    read: fn(&ConsoleState) -> PropertyValue,
    write: fn(&mut ConsoleState, PropertyValue),
}

/// The closed attribute schema of a console kind.
pub struct PropertySchema {
    descriptors: Vec<PropertyDescriptor>,
}

impl PropertySchema {
    fn new(descriptors: Vec<PropertyDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Descriptor by name.
    pub fn lookup(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Declared property names, in schema order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.iter().map(|d| d.name)
    }

    /// Reads or writes the property `name` on `state`, directed by the tag
    /// of `value`.
    ///
    /// `Unbound` reads; writes echo the written value back. Any incompatible
    /// tag/kind combination fails with
    /// [`BridgeError::PropertyTypeMismatch`] without touching the property.
    pub fn get_or_set(
        &self,
        state: &mut ConsoleState,
        name: &str,
        value: ExternalValue,
    ) -> BridgeResult<ExternalValue> {
        let descriptor = self
            .lookup(name)
            .ok_or_else(|| BridgeError::PropertyNotFound(name.to_string()))?;

        let mismatch = |detail: String| BridgeError::PropertyTypeMismatch {
            property: name.to_string(),
            detail,
        };

        match value {
            ExternalValue::Unbound => {
                let current = (descriptor.read)(state);
                match (descriptor.kind, current) {
                    (PropertyKind::Bool, PropertyValue::Bool(b)) => {
                        Ok(ExternalValue::Atom(bool_symbol(b).to_string()))
                    }
                    (PropertyKind::Enum(table), PropertyValue::Int(v)) => {
                        Ok(match table.symbol_for(v) {
                            Some(symbol) => ExternalValue::Atom(symbol.to_string()),
                            None => ExternalValue::Int(v),
                        })
                    }
                    (PropertyKind::Int, PropertyValue::Int(v)) => Ok(ExternalValue::Int(v)),
                    (PropertyKind::UInt, PropertyValue::UInt(v)) => {
                        Ok(ExternalValue::Int(v as i64))
                    }
                    (PropertyKind::Text, PropertyValue::Text(s)) => Ok(ExternalValue::Atom(s)),
                    (kind, _) => Err(mismatch(format!(
                        "cannot read {} property through the bridge",
                        kind.name()
                    ))),
                }
            }

            ExternalValue::Int(i) => match descriptor.kind {
                PropertyKind::Int | PropertyKind::Enum(_) => {
                    (descriptor.write)(state, PropertyValue::Int(i));
                    Ok(ExternalValue::Int(i))
                }
                PropertyKind::UInt => {
                    let unsigned = u64::try_from(i).map_err(|_| {
                        mismatch(format!("negative value {i} into unsigned property"))
                    })?;
                    (descriptor.write)(state, PropertyValue::UInt(unsigned));
                    Ok(ExternalValue::Int(i))
                }
                kind => Err(mismatch(format!(
                    "integer value into {} property",
                    kind.name()
                ))),
            },

            ExternalValue::Atom(symbol) => match descriptor.kind {
                PropertyKind::Text => {
                    (descriptor.write)(state, PropertyValue::Text(symbol.clone()));
                    Ok(ExternalValue::Atom(symbol))
                }
                PropertyKind::Enum(table) => match table.value_for(&symbol) {
                    Some(backing) => {
                        (descriptor.write)(state, PropertyValue::Int(backing));
                        Ok(ExternalValue::Atom(symbol))
                    }
                    None => Err(mismatch(format!(
                        "unknown symbol '{symbol}' for enumerated property"
                    ))),
                },
                PropertyKind::Bool => match symbol.as_str() {
                    "true" => {
                        (descriptor.write)(state, PropertyValue::Bool(true));
                        Ok(ExternalValue::Atom(symbol))
                    }
                    "false" => {
                        (descriptor.write)(state, PropertyValue::Bool(false));
                        Ok(ExternalValue::Atom(symbol))
                    }
                    other => Err(mismatch(format!(
                        "symbol '{other}' into boolean property (expected true/false)"
                    ))),
                },
                kind => Err(mismatch(format!(
                    "atom value into {} property",
                    kind.name()
                ))),
            },

            ExternalValue::Float(f) => match descriptor.kind {
                PropertyKind::Float => {
                    (descriptor.write)(state, PropertyValue::Float(f));
                    Ok(ExternalValue::Float(f))
                }
                kind => Err(mismatch(format!(
                    "float value into {} property",
                    kind.name()
                ))),
            },
        }
    }
}

fn bool_symbol(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

static LINE_WRAP_TABLE: EnumTable =
    EnumTable::new(&[("NoWrap", 0), ("WidgetWidth", 1)]);

static CONSOLE_SCHEMA: Lazy<PropertySchema> = Lazy::new(|| {
    PropertySchema::new(vec![
        PropertyDescriptor {
            name: "updateRefreshRate",
            kind: PropertyKind::UInt,
            read: |s| PropertyValue::UInt(u64::from(s.update_refresh_rate)),
            write: |s, v| {
                if let PropertyValue::UInt(v) = v {
                    s.update_refresh_rate = u32::try_from(v).unwrap_or(u32::MAX);
                }
            },
        },
        PropertyDescriptor {
            name: "maximumBlockCount",
            kind: PropertyKind::Int,
            read: |s| PropertyValue::Int(s.maximum_block_count),
            write: |s, v| {
                if let PropertyValue::Int(v) = v {
                    s.maximum_block_count = v;
                }
            },
        },
        PropertyDescriptor {
            name: "lineWrapMode",
            kind: PropertyKind::Enum(LINE_WRAP_TABLE),
            read: |s| PropertyValue::Int(s.line_wrap_mode.as_i64()),
            write: |s, v| {
                if let PropertyValue::Int(v) = v {
                    // A raw integer outside the table leaves the mode as is.
                    if let Some(mode) = LineWrapMode::from_i64(v) {
                        s.line_wrap_mode = mode;
                    }
                }
            },
        },
        PropertyDescriptor {
            name: "overwriteMode",
            kind: PropertyKind::Bool,
            read: |s| PropertyValue::Bool(s.overwrite_mode),
            write: |s, v| {
                if let PropertyValue::Bool(v) = v {
                    s.overwrite_mode = v;
                }
            },
        },
        PropertyDescriptor {
            name: "fontFamily",
            kind: PropertyKind::Text,
            read: |s| PropertyValue::Text(s.font.family.clone()),
            write: |s, v| {
                if let PropertyValue::Text(v) = v {
                    s.font.family = v;
                }
            },
        },
        PropertyDescriptor {
            name: "fontSize",
            kind: PropertyKind::Float,
            read: |s| PropertyValue::Float(s.font.point_size),
            write: |s, v| {
                if let PropertyValue::Float(v) = v {
                    s.font.point_size = v;
                }
            },
        },
    ])
});

/// The console kind's schema, built once at first use.
pub fn console_schema() -> &'static PropertySchema {
    &CONSOLE_SCHEMA
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleDefaults;
    use crate::console::console_channels;

    fn state() -> ConsoleState {
        let (gui, _worker) = console_channels();
        ConsoleState::new(
            std::thread::current().id(),
            &ConsoleDefaults::default(),
            100,
            gui,
        )
    }

    fn atom(s: &str) -> ExternalValue {
        ExternalValue::Atom(s.to_string())
    }

    #[test]
    fn boolean_round_trip_yields_true_symbol() {
        let mut state = state();
        let schema = console_schema();

        schema
            .get_or_set(&mut state, "overwriteMode", atom("true"))
            .unwrap();
        let read = schema
            .get_or_set(&mut state, "overwriteMode", ExternalValue::Unbound)
            .unwrap();
        assert_eq!(read, atom("true"));
    }

    #[test]
    fn enumerated_reads_resolve_to_symbol() {
        let mut state = state();
        let schema = console_schema();

        schema
            .get_or_set(&mut state, "lineWrapMode", atom("NoWrap"))
            .unwrap();
        assert_eq!(state.line_wrap_mode, LineWrapMode::NoWrap);
        let read = schema
            .get_or_set(&mut state, "lineWrapMode", ExternalValue::Unbound)
            .unwrap();
        assert_eq!(read, atom("NoWrap"));
    }

    #[test]
    fn unknown_enum_symbol_fails_and_leaves_value_unchanged() {
        let mut state = state();
        let before = state.line_wrap_mode;

        let err = console_schema()
            .get_or_set(&mut state, "lineWrapMode", atom("Diagonal"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::PropertyTypeMismatch { .. }));
        assert_eq!(state.line_wrap_mode, before);
    }

    #[test]
    fn integer_into_text_property_fails() {
        let mut state = state();
        let err = console_schema()
            .get_or_set(&mut state, "fontFamily", ExternalValue::Int(3))
            .unwrap_err();
        assert!(matches!(err, BridgeError::PropertyTypeMismatch { .. }));
    }

    #[test]
    fn plain_integer_properties_read_and_write_raw() {
        let mut state = state();
        let schema = console_schema();

        let read = schema
            .get_or_set(&mut state, "updateRefreshRate", ExternalValue::Unbound)
            .unwrap();
        assert_eq!(read, ExternalValue::Int(100));

        schema
            .get_or_set(&mut state, "maximumBlockCount", ExternalValue::Int(500))
            .unwrap();
        assert_eq!(state.maximum_block_count, 500);
    }

    #[test]
    fn negative_into_unsigned_property_fails() {
        let mut state = state();
        let before = state.update_refresh_rate;
        let err = console_schema()
            .get_or_set(&mut state, "updateRefreshRate", ExternalValue::Int(-5))
            .unwrap_err();
        assert!(matches!(err, BridgeError::PropertyTypeMismatch { .. }));
        assert_eq!(state.update_refresh_rate, before);
    }

    #[test]
    fn raw_integer_accepted_for_enumerated_property() {
        let mut state = state();
        console_schema()
            .get_or_set(&mut state, "lineWrapMode", ExternalValue::Int(0))
            .unwrap();
        assert_eq!(state.line_wrap_mode, LineWrapMode::NoWrap);
    }

    #[test]
    fn float_property_accepts_float_but_refuses_read() {
        let mut state = state();
        let schema = console_schema();

        schema
            .get_or_set(&mut state, "fontSize", ExternalValue::Float(12.5))
            .unwrap();
        assert_eq!(state.font.point_size, 12.5);

        let err = schema
            .get_or_set(&mut state, "fontSize", ExternalValue::Unbound)
            .unwrap_err();
        assert!(matches!(err, BridgeError::PropertyTypeMismatch { .. }));
    }

    #[test]
    fn unknown_property_name_is_its_own_error() {
        let mut state = state();
        let err = console_schema()
            .get_or_set(&mut state, "noSuchProperty", ExternalValue::Unbound)
            .unwrap_err();
        assert!(matches!(err, BridgeError::PropertyNotFound(_)));
    }
}
