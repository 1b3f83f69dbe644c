use std::fmt::Display;

use crate::Error;

/// Canonical numeric element type of the values exchanged between cooperating processes. This is the closed
/// vocabulary that [`CollectiveRuntime::native_element_type`](crate::CollectiveRuntime::native_element_type)
/// translates into the corresponding predefined datatype handle of the collective-communication runtime.
///
/// Note that 16-bit floating-point types are intentionally absent: the runtime boundary defines no portable
/// predefined handle for them, and so descriptors such as `"float16"` parse as unrecognized values rather than
/// mapping to an alternate encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementType {
    /// [`ElementType`] that represents `true`/`false` values.
    Boolean,

    /// [`ElementType`] that represents 8-bit signed integer values.
    Int8,

    /// [`ElementType`] that represents 16-bit signed integer values.
    Int16,

    /// [`ElementType`] that represents 32-bit signed integer values.
    Int32,

    /// [`ElementType`] that represents 64-bit signed integer values.
    Int64,

    /// [`ElementType`] that represents 8-bit unsigned integer values.
    UnsignedInt8,

    /// [`ElementType`] that represents 16-bit unsigned integer values.
    UnsignedInt16,

    /// [`ElementType`] that represents 32-bit unsigned integer values.
    UnsignedInt32,

    /// [`ElementType`] that represents 64-bit unsigned integer values.
    UnsignedInt64,

    /// [`ElementType`] that represents 32-bit IEEE floating-point values.
    Float32,

    /// [`ElementType`] that represents 64-bit IEEE floating-point values.
    Float64,

    /// [`ElementType`] that represents complex values stored as pairs of 32-bit IEEE floating-point values.
    Complex64,

    /// [`ElementType`] that represents complex values stored as pairs of 64-bit IEEE floating-point values.
    Complex128,
}

impl ElementType {
    /// Parses an element-type descriptor into an [`ElementType`]. The lookup is case-insensitive and accepts both
    /// the numeric array library's descriptor spellings (e.g., `"float32"`) and the short forms (e.g., `"f32"`).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str<S: AsRef<str>>(value: S) -> Result<Self, Error> {
        let value = value.as_ref();
        match value.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(Self::Boolean),
            "int8" | "i8" => Ok(Self::Int8),
            "int16" | "i16" => Ok(Self::Int16),
            "int32" | "i32" => Ok(Self::Int32),
            "int64" | "i64" => Ok(Self::Int64),
            "uint8" | "u8" => Ok(Self::UnsignedInt8),
            "uint16" | "u16" => Ok(Self::UnsignedInt16),
            "uint32" | "u32" => Ok(Self::UnsignedInt32),
            "uint64" | "u64" => Ok(Self::UnsignedInt64),
            "float32" | "f32" => Ok(Self::Float32),
            "float64" | "f64" => Ok(Self::Float64),
            "complex64" | "c64" => Ok(Self::Complex64),
            "complex128" | "c128" => Ok(Self::Complex128),
            _ => Err(Error::unrecognized_value(value, format!("conversion from element type {value} is not known"))),
        }
    }

    /// Returns all [`ElementType`]s, in a stable order.
    pub fn all() -> [Self; 13] {
        [
            Self::Boolean,
            Self::Int8,
            Self::Int16,
            Self::Int32,
            Self::Int64,
            Self::UnsignedInt8,
            Self::UnsignedInt16,
            Self::UnsignedInt32,
            Self::UnsignedInt64,
            Self::Float32,
            Self::Float64,
            Self::Complex64,
            Self::Complex128,
        ]
    }
}

impl Display for ElementType {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::Boolean => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UnsignedInt8 => "uint8",
            Self::UnsignedInt16 => "uint16",
            Self::UnsignedInt32 => "uint32",
            Self::UnsignedInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
        })
    }
}
