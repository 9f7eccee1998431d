use std::fmt;

/// Element type tag carried by every [`crate::NDArray`] and written to the wire as a lowercase
/// string (`"int32"`, `"float64"`, ...).
///
/// Deserializing an unknown tag yields [`DataType::Object`] rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Float32,
    Float64,
    #[serde(other)]
    Object,
}

impl DataType {
    pub const ALL: [DataType; 10] = [
        DataType::Bool,
        DataType::Uint8,
        DataType::Int8,
        DataType::Uint16,
        DataType::Int16,
        DataType::Uint32,
        DataType::Int32,
        DataType::Float32,
        DataType::Float64,
        DataType::Object,
    ];

    /// Width of one element in bytes, `None` for [`DataType::Object`].
    pub const fn byte_width(&self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Uint8 | DataType::Int8 => Some(1),
            DataType::Uint16 | DataType::Int16 => Some(2),
            DataType::Uint32 | DataType::Int32 | DataType::Float32 => Some(4),
            DataType::Float64 => Some(8),
            DataType::Object => None,
        }
    }

    pub const fn is_numeric(&self) -> bool {
        !matches!(self, DataType::Object)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Uint8 => "uint8",
            DataType::Int8 => "int8",
            DataType::Uint16 => "uint16",
            DataType::Int16 => "int16",
            DataType::Uint32 => "uint32",
            DataType::Int32 => "int32",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Object => "object",
        }
    }

    /// Resolve a dtype tag. Unrecognized tags fall back to [`DataType::Object`].
    pub fn resolve(tag: &str) -> DataType {
        match DataType::ALL.iter().find(|dtype| dtype.as_str() == tag) {
            Some(dtype) => *dtype,
            None => {
                tracing::debug!(tag, "unrecognized dtype, falling back to object");
                DataType::Object
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
