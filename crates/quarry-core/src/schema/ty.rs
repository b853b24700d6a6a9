use std::fmt;

/// The builtin types every element resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinType {
    Boolean,
    UInt8,
    Int16,
    Int32,
    Int64,
    Double,

    /// Decimal with optional precision and scale. `Decimal(p)` means scale 0.
    Decimal {
        precision: Option<u32>,
        scale: Option<u32>,
    },

    String {
        length: Option<u32>,
    },
    LargeString,
    Binary {
        length: Option<u32>,
    },
    LargeBinary,
    Uuid,
    Date,
    Time,

    /// Date and time, second precision
    DateTime,

    /// Date and time with fractional seconds. `precision` overrides the
    /// configured default (0–7 digits).
    Timestamp {
        precision: Option<u8>,
    },
}

/// A named type declared in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    Builtin(BuiltinType),

    /// Another named type
    Alias(String),
}

/// Type reference as written on an element declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Builtin(BuiltinType),
    Named(String),
}

impl BuiltinType {
    pub fn string() -> Self {
        Self::String { length: None }
    }

    pub fn string_of(length: u32) -> Self {
        Self::String {
            length: Some(length),
        }
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self::Decimal {
            precision: Some(precision),
            scale: Some(scale),
        }
    }

    pub fn binary() -> Self {
        Self::Binary { length: None }
    }

    pub fn timestamp() -> Self {
        Self::Timestamp { precision: None }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String { .. } | Self::LargeString)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary { .. } | Self::LargeBinary)
    }

    /// Large objects are candidates for streamed reads.
    pub fn is_large_object(&self) -> bool {
        matches!(self, Self::LargeString | Self::LargeBinary)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::UInt8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Self::Double | Self::Decimal { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::UInt8 => "UInt8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Double => "Double",
            Self::Decimal { .. } => "Decimal",
            Self::String { .. } => "String",
            Self::LargeString => "LargeString",
            Self::Binary { .. } => "Binary",
            Self::LargeBinary => "LargeBinary",
            Self::Uuid => "UUID",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::DateTime => "DateTime",
            Self::Timestamp { .. } => "Timestamp",
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal {
                precision: Some(p),
                scale,
            } => write!(f, "Decimal({p}, {})", scale.unwrap_or(0)),
            Self::String { length: Some(n) } => write!(f, "String({n})"),
            Self::Binary { length: Some(n) } => write!(f, "Binary({n})"),
            Self::Timestamp { precision: Some(p) } => write!(f, "Timestamp({p})"),
            ty => f.write_str(ty.name()),
        }
    }
}

impl From<BuiltinType> for TypeRef {
    fn from(value: BuiltinType) -> Self {
        TypeRef::Builtin(value)
    }
}

impl From<&str> for TypeRef {
    fn from(value: &str) -> Self {
        TypeRef::Named(value.to_string())
    }
}
