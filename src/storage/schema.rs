/// Fixed width used for every `String` field produced by the text
/// loader (see `heap_file_encoder`). Tables built programmatically are
/// free to use any width; this one only binds CSV ingestion.
pub const STRING_LEN: usize = 128;

/// A field type. `Int` is a 4-byte signed integer; `String(n)` is a
/// fixed-width field holding up to `n` bytes, stored with a 4-byte
/// length prefix followed by `n` zero-padded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Int,
    String(usize),
}

impl Type {
    pub fn size(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::String(n) => 4 + n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldItem {
    pub field_type: Type,
    pub field_name: String,
}

/// A tuple descriptor: the ordered sequence of field types a `Tuple`
/// must conform to.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<FieldItem>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Schema {
    pub fn new(fields: Vec<FieldItem>) -> Self {
        Self { fields }
    }

    pub fn size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.size()).sum()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// A schema of `width` INT columns, named `{prefix}-{i}`. Mirrors the
/// fixture-building helper every integration test reaches for.
pub fn int_schema(width: usize, prefix: &str) -> Schema {
    let fields = (0..width)
        .map(|i| FieldItem {
            field_type: Type::Int,
            field_name: format!("{}-{}", prefix, i),
        })
        .collect();
    Schema::new(fields)
}
