use std::collections::HashMap;

/// A dynamically typed value tree the engine queries against.
///
/// This is the single "any" representation the executor understands. JSON
/// documents bridge into it via `From<serde_json::Value>`; native data can
/// additionally use [`Record`] for struct-like values with a declared field
/// order and optional per-field output renames.
///
/// Integers and unsigned integers are kept apart so that cross-width
/// comparisons can resolve sign correctly, and floats stay distinct from both.
///
/// # Examples
///
/// ```
/// use jetpath::Value;
///
/// let v: Value = serde_json::json!({"a": [1, 2.5, "x"]}).into();
/// assert!(matches!(v, Value::Mapping(_)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Bool(bool),

    /// Signed integer
    Int(i64),

    /// Unsigned integer (used for values exceeding i64)
    Uint(u64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Ordered array of values
    Array(Vec<Value>),

    /// Unordered mapping from string keys to values.
    ///
    /// Iteration order is unspecified, so rendered output involving mappings
    /// is order-unstable.
    Mapping(HashMap<String, Value>),

    /// Struct-like value with declared field order
    Record(Record),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value has children to traverse (array, mapping, record).
    pub fn has_children(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Mapping(_) | Value::Record(_))
    }

    /// Human-readable kind name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Mapping(_) => "mapping",
            Value::Record(_) => "record",
        }
    }

    /// Looks up a member by name on mappings and records.
    pub fn named_child(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get(name),
            Value::Record(rec) => rec.get(name),
            _ => None,
        }
    }

    /// Number of members/elements for containers, `None` for leaves.
    pub fn child_count(&self) -> Option<usize> {
        match self {
            Value::Array(arr) => Some(arr.len()),
            Value::Mapping(map) => Some(map.len()),
            Value::Record(rec) => Some(rec.len()),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else {
                    // serde_json numbers are i64, u64 or f64
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Mapping(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// A struct-like value: named fields in declared order.
///
/// A field may carry a rename, which the output formatters prefer over the
/// declared name (the equivalent of a `json` serialization annotation).
/// Name selectors and comparisons always use the declared name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub rename: Option<String>,
    pub value: Value,
}

impl Field {
    /// The name the formatters render: the rename when present.
    pub fn output_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Appends a field, builder-style.
    pub fn field(mut self, name: &str, value: Value) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            rename: None,
            value,
        });
        self
    }

    /// Appends a field carrying an output rename, builder-style.
    pub fn renamed_field(mut self, name: &str, rename: &str, value: Value) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            rename: Some(rename.to_string()),
            value,
        });
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a field value by declared name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

/// An ordered set of node references produced by a query.
///
/// Elements borrow the input tree; duplicates are permitted and ordering
/// follows the input structure (reversed under negative-step slices).
#[derive(Debug, Clone, Default)]
pub struct ResultSet<'a> {
    pub elems: Vec<&'a Value>,
}

impl<'a> ResultSet<'a> {
    pub fn new() -> Self {
        ResultSet { elems: Vec::new() }
    }

    pub fn single(elem: &'a Value) -> Self {
        ResultSet { elems: vec![elem] }
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }
}

/// A single unwrapped value: literals, function outputs, and the values of
/// singular sub-queries used in comparisons.
///
/// `Node` only ever holds structured values (array/mapping/record); leaves
/// are unwrapped into the scalar variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Singular<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Node(&'a Value),
}

impl<'a> Singular<'a> {
    /// Unwraps a tree node into a singular: leaves become scalars, structured
    /// values stay as borrowed nodes.
    pub fn of_node(v: &'a Value) -> Singular<'a> {
        match v {
            Value::Null => Singular::Null,
            Value::Bool(b) => Singular::Bool(*b),
            Value::Int(i) => Singular::Int(*i),
            Value::Uint(u) => Singular::Uint(*u),
            Value::Float(f) => Singular::Float(*f),
            Value::String(s) => Singular::String(s.clone()),
            Value::Array(_) | Value::Mapping(_) | Value::Record(_) => Singular::Node(v),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Singular::Null)
    }
}

/// What a query or filter function evaluates to: a set of borrowed nodes or
/// one singular value.
#[derive(Debug, Clone)]
pub enum QueryResult<'a> {
    Set(ResultSet<'a>),
    Singular(Singular<'a>),
}
