use crate::objects::Dictionary;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// PDF name object. Holds the decoded name bytes (`#hh` escapes already
/// resolved); the leading `/` is a wire-format detail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// Wire form of a string object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    /// `(…)` with backslash escapes
    Literal,
    /// `<…>` hex pairs
    Hexadecimal,
}

/// PDF string object: raw bytes plus the wire form they were parsed from
/// (or should be emitted in).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfString {
    pub data: Vec<u8>,
    pub format: StringFormat,
}

impl PdfString {
    pub fn literal(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            format: StringFormat::Literal,
        }
    }

    pub fn hexadecimal(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            format: StringFormat::Hexadecimal,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Identity of an indirect object: object number and generation number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    number: u32,
    generation: u16,
}

impl ObjectId {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// An object with indirect identity, addressable by reference. The identity
/// is assigned once: by the parser when the object is materialized, or by
/// the writer just before emission.
#[derive(Debug)]
pub struct IndirectObject {
    id: Cell<ObjectId>,
    pub object: RefCell<PdfObject>,
}

impl IndirectObject {
    /// Wrap an inner object in a fresh, unnumbered handle.
    pub fn new(object: PdfObject) -> Rc<Self> {
        Rc::new(Self {
            id: Cell::new(ObjectId::new(0, 0)),
            object: RefCell::new(object),
        })
    }

    pub fn with_id(id: ObjectId, object: PdfObject) -> Rc<Self> {
        Rc::new(Self {
            id: Cell::new(id),
            object: RefCell::new(object),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id.get()
    }

    pub(crate) fn set_id(&self, id: ObjectId) {
        self.id.set(id);
    }
}

/// A stream object: dictionary plus raw byte payload, with indirect
/// identity. The payload is opaque to traversal.
#[derive(Debug)]
pub struct PdfStream {
    id: Cell<ObjectId>,
    pub dict: RefCell<Dictionary>,
    pub data: RefCell<Vec<u8>>,
}

impl PdfStream {
    pub fn new(dict: Dictionary, data: Vec<u8>) -> Rc<Self> {
        Rc::new(Self {
            id: Cell::new(ObjectId::new(0, 0)),
            dict: RefCell::new(dict),
            data: RefCell::new(data),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id.get()
    }

    pub(crate) fn set_id(&self, id: ObjectId) {
        self.id.set(id);
    }
}

/// Tagged variant covering every PDF object kind. Containers are values;
/// sharing and cycles flow only through `Indirect` and `Stream` handles, so
/// identity-keyed sets on those handles break every cycle.
#[derive(Debug, Clone)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Name),
    String(PdfString),
    Array(Vec<PdfObject>),
    Dictionary(Dictionary),
    Reference(ObjectId),
    Indirect(Rc<IndirectObject>),
    Stream(Rc<PdfStream>),
}

impl PdfObject {
    /// Wrap a value in a fresh indirect handle.
    pub fn indirect(object: PdfObject) -> Self {
        PdfObject::Indirect(IndirectObject::new(object))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PdfObject::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PdfObject::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            PdfObject::Real(r) => Some(*r),
            PdfObject::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&Name> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            PdfObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<PdfObject>> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            PdfObject::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_indirect(&self) -> Option<&Rc<IndirectObject>> {
        match self {
            PdfObject::Indirect(io) => Some(io),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Rc<PdfStream>> {
        match self {
            PdfObject::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Allocation address of the underlying node, for identity-keyed
    /// visited sets. `None` for objects without identity.
    pub fn node_address(&self) -> Option<usize> {
        match self {
            PdfObject::Indirect(io) => Some(Rc::as_ptr(io) as usize),
            PdfObject::Stream(s) => Some(Rc::as_ptr(s) as usize),
            _ => None,
        }
    }

    /// Identity comparison: true iff both sides are handles to the same
    /// indirect or stream node.
    pub fn is_same_node(&self, other: &PdfObject) -> bool {
        match (self, other) {
            (PdfObject::Indirect(a), PdfObject::Indirect(b)) => Rc::ptr_eq(a, b),
            (PdfObject::Stream(a), PdfObject::Stream(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for PdfObject {
    fn from(b: bool) -> Self {
        PdfObject::Boolean(b)
    }
}

impl From<i64> for PdfObject {
    fn from(i: i64) -> Self {
        PdfObject::Integer(i)
    }
}

impl From<f64> for PdfObject {
    fn from(r: f64) -> Self {
        PdfObject::Real(r)
    }
}

impl From<Name> for PdfObject {
    fn from(n: Name) -> Self {
        PdfObject::Name(n)
    }
}

impl From<PdfString> for PdfObject {
    fn from(s: PdfString) -> Self {
        PdfObject::String(s)
    }
}

impl From<Vec<PdfObject>> for PdfObject {
    fn from(a: Vec<PdfObject>) -> Self {
        PdfObject::Array(a)
    }
}

impl From<Dictionary> for PdfObject {
    fn from(d: Dictionary) -> Self {
        PdfObject::Dictionary(d)
    }
}

impl From<Rc<IndirectObject>> for PdfObject {
    fn from(io: Rc<IndirectObject>) -> Self {
        PdfObject::Indirect(io)
    }
}

impl From<Rc<PdfStream>> for PdfObject {
    fn from(s: Rc<PdfStream>) -> Self {
        PdfObject::Stream(s)
    }
}
