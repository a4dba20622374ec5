use crate::error::TypeTrack;
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Shape of a unit of storable data.
///
/// Containers always hold other `TypeExpr` nodes. Records are referred to by their portable
/// path (`module::Name`) and resolved through a [`Registry`](crate::Registry).
#[derive(Clone, Debug, PartialEq)]
pub enum TypeExpr {
    Boolean,
    Byte,
    Character,
    Rune,
    Integer2,
    Integer4,
    Integer8,
    Unsigned2,
    Unsigned4,
    Unsigned8,
    Float4,
    Float8,
    Block,
    String,
    Unicode,
    Enumeration(Arc<Enumeration>),
    ClockTime,
    TimeSpan,
    WorldTime,
    TimeDelta,
    Uuid,
    Type,
    Word,
    Any,
    TargetAddress,
    Address,
    ArrayOf(Box<TypeExpr>, usize),
    VectorOf(Box<TypeExpr>),
    SetOf(Box<TypeExpr>),
    MapOf(Box<TypeExpr>, Box<TypeExpr>),
    DequeOf(Box<TypeExpr>),
    UserDefined(String),
    PointerTo(Pointer),
}

/// Name of every [`TypeExpr`] variant, without parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Boolean,
    Byte,
    Character,
    Rune,
    Integer2,
    Integer4,
    Integer8,
    Unsigned2,
    Unsigned4,
    Unsigned8,
    Float4,
    Float8,
    Block,
    String,
    Unicode,
    Enumeration,
    ClockTime,
    TimeSpan,
    WorldTime,
    TimeDelta,
    Uuid,
    Type,
    Word,
    Any,
    TargetAddress,
    Address,
    ArrayOf,
    VectorOf,
    SetOf,
    MapOf,
    DequeOf,
    UserDefined,
    PointerTo,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Boolean => "Boolean",
            Kind::Byte => "Byte",
            Kind::Character => "Character",
            Kind::Rune => "Rune",
            Kind::Integer2 => "Integer2",
            Kind::Integer4 => "Integer4",
            Kind::Integer8 => "Integer8",
            Kind::Unsigned2 => "Unsigned2",
            Kind::Unsigned4 => "Unsigned4",
            Kind::Unsigned8 => "Unsigned8",
            Kind::Float4 => "Float4",
            Kind::Float8 => "Float8",
            Kind::Block => "Block",
            Kind::String => "String",
            Kind::Unicode => "Unicode",
            Kind::Enumeration => "Enumeration",
            Kind::ClockTime => "ClockTime",
            Kind::TimeSpan => "TimeSpan",
            Kind::WorldTime => "WorldTime",
            Kind::TimeDelta => "TimeDelta",
            Kind::Uuid => "UUID",
            Kind::Type => "Type",
            Kind::Word => "Word",
            Kind::Any => "Any",
            Kind::TargetAddress => "TargetAddress",
            Kind::Address => "Address",
            Kind::ArrayOf => "ArrayOf",
            Kind::VectorOf => "VectorOf",
            Kind::SetOf => "SetOf",
            Kind::MapOf => "MapOf",
            Kind::DequeOf => "DequeOf",
            Kind::UserDefined => "UserDefined",
            Kind::PointerTo => "PointerTo",
        }
    }

    /// Kinds that cannot be built without parameters (element types, a table, a record).
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Kind::Enumeration
                | Kind::ArrayOf
                | Kind::VectorOf
                | Kind::SetOf
                | Kind::MapOf
                | Kind::DequeOf
                | Kind::UserDefined
                | Kind::PointerTo
        )
    }

    /// Promote a bare leaf class to its expression. Containers are ambiguous without
    /// parameters and fail.
    pub fn promote(&self) -> Result<TypeExpr, TypeTrack> {
        let te = match self {
            Kind::Boolean => TypeExpr::Boolean,
            Kind::Byte => TypeExpr::Byte,
            Kind::Character => TypeExpr::Character,
            Kind::Rune => TypeExpr::Rune,
            Kind::Integer2 => TypeExpr::Integer2,
            Kind::Integer4 => TypeExpr::Integer4,
            Kind::Integer8 => TypeExpr::Integer8,
            Kind::Unsigned2 => TypeExpr::Unsigned2,
            Kind::Unsigned4 => TypeExpr::Unsigned4,
            Kind::Unsigned8 => TypeExpr::Unsigned8,
            Kind::Float4 => TypeExpr::Float4,
            Kind::Float8 => TypeExpr::Float8,
            Kind::Block => TypeExpr::Block,
            Kind::String => TypeExpr::String,
            Kind::Unicode => TypeExpr::Unicode,
            Kind::ClockTime => TypeExpr::ClockTime,
            Kind::TimeSpan => TypeExpr::TimeSpan,
            Kind::WorldTime => TypeExpr::WorldTime,
            Kind::TimeDelta => TypeExpr::TimeDelta,
            Kind::Uuid => TypeExpr::Uuid,
            Kind::Type => TypeExpr::Type,
            Kind::Word => TypeExpr::Word,
            Kind::Any => TypeExpr::Any,
            Kind::TargetAddress => TypeExpr::TargetAddress,
            Kind::Address => TypeExpr::Address,
            container => {
                return Err(TypeTrack::new(
                    Some(container.name()),
                    "container class used in type information, instance required",
                ))
            }
        };
        Ok(te)
    }
}

impl TypeExpr {
    pub fn kind(&self) -> Kind {
        match self {
            TypeExpr::Boolean => Kind::Boolean,
            TypeExpr::Byte => Kind::Byte,
            TypeExpr::Character => Kind::Character,
            TypeExpr::Rune => Kind::Rune,
            TypeExpr::Integer2 => Kind::Integer2,
            TypeExpr::Integer4 => Kind::Integer4,
            TypeExpr::Integer8 => Kind::Integer8,
            TypeExpr::Unsigned2 => Kind::Unsigned2,
            TypeExpr::Unsigned4 => Kind::Unsigned4,
            TypeExpr::Unsigned8 => Kind::Unsigned8,
            TypeExpr::Float4 => Kind::Float4,
            TypeExpr::Float8 => Kind::Float8,
            TypeExpr::Block => Kind::Block,
            TypeExpr::String => Kind::String,
            TypeExpr::Unicode => Kind::Unicode,
            TypeExpr::Enumeration(_) => Kind::Enumeration,
            TypeExpr::ClockTime => Kind::ClockTime,
            TypeExpr::TimeSpan => Kind::TimeSpan,
            TypeExpr::WorldTime => Kind::WorldTime,
            TypeExpr::TimeDelta => Kind::TimeDelta,
            TypeExpr::Uuid => Kind::Uuid,
            TypeExpr::Type => Kind::Type,
            TypeExpr::Word => Kind::Word,
            TypeExpr::Any => Kind::Any,
            TypeExpr::TargetAddress => Kind::TargetAddress,
            TypeExpr::Address => Kind::Address,
            TypeExpr::ArrayOf(..) => Kind::ArrayOf,
            TypeExpr::VectorOf(_) => Kind::VectorOf,
            TypeExpr::SetOf(_) => Kind::SetOf,
            TypeExpr::MapOf(..) => Kind::MapOf,
            TypeExpr::DequeOf(_) => Kind::DequeOf,
            TypeExpr::UserDefined(_) => Kind::UserDefined,
            TypeExpr::PointerTo(_) => Kind::PointerTo,
        }
    }

    pub fn is_container(&self) -> bool {
        self.kind().is_container()
    }

    pub fn vector_of(element: TypeExpr) -> Self {
        TypeExpr::VectorOf(Box::new(element))
    }

    pub fn map_of(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::MapOf(Box::new(key), Box::new(value))
    }

    pub fn user_defined(path: impl Into<String>) -> Self {
        TypeExpr::UserDefined(path.into())
    }

    /// A pointer to an already built element, not shared with any other pointer.
    pub fn pointer_to(element: TypeExpr) -> Self {
        let pointer = Pointer::unresolved();
        pointer.resolve(element);
        TypeExpr::PointerTo(pointer)
    }

    /// The record kind this expression ultimately carries, looking through containers
    /// (map values) and pointers.
    pub fn effective_type(&self) -> Option<&str> {
        let mut visited = HashSet::new();
        self.effective_inner(&mut visited)
    }

    fn effective_inner<'a>(&'a self, visited: &mut HashSet<usize>) -> Option<&'a str> {
        match self {
            TypeExpr::UserDefined(path) => Some(path.as_str()),
            TypeExpr::ArrayOf(e, _)
            | TypeExpr::VectorOf(e)
            | TypeExpr::DequeOf(e)
            | TypeExpr::SetOf(e) => e.effective_inner(visited),
            TypeExpr::MapOf(_, v) => v.effective_inner(visited),
            TypeExpr::PointerTo(p) => {
                if !visited.insert(p.slot()) {
                    return None;
                }
                p.element()?.effective_inner(visited)
            }
            _ => None,
        }
    }

    fn write_text(&self, f: &mut Formatter<'_>, bread: &mut HashSet<usize>) -> std::fmt::Result {
        match self {
            TypeExpr::UserDefined(path) => write!(f, "UserDefined({path})"),
            TypeExpr::ArrayOf(e, size) => {
                write!(f, "ArrayOf(")?;
                e.write_text(f, bread)?;
                write!(f, ",{size})")
            }
            TypeExpr::VectorOf(e) | TypeExpr::SetOf(e) | TypeExpr::DequeOf(e) => {
                write!(f, "{}(", self.kind().name())?;
                e.write_text(f, bread)?;
                write!(f, ")")
            }
            TypeExpr::MapOf(k, v) => {
                write!(f, "MapOf(")?;
                k.write_text(f, bread)?;
                write!(f, ",")?;
                v.write_text(f, bread)?;
                write!(f, ")")
            }
            TypeExpr::PointerTo(p) => {
                if !bread.insert(p.slot()) {
                    return write!(f, "PointerTo(...)");
                }
                write!(f, "PointerTo(")?;
                match p.element() {
                    Some(e) => e.write_text(f, bread)?,
                    None => write!(f, "?")?,
                }
                write!(f, ")")
            }
            leaf => write!(f, "{}()", leaf.kind().name()),
        }
    }
}

impl Display for TypeExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut bread = HashSet::new();
        self.write_text(f, &mut bread)
    }
}

/// Non-owning back-reference. Two pointers are the same pointer only when they share a target
/// cell, which is how shared and cyclic targets are represented after fixing.
#[derive(Clone)]
pub struct Pointer {
    target: Arc<OnceCell<TypeExpr>>,
}

impl Pointer {
    pub(crate) fn unresolved() -> Self {
        Pointer {
            target: Arc::new(OnceCell::new()),
        }
    }

    pub(crate) fn resolve(&self, element: TypeExpr) {
        if self.target.set(element).is_err() {
            log::trace!("pointer target already resolved");
        }
    }

    /// `None` only while the target is still being fixed.
    pub fn element(&self) -> Option<&TypeExpr> {
        self.target.get()
    }

    /// Identity of the target cell.
    pub fn slot(&self) -> usize {
        Arc::as_ptr(&self.target) as usize
    }
}

impl PartialEq for Pointer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.target, &other.target)
    }
}

impl Debug for Pointer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pointer({:#x})", self.slot())
    }
}

/// Bijection between member names and integers.
#[derive(Debug, PartialEq, Eq)]
pub struct Enumeration {
    name: String,
    members: Vec<(String, i64)>,
}

impl Enumeration {
    pub fn new<N: Into<String>>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = (N, i64)>,
    ) -> Result<Self, TypeTrack> {
        let name = name.into();
        let members: Vec<(String, i64)> = members.into_iter().map(|(n, v)| (n.into(), v)).collect();
        let mut names = HashSet::new();
        let mut numbers = HashSet::new();
        for (n, v) in &members {
            if !names.insert(n.as_str()) || !numbers.insert(*v) {
                return Err(TypeTrack::new(
                    Some(name.as_str()),
                    format!("member \"{n}\" ({v}) breaks the name/number bijection"),
                ));
            }
        }
        Ok(Enumeration { name, members })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn to_name(&self, number: i64) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| *v == number)
            .map(|(n, _)| n.as_str())
    }

    pub fn to_number(&self, name: &str) -> Option<i64> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn first(&self) -> Option<i64> {
        self.members.first().map(|(_, v)| *v)
    }
}
