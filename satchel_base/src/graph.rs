//! Raw type descriptions and their resolution into [`TypeExpr`].
//!
//! Declarations are collected as nodes in a [`TypeGraph`] arena. Containers refer to their
//! children by [`NodeId`], so a `PointerTo` node can point back at an ancestor and describe a
//! cyclic shape. [`fix`] walks the graph once, memoizing pointer targets by node id.

use crate::error::TypeTrack;
use crate::type_expr::{Kind, Pointer, TypeExpr};
use std::collections::HashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Native Rust types that map 1:1 onto a leaf expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Native {
    Bool,
    Int,
    Float,
    /// Mutable byte buffer.
    Bytes,
    /// Immutable byte string.
    ByteString,
    Str,
    Uuid,
    DateTime,
    Duration,
}

impl Native {
    pub fn equivalent(&self) -> TypeExpr {
        match self {
            Native::Bool => TypeExpr::Boolean,
            Native::Int => TypeExpr::Integer8,
            Native::Float => TypeExpr::Float8,
            Native::Bytes => TypeExpr::Block,
            Native::ByteString => TypeExpr::String,
            Native::Str => TypeExpr::Unicode,
            Native::Uuid => TypeExpr::Uuid,
            Native::DateTime => TypeExpr::WorldTime,
            Native::Duration => TypeExpr::TimeDelta,
        }
    }
}

#[derive(Clone, Debug)]
pub enum RawType {
    /// Already a complete expression. Record references inside it are still checked.
    Fixed(TypeExpr),
    /// A bare class, only usable for leaves.
    Class(Kind),
    Native(Native),
    ArrayOf(NodeId, usize),
    VectorOf(NodeId),
    SetOf(NodeId),
    MapOf(NodeId, NodeId),
    DequeOf(NodeId),
    UserDefined(String),
    /// Target is filled in with [`TypeGraph::point`] when it is declared after the pointer.
    PointerTo(Option<NodeId>),
}

#[derive(Clone, Debug, Default)]
pub struct TypeGraph {
    nodes: Vec<RawType>,
}

impl TypeGraph {
    pub fn new() -> Self {
        TypeGraph { nodes: Vec::new() }
    }

    pub fn add(&mut self, raw: RawType) -> NodeId {
        self.nodes.push(raw);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&RawType> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn fixed(&mut self, te: TypeExpr) -> NodeId {
        self.add(RawType::Fixed(te))
    }

    pub fn class(&mut self, kind: Kind) -> NodeId {
        self.add(RawType::Class(kind))
    }

    pub fn native(&mut self, native: Native) -> NodeId {
        self.add(RawType::Native(native))
    }

    pub fn array_of(&mut self, element: NodeId, size: usize) -> NodeId {
        self.add(RawType::ArrayOf(element, size))
    }

    pub fn vector_of(&mut self, element: NodeId) -> NodeId {
        self.add(RawType::VectorOf(element))
    }

    pub fn set_of(&mut self, element: NodeId) -> NodeId {
        self.add(RawType::SetOf(element))
    }

    pub fn map_of(&mut self, key: NodeId, value: NodeId) -> NodeId {
        self.add(RawType::MapOf(key, value))
    }

    pub fn deque_of(&mut self, element: NodeId) -> NodeId {
        self.add(RawType::DequeOf(element))
    }

    pub fn user_defined(&mut self, path: impl Into<String>) -> NodeId {
        self.add(RawType::UserDefined(path.into()))
    }

    pub fn pointer_to(&mut self, element: NodeId) -> NodeId {
        self.add(RawType::PointerTo(Some(element)))
    }

    /// Pointer whose target is not declared yet.
    pub fn pointer(&mut self) -> NodeId {
        self.add(RawType::PointerTo(None))
    }

    /// Aim a pointer created with [`TypeGraph::pointer`]. Returns false if `pointer` is not a
    /// pointer node.
    pub fn point(&mut self, pointer: NodeId, element: NodeId) -> bool {
        match self.nodes.get_mut(pointer.0) {
            Some(RawType::PointerTo(target)) => {
                *target = Some(element);
                true
            }
            _ => false,
        }
    }
}

/// Resolve `node` into a complete expression.
///
/// `is_record` decides whether a portable path names a known record kind.
pub fn fix(
    graph: &TypeGraph,
    node: NodeId,
    is_record: &dyn Fn(&str) -> bool,
) -> Result<TypeExpr, TypeTrack> {
    let mut fixer = Fixer {
        graph,
        is_record,
        bread: HashMap::new(),
    };
    fixer.fix(node)
}

struct Fixer<'a> {
    graph: &'a TypeGraph,
    is_record: &'a dyn Fn(&str) -> bool,
    bread: HashMap<NodeId, Pointer>,
}

impl<'a> Fixer<'a> {
    fn fix(&mut self, node: NodeId) -> Result<TypeExpr, TypeTrack> {
        let graph = self.graph;
        let Some(raw) = graph.get(node) else {
            return Err(TypeTrack::new(None, "not one of the portable types"));
        };
        match raw {
            RawType::Fixed(te) => {
                self.check_fixed(te)?;
                Ok(te.clone())
            }
            RawType::Class(kind) => kind.promote(),
            RawType::Native(native) => Ok(native.equivalent()),
            RawType::ArrayOf(e, size) => {
                let e = self.fix(*e).map_err(|t| t.push("ArrayOf"))?;
                Ok(TypeExpr::ArrayOf(Box::new(e), *size))
            }
            RawType::VectorOf(e) => {
                let e = self.fix(*e).map_err(|t| t.push("VectorOf"))?;
                Ok(TypeExpr::VectorOf(Box::new(e)))
            }
            RawType::SetOf(e) => {
                let e = self.fix(*e).map_err(|t| t.push("SetOf"))?;
                Ok(TypeExpr::SetOf(Box::new(e)))
            }
            RawType::MapOf(k, v) => {
                let k = self.fix(*k).map_err(|t| t.push("MapOf"))?;
                let v = self.fix(*v).map_err(|t| t.push("MapOf"))?;
                Ok(TypeExpr::MapOf(Box::new(k), Box::new(v)))
            }
            RawType::DequeOf(e) => {
                let e = self.fix(*e).map_err(|t| t.push("DequeOf"))?;
                Ok(TypeExpr::DequeOf(Box::new(e)))
            }
            RawType::UserDefined(path) => {
                self.check_record(path)?;
                Ok(TypeExpr::UserDefined(path.clone()))
            }
            RawType::PointerTo(target) => {
                if let Some(pointer) = self.bread.get(&node) {
                    return Ok(TypeExpr::PointerTo(pointer.clone()));
                }
                let Some(target) = *target else {
                    return Err(TypeTrack::new(Some("PointerTo"), "pointer has no target"));
                };
                let pointer = Pointer::unresolved();
                self.bread.insert(node, pointer.clone());
                let e = self.fix(target).map_err(|t| t.push("PointerTo"))?;
                pointer.resolve(e);
                Ok(TypeExpr::PointerTo(pointer))
            }
        }
    }

    fn check_record(&self, path: &str) -> Result<(), TypeTrack> {
        if (self.is_record)(path) {
            Ok(())
        } else {
            Err(TypeTrack::new(
                Some("UserDefined"),
                format!("\"{path}\" is not a user-defined message"),
            ))
        }
    }

    fn check_fixed(&self, te: &TypeExpr) -> Result<(), TypeTrack> {
        let name = te.kind().name();
        match te {
            TypeExpr::ArrayOf(e, _)
            | TypeExpr::VectorOf(e)
            | TypeExpr::SetOf(e)
            | TypeExpr::DequeOf(e) => self.check_fixed(e).map_err(|t| t.push(name)),
            TypeExpr::MapOf(k, v) => {
                self.check_fixed(k).map_err(|t| t.push(name))?;
                self.check_fixed(v).map_err(|t| t.push(name))
            }
            TypeExpr::UserDefined(path) => self.check_record(path),
            // Built pointers were checked when they were built.
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(path: &str) -> bool {
        path == "shop::Sku"
    }

    #[test]
    fn natives_and_leaves() {
        let mut g = TypeGraph::new();
        let n = g.native(Native::Str);
        assert_eq!(fix(&g, n, &known), Ok(TypeExpr::Unicode));
        let n = g.class(Kind::Unsigned2);
        assert_eq!(fix(&g, n, &known), Ok(TypeExpr::Unsigned2));
    }

    #[test]
    fn bare_container_class_fails() {
        let mut g = TypeGraph::new();
        let c = g.class(Kind::MapOf);
        let v = g.vector_of(c);
        let e = fix(&g, v, &known).unwrap_err();
        assert_eq!(e.correct_track(), "VectorOf.MapOf");
    }

    #[test]
    fn unknown_record_path_is_tracked() {
        let mut g = TypeGraph::new();
        let u = g.user_defined("shop::Missing");
        let k = g.native(Native::Int);
        let m = g.map_of(k, u);
        let v = g.vector_of(m);
        let e = fix(&g, v, &known).unwrap_err();
        assert_eq!(e.correct_track(), "VectorOf.MapOf.UserDefined");
        assert!(e.reason.contains("shop::Missing"));
    }

    #[test]
    fn fixed_expressions_are_rechecked() {
        let mut g = TypeGraph::new();
        let n = g.fixed(TypeExpr::vector_of(TypeExpr::user_defined("shop::Gone")));
        assert!(fix(&g, n, &known).is_err());
        let n = g.fixed(TypeExpr::vector_of(TypeExpr::user_defined("shop::Sku")));
        assert!(fix(&g, n, &known).is_ok());
    }

    #[test]
    fn shared_pointer_is_built_once() {
        let mut g = TypeGraph::new();
        let sku = g.user_defined("shop::Sku");
        let p = g.pointer_to(sku);
        let m = g.map_of(p, p);
        let te = fix(&g, m, &known).unwrap();
        let TypeExpr::MapOf(k, v) = te else {
            panic!("not a map");
        };
        assert_eq!(k, v);
    }

    #[test]
    fn cyclic_pointer_terminates() {
        let mut g = TypeGraph::new();
        let p = g.pointer();
        let list = g.vector_of(p);
        assert!(g.point(p, list));
        let te = fix(&g, p, &known).unwrap();
        let TypeExpr::PointerTo(outer) = &te else {
            panic!("not a pointer");
        };
        let Some(TypeExpr::VectorOf(inner)) = outer.element() else {
            panic!("not a vector");
        };
        assert_eq!(**inner, te);
        assert_eq!(te.to_string(), "PointerTo(VectorOf(PointerTo(...)))");
    }

    #[test]
    fn dangling_pointer_fails() {
        let mut g = TypeGraph::new();
        let p = g.pointer();
        let e = fix(&g, p, &known).unwrap_err();
        assert_eq!(e.correct_track(), "PointerTo");
    }
}
