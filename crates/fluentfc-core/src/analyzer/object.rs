//! The result of analyzing one expression subtree.

use crate::types::Type;

/// A constant-foldable value, carried alongside a type when the expression
/// is a literal — IR lowering uses this to skip a `mov` for pool-backed
/// constants (§4.G "constant fast path").
#[derive(Debug, Clone, PartialEq)]
pub enum StaticValue {
    Str(String),
    Num(String),
    Dec(String),
    Bool(bool),
}

/// The analyzer's working value: a type under construction plus an optional
/// constant value and heap-escape bit.
///
/// `pointer_rank` is signed during analysis (over-dereferencing transiently
/// drives it negative before the frame's final check catches it); it is
/// clamped to the type model's unsigned `pointer_rank` only once committed
/// via [`Object::to_type`].
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub base_name: String,
    pub pointer_rank: i32,
    pub array_rank: u32,
    pub is_primitive: bool,
    pub children: Vec<Type>,
    pub value: Option<StaticValue>,
    pub is_heap: bool,
}

impl Object {
    #[must_use]
    pub fn from_type(ty: Type, is_heap: bool) -> Self {
        Self {
            base_name: ty.base_name,
            pointer_rank: i32::try_from(ty.pointer_rank).unwrap_or(i32::MAX),
            array_rank: ty.array_rank,
            is_primitive: ty.is_primitive,
            children: ty.children,
            value: None,
            is_heap,
        }
    }

    #[must_use]
    pub fn to_type(&self) -> Type {
        Type {
            base_name: self.base_name.clone(),
            pointer_rank: u32::try_from(self.pointer_rank.max(0)).unwrap_or(0),
            array_rank: self.array_rank,
            is_primitive: self.is_primitive,
            children: self.children.clone(),
        }
    }

    #[must_use]
    pub fn is_infer(&self) -> bool {
        self.base_name == crate::types::INFER_SENTINEL
    }
}
