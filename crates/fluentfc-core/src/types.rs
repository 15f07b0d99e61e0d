//! The type model (component A): concrete and inferable types, equality, and marshalling.

use std::fmt::Write as _;

/// The base-name sentinel meaning "to be unified from context".
pub const INFER_SENTINEL: &str = "(Infer)";

/// A concrete or inferable Fluent type.
///
/// Invariants: `pointer_rank` and `array_rank` are non-negative by
/// construction (`u32`); a type with `is_primitive` set has no children.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Type {
    pub base_name: String,
    pub array_rank: u32,
    pub pointer_rank: u32,
    pub is_primitive: bool,
    pub children: Vec<Type>,
}

impl Type {
    /// Creates the infer-sentinel type, optionally already carrying pointer/array ranks.
    #[must_use]
    pub fn infer() -> Self {
        Self { base_name: INFER_SENTINEL.to_owned(), ..Self::default() }
    }

    /// Creates a primitive type (`num`, `dec`, `bool`, `str`, `nothing`).
    #[must_use]
    pub fn primitive(base_name: impl Into<String>) -> Self {
        Self { base_name: base_name.into(), is_primitive: true, ..Self::default() }
    }

    /// Creates a named, non-primitive type (a module reference).
    #[must_use]
    pub fn named(base_name: impl Into<String>) -> Self {
        Self { base_name: base_name.into(), ..Self::default() }
    }

    #[must_use]
    pub fn is_infer(&self) -> bool {
        self.base_name == INFER_SENTINEL
    }

    /// An empty base name means "no constraint yet" and always compares equal;
    /// this mirrors the original analyzer's `expected.BaseType != ""` guards
    /// before a mismatch is ever raised.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.base_name.is_empty()
    }

    /// Structural equality over `(base_name, pointer_rank, array_rank, children)`.
    #[must_use]
    pub fn compare(&self, other: &Type) -> bool {
        if self.is_unconstrained() {
            return true;
        }
        self.base_name == other.base_name
            && self.pointer_rank == other.pointer_rank
            && self.array_rank == other.array_rank
            && self.children.len() == other.children.len()
            && self.children.iter().zip(&other.children).all(|(a, b)| a.compare(b))
    }

    /// If `self` is the infer sentinel, overwrites it with `got`'s concrete
    /// fields while preserving `self`'s pointer and array ranks.
    pub fn infer_from(&mut self, got: &Type) {
        if self.is_infer() {
            let pointer_rank = self.pointer_rank;
            let array_rank = self.array_rank;
            *self = got.clone();
            self.pointer_rank = pointer_rank;
            self.array_rank = array_rank;
        }
    }

    /// Returns a clone with `array_rank` decremented by one (used when
    /// descending into one array dimension's elements).
    #[must_use]
    pub fn with_array_rank_decremented(&self) -> Type {
        let mut clone = self.clone();
        clone.array_rank = clone.array_rank.saturating_sub(1);
        clone
    }

    /// `('&' * pointer_rank) base_name ('[]' * array_rank)` with children
    /// inside `<…>` when present. Used only for diagnostics and IR emission.
    #[must_use]
    pub fn marshal(&self) -> String {
        let mut out = String::new();
        for _ in 0..self.pointer_rank {
            out.push('&');
        }
        out.push_str(&self.base_name);
        for _ in 0..self.array_rank {
            out.push_str("[]");
        }
        if !self.children.is_empty() {
            out.push('<');
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}", child.marshal());
            }
            out.push('>');
        }
        out
    }

    /// Parses the textual form produced by `marshal`. Round-trips for every
    /// concrete type: `parse(marshal(t)) == t`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Type> {
        let mut chars = text.chars().peekable();
        let mut pointer_rank = 0;
        while chars.peek() == Some(&'&') {
            pointer_rank += 1;
            chars.next();
        }

        let rest: String = chars.collect();
        let (before_children, children_text) = match rest.find('<') {
            Some(idx) if rest.ends_with('>') => (&rest[..idx], Some(&rest[idx + 1..rest.len() - 1])),
            _ => (rest.as_str(), None),
        };

        let mut array_rank = 0;
        let mut base_name = before_children;
        while let Some(stripped) = base_name.strip_suffix("[]") {
            array_rank += 1;
            base_name = stripped;
        }

        if base_name.is_empty() {
            return None;
        }

        let children = match children_text {
            Some(text) if !text.is_empty() => split_top_level(text)
                .iter()
                .map(|s| Type::parse(s))
                .collect::<Option<Vec<_>>>()?,
            _ => Vec::new(),
        };

        let is_primitive =
            matches!(base_name, "num" | "dec" | "bool" | "str" | "nothing") && pointer_rank == 0 && array_rank == 0;

        Some(Type { base_name: base_name.to_owned(), array_rank, pointer_rank, is_primitive, children })
    }
}

/// Splits a comma-separated child-type list at the top nesting level only
/// (commas inside a nested `<...>` do not split).
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marshal_primitive() {
        let t = Type::primitive("num");
        assert_eq!(t.marshal(), "num");
    }

    #[test]
    fn marshal_pointer_and_array() {
        let t = Type { base_name: "num".into(), pointer_rank: 2, array_rank: 1, ..Default::default() };
        assert_eq!(t.marshal(), "&&num[]");
    }

    #[test]
    fn marshal_with_children() {
        let t = Type {
            base_name: "Box".into(),
            children: vec![Type::primitive("num"), Type::primitive("str")],
            ..Default::default()
        };
        assert_eq!(t.marshal(), "Box<num,str>");
    }

    #[test]
    fn round_trip_every_shape() {
        let shapes = [
            Type::primitive("num"),
            Type::primitive("nothing"),
            Type { base_name: "str".into(), array_rank: 2, ..Default::default() },
            Type { base_name: "num".into(), pointer_rank: 3, ..Default::default() },
            Type {
                base_name: "Pair".into(),
                children: vec![Type::primitive("num"), Type { base_name: "str".into(), array_rank: 1, ..Default::default() }],
                ..Default::default()
            },
        ];
        for shape in shapes {
            let marshalled = shape.marshal();
            let parsed = Type::parse(&marshalled).unwrap_or_else(|| panic!("failed to parse {marshalled}"));
            assert_eq!(parsed, shape, "round trip mismatch for {marshalled}");
        }
    }

    #[test]
    fn compare_is_structural() {
        let a = Type { base_name: "num".into(), array_rank: 1, ..Default::default() };
        let b = Type { base_name: "num".into(), array_rank: 1, ..Default::default() };
        let c = Type { base_name: "num".into(), array_rank: 2, ..Default::default() };
        assert!(a.compare(&b));
        assert!(!a.compare(&c));
    }

    #[test]
    fn infer_preserves_ranks() {
        let mut expected = Type { base_name: INFER_SENTINEL.into(), array_rank: 1, ..Default::default() };
        let got = Type::primitive("num");
        expected.infer_from(&got);
        assert_eq!(expected.base_name, "num");
        assert_eq!(expected.array_rank, 1);
        assert!(expected.is_primitive);
    }

    #[test]
    fn unconstrained_compares_equal_to_anything() {
        let unconstrained = Type::default();
        assert!(unconstrained.compare(&Type::primitive("str")));
    }
}
