//! Deduplicating constant pools (component F): strings, numbers, and trace
//! numbers each map a domain value to a stable symbolic address, assigned
//! once and reused for every later insertion of a structurally-equal value.

use ahash::AHashMap;

/// Wraps numeric literal text (plus its `num`/`dec` kind) so pool keys are
/// compared as text, not value — `1` and `1.0` must never collide even
/// though they could parse to the same `f64`, and a `num` and a `dec`
/// sharing the same digits must not alias either.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumKey {
    pub text: String,
    pub kind: &'static str,
}

impl NumKey {
    #[must_use]
    pub fn new(text: impl Into<String>, kind: &'static str) -> Self {
        Self { text: text.into(), kind }
    }
}

/// A single deduplicating pool: `prefix` is the address namespace
/// (`__str__`, `__num__`, `__trace_num__`); entries are kept in insertion
/// order so serialization is deterministic (§5 ordering guarantees).
#[derive(Debug)]
pub struct Pool<K> {
    prefix: &'static str,
    addresses: AHashMap<K, u32>,
    order: Vec<K>,
}

impl<K: std::hash::Hash + Eq + Clone> Pool<K> {
    #[must_use]
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix, addresses: AHashMap::new(), order: Vec::new() }
    }

    /// Returns the existing address for `value`, or allocates and records a fresh one.
    pub fn request_address(&mut self, value: K) -> String {
        if let Some(&id) = self.addresses.get(&value) {
            return format!("{}{id}", self.prefix);
        }
        let id = u32::try_from(self.order.len()).expect("pool exhausted u32 address space");
        self.addresses.insert(value.clone(), id);
        self.order.push(value);
        format!("{}{id}", self.prefix)
    }

    /// Entries in insertion order, paired with their assigned address.
    pub fn entries(&self) -> impl Iterator<Item = (String, &K)> {
        self.order.iter().enumerate().map(|(id, value)| (format!("{}{id}", self.prefix), value))
    }
}

/// Pool of string-literal values, addressed `__str__N`.
pub type StringPool = Pool<String>;

/// Pool of numeric/decimal literal text, addressed `__num__N`.
pub type NumberPool = Pool<NumKey>;

/// Pool of trace (file/line/column) integers, addressed `__trace_num__N`.
///
/// Kept as a logically distinct pool from [`NumberPool`] (per §4.F) even
/// though both are backed by the same `Pool<NumKey>` machinery, so a trace
/// numeral never aliases a source numeric literal with the same text.
pub type TraceNumberPool = Pool<NumKey>;

#[must_use]
pub fn new_string_pool() -> StringPool {
    Pool::new("__str__")
}

#[must_use]
pub fn new_number_pool() -> NumberPool {
    Pool::new("__num__")
}

#[must_use]
pub fn new_trace_number_pool() -> TraceNumberPool {
    Pool::new("__trace_num__")
}
