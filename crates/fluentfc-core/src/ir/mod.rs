//! IR pools, block addressing, and lowering (components F and G).

pub mod block;
pub mod lower;
pub mod opcode;
pub mod pool;

pub use block::{BlockId, BlockPool, BLOCK_END};
pub use lower::{lower_function, mangle_function, mangle_method, mangle_module, property_index, LowerCtx};
pub use pool::{new_number_pool, new_string_pool, new_trace_number_pool, NumKey, NumberPool, StringPool, TraceNumberPool};
