//! The basic-block pool (component F): lowering requests fresh addressable
//! blocks and appends text to them as control-flow linearization proceeds.

/// The fixed marker used when a control-flow construct has no successor in
/// its enclosing block (§9 Open Question: the explicit-marker resolution).
pub const BLOCK_END: &str = "__block_end__";

/// One lowered basic block: a stable address and an appending text buffer.
#[derive(Debug, Default)]
pub struct Block {
    pub buffer: String,
}

/// Allocates block addresses in request order and owns every block's buffer.
///
/// Addresses are handed out as opaque ids (`BlockId`) rather than raw
/// strings so lowering can keep appending to a block after requesting
/// another — the pool, not the caller, owns the buffers.
#[derive(Debug, Default)]
pub struct BlockPool {
    blocks: Vec<Block>,
}

pub type BlockId = usize;

impl BlockPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh block and returns its id.
    pub fn request(&mut self) -> BlockId {
        self.blocks.push(Block::default());
        self.blocks.len() - 1
    }

    /// The symbolic address lowering should write as an operand.
    #[must_use]
    pub fn address(id: BlockId) -> String {
        format!("__block_{id}__")
    }

    pub fn buffer_mut(&mut self, id: BlockId) -> &mut String {
        &mut self.blocks[id].buffer
    }

    /// Serializes every block in allocation order, each preceded by its
    /// address label — allocation order is deterministic and matches the
    /// order blocks were requested during lowering (§5 ordering guarantees).
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (id, block) in self.blocks.iter().enumerate() {
            out.push_str(&Self::address(id));
            out.push_str(":\n");
            out.push_str(&block.buffer);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_stable_and_ordered() {
        let mut pool = BlockPool::new();
        let a = pool.request();
        let b = pool.request();
        assert_eq!(BlockPool::address(a), "__block_0__");
        assert_eq!(BlockPool::address(b), "__block_1__");
    }

    #[test]
    fn serialize_preserves_allocation_order() {
        let mut pool = BlockPool::new();
        let a = pool.request();
        let b = pool.request();
        pool.buffer_mut(b).push_str("jump __block_0__\n");
        pool.buffer_mut(a).push_str("ret_void\n");
        let text = pool.serialize();
        assert!(text.find("__block_0__:").unwrap() < text.find("__block_1__:").unwrap());
    }
}
