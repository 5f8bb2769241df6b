use xdecoder_dsa::{ObjectPool, PoolStats};

use crate::fst::Arc;

/// Handle of a token inside a [`TokenArena`].
pub type TokenId = u32;

/// A search hypothesis: the arc that reached it and the path behind it.
///
/// Tokens form backward-only chains that successors share. `ref_count`
/// counts the successors pointing here plus the active-set slot holding it.
#[derive(Debug, Clone, Copy)]
pub struct Token {
    /// Graph part of the cost only; the acoustic part is the difference
    /// between `cost` and the predecessor's cost.
    pub arc: Arc,
    pub prev: Option<TokenId>,
    pub ref_count: u32,
    pub cost: f64,
}

/// Pool-backed storage for reference-counted tokens.
pub struct TokenArena {
    pool: ObjectPool<Token>,
}

impl TokenArena {
    pub fn new() -> Self {
        Self { pool: ObjectPool::new() }
    }

    /// Creates a token with one reference, taking a reference on `prev`.
    #[inline]
    pub fn new_token(&mut self, arc: Arc, ac_cost: f32, prev: Option<TokenId>) -> TokenId {
        let cost = match prev {
            Some(p) => {
                let prev_tok = self.pool.get_mut(p);
                prev_tok.ref_count += 1;
                prev_tok.cost + arc.weight as f64 + ac_cost as f64
            }
            None => arc.weight as f64 + ac_cost as f64,
        };
        self.pool.allocate(Token { arc, prev, ref_count: 1, cost })
    }

    /// Drops one reference to `tok`, releasing it and, transitively, any
    /// predecessor whose last reference it held.
    pub fn delete(&mut self, mut tok: TokenId) {
        loop {
            let t = self.pool.get_mut(tok);
            assert!(t.ref_count > 0, "TokenArena: ref count underflow on token {}", tok);
            t.ref_count -= 1;
            if t.ref_count > 0 {
                return;
            }
            let prev = t.prev;
            self.pool.release(tok);
            match prev {
                Some(p) => tok = p,
                None => return,
            }
        }
    }

    #[inline(always)]
    pub fn cost(&self, tok: TokenId) -> f64 {
        self.pool.get(tok).cost
    }

    #[inline(always)]
    pub fn get(&self, tok: TokenId) -> &Token {
        self.pool.get(tok)
    }

    /// Tokens currently alive.
    pub fn live(&self) -> usize {
        self.pool.live()
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl Default for TokenArena {
    fn default() -> Self {
        Self::new()
    }
}
