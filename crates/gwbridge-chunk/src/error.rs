use crate::pool::ChunkIndex;

/// Errors raised by the chunk pool and chunk chains.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// Every chunk in the pool is currently owned or in transit.
    #[error("chunk pool exhausted ({capacity} chunks in use)")]
    PoolExhausted { capacity: usize },

    /// Linking another chunk would exceed the extra-chunk limit.
    #[error("chunk chain too long (max {max} extra chunks)")]
    ChainTooLong { max: usize },

    /// The chunk was not handed over by the other side.
    #[error("chunk {0} is not in transit")]
    NotInTransit(ChunkIndex),

    /// The index does not name a chunk of this pool.
    #[error("chunk index {0} out of range")]
    InvalidIndex(ChunkIndex),

    /// The chunk belongs to a different pool than the chain.
    #[error("chunk {0} belongs to another pool")]
    ForeignChunk(ChunkIndex),

    /// A received chain has a cycle, a bad link or too many chunks.
    #[error("malformed chunk chain: {0}")]
    MalformedChain(String),
}

pub type Result<T> = std::result::Result<T, ChunkError>;

/// Errors raised while streaming a body or a response through chunks.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Chunk-level error (exhaustion, chain limit).
    #[error("chunk error: {0}")]
    Chunk(#[from] ChunkError),

    /// The response does not fit into a full chunk chain.
    #[error("response too large ({size} bytes, max {max})")]
    ResponseTooLarge { size: usize, max: usize },

    /// The declared body is longer than the delivered chunk chain.
    #[error("request body truncated ({declared} bytes declared, {available} available)")]
    BodyTruncated { declared: usize, available: usize },
}
