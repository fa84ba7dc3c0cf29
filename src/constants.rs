//! Performance and sizing constants shared by both ring flavors.

/// Number of contention-sharded free/used counter slots in the MPMC ring.
/// Fixed per spec, not configurable: each shard holds `capacity / MPMC_SHARDS`
/// units of capacity, so `capacity` must be a multiple of this value.
pub const MPMC_SHARDS: usize = 256;

/// Bits used for the `size` half of the packed `head_size` diagnostic word.
/// Caps the representable MPMC capacity (see `MAX_MPMC_CAPACITY`).
pub const HEAD_SIZE_BITS: u32 = 16;

/// Largest MPMC capacity the packed 16-bit size field can mirror without
/// overflow. Capacities are rounded up to a power of two no smaller than
/// `MPMC_SHARDS`, so this is also the largest power of two below `2^16`.
pub const MAX_MPMC_CAPACITY: usize = 1 << 15;

/// Default capacity used when an SPSC queue's caller doesn't have a
/// specific sizing requirement in mind.
pub const DEFAULT_SPSC_CAPACITY: usize = 4096;
