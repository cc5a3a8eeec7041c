use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SphError {
    #[error("invalid config: `{field}` = {value} ({reason})")]
    InvalidConfig {
        field: &'static str,
        value: f32,
        reason: &'static str,
    },

    // requested particle count is larger than what the store or device can hold
    #[error("capacity exceeded: {requested} particles requested, limit is {limit}")]
    Capacity { requested: u64, limit: u64 },

    #[error("spawn lattice {nx} x {ny} x {nz} overflows the particle index range")]
    LatticeOverflow { nx: u32, ny: u32, nz: u32 },
}

pub type SphResult<T> = Result<T, SphError>;
