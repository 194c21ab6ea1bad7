pub mod act;
pub mod block;
pub mod canonical;
pub mod constants;
pub mod error;
pub mod pow;
pub mod transaction;
pub mod types;

pub use act::Act;
pub use block::{reward_for, v_diff_for, v_diff_with_base, Block};
pub use constants::*;
pub use error::PicoError;
pub use pow::ProofOfWork;
pub use transaction::Transaction;
pub use types::{utc_timestamp, Hash, PubKey};
