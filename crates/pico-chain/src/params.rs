use pico_core::block::v_diff_with_base;
use pico_core::constants::{
    BLOCK_REQUIRED_CONFIRMS, H_DIFF_INIT, H_DIFF_RETARGET_INTERVAL, V_DIFF_EXP_BASE,
};

/// Shape of the consensus difficulty and confirmation rules.
///
/// Defaults are the production network. Tests shrink `h_diff_init` and
/// `v_diff_exp_base` so blocks stay minable in microseconds without touching
/// any validation logic.
#[derive(Clone, Debug)]
pub struct ChainParams {
    /// Genesis `h_diff`, also the consensus minimum.
    pub h_diff_init: u32,

    /// Exponent base of the vertical-difficulty curve.
    pub v_diff_exp_base: u32,

    /// Accepted blocks between `h_diff` increments.
    pub retarget_interval: u64,

    /// Re-announcements promoting a pending block to accepted.
    pub required_confirms: u32,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            h_diff_init: H_DIFF_INIT,
            v_diff_exp_base: V_DIFF_EXP_BASE,
            retarget_interval: H_DIFF_RETARGET_INTERVAL,
            required_confirms: BLOCK_REQUIRED_CONFIRMS,
        }
    }
}

impl ChainParams {
    /// Vertical difficulty for a horizontal difficulty under these params.
    pub fn v_diff_for(&self, h_diff: u32) -> u32 {
        v_diff_with_base(self.v_diff_exp_base, h_diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_consensus_formula() {
        let params = ChainParams::default();
        assert_eq!(params.h_diff_init, 14);
        assert_eq!(params.v_diff_for(14), pico_core::block::v_diff_for(14));
        assert_eq!(params.required_confirms, 6);
    }
}
