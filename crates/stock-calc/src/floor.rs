//! 庫存下限政策

use stock_core::{FloorPolicy, MaterialClass};

/// 下限執行器：公式選定後無條件套用
#[derive(Debug, Clone, Copy, Default)]
pub struct FloorEnforcer {
    policy: FloorPolicy,
}

impl FloorEnforcer {
    pub fn new(policy: FloorPolicy) -> Self {
        Self { policy }
    }

    pub fn enforce(&self, recommendation: u32, class: MaterialClass) -> u32 {
        recommendation.max(self.policy.floor_for(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_floor_binding() {
        let enforcer = FloorEnforcer::default();

        assert_eq!(enforcer.enforce(0, MaterialClass::Critical), 10);
        assert_eq!(enforcer.enforce(3, MaterialClass::Critical), 10);
        assert_eq!(enforcer.enforce(0, MaterialClass::Standard), 1);
    }

    #[test]
    fn test_floor_not_binding() {
        let enforcer = FloorEnforcer::default();

        assert_eq!(enforcer.enforce(159, MaterialClass::Critical), 159);
        assert_eq!(enforcer.enforce(2, MaterialClass::Standard), 2);
    }

    proptest! {
        #[test]
        fn floors_always_hold(x in 0u32..100_000) {
            let enforcer = FloorEnforcer::default();
            prop_assert!(enforcer.enforce(x, MaterialClass::Critical) >= 10);
            prop_assert!(enforcer.enforce(x, MaterialClass::Standard) >= 1);
            prop_assert!(enforcer.enforce(x, MaterialClass::Standard) >= x);
        }
    }
}
