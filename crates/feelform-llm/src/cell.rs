use parking_lot::RwLock;

use crate::motion::MotionPlan;

/// Holds the plan currently driving the animation.
///
/// A plan is only ever replaced wholesale. Failed computations leave the
/// previous plan in place.
pub struct PlanCell {
    current: RwLock<MotionPlan>,
}

impl Default for PlanCell {
    fn default() -> Self {
        Self::new(MotionPlan::default())
    }
}

impl PlanCell {
    pub fn new(initial: MotionPlan) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    pub fn current(&self) -> MotionPlan {
        self.current.read().clone()
    }

    /// Returns `true` if the plan was replaced.
    pub fn apply<E>(&self, result: Result<MotionPlan, E>) -> bool {
        match result {
            Ok(plan) => {
                *self.current.write() = plan;
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MotionMode;

    #[test]
    fn starts_with_default_plan() {
        assert_eq!(PlanCell::default().current(), MotionPlan::default());
    }

    #[test]
    fn success_replaces_failure_retains() {
        let cell = PlanCell::default();
        let mut next = MotionPlan::default();
        next.motion = MotionMode::Tremble;
        next.params.hue = 12.0;

        assert!(cell.apply::<()>(Ok(next.clone())));
        assert_eq!(cell.current(), next);

        assert!(!cell.apply(Err("upstream down")));
        assert_eq!(cell.current(), next);
    }
}
