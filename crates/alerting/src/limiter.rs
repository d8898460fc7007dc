//! Alert rate limiting

use classifier::Label;
use std::time::Instant;
use tracing::{debug, info};

use crate::{AlertError, AlertPolicy};

/// Per-run rate limiter memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiterState {
    /// Drowsy classifications seen this run
    pub drowsy_count: u64,
    /// Last time an alert fired
    pub last_fired_at: Option<Instant>,
}

/// Outcome of one rate limiter decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub fire: bool,
    pub state: RateLimiterState,
}

/// Decide whether `label` fires an alert under `policy`.
///
/// Alert labels leave the state untouched. `now` is only consulted by
/// [`AlertPolicy::Cooldown`]; a clock reading earlier than the last alert
/// never fires, so `last_fired_at` cannot move backwards.
pub fn decide(
    label: Label,
    policy: &AlertPolicy,
    state: RateLimiterState,
    now: Instant,
) -> Decision {
    if !label.is_drowsy() {
        return Decision { fire: false, state };
    }

    let mut next = RateLimiterState {
        drowsy_count: state.drowsy_count + 1,
        ..state
    };

    let fire = match policy {
        AlertPolicy::CountThreshold(n) => next.drowsy_count % u64::from(n.get()) == 0,
        AlertPolicy::Immediate => true,
        AlertPolicy::Cooldown(period) => match state.last_fired_at {
            None => true,
            Some(last) => now >= last && now.duration_since(last) >= *period,
        },
    };

    if fire {
        if let AlertPolicy::Cooldown(_) = policy {
            next.last_fired_at = Some(now);
        }
    }

    Decision { fire, state: next }
}

/// Owns a validated policy and its per-run state
#[derive(Debug, Clone)]
pub struct RateLimiter {
    policy: AlertPolicy,
    state: RateLimiterState,
    alerts_fired: u64,
}

impl RateLimiter {
    /// Create a rate limiter. Invalid policies are rejected here, before
    /// any frame is seen.
    pub fn new(policy: AlertPolicy) -> Result<Self, AlertError> {
        policy.validate()?;
        info!("Creating rate limiter: {}", policy);
        Ok(Self {
            policy,
            state: RateLimiterState::default(),
            alerts_fired: 0,
        })
    }

    /// Feed one classification, returns whether to alert now
    pub fn observe(&mut self, label: Label, now: Instant) -> bool {
        let decision = decide(label, &self.policy, self.state, now);
        self.state = decision.state;
        if decision.fire {
            self.alerts_fired += 1;
            debug!(
                "Alert fired (drowsy_count: {}, total alerts: {})",
                self.state.drowsy_count, self.alerts_fired
            );
        } else if label.is_drowsy() {
            debug!("Alert suppressed (drowsy_count: {})", self.state.drowsy_count);
        }
        decision.fire
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    pub fn state(&self) -> RateLimiterState {
        self.state
    }

    pub fn alerts_fired(&self) -> u64 {
        self.alerts_fired
    }

    /// Start a new run
    pub fn reset(&mut self) {
        self.state = RateLimiterState::default();
        self.alerts_fired = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn drowsy_run(policy: AlertPolicy, k: usize) -> u64 {
        let mut limiter = RateLimiter::new(policy).unwrap();
        let now = Instant::now();
        for _ in 0..k {
            limiter.observe(Label::Drowsy, now);
        }
        limiter.alerts_fired()
    }

    #[test]
    fn test_count_threshold_every_tenth() {
        assert_eq!(drowsy_run(AlertPolicy::count_threshold(10).unwrap(), 25), 2);
        assert_eq!(drowsy_run(AlertPolicy::count_threshold(10).unwrap(), 9), 0);
        assert_eq!(drowsy_run(AlertPolicy::count_threshold(10).unwrap(), 10), 1);
    }

    #[test]
    fn test_count_threshold_is_cumulative() {
        let mut limiter = RateLimiter::new(AlertPolicy::count_threshold(3).unwrap()).unwrap();
        let now = Instant::now();
        let fired: Vec<bool> = [
            Label::Drowsy,
            Label::Alert,
            Label::Drowsy,
            Label::Alert,
            Label::Drowsy,
        ]
        .into_iter()
        .map(|label| limiter.observe(label, now))
        .collect();
        assert_eq!(fired, vec![false, false, false, false, true]);
        assert_eq!(limiter.state().drowsy_count, 3);
    }

    #[test]
    fn test_immediate_fires_once_per_drowsy() {
        assert_eq!(drowsy_run(AlertPolicy::Immediate, 1), 1);
        assert_eq!(drowsy_run(AlertPolicy::Immediate, 7), 7);
    }

    #[test]
    fn test_alert_label_is_a_no_op() {
        let state = RateLimiterState::default();
        for policy in [
            AlertPolicy::Immediate,
            AlertPolicy::count_threshold(1).unwrap(),
            AlertPolicy::Cooldown(Duration::from_secs(5)),
        ] {
            let decision = decide(Label::Alert, &policy, state, Instant::now());
            assert!(!decision.fire);
            assert_eq!(decision.state, state);
        }
    }

    #[test]
    fn test_cooldown_suppresses_inside_window() {
        let policy = AlertPolicy::cooldown(Duration::from_secs(5)).unwrap();
        let mut limiter = RateLimiter::new(policy).unwrap();
        let t0 = Instant::now();

        assert!(limiter.observe(Label::Drowsy, t0));
        assert!(!limiter.observe(Label::Drowsy, t0 + Duration::from_secs(2)));
        assert!(limiter.observe(Label::Drowsy, t0 + Duration::from_secs(6)));
        assert_eq!(limiter.alerts_fired(), 2);
        assert_eq!(
            limiter.state().last_fired_at,
            Some(t0 + Duration::from_secs(6))
        );
    }

    #[test]
    fn test_cooldown_boundary_fires() {
        let policy = AlertPolicy::Cooldown(Duration::from_secs(5));
        let t0 = Instant::now();
        let first = decide(Label::Drowsy, &policy, RateLimiterState::default(), t0);
        let second = decide(Label::Drowsy, &policy, first.state, t0 + Duration::from_secs(5));
        assert!(first.fire);
        assert!(second.fire);
    }

    #[test]
    fn test_cooldown_ignores_clock_going_backwards() {
        let policy = AlertPolicy::Cooldown(Duration::from_secs(5));
        let t0 = Instant::now() + Duration::from_secs(60);
        let first = decide(Label::Drowsy, &policy, RateLimiterState::default(), t0);
        let second = decide(Label::Drowsy, &policy, first.state, t0 - Duration::from_secs(30));
        assert!(!second.fire);
        assert_eq!(second.state.last_fired_at, Some(t0));
    }

    #[test]
    fn test_invalid_policy_fails_at_construction() {
        assert!(RateLimiter::new(AlertPolicy::Cooldown(Duration::ZERO)).is_err());
    }

    #[test]
    fn test_reset() {
        let mut limiter = RateLimiter::new(AlertPolicy::Immediate).unwrap();
        limiter.observe(Label::Drowsy, Instant::now());
        limiter.reset();
        assert_eq!(limiter.state(), RateLimiterState::default());
        assert_eq!(limiter.alerts_fired(), 0);
    }

    fn label_strategy() -> impl Strategy<Value = Label> {
        prop_oneof![Just(Label::Alert), Just(Label::Drowsy)]
    }

    proptest! {
        #[test]
        fn prop_count_threshold_fires_floor_k_over_n(n in 1u32..20, k in 0usize..200) {
            let policy = AlertPolicy::count_threshold(n).unwrap();
            prop_assert_eq!(drowsy_run(policy, k), (k / n as usize) as u64);
        }

        #[test]
        fn prop_threshold_one_matches_immediate(labels in prop::collection::vec(label_strategy(), 0..100)) {
            let now = Instant::now();
            let mut one = RateLimiter::new(AlertPolicy::count_threshold(1).unwrap()).unwrap();
            let mut immediate = RateLimiter::new(AlertPolicy::Immediate).unwrap();
            for label in labels {
                prop_assert_eq!(one.observe(label, now), immediate.observe(label, now));
            }
        }

        #[test]
        fn prop_decisions_are_deterministic(
            labels in prop::collection::vec(label_strategy(), 0..100),
            gaps_ms in prop::collection::vec(0u64..3000, 100),
        ) {
            let policy = AlertPolicy::cooldown(Duration::from_secs(5)).unwrap();
            let t0 = Instant::now();
            let run = || {
                let mut limiter = RateLimiter::new(policy).unwrap();
                let mut now = t0;
                labels
                    .iter()
                    .zip(&gaps_ms)
                    .map(|(label, gap)| {
                        now += Duration::from_millis(*gap);
                        limiter.observe(*label, now)
                    })
                    .collect::<Vec<_>>()
            };
            prop_assert_eq!(run(), run());
        }

        #[test]
        fn prop_state_is_monotonic(
            labels in prop::collection::vec(label_strategy(), 0..100),
            gaps_ms in prop::collection::vec(0u64..8000, 100),
        ) {
            let policy = AlertPolicy::Cooldown(Duration::from_secs(5));
            let mut state = RateLimiterState::default();
            let mut now = Instant::now();
            for (label, gap) in labels.iter().zip(&gaps_ms) {
                now += Duration::from_millis(*gap);
                let next = decide(*label, &policy, state, now).state;
                prop_assert!(next.drowsy_count >= state.drowsy_count);
                prop_assert!(next.last_fired_at >= state.last_fired_at);
                state = next;
            }
        }
    }
}
