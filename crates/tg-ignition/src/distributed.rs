//! Distributed (self) ignition (`spec.md` §4.H): while disconnected from
//! the controller, each radio attempts to ignite a round-robin candidate
//! during its own color's time slot, backing off on repeated failure.
//! Purely time- and state-driven; the GPS clock reading and the random
//! jitter roll are passed in by the caller so this stays deterministic and
//! testable.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use tg_types::RadioMac;

#[derive(Debug, Clone)]
pub struct DistributedIgnitionConfig {
    pub cooldown_duration: Duration,
    pub max_offset: Duration,
    pub attempts_before_backoff: u32,
    pub max_attempts: u32,
}

impl Default for DistributedIgnitionConfig {
    fn default() -> Self {
        Self {
            cooldown_duration: Duration::from_secs(5),
            max_offset: Duration::from_secs(1),
            attempts_before_backoff: 3,
            max_attempts: 18,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CandidateState {
    num_attempts: u32,
    cooldown_secs: f64,
    cooldown_until_secs: Option<f64>,
    disabled: bool,
}

/// Per-radio distributed-ignition scheduler. One instance per radio that
/// participates, since each radio owns its own color and candidate list.
#[derive(Debug)]
pub struct DistributedIgnition {
    cfg: DistributedIgnitionConfig,
    color: u32,
    num_colors: u32,
    candidates: Vec<RadioMac>,
    cursor: usize,
    states: HashMap<RadioMac, CandidateState>,
    in_flight: bool,
    globally_disabled: bool,
}

impl DistributedIgnition {
    pub fn new(cfg: DistributedIgnitionConfig, color: u32, num_colors: u32, candidates: Vec<RadioMac>) -> Self {
        Self {
            cfg,
            color,
            num_colors: num_colors.max(1),
            candidates,
            cursor: 0,
            states: HashMap::new(),
            in_flight: false,
            globally_disabled: false,
        }
    }

    /// Disables self-ignition entirely, e.g. once the controller connects
    /// (`spec.md` §4.H).
    pub fn disable(&mut self) {
        self.globally_disabled = true;
    }

    /// Explicit dissoc from a peer permanently disables it as a
    /// self-ignition candidate.
    pub fn on_dissoc(&mut self, candidate: RadioMac) {
        self.states.entry(candidate).or_default().disabled = true;
    }

    /// Decides whether an attempt should fire `now` (GPS time since epoch),
    /// returning the responder to attempt, round-robin among eligible
    /// candidates starting just after the last one tried.
    pub fn maybe_attempt(&mut self, now: Duration) -> Option<RadioMac> {
        if self.globally_disabled || self.in_flight || self.candidates.is_empty() {
            return None;
        }
        let now_s = now.as_secs_f64();
        let cooldown_s = self.cfg.cooldown_duration.as_secs_f64();
        let nearest_boundary = (now_s / cooldown_s).round() * cooldown_s;
        if (now_s - nearest_boundary).abs() > self.cfg.max_offset.as_secs_f64() {
            return None;
        }
        let slot = ((nearest_boundary / cooldown_s).round() as i64).rem_euclid(self.num_colors as i64) as u32;
        if slot != self.color {
            return None;
        }

        let n = self.candidates.len();
        for step in 0..n {
            let idx = (self.cursor + step) % n;
            let candidate = self.candidates[idx];
            let state = self.states.entry(candidate).or_default();
            if state.disabled {
                continue;
            }
            if let Some(until) = state.cooldown_until_secs {
                if now_s < until {
                    continue;
                }
            }
            if state.num_attempts >= self.cfg.max_attempts {
                continue;
            }
            self.cursor = (idx + 1) % n;
            self.in_flight = true;
            return Some(candidate);
        }
        None
    }

    /// Records the outcome of an attempt `maybe_attempt` returned.
    pub fn on_attempt_result(&mut self, candidate: RadioMac, success: bool, now: Duration, rng: &mut impl Rng) {
        self.in_flight = false;
        let state = self.states.entry(candidate).or_default();
        if success {
            state.num_attempts = 0;
            state.cooldown_secs = 0.0;
            state.cooldown_until_secs = None;
            return;
        }
        state.num_attempts += 1;
        if state.num_attempts < self.cfg.attempts_before_backoff {
            return;
        }
        let base_cycle = self.num_colors as f64 * self.cfg.cooldown_duration.as_secs_f64();
        let current = if state.cooldown_secs > 0.0 { state.cooldown_secs } else { base_cycle };
        let mut next = current * 2.0;
        if rng.gen::<f64>() < 0.25 {
            next += base_cycle;
        }
        state.cooldown_secs = next;
        state.cooldown_until_secs = Some(now.as_secs_f64() + next);
    }

    pub fn num_attempts(&self, candidate: RadioMac) -> u32 {
        self.states.get(&candidate).map(|s| s.num_attempts).unwrap_or(0)
    }

    pub fn is_disabled(&self, candidate: RadioMac) -> bool {
        self.states.get(&candidate).map(|s| s.disabled).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(label: &str) -> RadioMac {
        RadioMac::test_mac(label)
    }

    #[test]
    fn attempt_only_fires_inside_own_color_slot_near_a_boundary() {
        let cfg = DistributedIgnitionConfig::default();
        let mut d = DistributedIgnition::new(cfg, 1, 2, vec![mac("peer")]);
        // color 1 of 2 owns odd multiples of the cooldown (5s): boundary at
        // 5s has slot = round(5/5) % 2 = 1.
        assert!(d.maybe_attempt(Duration::from_secs(5)).is_some());
    }

    #[test]
    fn attempt_does_not_fire_in_another_colors_slot() {
        let cfg = DistributedIgnitionConfig::default();
        let mut d = DistributedIgnition::new(cfg, 0, 2, vec![mac("peer")]);
        // slot at t=5s is 1, this radio owns color 0.
        assert!(d.maybe_attempt(Duration::from_secs(5)).is_none());
    }

    #[test]
    fn disabled_candidate_is_never_returned() {
        let cfg = DistributedIgnitionConfig::default();
        let mut d = DistributedIgnition::new(cfg, 0, 1, vec![mac("peer")]);
        d.on_dissoc(mac("peer"));
        assert!(d.maybe_attempt(Duration::ZERO).is_none());
    }

    #[test]
    fn failures_past_threshold_enter_cooldown() {
        let cfg = DistributedIgnitionConfig { attempts_before_backoff: 1, ..DistributedIgnitionConfig::default() };
        let mut d = DistributedIgnition::new(cfg, 0, 1, vec![mac("peer")]);
        let mut rng = rand::rngs::mock::StepRng::new(u64::MAX, 0); // jitter roll always ~1.0, never < 0.25
        let attempted = d.maybe_attempt(Duration::ZERO).unwrap();
        d.on_attempt_result(attempted, false, Duration::ZERO, &mut rng);
        // cooldown now active; immediately retrying finds no candidate.
        assert!(d.maybe_attempt(Duration::ZERO).is_none());
        assert_eq!(d.num_attempts(mac("peer")), 1);
    }

    #[test]
    fn success_resets_attempt_count() {
        let cfg = DistributedIgnitionConfig::default();
        let mut d = DistributedIgnition::new(cfg, 0, 1, vec![mac("peer")]);
        let mut rng = rand::thread_rng();
        let attempted = d.maybe_attempt(Duration::ZERO).unwrap();
        d.on_attempt_result(attempted, false, Duration::ZERO, &mut rng);
        d.on_attempt_result(attempted, true, Duration::from_secs(100), &mut rng);
        assert_eq!(d.num_attempts(mac("peer")), 0);
    }

    #[test]
    fn disabling_globally_stops_all_attempts() {
        let cfg = DistributedIgnitionConfig::default();
        let mut d = DistributedIgnition::new(cfg, 1, 2, vec![mac("peer")]);
        d.disable();
        assert!(d.maybe_attempt(Duration::from_secs(5)).is_none());
    }
}
