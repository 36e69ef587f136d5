/// Timing primitives driven by the session clock.
///
/// Nothing in here reads wall-clock time.  Every timestamp is a session-clock
/// value in milliseconds, so a paused or throttled session never sees time
/// it did not simulate.

use rand::Rng;

// ── Cadence ───────────────────────────────────────────────────────────────────

/// Timed-emission policy shared by enemy spawning, player fire and enemy fire.
///
/// A cadence remembers when it last emitted.  `poll` fires once the elapsed
/// time strictly exceeds the interval (plus the jitter drawn at the previous
/// emission) and re-arms at `now`.
#[derive(Clone, Debug, PartialEq)]
pub struct Cadence {
    last: Option<f64>,
    /// Fraction of the interval that may be added or removed per emission.
    jitter: f64,
    slack: f64,
}

impl Cadence {
    /// A cadence that fires on its first poll.
    pub fn ready() -> Self {
        Self {
            last: None,
            jitter: 0.0,
            slack: 0.0,
        }
    }

    /// A cadence that waits a full interval measured from `now`.
    pub fn armed_at(now: f64) -> Self {
        Self {
            last: Some(now),
            ..Self::ready()
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }

    /// True if a poll at `now` would emit.
    pub fn is_due(&self, now: f64, interval: f64) -> bool {
        match self.last {
            None => true,
            Some(last) => now - last > interval + self.slack,
        }
    }

    /// Emit if due, re-arming at `now`.
    pub fn poll<R: Rng + ?Sized>(&mut self, now: f64, interval: f64, rng: &mut R) -> bool {
        if !self.is_due(now, interval) {
            return false;
        }
        self.rearm(now);
        if self.jitter > 0.0 {
            self.slack = rng.gen_range(-self.jitter..=self.jitter) * interval;
        }
        true
    }

    pub fn rearm(&mut self, now: f64) {
        self.last = Some(now);
    }
}

// ── Effect windows ────────────────────────────────────────────────────────────

/// A fixed-length effect window (power-up, shield, invulnerability).
///
/// Only the start time is stored; the duration is supplied by the caller so
/// tuning changes apply to running effects.  Restarting an active window moves
/// its start forward instead of adding time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EffectTimer {
    started_at: Option<f64>,
}

impl EffectTimer {
    pub fn start(&mut self, now: f64) {
        self.started_at = Some(now);
    }

    pub fn clear(&mut self) {
        self.started_at = None;
    }

    pub fn is_active(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<f64> {
        self.started_at
    }

    /// Deactivate once the window has run strictly longer than `duration`.
    /// Returns true on the call that deactivates it.
    pub fn expire(&mut self, now: f64, duration: f64) -> bool {
        match self.started_at {
            Some(start) if now - start > duration => {
                self.started_at = None;
                true
            }
            _ => false,
        }
    }

    /// Milliseconds left in the window, zero when inactive.
    pub fn remaining(&self, now: f64, duration: f64) -> f64 {
        self.started_at
            .map(|start| (duration - (now - start)).max(0.0))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ready_cadence_fires_immediately_then_waits() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut c = Cadence::ready();
        assert!(c.poll(0.0, 200.0, &mut rng));
        assert!(!c.poll(200.0, 200.0, &mut rng)); // strictly greater
        assert!(c.poll(200.5, 200.0, &mut rng));
        assert_eq!(c.last(), Some(200.5));
    }

    #[test]
    fn armed_cadence_waits_a_full_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut c = Cadence::armed_at(0.0);
        assert!(!c.poll(2500.0, 2500.0, &mut rng));
        assert!(c.poll(2516.0, 2500.0, &mut rng));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut c = Cadence::armed_at(0.0).with_jitter(0.5);
        let mut now = 0.0;
        let mut gaps = Vec::new();
        let mut last = 0.0;
        while gaps.len() < 200 {
            now += 1.0;
            if c.poll(now, 100.0, &mut rng) {
                gaps.push(now - last);
                last = now;
            }
        }
        assert!(gaps.iter().all(|&g| g > 50.0 && g <= 151.0));
    }

    #[test]
    fn effect_restart_does_not_stack() {
        let mut t = EffectTimer::default();
        t.start(0.0);
        t.start(4000.0);
        assert!(!t.expire(14_000.0, 10_000.0));
        assert_eq!(t.remaining(9000.0, 10_000.0), 5000.0);
        assert_eq!(t.remaining(14_000.0, 10_000.0), 0.0);
        assert!(t.expire(14_001.0, 10_000.0));
        assert!(!t.is_active());
    }
}
