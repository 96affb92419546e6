use crate::config::ClockConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockEstimate {
    /// Host clock minus guest clock.
    pub offset_ms: f64,
    pub rtt_ms: Option<f64>,
    pub gap_ms: Option<f64>,
    pub jitter_ms: f64,
    pub render_delay_ms: f64,
}

/// Guest-side estimate of the host clock and of how far behind it to render.
///
/// The offset comes from ping/pong round trips; until the first pong it is
/// seeded from the host timestamp of the first snapshot. Snapshot arrival
/// times feed a smoothed gap and jitter. The render delay tracks half the
/// round trip plus jitter, clamped, and moves gradually.
#[derive(Debug, Clone)]
pub struct ClockEstimator {
    config: ClockConfig,
    offset_ms: Option<f64>,
    offset_from_pong: bool,
    rtt_ms: Option<f64>,
    last_arrival_ms: Option<f64>,
    gap_ms: Option<f64>,
    jitter_ms: f64,
    render_delay_ms: f64,
}

impl ClockEstimator {
    pub fn new(config: ClockConfig) -> Self {
        let render_delay_ms = config
            .initial_render_delay_ms
            .clamp(config.min_render_delay_ms, config.max_render_delay_ms);
        Self {
            config,
            offset_ms: None,
            offset_from_pong: false,
            rtt_ms: None,
            last_arrival_ms: None,
            gap_ms: None,
            jitter_ms: 0.0,
            render_delay_ms,
        }
    }

    /// Folds in a pong. Returns the measured round trip, or `None` for a
    /// reply that claims to arrive before it was sent.
    pub fn on_pong(&mut self, client_send_ms: f64, host_time_ms: f64, now_ms: f64) -> Option<f64> {
        let rtt = now_ms - client_send_ms;
        if rtt < 0.0 {
            return None;
        }

        let sample = host_time_ms + rtt * 0.5 - now_ms;
        self.offset_ms = Some(match self.offset_ms {
            Some(offset) if self.offset_from_pong => {
                offset + (sample - offset) * self.config.offset_smoothing
            }
            _ => sample,
        });
        self.offset_from_pong = true;
        self.rtt_ms = Some(smooth(self.rtt_ms, rtt, self.config.offset_smoothing));
        Some(rtt)
    }

    /// Seeds the offset from a host timestamp when no round trip is known yet.
    pub fn observe_host_time(&mut self, host_time_ms: f64, now_ms: f64) {
        if self.offset_ms.is_none() {
            self.offset_ms = Some(host_time_ms - now_ms);
        }
    }

    pub fn on_snapshot_arrival(&mut self, now_ms: f64) {
        if let Some(last) = self.last_arrival_ms {
            let gap = (now_ms - last).max(0.0);
            let deviation = self.gap_ms.map_or(0.0, |smoothed| (gap - smoothed).abs());
            self.gap_ms = Some(smooth(self.gap_ms, gap, self.config.gap_smoothing));
            self.jitter_ms += (deviation - self.jitter_ms) * self.config.jitter_smoothing;
        }
        self.last_arrival_ms = Some(now_ms);
    }

    pub fn target_render_delay_ms(&self) -> f64 {
        let base = match self.rtt_ms {
            Some(rtt) => rtt * 0.5 + self.jitter_ms,
            None => self.config.initial_render_delay_ms,
        };
        base.clamp(self.config.min_render_delay_ms, self.config.max_render_delay_ms)
    }

    /// Moves the render delay one smoothing step toward its target. Called
    /// once per frame.
    pub fn update_render_delay(&mut self) -> f64 {
        let target = self.target_render_delay_ms();
        self.render_delay_ms += (target - self.render_delay_ms) * self.config.delay_smoothing;
        self.render_delay_ms
    }

    pub fn has_offset(&self) -> bool {
        self.offset_ms.is_some()
    }

    pub fn host_now(&self, local_now_ms: f64) -> f64 {
        local_now_ms + self.offset_ms.unwrap_or(0.0)
    }

    pub fn render_time(&self, local_now_ms: f64) -> f64 {
        self.host_now(local_now_ms) - self.render_delay_ms
    }

    pub fn estimate(&self) -> ClockEstimate {
        ClockEstimate {
            offset_ms: self.offset_ms.unwrap_or(0.0),
            rtt_ms: self.rtt_ms,
            gap_ms: self.gap_ms,
            jitter_ms: self.jitter_ms,
            render_delay_ms: self.render_delay_ms,
        }
    }
}

fn smooth(current: Option<f64>, sample: f64, alpha: f64) -> f64 {
    match current {
        Some(value) => value + (sample - value) * alpha,
        None => sample,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> ClockEstimator {
        ClockEstimator::new(ClockConfig::default())
    }

    #[test]
    fn symmetric_round_trips_recover_offset() {
        let mut clock = estimator();
        // Host runs 5000 ms ahead, 20 ms each way.
        for i in 0..20 {
            let sent = i as f64 * 250.0;
            let host_time = sent + 20.0 + 5000.0;
            let rtt = clock.on_pong(sent, host_time, sent + 40.0).unwrap();
            assert_eq!(rtt, 40.0);
        }

        let estimate = clock.estimate();
        assert!((estimate.offset_ms - 5000.0).abs() < 1e-9);
        assert_eq!(estimate.rtt_ms, Some(40.0));
        assert_eq!(clock.host_now(100.0), 5100.0);
    }

    #[test]
    fn pong_replaces_seeded_offset() {
        let mut clock = estimator();
        clock.observe_host_time(900.0, 0.0);
        assert_eq!(clock.host_now(0.0), 900.0);

        clock.on_pong(0.0, 1020.0, 40.0);
        assert_eq!(clock.estimate().offset_ms, 1000.0);

        clock.observe_host_time(0.0, 0.0);
        assert_eq!(clock.estimate().offset_ms, 1000.0);
    }

    #[test]
    fn reply_from_the_future_is_ignored() {
        let mut clock = estimator();
        assert!(clock.on_pong(100.0, 0.0, 50.0).is_none());
        assert!(!clock.has_offset());
    }

    #[test]
    fn steady_arrivals_have_no_jitter() {
        let mut clock = estimator();
        for i in 0..50 {
            clock.on_snapshot_arrival(i as f64 * 50.0);
        }
        let estimate = clock.estimate();
        assert_eq!(estimate.gap_ms, Some(50.0));
        assert_eq!(estimate.jitter_ms, 0.0);
    }

    #[test]
    fn uneven_arrivals_raise_jitter() {
        let mut clock = estimator();
        let mut t = 0.0;
        for i in 0..50 {
            t += if i % 2 == 0 { 20.0 } else { 80.0 };
            clock.on_snapshot_arrival(t);
        }
        assert!(clock.estimate().jitter_ms > 10.0);
    }

    #[test]
    fn render_delay_is_clamped_and_smoothed() {
        let config = ClockConfig::default();
        let mut clock = ClockEstimator::new(config.clone());
        clock.on_pong(0.0, 0.0, 2000.0);
        assert_eq!(clock.target_render_delay_ms(), config.max_render_delay_ms);

        let first = clock.update_render_delay();
        assert!(first > config.initial_render_delay_ms);
        assert!(first < config.max_render_delay_ms);

        for _ in 0..500 {
            clock.update_render_delay();
        }
        assert!((clock.estimate().render_delay_ms - config.max_render_delay_ms).abs() < 0.01);

        let mut fast = ClockEstimator::new(config.clone());
        fast.on_pong(0.0, 0.0, 2.0);
        assert_eq!(fast.target_render_delay_ms(), config.min_render_delay_ms);
    }
}
