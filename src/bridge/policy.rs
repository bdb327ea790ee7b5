//! Gyro-driven motion policy
//!
//! Keeps a short rolling window of per-frame peak gyro magnitudes and
//! maps it to LED and streaming-rate decisions: a settled orb goes dark
//! and streams slowly, a hard-moving orb lights up and streams fast.

use crate::config::PolicyConfig;
use crate::device::Rgb;
use std::collections::VecDeque;

/// Decision produced by one observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyAction {
    /// Orb has settled: dim the LED, drop to the idle streaming rate
    Idle,
    /// Orb is moving hard: light up, raise the streaming rate.
    /// `level` is the capped magnitude scaled to `0.0..=1.0`.
    Active { level: f64 },
}

/// Rolling-window motion policy
#[derive(Debug)]
pub struct MotionPolicy {
    cfg: PolicyConfig,
    window: VecDeque<i32>,
}

impl MotionPolicy {
    pub fn new(cfg: PolicyConfig) -> Self {
        let capacity = cfg.window;
        Self {
            cfg,
            window: VecDeque::with_capacity(capacity),
        }
    }

    /// Feed one per-frame peak gyro magnitude, get the resulting action
    pub fn observe(&mut self, gyro_max: i32) -> Option<PolicyAction> {
        self.window.push_front(gyro_max);
        self.window.truncate(self.cfg.window);

        let avg = self.window.iter().map(|&v| f64::from(v)).sum::<f64>()
            / self.window.len() as f64;

        if avg < self.cfg.idle_below {
            Some(PolicyAction::Idle)
        } else if gyro_max > self.cfg.active_above {
            let capped = gyro_max.min(self.cfg.magnitude_cap);
            Some(PolicyAction::Active {
                level: f64::from(capped) / f64::from(self.cfg.magnitude_cap),
            })
        } else {
            None
        }
    }
}

/// LED color for an activity level
///
/// Scales from a warm amber at low levels to full red at the cap.
pub fn activity_color(level: f64) -> Rgb {
    let level = level.clamp(0.0, 1.0);
    Rgb {
        r: 0xFF,
        g: (160.0 * (1.0 - level)) as u8,
        b: 0x20,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> MotionPolicy {
        MotionPolicy::new(PolicyConfig::default())
    }

    #[test]
    fn settled_orb_is_idle() {
        let mut p = policy();
        assert_eq!(p.observe(10), Some(PolicyAction::Idle));
        assert_eq!(p.observe(0), Some(PolicyAction::Idle));
    }

    #[test]
    fn hard_motion_is_active() {
        let mut p = policy();
        match p.observe(5000) {
            Some(PolicyAction::Active { level }) => {
                assert!((level - 0.5).abs() < 1e-9);
            }
            other => panic!("expected active: {:?}", other),
        }
    }

    #[test]
    fn level_caps_at_one() {
        let mut p = policy();
        match p.observe(50_000) {
            Some(PolicyAction::Active { level }) => assert_eq!(level, 1.0),
            other => panic!("expected active: {:?}", other),
        }
    }

    #[test]
    fn moderate_motion_is_no_action() {
        let mut p = policy();
        // Average above idle threshold, peak below active threshold
        assert_eq!(p.observe(200), None);
        assert_eq!(p.observe(250), None);
    }

    #[test]
    fn window_average_drives_idle() {
        let mut p = policy();
        // Prime the window with activity
        for _ in 0..5 {
            p.observe(5000);
        }
        // One quiet frame does not flip the average below 150
        assert_eq!(p.observe(0), None);
        // A run of quiet frames does
        let mut last = None;
        for _ in 0..5 {
            last = p.observe(0);
        }
        assert_eq!(last, Some(PolicyAction::Idle));
    }

    #[test]
    fn window_length_is_bounded() {
        let mut p = policy();
        for _ in 0..20 {
            p.observe(1000);
        }
        assert!(p.window.len() <= 5);
    }

    #[test]
    fn activity_color_scales_green_channel() {
        let low = activity_color(0.0);
        let high = activity_color(1.0);
        assert_eq!(low.r, 0xFF);
        assert!(low.g > high.g);
        assert_eq!(high.g, 0);
    }
}
