use serde::Serialize;

const BEATS_PER_BAR: u32 = 4;

/// A single ruler/grid line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulerTick {
    pub time_sec: f64,
    /// Bar lines, or whole seconds without a tempo.
    pub major: bool,
    pub label: Option<String>,
}

/// Tick spacing of the ruler: bars/beats when a tempo is known, seconds otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RulerMode {
    Seconds,
    Beats { seconds_per_beat: f64 },
}

impl RulerMode {
    pub fn for_bpm(bpm: Option<f64>) -> Self {
        match bpm {
            Some(bpm) if bpm.is_finite() && bpm > 0.0 => RulerMode::Beats {
                seconds_per_beat: 60.0 / bpm,
            },
            _ => RulerMode::Seconds,
        }
    }

    pub fn step_sec(&self) -> f64 {
        match self {
            RulerMode::Seconds => 1.0,
            RulerMode::Beats { seconds_per_beat } => *seconds_per_beat,
        }
    }
}

/// Ticks covering `[start_sec, end_sec]`. Positions are exact grid times, never snapped.
pub fn ruler_ticks(start_sec: f64, end_sec: f64, bpm: Option<f64>) -> Vec<RulerTick> {
    let mode = RulerMode::for_bpm(bpm);
    let step = mode.step_sec();
    if !(end_sec >= start_sec) || !step.is_finite() {
        return Vec::new();
    }

    let first = (start_sec.max(0.0) / step).ceil() as u64;
    let last = (end_sec / step).floor() as u64;
    (first..=last)
        .map(|index| {
            let time_sec = index as f64 * step;
            match mode {
                RulerMode::Seconds => RulerTick {
                    time_sec,
                    major: true,
                    label: Some(format!("{index}s")),
                },
                RulerMode::Beats { .. } => {
                    let major = index % BEATS_PER_BAR as u64 == 0;
                    RulerTick {
                        time_sec,
                        major,
                        label: major.then(|| format!("{}", index / BEATS_PER_BAR as u64 + 1)),
                    }
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn seconds_without_tempo() {
        let ticks = ruler_ticks(0.5, 3.0, None);
        let times: Vec<f64> = ticks.iter().map(|tick| tick.time_sec).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
        assert_eq!(ticks[0].label.as_deref(), Some("1s"));
    }

    #[test]
    fn bars_and_beats_with_tempo() {
        // 120 BPM: half a second per beat, two seconds per bar.
        let ticks = ruler_ticks(0.0, 4.0, Some(120.0));
        assert_eq!(ticks.len(), 9);
        assert!(ticks[0].major);
        assert_eq!(ticks[0].label.as_deref(), Some("1"));
        assert!(!ticks[1].major);
        assert_eq!(ticks[4].time_sec, 2.0);
        assert_eq!(ticks[4].label.as_deref(), Some("2"));
    }

    #[test]
    fn zero_bpm_falls_back_to_seconds() {
        assert_eq!(RulerMode::for_bpm(Some(0.0)), RulerMode::Seconds);
    }
}
