//! Preview segment selection.

use vshorts_models::{Interval, Timecode};

/// Pick the shortest candidate lasting at most `max_duration` seconds.
///
/// Candidates that are too long, or whose times do not parse, never win.
/// Ties go to the first candidate. With no qualifying candidate the result is
/// `[0, max_duration]`.
pub fn select(candidates: &[Timecode], max_duration: f64) -> Interval {
    select_intervals(candidates.iter().map(Timecode::interval), max_duration)
}

/// [`select`] over already normalized intervals; `None` entries never win.
pub fn select_intervals<I>(candidates: I, max_duration: f64) -> Interval
where
    I: IntoIterator<Item = Option<Interval>>,
{
    let mut best: Option<(f64, Interval)> = None;

    for interval in candidates.into_iter().flatten() {
        let cost = cost(&interval, max_duration);
        if !cost.is_finite() {
            continue;
        }
        match best {
            Some((best_cost, _)) if best_cost <= cost => {}
            _ => best = Some((cost, interval)),
        }
    }

    best.map(|(_, interval)| interval)
        .unwrap_or_else(|| Interval::new(0.0, max_duration))
}

fn cost(interval: &Interval, max_duration: f64) -> f64 {
    let duration = interval.duration();
    if duration.is_finite() && duration >= 0.0 && duration <= max_duration {
        duration
    } else {
        f64::INFINITY
    }
}
