//! Maps selection seconds from the timeline they were drawn on to the buffer being trimmed.

use crate::error::{EditError, Result};
use crate::region::Region;

/// Whether the active buffer came straight from the source file or from an earlier trim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOrigin {
    Original,
    Trimmed,
}

/// Durations a selection has to be reconciled against before trimming.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBase {
    pub origin: BufferOrigin,
    /// Duration of the timeline the view currently reports selections against.
    pub view_duration: f64,
    /// View duration at the moment the current selection was drawn.
    pub draw_duration: f64,
    /// Duration of the buffer the next trim operates on.
    pub active_duration: f64,
}

impl TimeBase {
    pub fn original(duration: f64) -> Self {
        Self {
            origin: BufferOrigin::Original,
            view_duration: duration,
            draw_duration: duration,
            active_duration: duration,
        }
    }

    /// Time base after a trim produced a buffer of `duration` seconds.
    pub fn after_trim(duration: f64) -> Self {
        Self {
            origin: BufferOrigin::Trimmed,
            ..Self::original(duration)
        }
    }

    /// Records the duration of the view's timeline, e.g. when the view keeps its old scale
    /// after the buffer under it has shrunk.
    pub fn set_view_duration(&mut self, duration: f64) {
        self.view_duration = duration;
    }

    /// Remembers the view duration a selection was drawn against.
    pub fn mark_drawn(&mut self) {
        self.draw_duration = self.view_duration;
    }

    /// Rebases `region` onto the active buffer.
    pub fn rebase(&self, region: &Region) -> Result<TrimInterval> {
        rebase(region, self.draw_duration, self.active_duration)
    }
}

/// Interval in seconds relative to the active buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimInterval {
    pub start: f64,
    pub end: f64,
}

/// Rescales `region` from a `draw_duration` timeline to an `active_duration` one.
///
/// Identity when both durations match. The result always satisfies
/// `0 <= start < end <= active_duration`.
pub fn rebase(region: &Region, draw_duration: f64, active_duration: f64) -> Result<TrimInterval> {
    let (start, end) = if draw_duration == active_duration {
        (region.start, region.end)
    } else {
        if !(draw_duration > 0.0) {
            return Err(EditError::InvalidRegion(format!(
                "cannot rebase from a {draw_duration}s timeline"
            )));
        }
        (
            region.start / draw_duration * active_duration,
            region.end / draw_duration * active_duration,
        )
    };

    if !(0.0 <= start && start < end && end <= active_duration) {
        return Err(EditError::InvalidRegion(format!(
            "rebased interval {start}..{end} is outside 0..{active_duration}"
        )));
    }

    Ok(TrimInterval { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{RegionDraft, RegionModel};

    fn selection(start: f64, end: f64, duration: f64) -> Region {
        RegionModel::new()
            .create_or_update(RegionDraft::selection(start, end), duration)
            .unwrap()
    }

    #[test]
    fn identity_when_durations_match() {
        let interval = rebase(&selection(2.0, 4.0, 10.0), 10.0, 10.0).unwrap();
        assert_eq!(interval, TrimInterval { start: 2.0, end: 4.0 });
    }

    #[test]
    fn rescales_against_shorter_active_buffer() {
        // Drawn on the old 10 s scale, buffer is now 5 s long.
        let interval = rebase(&selection(2.0, 8.0, 10.0), 10.0, 5.0).unwrap();
        assert_eq!(interval, TrimInterval { start: 1.0, end: 4.0 });
    }

    #[test]
    fn rejects_out_of_range_or_unscalable_intervals() {
        let mut region = selection(1.0, 6.0, 10.0);
        region.end = 12.0;
        assert!(matches!(
            rebase(&region, 10.0, 10.0),
            Err(EditError::InvalidRegion(_))
        ));
        assert!(matches!(
            rebase(&selection(1.0, 2.0, 4.0), 0.0, 4.0),
            Err(EditError::InvalidRegion(_))
        ));
    }

    #[test]
    fn time_base_tracks_draw_duration() {
        let mut time_base = TimeBase::after_trim(5.0);
        time_base.set_view_duration(10.0);
        time_base.mark_drawn();
        assert_eq!(time_base.origin, BufferOrigin::Trimmed);

        let interval = time_base.rebase(&selection(4.0, 10.0, 10.0)).unwrap();
        assert_eq!(interval, TrimInterval { start: 2.0, end: 5.0 });
    }
}
