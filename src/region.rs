//! User-defined regions on the audio timeline.
//!
//! [RegionModel] is the only place regions are created or changed, so the
//! single-active-selection rule holds no matter which call site adds a region.

use std::fmt;

use tracing::debug;

use crate::error::{EditError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(u64);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Time interval with `end > start`.
    Selection,
    /// Single instant with `start == end`.
    Marker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub start: f64,
    pub end: f64,
    pub kind: RegionKind,
}

impl Region {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Text shown next to a marker, e.g. `"12.3s"`.
    pub fn label(&self) -> String {
        format!("{:.1}s", self.start)
    }
}

/// Region as requested by the caller, before clamping and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDraft {
    /// Existing region to update, or [None] to create a new one.
    pub id: Option<RegionId>,
    pub start: f64,
    pub end: f64,
    pub kind: RegionKind,
}

impl RegionDraft {
    pub fn selection(start: f64, end: f64) -> Self {
        Self {
            id: None,
            start,
            end,
            kind: RegionKind::Selection,
        }
    }

    pub fn marker(at: f64) -> Self {
        Self {
            id: None,
            start: at,
            end: at,
            kind: RegionKind::Marker,
        }
    }

    /// Infers the kind from raw bounds the way the waveform view reports them: anything
    /// with a positive length is a selection, everything else is a marker at `start`.
    pub fn from_bounds(id: Option<RegionId>, start: f64, end: f64) -> Self {
        if end > start {
            Self {
                id,
                ..Self::selection(start, end)
            }
        } else {
            Self {
                id,
                ..Self::marker(start)
            }
        }
    }
}

/// Inbound notification from the external waveform view.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionEvent {
    /// The user drew a new region or placed a marker.
    Created { start: f64, end: f64 },
    /// The user dragged or resized an existing region.
    Updated { id: RegionId, start: f64, end: f64 },
}

/// Authoritative set of regions. Holds at most one [RegionKind::Selection].
#[derive(Debug, Default)]
pub struct RegionModel {
    regions: Vec<Region>,
    next_id: u64,
}

impl RegionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores `draft` against a timeline of `duration` seconds.
    ///
    /// A selection replaces every other selection; markers are never removed here. Bounds
    /// past the end of the timeline are clamped to `duration`.
    ///
    /// # Errors
    ///
    /// [EditError::InvalidRegion] if a selection is empty after clamping, if a marker
    /// draft has `start != end`, or if the draft names an unknown region id or a region
    /// of another kind.
    pub fn create_or_update(&mut self, draft: RegionDraft, duration: f64) -> Result<Region> {
        if !draft.start.is_finite() || !draft.end.is_finite() {
            return Err(EditError::InvalidRegion(format!(
                "bounds must be finite, got {}..{}",
                draft.start, draft.end
            )));
        }

        let duration = duration.max(0.0);
        let (start, end) = match draft.kind {
            RegionKind::Selection => {
                if draft.end <= draft.start {
                    return Err(EditError::InvalidRegion(format!(
                        "selection end {} must be greater than start {}",
                        draft.end, draft.start
                    )));
                }
                let start = draft.start.clamp(0.0, duration);
                let end = draft.end.clamp(start, duration);
                if end <= start {
                    return Err(EditError::InvalidRegion(format!(
                        "selection {}..{} is empty on a {duration}s timeline",
                        draft.start, draft.end
                    )));
                }
                (start, end)
            }
            RegionKind::Marker => {
                if draft.start != draft.end {
                    return Err(EditError::InvalidRegion(format!(
                        "marker must have start == end, got {}..{}",
                        draft.start, draft.end
                    )));
                }
                let at = draft.start.clamp(0.0, duration);
                (at, at)
            }
        };

        let id = match draft.id {
            Some(id) => {
                let stored = self.kind_of(id)?;
                if stored != draft.kind {
                    return Err(EditError::InvalidRegion(format!(
                        "{id} is a {stored:?}, not a {:?}",
                        draft.kind
                    )));
                }
                id
            }
            None => {
                self.next_id += 1;
                RegionId(self.next_id)
            }
        };

        let region = Region {
            id,
            start,
            end,
            kind: draft.kind,
        };

        if region.kind == RegionKind::Selection {
            self.regions
                .retain(|r| r.id == id || r.kind != RegionKind::Selection);
        }

        match self.regions.iter_mut().find(|r| r.id == id) {
            Some(existing) => *existing = region.clone(),
            None => self.regions.push(region.clone()),
        }

        debug!(
            id = %region.id,
            kind = ?region.kind,
            start = region.start,
            end = region.end,
            "region stored"
        );
        Ok(region)
    }

    /// Applies a change reported by the waveform view.
    ///
    /// New regions get their kind from the bounds. An update keeps the kind of the region
    /// it names, so dragging a selection's end past its start is rejected instead of
    /// turning the selection into a marker.
    pub fn apply_event(&mut self, event: RegionEvent, duration: f64) -> Result<Region> {
        let draft = match event {
            RegionEvent::Created { start, end } => RegionDraft::from_bounds(None, start, end),
            RegionEvent::Updated { id, start, end } => RegionDraft {
                id: Some(id),
                start,
                end,
                kind: self.kind_of(id)?,
            },
        };
        self.create_or_update(draft, duration)
    }

    fn kind_of(&self, id: RegionId) -> Result<RegionKind> {
        self.regions
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.kind)
            .ok_or_else(|| EditError::InvalidRegion(format!("unknown region {id}")))
    }

    pub fn remove(&mut self, id: RegionId) -> Option<Region> {
        let index = self.regions.iter().position(|r| r.id == id)?;
        Some(self.regions.remove(index))
    }

    /// Clears every region. Called after a trim, when old coordinates no longer apply.
    pub fn remove_all(&mut self) {
        self.regions.clear();
    }

    /// The active selection, if any.
    pub fn selection(&self) -> Option<&Region> {
        self.regions
            .iter()
            .find(|r| r.kind == RegionKind::Selection)
    }

    pub fn markers(&self) -> impl Iterator<Item = &Region> {
        self.regions
            .iter()
            .filter(|r| r.kind == RegionKind::Marker)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
