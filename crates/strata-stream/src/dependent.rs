//! Keeps chunks of the coarser rings consistent with editable-ring edits.

use strata_voxel::{DirtyRect, HeightChunk, WorldRect};

use crate::editable::EditableRing;

/// Result of [`sync_with_editable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing inside the chunk changed.
    Current,
    /// Vertices inside the rectangle were resampled.
    Patched(DirtyRect),
    /// The change could not be localised; every overlap was resampled.
    Refreshed,
}

/// Resample the vertices of `chunk` that fall inside `area` from the
/// editable ring. Returns the local rectangle written.
pub(crate) fn resample_area(
    chunk: &mut HeightChunk,
    area: &WorldRect,
    editable: &EditableRing,
) -> Option<DirtyRect> {
    let overlap = area.intersection(&chunk.world_bounds())?;
    let local = chunk.local_range(&overlap)?;
    for (i, j) in local.iter() {
        let (x, z) = chunk.vertex_world(i, j);
        let height = editable.sample_height(x, z);
        chunk.grid_mut().set(i, j, height);
    }
    Some(local)
}

/// Resample the overlap with loaded editable chunks (only edited ones with
/// `edited_only`). Returns the union of the rectangles written.
pub(crate) fn resample_overlap(
    chunk: &mut HeightChunk,
    editable: &EditableRing,
    edited_only: bool,
) -> Option<DirtyRect> {
    let mut written: Option<DirtyRect> = None;
    for area in editable.loaded_bounds_in(&chunk.world_bounds(), edited_only) {
        if let Some(rect) = resample_area(chunk, &area, editable) {
            written = Some(written.map_or(rect, |w| w.union(&rect)));
        }
    }
    written
}

/// Bring `chunk` up to date with editable chunks that changed since its
/// source version, patching from their dirty rectangles where possible.
pub(crate) fn sync_with_editable(chunk: &mut HeightChunk, editable: &EditableRing) -> SyncOutcome {
    let bounds = chunk.world_bounds();
    let source = editable.max_version_for_bounds(&bounds);
    let seen = chunk.source_version();
    if source == seen {
        return SyncOutcome::Current;
    }

    // A lower source means an edited chunk was reloaded without its edits.
    let mut resolvable = source > seen;
    let mut patched: Option<DirtyRect> = None;
    if resolvable {
        for patch in editable.dirty_patches_in(&bounds, seen) {
            let Some(area) = patch.rect else {
                resolvable = false;
                break;
            };
            if let Some(rect) = resample_area(chunk, &area, editable) {
                patched = Some(patched.map_or(rect, |p| p.union(&rect)));
            }
        }
    }
    chunk.set_source_version(source);

    if !resolvable {
        tracing::debug!(key = ?chunk.key(), source, "Refreshing chunk from editable ring");
        resample_overlap(chunk, editable, false);
        chunk.record_edit(None, chunk.version() + 1);
        return SyncOutcome::Refreshed;
    }
    match patched {
        Some(rect) => {
            chunk.record_edit(Some(rect), chunk.version() + 1);
            SyncOutcome::Patched(rect)
        }
        None => SyncOutcome::Current,
    }
}
