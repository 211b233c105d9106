//! The show-logic plugin seam.
//!
//! The engine treats the blueprint as a black box. Every call goes
//! through a wrapper that catches errors and panics, logs them, and turns
//! them into "no selection".

use std::panic::{catch_unwind, AssertUnwindSafe};

use onair_core::ids::{RundownId, ShowStyleVariantId, StudioId};
use onair_core::ingest::IngestRundown;

#[derive(Debug, Clone)]
pub struct BlueprintContext {
    pub studio_id: StudioId,
    pub rundown_id: RundownId,
}

#[derive(Debug, thiserror::Error)]
#[error("Blueprint error: {0}")]
pub struct BlueprintError(pub String);

pub trait Blueprint: Send + Sync {
    /// Pick a show-style variant for an incoming rundown, or none.
    fn get_show_style_variant_id(
        &self,
        context: &BlueprintContext,
        variants: &[ShowStyleVariantId],
        rundown: &IngestRundown,
    ) -> Result<Option<ShowStyleVariantId>, BlueprintError>;
}

/// Picks the first offered variant.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBlueprint;

impl Blueprint for DefaultBlueprint {
    fn get_show_style_variant_id(
        &self,
        _context: &BlueprintContext,
        variants: &[ShowStyleVariantId],
        _rundown: &IngestRundown,
    ) -> Result<Option<ShowStyleVariantId>, BlueprintError> {
        Ok(variants.first().cloned())
    }
}

/// Call the blueprint's variant selection, downgrading failures to `None`.
pub fn select_show_style_variant(
    blueprint: &dyn Blueprint,
    context: &BlueprintContext,
    variants: &[ShowStyleVariantId],
    rundown: &IngestRundown,
) -> Option<ShowStyleVariantId> {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        blueprint.get_show_style_variant_id(context, variants, rundown)
    }));
    let selected = match outcome {
        Ok(Ok(selected)) => selected,
        Ok(Err(e)) => {
            tracing::error!(
                studio_id = %context.studio_id,
                rundown_id = %context.rundown_id,
                error = %e,
                "Blueprint variant selection failed"
            );
            return None;
        }
        Err(_) => {
            tracing::error!(
                studio_id = %context.studio_id,
                rundown_id = %context.rundown_id,
                "Blueprint variant selection panicked"
            );
            return None;
        }
    };

    // A variant that was never offered is treated as no selection.
    match selected {
        Some(id) if !variants.contains(&id) => {
            tracing::warn!(variant = %id, "Blueprint selected an unknown show-style variant");
            None
        }
        other => other,
    }
}
