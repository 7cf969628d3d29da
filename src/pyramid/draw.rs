//! Viewport drawing and cross-resolution borrowing.
//!
//! A viewport draw walks the tiles covering the visible rectangle at one
//! level. Missing tiles are requested at [`Priority::Low`] and patched over
//! with content from the finer neighbour, then the coarser one.
//!
//! Borrowing maps one caller cell into the lending level's pixel space,
//! draws the lender's tiles under a clip and a scale that land them on the
//! caller's cell, and recurses further along the chain for the lender's own
//! gaps. Recursion always continues in the same direction, so a borrow takes
//! at most `levels - 1` hops.

use kurbo::Rect;
use tracing::trace;

use crate::error::PyramidError;
use crate::surface::ClipOp;
use crate::tile::{Priority, Scale, TileKey};

use super::chain::Pyramid;
use super::frame::DrawContext;
use super::node::ResolutionNode;

impl Pyramid {
    /// Draw the tiles covering `viewport` (pixel space of `scale`).
    ///
    /// Tiles outside the scale's content bounds are neither drawn nor
    /// requested. Missing tiles never fail the draw; at worst their cell is
    /// left blank for this frame.
    ///
    /// # Errors
    ///
    /// Returns [`PyramidError::UnknownScale`] if `scale` has no level.
    pub fn draw_viewport(
        &self,
        scale: Scale,
        viewport: Rect,
        ctx: &mut DrawContext<'_>,
    ) -> Result<(), PyramidError> {
        let node = self.node(scale)?;
        let content = ctx.store().content_bounds(scale);
        let range = ctx.grid().index_range(viewport).intersect(&content);

        for (x, y) in range.iter() {
            let key = TileKey::new(scale, x, y);
            if ctx.draw_tile(key) {
                ctx.report_mut().tiles_drawn += 1;
                continue;
            }

            ctx.request(key, Priority::Low);

            let covered = self.borrow_from_link(node.high(), scale, x, y, ctx, 1)
                || self.borrow_from_link(node.low(), scale, x, y, ctx, 1);

            let report = ctx.report_mut();
            if covered {
                report.cells_borrowed += 1;
            } else {
                report.cells_missing += 1;
            }
        }

        trace!(
            %scale,
            cells = range.len(),
            requests = ctx.report().requests.len(),
            "viewport drawn"
        );
        Ok(())
    }

    /// Fill cell `(x, y)` of `requested`'s grid with content from level `lender`.
    ///
    /// Returns `true` only if every lender cell overlapping the target was
    /// satisfied, directly or by further borrowing.
    ///
    /// # Errors
    ///
    /// Returns [`PyramidError::UnknownScale`] if `lender` has no level.
    pub fn borrow(
        &self,
        lender: Scale,
        requested: Scale,
        x: i32,
        y: i32,
        ctx: &mut DrawContext<'_>,
    ) -> Result<bool, PyramidError> {
        let node = self.node(lender)?;
        Ok(self.borrow_from(node, requested, x, y, ctx, 1))
    }

    fn borrow_from_link(
        &self,
        link: Option<Scale>,
        requested: Scale,
        x: i32,
        y: i32,
        ctx: &mut DrawContext<'_>,
        depth: usize,
    ) -> bool {
        match link.and_then(|scale| self.nodes.get(&scale)) {
            Some(node) => self.borrow_from(node, requested, x, y, ctx, depth),
            None => false,
        }
    }

    fn borrow_from(
        &self,
        node: &ResolutionNode,
        requested: Scale,
        x: i32,
        y: i32,
        ctx: &mut DrawContext<'_>,
        depth: usize,
    ) -> bool {
        let scale = node.scale();
        let borrowing_coarser = requested > scale;
        // Filling a non-canonical (currently viewed) level is latency sensitive.
        let escalate = borrowing_coarser && !requested.is_canonical();

        let rel = scale.ratio_to(requested);
        let grid = ctx.grid();
        let target = grid.rect_of(x, y);
        // Cells outside the lender's content hold nothing and count as satisfied.
        let range = grid
            .index_range(target.scale_from_origin(rel).expand())
            .intersect(&ctx.store().content_bounds(scale));
        let next = if borrowing_coarser {
            node.low()
        } else {
            node.high()
        };

        {
            let report = ctx.report_mut();
            report.max_borrow_depth = report.max_borrow_depth.max(depth);
        }

        let surface = ctx.surface();
        surface.save();
        surface.clip_rect(target, ClipOp::Intersect);
        surface.scale(1.0 / rel, 1.0 / rel);

        let mut satisfied = true;
        for (sx, sy) in range.iter() {
            let key = TileKey::new(scale, sx, sy);
            if ctx.draw_tile(key) {
                ctx.report_mut().tiles_borrowed += 1;
                continue;
            }

            let covered = self.borrow_from_link(next, scale, sx, sy, ctx, depth + 1);
            if escalate {
                let priority = if covered {
                    Priority::Middle
                } else {
                    Priority::High
                };
                ctx.request(key, priority);
            }
            satisfied &= covered;
        }

        ctx.surface().restore();
        satisfied
    }
}

// =============================================================================
// Tests
// =============================================================================
