// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The placement engine.
//!
//! A rebuild is one `start_overlay_placing`, any number of `add`s and one
//! `end_overlay_placing`. Candidates are bucketed by rank; ranks are resolved
//! in increasing order, each bucket from the strongest candidate down, against
//! a spatial index holding everything placed so far. Between rebuilds the
//! placement is reused until [`OverlayTree::frame`] reports it is due.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use core::fmt;
use core::mem;
use kurbo::{Point, Rect, Size};
use overlay_index::{Key, OverlayIndex, contains_point, intersects};

use crate::comparator::HandleComparator;
use crate::config::TreeConfig;
use crate::debug::{DisplacementCase, DisplacementInfo};
use crate::handle::{HandleKey, HandleRef, OverlayHandle};
use crate::schedule::FrameCounter;
use crate::screen::Screen;
use crate::types::{DisplacementMode, FeatureId, OverlayId, Rank};

#[derive(Clone, Debug)]
struct Placed {
    handle: HandleRef,
    index_key: Key,
    rank: Rank,
}

#[derive(Copy, Clone, Debug)]
enum InvalidateReason {
    Explicit,
    Clear,
    UpdateFailed,
    Removed,
    VisualScale,
    DisplacementEnabled,
    DisplacementMode,
    SelectedFeature,
}

/// Collision-free placement of overlay handles.
///
/// See the [crate docs](crate) for the rebuild protocol.
pub struct OverlayTree {
    config: TreeConfig,
    index: OverlayIndex<HandleKey>,
    handles: [Vec<HandleRef>; Rank::COUNT],
    queued: BTreeSet<HandleKey>,
    handles_cache: BTreeMap<HandleKey, Placed>,
    overlay_id_cache: BTreeMap<OverlayId, Vec<HandleKey>>,
    // Winners of any collision in the last finished rebuild.
    displacers: BTreeSet<HandleRef>,
    next_displacers: BTreeSet<HandleRef>,
    frame: FrameCounter,
    zoom_level: u8,
    screen: Screen,
    is_placing: bool,
    displacement_enabled: bool,
    displacement_mode: DisplacementMode,
    selected_feature: Option<FeatureId>,
    visual_scale: f64,
    debug_displacement: bool,
    displacement_info: Vec<DisplacementInfo>,
}

impl fmt::Debug for OverlayTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayTree")
            .field("placed", &self.handles_cache.len())
            .field("dirty", &self.frame.is_dirty())
            .field("period", &self.frame.period())
            .field("zoom_level", &self.zoom_level)
            .field("is_placing", &self.is_placing)
            .field("displacement_enabled", &self.displacement_enabled)
            .field("displacement_mode", &self.displacement_mode)
            .field("selected_feature", &self.selected_feature)
            .finish_non_exhaustive()
    }
}

impl Default for OverlayTree {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayTree {
    /// Create a tree with default tuning. It starts dirty.
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    /// Create a tree with explicit tuning. It starts dirty.
    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            config,
            index: OverlayIndex::with_cell_size(config.grid_cell_size),
            handles: core::array::from_fn(|_| Vec::new()),
            queued: BTreeSet::new(),
            handles_cache: BTreeMap::new(),
            overlay_id_cache: BTreeMap::new(),
            displacers: BTreeSet::new(),
            next_displacers: BTreeSet::new(),
            frame: FrameCounter::new(config.schedule),
            zoom_level: 0,
            screen: Screen::default(),
            is_placing: false,
            displacement_enabled: true,
            displacement_mode: DisplacementMode::all(),
            selected_feature: None,
            visual_scale: 1.0,
            debug_displacement: false,
            displacement_info: Vec::new(),
        }
    }

    /// Tuning in use.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    // --- Frame scheduling ---

    /// Advance one frame. Returns true if the caller should rebuild this frame.
    pub fn frame(&mut self) -> bool {
        self.frame.tick(self.handles_cache.len())
    }

    /// Whether the next frame must rebuild.
    pub fn is_need_update(&self) -> bool {
        self.frame.is_dirty()
    }

    /// Force a rebuild on the next frame.
    pub fn invalidate_on_next_frame(&mut self) {
        self.invalidate(InvalidateReason::Explicit);
    }

    /// Current stable-run length in frames.
    pub fn frame_update_period(&self) -> u32 {
        self.frame.period()
    }

    fn invalidate(&mut self, reason: InvalidateReason) {
        log::trace!("overlay tree invalidated: {reason:?}");
        self.frame.invalidate();
    }

    // --- Rebuild ---

    /// Begin a rebuild for `screen` at `zoom_level`, dropping the previous placement.
    pub fn start_overlay_placing(&mut self, screen: Screen, zoom_level: u8) {
        debug_assert!(self.is_need_update(), "placement started on a stable frame");
        debug_assert!(!self.is_placing, "placement already in progress");

        self.index.clear();
        self.handles_cache.clear();
        self.overlay_id_cache.clear();
        self.next_displacers.clear();
        self.queued.clear();
        for bucket in &mut self.handles {
            bucket.clear();
        }
        self.displacement_info.clear();

        self.screen = screen;
        self.zoom_level = zoom_level;
        self.frame.mark_stable();
        self.is_placing = true;
    }

    /// Offer a candidate for this rebuild.
    ///
    /// Rejected candidates are marked invisible, except ones whose `update`
    /// failed: those keep their flags, are marked not ready and schedule a retry.
    /// A candidate on or above the horizon is behind the camera and is simply
    /// rejected.
    pub fn add(&mut self, handle: &HandleRef) {
        debug_assert!(self.is_placing, "add called outside a rebuild");
        if !self.is_placing {
            return;
        }

        {
            let mut h = handle.borrow_mut();
            let st = h.state_mut();
            if self.zoom_level < st.min_visible_zoom()
                || !self.displacement_mode.intersects(st.displacement_mode())
            {
                st.set_visible(false);
                return;
            }
            st.set_caching_enabled(true);
        }

        if !self.queued.insert(handle.key()) {
            return;
        }

        let updated = handle.borrow_mut().update(&self.screen);
        if !updated {
            handle.borrow_mut().state_mut().set_ready(false);
            self.invalidate(InvalidateReason::UpdateFailed);
            return;
        }

        let (rect, pivot, rank) = {
            let mut h = handle.borrow_mut();
            h.state_mut().set_ready(true);
            (h.extended_pixel_rect(&self.screen), h.pivot(&self.screen), h.rank())
        };

        let reversed =
            self.screen.is_reverse_projection(rect.center()) || self.screen.is_reverse_projection(pivot);
        let offscreen = !intersects(&rect, &self.admission_rect()) && !self.displacers.contains(handle);
        if reversed || offscreen {
            handle.borrow_mut().state_mut().set_visible(false);
            return;
        }

        self.handles[rank.index()].push(handle.clone());
    }

    /// Resolve all candidates and publish the placement through handle flags.
    pub fn end_overlay_placing(&mut self) {
        debug_assert!(self.is_placing, "end_overlay_placing without a matching start");
        if !self.is_placing {
            return;
        }

        let cmp = HandleComparator::new(true);
        let mut considered = Vec::new();
        let mut bucket_sizes = [0_usize; Rank::COUNT];
        for rank in Rank::ALL {
            let mut bucket = mem::take(&mut self.handles[rank.index()]);
            bucket_sizes[rank.index()] = bucket.len();
            bucket.sort_by(|l, r| cmp.compare(r, l));
            for handle in &bucket {
                let parent = match rank.parent() {
                    None => None,
                    Some(parent_rank) => {
                        let id = handle.borrow().overlay_id();
                        match self.find_placed(id, parent_rank) {
                            Some(p) => Some(p),
                            None => continue,
                        }
                    }
                };
                self.insert_handle(handle, rank, parent.as_ref());
            }
            considered.extend(bucket);
        }

        for handle in &considered {
            let mut h = handle.borrow_mut();
            let st = h.state_mut();
            st.set_display_flag(false);
            st.set_visible(false);
        }
        for placed in self.handles_cache.values() {
            let mut h = placed.handle.borrow_mut();
            let st = h.state_mut();
            st.set_display_flag(true);
            st.set_visible(true);
            st.set_caching_enabled(false);
        }

        self.displacers = mem::take(&mut self.next_displacers);
        self.queued.clear();
        self.is_placing = false;
        log::debug!(
            "overlay rebuild: candidates per rank {:?}, placed {}, displacers {}",
            bucket_sizes,
            self.handles_cache.len(),
            self.displacers.len(),
        );
    }

    fn admission_rect(&self) -> Rect {
        let vp = self.screen.pixel_rect_in_3d();
        Rect::from_center_size(vp.center(), vp.size() * self.config.screen_rect_scale)
    }

    fn is_selected(&self, id: OverlayId) -> bool {
        self.selected_feature == Some(id.feature_id)
    }

    fn find_placed(&self, id: OverlayId, rank: Rank) -> Option<HandleRef> {
        self.overlay_id_cache
            .get(&id)?
            .iter()
            .filter_map(|k| self.handles_cache.get(k))
            .find(|p| p.rank == rank)
            .map(|p| p.handle.clone())
    }

    fn insert_handle(&mut self, handle: &HandleRef, rank: Rank, parent: Option<&HandleRef>) {
        let rect = handle.borrow().extended_pixel_rect(&self.screen);
        if !self.displacement_enabled {
            self.cache_handle(handle, rank, rect);
            return;
        }

        let rivals = self.collect_rivals(handle, rect, rank, parent);
        let (id, bound) = {
            let h = handle.borrow();
            (h.overlay_id(), h.state().is_bound_to_parent())
        };
        let subject = match parent {
            Some(p) if bound => p,
            _ => handle,
        };

        if !self.is_selected(id) {
            for rival in &rivals {
                let rival_selected = self.is_selected(rival.borrow().overlay_id());
                if rival_selected || self.rival_wins(subject, rival) {
                    let case = if rival_selected {
                        DisplacementCase::SelectedRival
                    } else {
                        DisplacementCase::RivalWon
                    };
                    self.record_displacement(rival, handle, case);
                    self.next_displacers.insert(rival.clone());
                    // A sibling of the same overlay keeps the shared parent alive.
                    let sibling = rival.borrow().overlay_id() == id;
                    if bound && !sibling && let Some(p) = parent {
                        self.evict_group(p);
                    }
                    return;
                }
            }
        }

        let mut displaced = false;
        for rival in &rivals {
            // An earlier cascade may already have taken this one out.
            if !self.handles_cache.contains_key(&rival.key()) {
                continue;
            }
            self.record_displacement(handle, rival, DisplacementCase::CandidateWon);
            if rival.borrow().overlay_id() == id {
                self.evict_sibling(rival);
            } else {
                self.evict_group(rival);
            }
            displaced = true;
        }
        if displaced {
            self.next_displacers.insert(handle.clone());
        }
        if let Some(p) = parent
            && !self.handles_cache.contains_key(&p.key())
        {
            log::trace!("dropping {id:?} at {rank:?}: parent was evicted");
            return;
        }
        self.cache_handle(handle, rank, rect);
    }

    /// Placed handles colliding with `handle`, strongest first.
    fn collect_rivals(
        &self,
        handle: &HandleRef,
        rect: Rect,
        rank: Rank,
        parent: Option<&HandleRef>,
    ) -> Vec<HandleRef> {
        let h = handle.borrow();
        let id = h.overlay_id();
        let mode = h.state().displacement_mode();
        let mut rivals = Vec::new();
        self.index.for_each_in_rect(rect, |_, key| {
            let Some(placed) = self.handles_cache.get(&key) else {
                return;
            };
            if parent.is_some_and(|p| p.key() == key) {
                return;
            }
            let collides = {
                let r = placed.handle.borrow();
                let lower_sibling = r.overlay_id() == id && placed.rank < rank;
                !lower_sibling
                    && r.state().displacement_mode().intersects(mode)
                    && h.is_intersect(&self.screen, &*r)
            };
            if collides {
                rivals.push(placed.handle.clone());
            }
        });
        let cmp = HandleComparator::new(true);
        rivals.sort_by(|l, r| cmp.compare(r, l));
        rivals
    }

    fn rival_wins(&self, subject: &HandleRef, rival: &HandleRef) -> bool {
        let cmp = HandleComparator::new(true);
        if self.screen.is_perspective() {
            let s = subject.borrow();
            let r = rival.borrow();
            let exempt = |h: &dyn OverlayHandle| {
                h.state().has_linear_feature_shape() || h.state().is_special_layer()
            };
            if !exempt(&*s) && !exempt(&*r) && cmp.is_equal(&*s, &*r) {
                let (sy, ry) = (s.pivot(&self.screen).y, r.pivot(&self.screen).y);
                if sy != ry {
                    return sy > ry;
                }
            }
        }
        cmp.is_greater(rival, subject)
    }

    fn cache_handle(&mut self, handle: &HandleRef, rank: Rank, rect: Rect) {
        let key = handle.key();
        let id = handle.borrow().overlay_id();
        let index_key = self.index.insert(rect, key);
        self.handles_cache.insert(
            key,
            Placed {
                handle: handle.clone(),
                index_key,
                rank,
            },
        );
        self.overlay_id_cache.entry(id).or_default().push(key);
    }

    /// Evict `handle` together with everything bound to it.
    ///
    /// The eviction floor walks down through placed parents while the handle
    /// at the floor is bound, then every same-id handle at or above it goes.
    fn evict_group(&mut self, handle: &HandleRef) {
        let (id, mut floor, mut bound) = {
            let h = handle.borrow();
            (h.overlay_id(), h.rank(), h.state().is_bound_to_parent())
        };
        while bound {
            let Some(parent_rank) = floor.parent() else {
                break;
            };
            let Some(parent) = self.find_placed(id, parent_rank) else {
                break;
            };
            floor = parent_rank;
            bound = parent.borrow().state().is_bound_to_parent();
        }
        for evicted in self.erase_if(id, |_, rank| rank >= floor) {
            log::trace!("evicted {:?} at {:?}", id, evicted.borrow().rank());
        }
    }

    /// Evict a placed handle sharing the candidate's overlay id, with the
    /// ranks above it. Its parents stay, since the candidate relies on them.
    fn evict_sibling(&mut self, sibling: &HandleRef) {
        let (id, rank) = {
            let h = sibling.borrow();
            (h.overlay_id(), h.rank())
        };
        let key = sibling.key();
        for evicted in self.erase_if(id, |k, r| k == key || r > rank) {
            log::trace!("evicted sibling {:?} at {:?}", id, evicted.borrow().rank());
        }
    }

    /// Drop placed handles of `id` matching `pred` from the index and both caches.
    fn erase_if(&mut self, id: OverlayId, mut pred: impl FnMut(HandleKey, Rank) -> bool) -> Vec<HandleRef> {
        let mut erased = Vec::new();
        let Some(keys) = self.overlay_id_cache.get_mut(&id) else {
            return erased;
        };
        let cache = &mut self.handles_cache;
        let index = &mut self.index;
        keys.retain(|&k| {
            let Some(placed) = cache.get(&k) else {
                return false;
            };
            if !pred(k, placed.rank) {
                return true;
            }
            if let Some(placed) = cache.remove(&k) {
                index.remove(placed.index_key);
                erased.push(placed.handle);
            }
            false
        });
        if keys.is_empty() {
            self.overlay_id_cache.remove(&id);
        }
        erased
    }

    fn record_displacement(&mut self, winner: &HandleRef, loser: &HandleRef, case: DisplacementCase) {
        if !self.debug_displacement {
            return;
        }
        let displacer_center = winner.borrow().extended_pixel_rect(&self.screen).center();
        let displaced_center = loser.borrow().extended_pixel_rect(&self.screen).center();
        self.displacement_info.push(DisplacementInfo {
            displacer_center,
            displaced_center,
            case,
            color: case.color(),
        });
    }

    // --- Outside a rebuild ---

    /// Remove a placed handle and its same-id handles at higher ranks.
    ///
    /// Returns false during a rebuild or if the handle is not placed.
    pub fn remove(&mut self, handle: &HandleRef) -> bool {
        if self.is_placing {
            return false;
        }
        let key = handle.key();
        let Some(rank) = self.handles_cache.get(&key).map(|p| p.rank) else {
            return false;
        };
        let id = handle.borrow().overlay_id();
        for h in self.erase_if(id, |k, r| k == key || r > rank) {
            h.borrow_mut().state_mut().set_visible(false);
        }
        self.invalidate(InvalidateReason::Removed);
        true
    }

    /// Drop every placement and cache and go dirty. Handle flags are left as they are.
    pub fn clear(&mut self) {
        self.index.clear();
        self.handles_cache.clear();
        self.overlay_id_cache.clear();
        self.displacers.clear();
        self.next_displacers.clear();
        self.queued.clear();
        for bucket in &mut self.handles {
            bucket.clear();
        }
        self.displacement_info.clear();
        self.is_placing = false;
        self.invalidate(InvalidateReason::Clear);
    }

    // --- Settings ---

    /// Record the display density. Scales hit-test tolerance.
    pub fn set_visual_scale(&mut self, visual_scale: f64) {
        self.visual_scale = visual_scale;
        self.invalidate(InvalidateReason::VisualScale);
    }

    /// Display density.
    pub fn visual_scale(&self) -> f64 {
        self.visual_scale
    }

    /// Turn collision resolution on or off. With it off every admitted candidate is placed.
    pub fn set_displacement_enabled(&mut self, enabled: bool) {
        if self.displacement_enabled != enabled {
            self.displacement_enabled = enabled;
            self.invalidate(InvalidateReason::DisplacementEnabled);
        }
    }

    /// Whether collision resolution is on.
    pub fn is_displacement_enabled(&self) -> bool {
        self.displacement_enabled
    }

    /// Admit only handles sharing a group with `mode`.
    pub fn set_displacement_mode(&mut self, mode: DisplacementMode) {
        if self.displacement_mode != mode {
            self.displacement_mode = mode;
            self.invalidate(InvalidateReason::DisplacementMode);
        }
    }

    /// Admitted displacement groups.
    pub fn displacement_mode(&self) -> DisplacementMode {
        self.displacement_mode
    }

    /// Make handles of `feature` immune to displacement.
    pub fn set_selected_feature(&mut self, feature: FeatureId) {
        if self.selected_feature != Some(feature) {
            self.selected_feature = Some(feature);
            self.invalidate(InvalidateReason::SelectedFeature);
        }
    }

    /// Clear the selected feature.
    pub fn reset_selected_feature(&mut self) {
        if self.selected_feature.take().is_some() {
            self.invalidate(InvalidateReason::SelectedFeature);
        }
    }

    /// The selected feature, if any.
    pub fn selected_feature(&self) -> Option<FeatureId> {
        self.selected_feature
    }

    /// Record displacement events during rebuilds. Disabling drops the log.
    pub fn set_debug_displacement(&mut self, enabled: bool) {
        self.debug_displacement = enabled;
        if !enabled {
            self.displacement_info.clear();
        }
    }

    /// Displacement events of the last rebuild, in decision order.
    pub fn displacement_info(&self) -> &[DisplacementInfo] {
        &self.displacement_info
    }

    // --- Queries ---

    /// Visible, non-linear handles whose shape contains `point`, strongest first.
    pub fn select_point(&self, point: Point) -> Vec<HandleRef> {
        let half = self.config.search_half_size * self.visual_scale;
        let query = Rect::from_center_size(point, Size::new(2.0 * half, 2.0 * half));
        let mut hits = self.select_with(query, |h| {
            h.pixel_shape(&self.screen)
                .iter()
                .any(|r| contains_point(r, point))
        });
        let cmp = HandleComparator::new(false);
        hits.sort_by(|l, r| cmp.compare(r, l));
        hits
    }

    /// Visible, non-linear handles with any sub-shape intersecting `rect`.
    pub fn select_rect(&self, rect: Rect) -> Vec<HandleRef> {
        self.select_with(rect, |h| {
            h.pixel_shape(&self.screen)
                .iter()
                .any(|r| intersects(r, &rect))
        })
    }

    fn select_with(&self, query: Rect, mut keep: impl FnMut(&dyn OverlayHandle) -> bool) -> Vec<HandleRef> {
        let mut out = Vec::new();
        self.index.for_each_in_rect(query, |_, key| {
            let Some(placed) = self.handles_cache.get(&key) else {
                return;
            };
            let matched = {
                let h = placed.handle.borrow();
                let st = h.state();
                st.is_visible() && !st.has_linear_feature_shape() && keep(&*h)
            };
            if matched {
                out.push(placed.handle.clone());
            }
        });
        out
    }

    /// Union of the pixel rects of visible placed handles of the selected feature.
    pub fn selected_feature_rect(&self, screen: &Screen) -> Option<Rect> {
        let feature = self.selected_feature?;
        let ids = OverlayId::new(feature, 0)..=OverlayId::new(feature, u32::MAX);
        self.overlay_id_cache
            .range(ids)
            .flat_map(|(_, keys)| keys.iter())
            .filter_map(|k| self.handles_cache.get(k))
            .filter(|p| p.handle.borrow().state().is_visible())
            .map(|p| p.handle.borrow().pixel_rect(screen))
            .reduce(|a, b| a.union(b))
    }

    // --- Introspection ---

    /// Handles placed by the last rebuild, in no particular order.
    pub fn placed_handles(&self) -> impl Iterator<Item = &HandleRef> + '_ {
        self.handles_cache.values().map(|p| &p.handle)
    }

    /// Number of placed handles.
    pub fn placed_count(&self) -> usize {
        self.handles_cache.len()
    }

    /// Whether a rebuild is in progress.
    pub fn is_placing(&self) -> bool {
        self.is_placing
    }

    /// Zoom level of the last rebuild.
    pub fn zoom_level(&self) -> u8 {
        self.zoom_level
    }

    /// Screen of the last rebuild.
    pub fn screen(&self) -> &Screen {
        &self.screen
    }
}
