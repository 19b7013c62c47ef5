use std::collections::HashMap;

use glam::Vec2;

use crate::{
    collision::aabb::Aabb,
    config::{AABB_DISPLACEMENT_MULTIPLIER, AABB_MARGIN},
    core::collider::ColliderHandle,
    utils::allocator::{Arena, Handle},
};

pub type ProxyHandle = Handle<Proxy>;

/// Broadphase entry for one fixture, tracked by its fattened AABB.
#[derive(Debug, Clone)]
pub struct Proxy {
    pub collider: ColliderHandle,
    pub fat_aabb: Aabb,
    cells: CellRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    min: (i32, i32),
    max: (i32, i32),
}

impl CellRange {
    fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        (self.min.0..=self.max.0)
            .flat_map(move |x| (self.min.1..=self.max.1).map(move |y| (x, y)))
    }
}

/// Uniform grid spatial partitioning used by the broad-phase.
pub struct SpatialGrid {
    cell_size: f32,
    grid: HashMap<(i32, i32), Vec<ProxyHandle>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            grid: HashMap::new(),
        }
    }

    fn world_to_grid(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    fn range(&self, aabb: &Aabb) -> CellRange {
        CellRange {
            min: self.world_to_grid(aabb.min),
            max: self.world_to_grid(aabb.max),
        }
    }

    fn insert(&mut self, proxy: ProxyHandle, range: CellRange) {
        for cell in range.cells() {
            self.grid.entry(cell).or_default().push(proxy);
        }
    }

    fn remove(&mut self, proxy: ProxyHandle, range: CellRange) {
        for cell in range.cells() {
            if let Some(bucket) = self.grid.get_mut(&cell) {
                bucket.retain(|p| *p != proxy);
                if bucket.is_empty() {
                    self.grid.remove(&cell);
                }
            }
        }
    }

    /// Proxies registered in any cell touched by `aabb`, deduplicated.
    fn candidates(&self, aabb: &Aabb) -> Vec<ProxyHandle> {
        let mut results = Vec::new();
        for cell in self.range(aabb).cells() {
            if let Some(bucket) = self.grid.get(&cell) {
                results.extend(bucket);
            }
        }
        results.sort();
        results.dedup();
        results
    }

    pub fn occupied_cells(&self) -> usize {
        self.grid.len()
    }
}

/// Broad phase driver: keeps fattened proxies in the grid and reports new overlapping pairs.
pub struct BroadPhase {
    grid: SpatialGrid,
    proxies: Arena<Proxy>,
    move_buffer: Vec<ProxyHandle>,
}

impl BroadPhase {
    pub fn new(cell_size: f32) -> Self {
        Self {
            grid: SpatialGrid::new(cell_size),
            proxies: Arena::new(),
            move_buffer: Vec::new(),
        }
    }

    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }

    pub fn create_proxy(&mut self, aabb: Aabb, collider: ColliderHandle) -> ProxyHandle {
        let fat_aabb = aabb.expanded(AABB_MARGIN);
        let cells = self.grid.range(&fat_aabb);
        let handle = self.proxies.insert(Proxy {
            collider,
            fat_aabb,
            cells,
        });
        self.grid.insert(handle, cells);
        self.move_buffer.push(handle);
        handle
    }

    pub fn destroy_proxy(&mut self, handle: ProxyHandle) {
        if let Some(proxy) = self.proxies.remove(handle) {
            self.grid.remove(handle, proxy.cells);
        }
        self.move_buffer.retain(|p| *p != handle);
    }

    /// Refits a proxy whose tight box left its fat box. Returns whether it was re-inserted.
    pub fn move_proxy(&mut self, handle: ProxyHandle, aabb: Aabb, displacement: Vec2) -> bool {
        let Some(proxy) = self.proxies.get(handle) else {
            return false;
        };
        if proxy.fat_aabb.contains(&aabb) {
            return false;
        }

        let fat_aabb = aabb
            .expanded(AABB_MARGIN)
            .swept(displacement * AABB_DISPLACEMENT_MULTIPLIER);
        let old_cells = proxy.cells;
        let new_cells = self.grid.range(&fat_aabb);
        if old_cells != new_cells {
            self.grid.remove(handle, old_cells);
            self.grid.insert(handle, new_cells);
        }
        if let Some(proxy) = self.proxies.get_mut(handle) {
            proxy.fat_aabb = fat_aabb;
            proxy.cells = new_cells;
        }
        self.touch_proxy(handle);
        true
    }

    /// Forces the proxy to be re-paired on the next update.
    pub fn touch_proxy(&mut self, handle: ProxyHandle) {
        if !self.move_buffer.contains(&handle) {
            self.move_buffer.push(handle);
        }
    }

    pub fn fat_aabb(&self, handle: ProxyHandle) -> Option<Aabb> {
        self.proxies.get(handle).map(|proxy| proxy.fat_aabb)
    }

    pub fn test_overlap(&self, a: ProxyHandle, b: ProxyHandle) -> bool {
        match (self.proxies.get(a), self.proxies.get(b)) {
            (Some(a), Some(b)) => a.fat_aabb.overlaps(&b.fat_aabb),
            _ => false,
        }
    }

    /// Visits every proxy whose fat box overlaps `aabb` until the callback returns `false`.
    pub fn query<F>(&self, aabb: &Aabb, mut callback: F)
    where
        F: FnMut(ProxyHandle, &Proxy) -> bool,
    {
        for handle in self.grid.candidates(aabb) {
            let Some(proxy) = self.proxies.get(handle) else {
                continue;
            };
            if proxy.fat_aabb.overlaps(aabb) && !callback(handle, proxy) {
                return;
            }
        }
    }

    /// Drains the move buffer and returns each newly overlapping collider pair once.
    pub fn update_pairs(&mut self) -> Vec<(ColliderHandle, ColliderHandle)> {
        let moved = std::mem::take(&mut self.move_buffer);
        let mut pairs = Vec::new();

        for &query_handle in &moved {
            let Some(query_proxy) = self.proxies.get(query_handle) else {
                continue;
            };
            let fat_aabb = query_proxy.fat_aabb;
            self.query(&fat_aabb, |other_handle, other| {
                if other_handle == query_handle {
                    return true;
                }
                // Both moved: let the smaller handle report the pair.
                if other_handle < query_handle && moved.contains(&other_handle) {
                    return true;
                }
                let (a, b) = if query_proxy.collider < other.collider {
                    (query_proxy.collider, other.collider)
                } else {
                    (other.collider, query_proxy.collider)
                };
                pairs.push((a, b));
                true
            });
        }

        pairs.sort();
        pairs.dedup();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::allocator::GenerationalId;

    fn collider(index: u32) -> ColliderHandle {
        Handle::from_raw(GenerationalId::new(index, 0))
    }

    fn unit_box(at: Vec2) -> Aabb {
        Aabb::new(at, at + Vec2::ONE)
    }

    #[test]
    fn reports_overlapping_pair_once() {
        let mut bp = BroadPhase::new(1.0);
        bp.create_proxy(unit_box(Vec2::ZERO), collider(0));
        bp.create_proxy(unit_box(Vec2::new(0.5, 0.5)), collider(1));
        bp.create_proxy(unit_box(Vec2::new(10.0, 10.0)), collider(2));

        let pairs = bp.update_pairs();
        assert_eq!(pairs, vec![(collider(0), collider(1))]);
        assert!(bp.update_pairs().is_empty(), "move buffer drained");
    }

    #[test]
    fn small_motion_stays_inside_fat_box() {
        let mut bp = BroadPhase::new(1.0);
        let proxy = bp.create_proxy(unit_box(Vec2::ZERO), collider(0));
        bp.update_pairs();

        assert!(!bp.move_proxy(proxy, unit_box(Vec2::splat(0.05)), Vec2::splat(0.05)));
        assert!(bp.move_proxy(proxy, unit_box(Vec2::new(3.0, 0.0)), Vec2::new(3.0, 0.0)));
        let fat = bp.fat_aabb(proxy).expect("live proxy");
        assert!(fat.contains(&unit_box(Vec2::new(3.0, 0.0))));
    }

    #[test]
    fn destroyed_proxies_leave_the_grid() {
        let mut bp = BroadPhase::new(1.0);
        let a = bp.create_proxy(unit_box(Vec2::ZERO), collider(0));
        let b = bp.create_proxy(unit_box(Vec2::ZERO), collider(1));
        bp.destroy_proxy(a);

        let mut seen = Vec::new();
        bp.query(&unit_box(Vec2::ZERO), |handle, _| {
            seen.push(handle);
            true
        });
        assert_eq!(seen, vec![b]);
        assert!(bp.update_pairs().is_empty());
    }
}
