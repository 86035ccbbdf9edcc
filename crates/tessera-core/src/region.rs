//! Scoring regions and the arena that tracks them.
//!
//! A region is a contiguous road, town, meadow or cloister that may span
//! many tiles. Regions live in an arena and are addressed by [`RegionId`].
//! When two regions join, one absorbs the other and the absorbed id becomes
//! an alias resolved through a union-find with path compression, so the
//! per-tile area map never has to be rewritten.

use crate::game::GameError;
use crate::player::Token;
use crate::position::Position;
use crate::tile::{AreaIndex, AreaKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Stable handle into the region arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u32);

impl RegionId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scorable area spanning one or more tiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub kind: AreaKind,
    /// Cells of every tile contributing an area
    pub positions: BTreeSet<Position>,
    pub tokens: Vec<Token>,
    /// Town pennant
    pub multiplier: bool,
    /// Town bonus (cathedral)
    pub bonus: bool,
    /// Open road ends or open town edges; unused for meadows and cloisters
    pub open: u32,
    pub finished: bool,
    /// Towns and cloisters this meadow borders (may be stale aliases)
    pub links: BTreeSet<RegionId>,
}

impl Region {
    /// A region covering a single area of the tile at `pos`
    pub fn new(kind: AreaKind, pos: Position) -> Self {
        Self {
            positions: BTreeSet::from([pos]),
            ..Self::empty(kind)
        }
    }

    /// What an absorbed id is left holding
    fn empty(kind: AreaKind) -> Self {
        Self {
            kind,
            positions: BTreeSet::new(),
            tokens: Vec::new(),
            multiplier: false,
            bonus: false,
            open: 0,
            finished: false,
            links: BTreeSet::new(),
        }
    }

    /// Cell a cloister region is anchored on
    pub fn anchor(&self) -> Option<Position> {
        self.positions.iter().next().copied()
    }
}

/// Arena of every region created during a game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionArena {
    regions: Vec<Region>,
    parent: Vec<RegionId>,
    /// Region of each area, per placed tile, in area order
    #[serde(with = "crate::position::cell_map")]
    areas: HashMap<Position, Vec<RegionId>>,
    /// Canonical regions that have not been scored yet
    active: BTreeSet<RegionId>,
}

impl RegionArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fresh region and mark it active
    pub fn create(&mut self, region: Region) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(region);
        self.parent.push(id);
        self.active.insert(id);
        id
    }

    /// Record the regions for the areas of the tile at `pos`
    pub fn assign_tile(&mut self, pos: Position, ids: Vec<RegionId>) {
        self.areas.insert(pos, ids);
    }

    /// Canonical id, compressing the path on the way
    pub fn find(&mut self, id: RegionId) -> RegionId {
        let root = self.root(id);
        let mut current = id;
        while current != root {
            let next = self.parent[current.index()];
            self.parent[current.index()] = root;
            current = next;
        }
        root
    }

    /// Canonical id without touching the forest
    pub fn root(&self, id: RegionId) -> RegionId {
        let mut current = id;
        while self.parent[current.index()] != current {
            current = self.parent[current.index()];
        }
        current
    }

    /// Canonical region of one area of a placed tile
    pub fn region_at(&self, pos: Position, area: AreaIndex) -> Result<RegionId, GameError> {
        self.areas
            .get(&pos)
            .and_then(|ids| ids.get(area as usize))
            .map(|id| self.root(*id))
            .ok_or_else(|| {
                GameError::RegionInvariantViolation(format!(
                    "area {} at {} has no region",
                    area, pos
                ))
            })
    }

    /// Canonical regions of every area of a placed tile
    pub fn regions_at(&self, pos: Position) -> Vec<RegionId> {
        self.areas
            .get(&pos)
            .map(|ids| ids.iter().map(|id| self.root(*id)).collect())
            .unwrap_or_default()
    }

    /// Resolve an id to its canonical region
    pub fn get(&self, id: RegionId) -> &Region {
        &self.regions[self.root(id).index()]
    }

    pub fn get_mut(&mut self, id: RegionId) -> &mut Region {
        let root = self.find(id);
        &mut self.regions[root.index()]
    }

    pub fn is_active(&self, id: RegionId) -> bool {
        self.active.contains(&self.root(id))
    }

    /// Canonical regions still waiting to be scored
    pub fn active(&self) -> Vec<RegionId> {
        self.active.iter().copied().collect()
    }

    /// Drop a scored region from the active list
    pub fn deactivate(&mut self, id: RegionId) {
        let root = self.find(id);
        self.active.remove(&root);
    }

    /// Every canonical region, scored or not
    pub fn canonical(&self) -> impl Iterator<Item = (RegionId, &Region)> + '_ {
        self.regions
            .iter()
            .enumerate()
            .filter(|(i, _)| self.parent[*i].index() == *i)
            .map(|(i, r)| (RegionId(i as u32), r))
    }

    /// Canonical ids of the towns and cloisters a meadow borders
    pub fn linked(&self, meadow: RegionId) -> BTreeSet<RegionId> {
        self.get(meadow)
            .links
            .iter()
            .map(|id| self.root(*id))
            .collect()
    }

    /// Add a token to a region
    pub fn add_token(&mut self, id: RegionId, token: Token) {
        self.get_mut(id).tokens.push(token);
    }

    /// Union two regions; the one with more cells survives.
    ///
    /// Cells, tokens, flags, meadow links and open counters are combined.
    /// Returns the surviving canonical id.
    pub fn union(&mut self, a: RegionId, b: RegionId) -> RegionId {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return ra;
        }

        let (survivor, absorbed) =
            if self.regions[ra.index()].positions.len() >= self.regions[rb.index()].positions.len()
            {
                (ra, rb)
            } else {
                (rb, ra)
            };

        let kind = self.regions[absorbed.index()].kind;
        let taken = std::mem::replace(&mut self.regions[absorbed.index()], Region::empty(kind));
        let target = &mut self.regions[survivor.index()];
        target.positions.extend(taken.positions);
        target.tokens.extend(taken.tokens);
        target.multiplier |= taken.multiplier;
        target.bonus |= taken.bonus;
        target.open += taken.open;
        target.links.extend(taken.links);

        self.parent[absorbed.index()] = survivor;
        self.active.remove(&absorbed);
        survivor
    }

    /// Join the regions on either side of one shared edge segment.
    ///
    /// Roads and towns lose one open end on each side of the shared
    /// boundary, also when the edge closes a loop within one region.
    pub fn join_across_edge(&mut self, a: RegionId, b: RegionId) -> Result<RegionId, GameError> {
        let ra = self.find(a);
        let rb = self.find(b);
        let kind = self.regions[ra.index()].kind;
        if kind != self.regions[rb.index()].kind {
            return Err(GameError::RegionInvariantViolation(format!(
                "cannot join {:?} region {} with {:?} region {}",
                kind,
                ra,
                self.regions[rb.index()].kind,
                rb
            )));
        }

        let survivor = self.union(ra, rb);
        if matches!(kind, AreaKind::Road | AreaKind::Town) {
            let region = &mut self.regions[survivor.index()];
            region.open = region.open.checked_sub(2).ok_or_else(|| {
                GameError::RegionInvariantViolation(format!(
                    "region {} closed more edges than it had open",
                    survivor
                ))
            })?;
        }
        Ok(survivor)
    }
}
