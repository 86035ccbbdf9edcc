//! Placement engine: validates a tile against its neighbours, then creates
//! the regions for its areas and joins them with the regions across every
//! shared edge.
//!
//! Validation never mutates. Once [`place_tile`] starts mutating, the only
//! possible failure is an internal invariant violation.

use crate::board::Board;
use crate::game::GameError;
use crate::position::{Direction, Position};
use crate::region::{Region, RegionArena, RegionId};
use crate::tile::{AreaIndex, AreaKind, Tile};

/// Validate and place an oriented tile.
///
/// Returns the canonical regions of the new tile's areas after merging.
pub fn place_tile(
    board: &mut Board,
    regions: &mut RegionArena,
    pos: Position,
    tile: Tile,
) -> Result<Vec<RegionId>, GameError> {
    board.matching_edges(&tile, pos)?;
    lay_tile(board, regions, pos, tile)
}

/// Place a tile with no edge checks (used for the starting tile).
pub fn lay_tile(
    board: &mut Board,
    regions: &mut RegionArena,
    pos: Position,
    tile: Tile,
) -> Result<Vec<RegionId>, GameError> {
    board.place(pos, tile)?;
    let ids = create_regions(regions, pos, &tile);
    regions.assign_tile(pos, ids);

    for side in Direction::ALL {
        let neighbor_pos = pos.neighbor(side);
        let Some(neighbor) = board.get(neighbor_pos).copied() else {
            continue;
        };
        for (ours, theirs) in shared_slots(&tile, &neighbor, side) {
            let a = regions.region_at(pos, ours)?;
            let b = regions.region_at(neighbor_pos, theirs)?;
            regions.join_across_edge(a, b)?;
        }
    }

    Ok(regions.regions_at(pos))
}

/// Distinct (our area, their area) pairs along one shared edge.
///
/// Facing slots line up in reverse order. A town edge yields a single pair,
/// a road edge yields one road pair and up to two meadow pairs.
fn shared_slots(tile: &Tile, neighbor: &Tile, side: Direction) -> Vec<(AreaIndex, AreaIndex)> {
    let ours = tile.edge(side);
    let theirs = neighbor.edge(side.opposite());
    let mut pairs = Vec::with_capacity(3);
    for i in 0..3 {
        let pair = (ours[i], theirs[2 - i]);
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }
    pairs
}

/// One fresh region per area of the tile, meadows linked to the towns and
/// cloisters they border on the same tile.
fn create_regions(regions: &mut RegionArena, pos: Position, tile: &Tile) -> Vec<RegionId> {
    let definition = tile.definition();
    let ids: Vec<RegionId> = tile
        .areas()
        .iter()
        .enumerate()
        .map(|(index, area)| {
            let index = index as AreaIndex;
            let mut region = Region::new(area.kind, pos);
            match area.kind {
                AreaKind::Road => region.open = tile.road_open_ends(index),
                AreaKind::Town => {
                    region.open = tile.town_open_edges(index);
                    region.multiplier = definition.multiplier;
                    region.bonus = definition.bonus;
                }
                AreaKind::Meadow | AreaKind::Cloister => {}
            }
            regions.create(region)
        })
        .collect();

    for (index, area) in tile.areas().iter().enumerate() {
        if area.kind == AreaKind::Meadow && !area.adjacent.is_empty() {
            let links = area.adjacent.iter().map(|a| ids[*a as usize]);
            regions.get_mut(ids[index]).links.extend(links);
        }
    }

    ids
}

/// Whether the region `area` would join after placing `tile` at `pos` is
/// still free of tokens. Reads only; call before [`place_tile`].
pub fn area_is_unclaimed(
    board: &Board,
    regions: &RegionArena,
    pos: Position,
    tile: &Tile,
    area: AreaIndex,
) -> Result<bool, GameError> {
    for side in Direction::ALL {
        let neighbor_pos = pos.neighbor(side);
        let Some(neighbor) = board.get(neighbor_pos) else {
            continue;
        };
        for (ours, theirs) in shared_slots(tile, neighbor, side) {
            if ours != area {
                continue;
            }
            let region = regions.region_at(neighbor_pos, theirs)?;
            if !regions.get(region).tokens.is_empty() {
                return Ok(false);
            }
        }
    }
    Ok(true)
}
