//! Scoring engine: completion detection, majority resolution, region values
//! and the end-of-game sweep.

use crate::actions::GameEvent;
use crate::board::Board;
use crate::game::GameError;
use crate::player::{Player, PlayerId, Token, TokenKind};
use crate::position::Position;
use crate::region::{Region, RegionArena, RegionId};
use crate::tile::AreaKind;
use std::collections::{BTreeMap, BTreeSet};

/// Points per town tile
const TOWN_POINTS: u32 = 2;

/// Points per town tile when the town carries a pennant
const PENNANT_TOWN_POINTS: u32 = 3;

/// Bishop bonus per cloister reachable through the town's meadows
const BISHOP_CLOISTER_POINTS: u32 = 4;

/// Meadow points per bordering finished town
const MEADOW_TOWN_POINTS: u32 = 3;

/// Players tied at the highest weight, ignoring zero weights
fn leaders(weights: BTreeMap<PlayerId, u32>) -> Vec<PlayerId> {
    let max = weights.values().copied().max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    weights
        .into_iter()
        .filter(|(_, w)| *w == max)
        .map(|(p, _)| p)
        .collect()
}

/// Players holding the region: doubles count twice, bishops not at all.
pub fn majority(tokens: &[Token]) -> Vec<PlayerId> {
    let mut weights = BTreeMap::new();
    for token in tokens {
        *weights.entry(token.owner).or_insert(0) += token.kind.majority_weight();
    }
    leaders(weights)
}

/// Players with the most bishops on the region
pub fn bishop_majority(tokens: &[Token]) -> Vec<PlayerId> {
    let mut counts = BTreeMap::new();
    for token in tokens.iter().filter(|t| t.kind == TokenKind::Bishop) {
        *counts.entry(token.owner).or_insert(0) += 1;
    }
    leaders(counts)
}

/// Value of a road, town or cloister for its holders
pub fn region_value(board: &Board, region: &Region) -> u32 {
    let tiles = region.positions.len() as u32;
    match region.kind {
        AreaKind::Road => tiles,
        AreaKind::Town => {
            let per_tile = if region.multiplier {
                PENNANT_TOWN_POINTS
            } else {
                TOWN_POINTS
            };
            let value = tiles * per_tile;
            if region.bonus {
                value * 2
            } else {
                value
            }
        }
        AreaKind::Cloister => region
            .anchor()
            .map(|pos| board.count_surrounding(pos) + 1)
            .unwrap_or(0),
        AreaKind::Meadow => 0,
    }
}

/// Whether a region is fully enclosed
pub fn is_complete(board: &Board, region: &Region) -> bool {
    match region.kind {
        AreaKind::Road | AreaKind::Town => region.open == 0,
        AreaKind::Cloister => region
            .anchor()
            .is_some_and(|pos| board.count_surrounding(pos) == 8),
        AreaKind::Meadow => false,
    }
}

/// Score every region finished by the tile just placed at `pos`.
///
/// `touched` are the canonical regions of the new tile. Cloisters on the
/// eight surrounding cells are checked too.
pub fn check_completions(
    board: &Board,
    regions: &mut RegionArena,
    players: &mut [Player],
    pos: Position,
    touched: &[RegionId],
) -> Result<Vec<GameEvent>, GameError> {
    let mut candidates: BTreeSet<RegionId> = touched
        .iter()
        .map(|id| regions.root(*id))
        .filter(|id| matches!(regions.get(*id).kind, AreaKind::Road | AreaKind::Town))
        .collect();

    for cell in std::iter::once(pos).chain(pos.surrounding()) {
        for id in regions.regions_at(cell) {
            if regions.get(id).kind == AreaKind::Cloister {
                candidates.insert(id);
            }
        }
    }

    let mut events = Vec::new();
    for id in candidates {
        let region = regions.get(id);
        if !regions.is_active(id) || region.finished || !is_complete(board, region) {
            continue;
        }
        regions.get_mut(id).finished = true;
        score_region(board, regions, players, id, &mut events)?;
    }
    Ok(events)
}

/// Award a road, town or cloister to its majority, pay the bishop bonus,
/// return the tokens and retire the region.
fn score_region(
    board: &Board,
    regions: &mut RegionArena,
    players: &mut [Player],
    id: RegionId,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let region = regions.get(id);
    let points = region_value(board, region);
    let winners = majority(&region.tokens);
    award(players, &winners, points)?;
    events.push(GameEvent::RegionScored {
        kind: region.kind,
        positions: region.positions.iter().copied().collect(),
        finished: region.finished,
        points,
        winners,
    });

    if region.kind == AreaKind::Town {
        let bishops = bishop_majority(&region.tokens);
        if !bishops.is_empty() {
            let cloisters = cloisters_near_town(regions, id);
            let points = cloisters as u32 * BISHOP_CLOISTER_POINTS;
            award(players, &bishops, points)?;
            events.push(GameEvent::BishopBonus {
                players: bishops,
                cloisters,
                points,
            });
        }
    }

    retire(regions, players, id, events)
}

/// Cloisters linked to any meadow that borders the town, whether or not
/// those cloisters are complete.
fn cloisters_near_town(regions: &RegionArena, town: RegionId) -> usize {
    let town = regions.root(town);
    let mut cloisters = BTreeSet::new();
    for (meadow, region) in regions.canonical() {
        if region.kind != AreaKind::Meadow {
            continue;
        }
        let linked = regions.linked(meadow);
        if !linked.contains(&town) {
            continue;
        }
        cloisters.extend(
            linked
                .into_iter()
                .filter(|id| regions.get(*id).kind == AreaKind::Cloister),
        );
    }
    cloisters.len()
}

fn award(players: &mut [Player], winners: &[PlayerId], points: u32) -> Result<(), GameError> {
    for &winner in winners {
        let player = players
            .get_mut(winner as usize)
            .ok_or(GameError::UnknownPlayer)?;
        player.score += points;
    }
    Ok(())
}

/// Give every token back to its owner and drop the region from the active list
fn retire(
    regions: &mut RegionArena,
    players: &mut [Player],
    id: RegionId,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let tokens = std::mem::take(&mut regions.get_mut(id).tokens);
    for token in &tokens {
        players
            .get_mut(token.owner as usize)
            .ok_or(GameError::UnknownPlayer)?
            .return_token(token.kind);
    }
    if !tokens.is_empty() {
        events.push(GameEvent::TokensReturned { tokens });
    }
    regions.deactivate(id);
    Ok(())
}

/// End-of-game sweep.
///
/// Every remaining road, town and cloister is scored by the usual majority
/// rule whether finished or not. Meadows then pay their holders for each
/// bordering town that was finished.
pub fn final_sweep(
    board: &Board,
    regions: &mut RegionArena,
    players: &mut [Player],
) -> Result<Vec<GameEvent>, GameError> {
    let mut events = Vec::new();

    let (meadows, others): (Vec<_>, Vec<_>) = regions
        .active()
        .into_iter()
        .partition(|id| regions.get(*id).kind == AreaKind::Meadow);

    for id in others {
        score_region(board, regions, players, id, &mut events)?;
    }

    for id in meadows {
        let finished_towns = regions
            .linked(id)
            .into_iter()
            .filter(|t| {
                let town = regions.get(*t);
                town.kind == AreaKind::Town && town.finished
            })
            .count() as u32;
        let region = regions.get(id);
        let points = finished_towns * MEADOW_TOWN_POINTS;
        let winners = majority(&region.tokens);
        award(players, &winners, points)?;
        events.push(GameEvent::RegionScored {
            kind: AreaKind::Meadow,
            positions: region.positions.iter().copied().collect(),
            finished: false,
            points,
            winners,
        });
        retire(regions, players, id, &mut events)?;
    }

    Ok(events)
}
