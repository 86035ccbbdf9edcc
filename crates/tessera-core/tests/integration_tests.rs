//! Integration tests for the Tessera rules engine.
//!
//! These tests drive the placement and scoring engines through whole
//! sequences of moves and check the region bookkeeping and scores.

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeSet;
use tessera_core::placement::lay_tile;
use tessera_core::scoring::{check_completions, final_sweep};
use tessera_core::*;

fn players(n: u8) -> Vec<Player> {
    (0..n)
        .map(|i| Player::new(i, format!("p{}", i), DEFAULT_TOKENS))
        .collect()
}

/// Lay a tile without edge checks and score what it completes
fn lay(
    board: &mut Board,
    regions: &mut RegionArena,
    players: &mut [Player],
    pos: Position,
    tile: Tile,
) -> Vec<GameEvent> {
    let touched = lay_tile(board, regions, pos, tile).unwrap();
    check_completions(board, regions, players, pos, &touched).unwrap()
}

fn claim(regions: &mut RegionArena, players: &mut [Player], pos: Position, area: AreaIndex, owner: PlayerId, kind: TokenKind) {
    let region = regions.region_at(pos, area).unwrap();
    regions.add_token(
        region,
        Token {
            owner,
            kind,
            position: pos,
            area,
        },
    );
    players[owner as usize].take_token(kind);
}

fn game_with(tiles: Vec<Tile>, config: GameConfig, seats: u8) -> GameState {
    let mut game = GameState::new("integration".to_string(), config);
    for i in 0..seats {
        game.add_player(format!("p{}", i)).unwrap();
    }
    game.start_with_deck(Deck::from_tiles(tiles)).unwrap();
    game
}

fn assert_every_area_mapped(game: &GameState) {
    for (pos, tile) in game.board.tiles() {
        let ids = game.regions.regions_at(*pos);
        assert_eq!(ids.len(), tile.area_count(), "tile at {} lost an area", pos);
        for area in 0..tile.area_count() {
            let id = game.regions.region_at(*pos, area as AreaIndex).unwrap();
            let region = game.regions.get(id);
            assert!(region.positions.contains(pos));
            assert_eq!(Some(region.kind), tile.area_kind(area as AreaIndex));
        }
    }
}

#[test]
fn test_random_games_keep_every_area_mapped_and_return_tokens() {
    for seed in 0..4 {
        let mut rng = StdRng::seed_from_u64(seed);
        let config = GameConfig {
            capabilities: BTreeSet::from([Capability::DoubleToken, Capability::Cathedral]),
            ..GameConfig::default()
        };
        let mut game = GameState::new("random".to_string(), config);
        for i in 0..3 {
            game.add_player(format!("p{}", i)).unwrap();
        }
        game.start(&mut rng).unwrap();

        loop {
            let turn = match game.next_turn(&mut rng) {
                Ok(turn) => turn,
                Err(GameError::DeckExhaustedDuringDraw) => break,
                Err(e) => panic!("unexpected draw error: {}", e),
            };
            let mut placements = game.board.legal_placements(&turn.tile);
            assert!(!placements.is_empty());
            placements.shuffle(&mut rng);
            let (pos, rotation) = placements[0];

            let kind = if game.turn_number % 5 == 0 {
                TokenKind::Double
            } else {
                TokenKind::Normal
            };
            let token = Some(TokenPlacement { area: 0, kind });
            if game.place_tile(turn.player, pos, rotation, token).is_err() {
                game.place_tile(turn.player, pos, rotation, None).unwrap();
            }
            assert_every_area_mapped(&game);
        }

        let events = game.final_sweep().unwrap();
        assert!(matches!(
            events.last(),
            Some(GameEvent::GameEnded {
                reason: EndReason::DeckExhausted,
                ..
            })
        ));
        assert_eq!(game.status, GameStatus::Ended);
        assert!(game.regions.active().is_empty());
        for player in &game.players {
            assert_eq!(player.tokens_remaining, DEFAULT_TOKENS);
            assert!(!player.double_in_use);
        }
    }
}

#[test]
fn test_completed_road_scores_distinct_tiles() {
    // Start tile road runs west-east; cloister roads cap both ends
    let cap_east = Tile::new(TileKind::A);
    let cap_west = Tile::new(TileKind::A);
    let mut game = game_with(vec![cap_west, cap_east], GameConfig::default(), 2);
    let mut rng = StdRng::seed_from_u64(0);

    game.next_turn(&mut rng).unwrap();
    let on_road = Some(TokenPlacement {
        area: 2,
        kind: TokenKind::Normal,
    });
    let events = game.place_tile(0, Position::new(1, 0), 3, on_road).unwrap();
    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::RegionScored { .. })));

    game.next_turn(&mut rng).unwrap();
    let events = game.place_tile(1, Position::new(-1, 0), 1, None).unwrap();
    let scored: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::RegionScored {
                kind: AreaKind::Road,
                positions,
                points,
                winners,
                ..
            } => Some((positions.len(), *points, winners.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(scored, vec![(3, 3, vec![0])]);
    assert_eq!(game.players[0].score, 3);
    assert_eq!(game.players[0].tokens_remaining, DEFAULT_TOKENS);
}

#[test]
fn test_cloister_completes_only_when_surrounded_in_any_order() {
    let ring = Position::ORIGIN.surrounding();
    let orders: Vec<Vec<Position>> = vec![
        ring.to_vec(),
        ring.iter().rev().copied().collect(),
        vec![ring[4], ring[0], ring[7], ring[2], ring[5], ring[1], ring[6], ring[3]],
    ];

    for order in orders {
        let mut board = Board::new();
        let mut regions = RegionArena::new();
        let mut ps = players(2);
        lay(&mut board, &mut regions, &mut ps, Position::ORIGIN, Tile::new(TileKind::B));
        claim(&mut regions, &mut ps, Position::ORIGIN, 1, 1, TokenKind::Normal);

        for (i, pos) in order.iter().enumerate() {
            let events = lay(&mut board, &mut regions, &mut ps, *pos, Tile::new(TileKind::B));
            let cloister_scored = events.iter().any(|e| {
                matches!(
                    e,
                    GameEvent::RegionScored {
                        kind: AreaKind::Cloister,
                        points: 9,
                        ..
                    }
                )
            });
            assert_eq!(cloister_scored, i == 7, "after {} neighbours", i + 1);
        }
        assert_eq!(ps[1].score, 9);
    }
}

#[test]
fn test_tied_town_majority_pays_everyone_tied() {
    let mut board = Board::new();
    let mut regions = RegionArena::new();
    let mut ps = players(3);

    let west = Position::new(0, 0);
    let east = Position::new(2, 0);
    let north = Position::new(1, 1);
    let south = Position::new(1, -1);
    lay(&mut board, &mut regions, &mut ps, west, Tile::new(TileKind::E).rotated(3));
    lay(&mut board, &mut regions, &mut ps, east, Tile::new(TileKind::E).rotated(1));
    lay(&mut board, &mut regions, &mut ps, north, Tile::new(TileKind::E).rotated(2));
    lay(&mut board, &mut regions, &mut ps, south, Tile::new(TileKind::E));
    claim(&mut regions, &mut ps, west, 0, 0, TokenKind::Double);
    claim(&mut regions, &mut ps, east, 0, 1, TokenKind::Normal);
    claim(&mut regions, &mut ps, north, 0, 1, TokenKind::Normal);
    claim(&mut regions, &mut ps, south, 0, 2, TokenKind::Normal);

    let events = lay(
        &mut board,
        &mut regions,
        &mut ps,
        Position::new(1, 0),
        Tile::new(TileKind::C),
    );

    // Five tiles with a pennant: 5 * 3
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::RegionScored {
            kind: AreaKind::Town,
            points: 15,
            ..
        }
    )));
    assert_eq!(ps[0].score, 15);
    assert_eq!(ps[1].score, 15);
    assert_eq!(ps[2].score, 0);
    assert!(!ps[0].double_in_use);
    assert_eq!(ps[1].tokens_remaining, DEFAULT_TOKENS);
}

#[test]
fn test_corner_town_needs_both_caps() {
    let mut board = Board::new();
    let mut regions = RegionArena::new();
    let mut ps = players(2);

    // Town fills the north and west sides of the corner tile
    lay(&mut board, &mut regions, &mut ps, Position::ORIGIN, Tile::new(TileKind::N));
    claim(&mut regions, &mut ps, Position::ORIGIN, 0, 0, TokenKind::Normal);

    let north_cap = Tile::new(TileKind::E).rotated(2);
    let events = lay(&mut board, &mut regions, &mut ps, Position::new(0, 1), north_cap);
    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::RegionScored { kind: AreaKind::Town, .. })));
    let town = regions.region_at(Position::ORIGIN, 0).unwrap();
    assert_eq!(regions.get(town).open, 1);
    assert!(!regions.get(town).finished);

    let west_cap = Tile::new(TileKind::E).rotated(3);
    let events = lay(&mut board, &mut regions, &mut ps, Position::new(-1, 0), west_cap);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::RegionScored {
            kind: AreaKind::Town,
            finished: true,
            points: 6,
            ..
        }
    )));
    assert_eq!(ps[0].score, 6);
    assert_eq!(ps[0].tokens_remaining, DEFAULT_TOKENS);
}

#[test]
fn test_meadow_scores_only_finished_towns() {
    let mut board = Board::new();
    let mut regions = RegionArena::new();
    let mut ps = players(2);

    // Two separate towns west and east with a meadow between them
    lay(&mut board, &mut regions, &mut ps, Position::ORIGIN, Tile::new(TileKind::H));
    claim(&mut regions, &mut ps, Position::ORIGIN, 2, 0, TokenKind::Normal);
    // Cap the west town only
    let events = lay(
        &mut board,
        &mut regions,
        &mut ps,
        Position::new(-1, 0),
        Tile::new(TileKind::E).rotated(3),
    );
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::RegionScored {
            kind: AreaKind::Town,
            finished: true,
            ..
        }
    )));

    let events = final_sweep(&board, &mut regions, &mut ps).unwrap();
    let meadow_points: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::RegionScored {
                kind: AreaKind::Meadow,
                points,
                winners,
                ..
            } if !winners.is_empty() => Some(*points),
            _ => None,
        })
        .collect();
    assert_eq!(meadow_points, vec![3]);
    assert_eq!(ps[0].score, 3);
    assert_eq!(ps[0].tokens_remaining, DEFAULT_TOKENS);
}

#[test]
fn test_bishop_bonus_counts_unfinished_cloisters() {
    let mut board = Board::new();
    let mut regions = RegionArena::new();
    let mut ps = players(2);

    // Town north with a meadow that reaches a cloister to the east
    lay(&mut board, &mut regions, &mut ps, Position::ORIGIN, Tile::new(TileKind::E));
    lay(&mut board, &mut regions, &mut ps, Position::new(1, 0), Tile::new(TileKind::B));
    claim(&mut regions, &mut ps, Position::ORIGIN, 0, 0, TokenKind::Normal);
    let town = regions.region_at(Position::ORIGIN, 0).unwrap();
    regions.add_token(
        town,
        Token {
            owner: 1,
            kind: TokenKind::Bishop,
            position: Position::ORIGIN,
            area: 0,
        },
    );
    ps[1].take_token(TokenKind::Bishop);

    let events = lay(
        &mut board,
        &mut regions,
        &mut ps,
        Position::new(0, 1),
        Tile::new(TileKind::E).rotated(2),
    );
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::BishopBonus {
            cloisters: 1,
            points: 4,
            ..
        }
    )));
    // Town of two tiles to the token holder, cloister bonus to the bishop
    assert_eq!(ps[0].score, 4);
    assert_eq!(ps[1].score, 4);
    assert!(!ps[1].bishop_in_use);
}

#[test]
fn test_region_membership_is_order_independent() {
    // A strip of meadow tiles south of the start, laid in two orders
    let orders = [
        [Position::new(0, -1), Position::new(1, -1), Position::new(-1, -1)],
        [Position::new(0, -1), Position::new(-1, -1), Position::new(1, -1)],
    ];
    let mut memberships = Vec::new();
    for order in orders {
        let mut game = game_with(
            vec![Tile::new(TileKind::B); 3],
            GameConfig::default(),
            2,
        );
        let mut rng = StdRng::seed_from_u64(0);
        for pos in order {
            let turn = game.next_turn(&mut rng).unwrap();
            game.place_tile(turn.player, pos, 0, None).unwrap();
        }
        let membership: BTreeSet<_> = game
            .regions
            .canonical()
            .map(|(_, r)| (format!("{:?}", r.kind), r.positions.clone()))
            .collect();
        memberships.push(membership);
    }
    assert_eq!(memberships[0], memberships[1]);
}

#[test]
fn test_state_survives_serialization() {
    let game = game_with(vec![Tile::new(TileKind::U)], GameConfig::default(), 2);
    let json = serde_json::to_string(&game).unwrap();
    let back: GameState = serde_json::from_str(&json).unwrap();
    assert_eq!(back.board.len(), 1);
    assert_eq!(back.status, GameStatus::Ongoing);
}
