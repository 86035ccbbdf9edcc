//! Tile definitions and the tile catalog.
//!
//! Each tile is split into areas (meadows, roads, towns, cloisters). Every
//! side of a tile is described by three slots, each naming the area that
//! touches the boundary there. Slots run clockwise around the tile, so for
//! the north edge they go west to east and for the south edge east to west.
//! Two facing edges therefore line up with their slot order reversed.

use crate::position::Direction;
use serde::{Deserialize, Serialize};

/// Index of an area within one tile
pub type AreaIndex = u8;

/// The kind of landscape an area shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaKind {
    Meadow,
    Road,
    Town,
    Cloister,
}

/// One contiguous area printed on a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub kind: AreaKind,
    /// Towns and cloisters this area borders on the same tile (meadows only)
    pub adjacent: &'static [AreaIndex],
}

const fn meadow(adjacent: &'static [AreaIndex]) -> Area {
    Area {
        kind: AreaKind::Meadow,
        adjacent,
    }
}

const ROAD: Area = Area {
    kind: AreaKind::Road,
    adjacent: &[],
};

const TOWN: Area = Area {
    kind: AreaKind::Town,
    adjacent: &[],
};

const CLOISTER: Area = Area {
    kind: AreaKind::Cloister,
    adjacent: &[],
};

/// Printed layout of a tile type, in its unrotated orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileDefinition {
    pub areas: &'static [Area],
    /// Edge slots in N, W, S, E order
    pub edges: [[AreaIndex; 3]; 4],
    /// Town pennant: raises the per-tile town value
    pub multiplier: bool,
    /// Doubles the value of the town it belongs to
    pub bonus: bool,
}

const fn def(areas: &'static [Area], edges: [[AreaIndex; 3]; 4]) -> TileDefinition {
    TileDefinition {
        areas,
        edges,
        multiplier: false,
        bonus: false,
    }
}

const fn pennant(areas: &'static [Area], edges: [[AreaIndex; 3]; 4]) -> TileDefinition {
    TileDefinition {
        areas,
        edges,
        multiplier: true,
        bonus: false,
    }
}

/// Tile types of the base set plus the cathedral extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Cathedral,
}

const ALL_MEADOW: [AreaIndex; 3] = [0, 0, 0];
const ALL_TOWN: [AreaIndex; 3] = [0, 0, 0];

const CLOISTER_ROAD_AREAS: &[Area] = &[meadow(&[1]), CLOISTER, ROAD];
const CLOISTER_AREAS: &[Area] = &[meadow(&[1]), CLOISTER];
const TOWN_ONLY_AREAS: &[Area] = &[TOWN];
const TOWN_MEADOW_AREAS: &[Area] = &[TOWN, meadow(&[0])];
const TOWN_ROAD_AREAS: &[Area] = &[TOWN, meadow(&[0]), ROAD, meadow(&[])];
const TOWN_BAND_AREAS: &[Area] = &[meadow(&[1]), TOWN, meadow(&[1])];
const TOWN_SPLIT_AREAS: &[Area] = &[TOWN, meadow(&[0]), meadow(&[0])];
const TWO_TOWNS_AREAS: &[Area] = &[TOWN, TOWN, meadow(&[0, 1])];
const TOWN_EAST_ROAD_AREAS: &[Area] = &[TOWN, meadow(&[]), ROAD, meadow(&[0])];
const TOWN_CROSSING_AREAS: &[Area] = &[
    TOWN,
    meadow(&[0]),
    ROAD,
    ROAD,
    ROAD,
    meadow(&[]),
    meadow(&[]),
];
const TOWN_GATE_AREAS: &[Area] = &[TOWN, meadow(&[0]), ROAD, meadow(&[0])];
const ROAD_AREAS: &[Area] = &[meadow(&[]), ROAD, meadow(&[])];
const JUNCTION_AREAS: &[Area] = &[meadow(&[]), ROAD, ROAD, ROAD, meadow(&[]), meadow(&[])];
const CROSSING_AREAS: &[Area] = &[
    meadow(&[]),
    meadow(&[]),
    meadow(&[]),
    meadow(&[]),
    ROAD,
    ROAD,
    ROAD,
    ROAD,
];

// Cloister with a road leaving south
const DEF_A: TileDefinition = def(
    CLOISTER_ROAD_AREAS,
    [ALL_MEADOW, ALL_MEADOW, [0, 2, 0], ALL_MEADOW],
);
// Cloister in a meadow
const DEF_B: TileDefinition = def(CLOISTER_AREAS, [ALL_MEADOW; 4]);
// Town on all four sides
const DEF_C: TileDefinition = pennant(TOWN_ONLY_AREAS, [ALL_TOWN; 4]);
// Town north, straight road west to east
const DEF_D: TileDefinition = def(
    TOWN_ROAD_AREAS,
    [ALL_TOWN, [3, 2, 1], [3, 3, 3], [1, 2, 3]],
);
// Town north
const DEF_E: TileDefinition = def(
    TOWN_MEADOW_AREAS,
    [ALL_TOWN, [1, 1, 1], [1, 1, 1], [1, 1, 1]],
);
// Town band west to east
const DEF_F: TileDefinition = pennant(
    TOWN_BAND_AREAS,
    [[0, 0, 0], [1, 1, 1], [2, 2, 2], [1, 1, 1]],
);
// Town band north to south
const DEF_G: TileDefinition = def(
    TOWN_SPLIT_AREAS,
    [ALL_TOWN, [1, 1, 1], ALL_TOWN, [2, 2, 2]],
);
// Separate towns west and east
const DEF_H: TileDefinition = def(
    TWO_TOWNS_AREAS,
    [[2, 2, 2], [0, 0, 0], [2, 2, 2], [1, 1, 1]],
);
// Separate towns north and west
const DEF_I: TileDefinition = def(
    TWO_TOWNS_AREAS,
    [[0, 0, 0], [1, 1, 1], [2, 2, 2], [2, 2, 2]],
);
// Town north, road curving east to south
const DEF_J: TileDefinition = def(
    TOWN_ROAD_AREAS,
    [ALL_TOWN, [1, 1, 1], [3, 2, 1], [1, 2, 3]],
);
// Town east, road curving north to west
const DEF_K: TileDefinition = def(
    TOWN_EAST_ROAD_AREAS,
    [[1, 2, 3], [3, 2, 1], [3, 3, 3], ALL_TOWN],
);
// Town north, three roads meeting in a crossing
const DEF_L: TileDefinition = def(
    TOWN_CROSSING_AREAS,
    [ALL_TOWN, [5, 2, 1], [6, 3, 5], [1, 4, 6]],
);
// Town across the north-west corner
const CORNER_TOWN: [[AreaIndex; 3]; 4] = [ALL_TOWN, ALL_TOWN, [1, 1, 1], [1, 1, 1]];
const DEF_M: TileDefinition = pennant(TOWN_MEADOW_AREAS, CORNER_TOWN);
const DEF_N: TileDefinition = def(TOWN_MEADOW_AREAS, CORNER_TOWN);
// Corner town with a road curving south to east
const CORNER_TOWN_ROAD: [[AreaIndex; 3]; 4] = [ALL_TOWN, ALL_TOWN, [3, 2, 1], [1, 2, 3]];
const DEF_O: TileDefinition = pennant(TOWN_ROAD_AREAS, CORNER_TOWN_ROAD);
const DEF_P: TileDefinition = def(TOWN_ROAD_AREAS, CORNER_TOWN_ROAD);
// Town on three sides, meadow south
const THREE_SIDED: [[AreaIndex; 3]; 4] = [ALL_TOWN, ALL_TOWN, [1, 1, 1], ALL_TOWN];
const DEF_Q: TileDefinition = pennant(TOWN_MEADOW_AREAS, THREE_SIDED);
const DEF_R: TileDefinition = def(TOWN_MEADOW_AREAS, THREE_SIDED);
// Town on three sides, road ending at the gate
const THREE_SIDED_GATE: [[AreaIndex; 3]; 4] = [ALL_TOWN, ALL_TOWN, [3, 2, 1], ALL_TOWN];
const DEF_S: TileDefinition = pennant(TOWN_GATE_AREAS, THREE_SIDED_GATE);
const DEF_T: TileDefinition = def(TOWN_GATE_AREAS, THREE_SIDED_GATE);
// Straight road north to south
const DEF_U: TileDefinition = def(
    ROAD_AREAS,
    [[0, 1, 2], ALL_MEADOW, [2, 1, 0], [2, 2, 2]],
);
// Road curving west to south
const DEF_V: TileDefinition = def(
    ROAD_AREAS,
    [ALL_MEADOW, [2, 1, 0], [0, 1, 2], ALL_MEADOW],
);
// Three roads meeting, meadow north
const DEF_W: TileDefinition = def(
    JUNCTION_AREAS,
    [ALL_MEADOW, [4, 1, 0], [5, 2, 4], [0, 3, 5]],
);
// Four roads meeting
const DEF_X: TileDefinition = def(
    CROSSING_AREAS,
    [[0, 4, 1], [3, 5, 0], [2, 6, 3], [1, 7, 2]],
);
const DEF_CATHEDRAL: TileDefinition = TileDefinition {
    areas: TOWN_ONLY_AREAS,
    edges: [ALL_TOWN; 4],
    multiplier: false,
    bonus: true,
};

impl TileKind {
    /// Base set composition (72 tiles, the starting tile included)
    pub const BASE_SET: [(TileKind, usize); 24] = [
        (TileKind::A, 2),
        (TileKind::B, 4),
        (TileKind::C, 1),
        (TileKind::D, 4),
        (TileKind::E, 5),
        (TileKind::F, 2),
        (TileKind::G, 1),
        (TileKind::H, 3),
        (TileKind::I, 2),
        (TileKind::J, 3),
        (TileKind::K, 3),
        (TileKind::L, 3),
        (TileKind::M, 2),
        (TileKind::N, 3),
        (TileKind::O, 2),
        (TileKind::P, 3),
        (TileKind::Q, 1),
        (TileKind::R, 3),
        (TileKind::S, 2),
        (TileKind::T, 1),
        (TileKind::U, 8),
        (TileKind::V, 9),
        (TileKind::W, 4),
        (TileKind::X, 1),
    ];

    /// Copies of the cathedral tile added by the cathedral extension
    pub const CATHEDRAL_COUNT: usize = 2;

    /// The tile every game starts with
    pub const STARTING: TileKind = TileKind::D;

    pub fn definition(self) -> &'static TileDefinition {
        match self {
            TileKind::A => &DEF_A,
            TileKind::B => &DEF_B,
            TileKind::C => &DEF_C,
            TileKind::D => &DEF_D,
            TileKind::E => &DEF_E,
            TileKind::F => &DEF_F,
            TileKind::G => &DEF_G,
            TileKind::H => &DEF_H,
            TileKind::I => &DEF_I,
            TileKind::J => &DEF_J,
            TileKind::K => &DEF_K,
            TileKind::L => &DEF_L,
            TileKind::M => &DEF_M,
            TileKind::N => &DEF_N,
            TileKind::O => &DEF_O,
            TileKind::P => &DEF_P,
            TileKind::Q => &DEF_Q,
            TileKind::R => &DEF_R,
            TileKind::S => &DEF_S,
            TileKind::T => &DEF_T,
            TileKind::U => &DEF_U,
            TileKind::V => &DEF_V,
            TileKind::W => &DEF_W,
            TileKind::X => &DEF_X,
            TileKind::Cathedral => &DEF_CATHEDRAL,
        }
    }
}

/// A tile with an orientation.
///
/// `rotation` counts counter-clockwise quarter turns (0-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub rotation: u8,
}

impl Tile {
    pub const fn new(kind: TileKind) -> Self {
        Self { kind, rotation: 0 }
    }

    /// The same tile turned to an absolute rotation
    pub const fn rotated(self, rotation: u8) -> Self {
        Self {
            kind: self.kind,
            rotation: rotation % 4,
        }
    }

    pub fn definition(&self) -> &'static TileDefinition {
        self.kind.definition()
    }

    pub fn areas(&self) -> &'static [Area] {
        self.definition().areas
    }

    pub fn area_count(&self) -> usize {
        self.areas().len()
    }

    pub fn area_kind(&self, area: AreaIndex) -> Option<AreaKind> {
        self.areas().get(area as usize).map(|a| a.kind)
    }

    /// Area slots along one side, taking the rotation into account
    pub fn edge(&self, side: Direction) -> [AreaIndex; 3] {
        let base = (side.index() + 4 - self.rotation as usize % 4) % 4;
        self.definition().edges[base]
    }

    /// Area kinds along one side, in slot order
    pub fn edge_kinds(&self, side: Direction) -> [AreaKind; 3] {
        self.edge(side).map(|a| self.areas()[a as usize].kind)
    }

    /// Number of sides whose middle slot belongs to `area`
    ///
    /// Rotation does not change it, so the printed layout is used.
    pub fn edges_reached(&self, area: AreaIndex) -> u32 {
        self.definition()
            .edges
            .iter()
            .filter(|slots| slots[1] == area)
            .count() as u32
    }

    /// Whether a road stops on this tile (at a cloister, a crossing or a town gate).
    pub fn road_has_end(&self, area: AreaIndex) -> bool {
        self.edges_reached(area) == 1
    }

    /// Open ends a fresh road region starts with: one if the road stops
    /// here, otherwise one per side it leaves through.
    pub fn road_open_ends(&self, area: AreaIndex) -> u32 {
        self.edges_reached(area)
    }

    /// Open edges a fresh town region starts with
    pub fn town_open_edges(&self, area: AreaIndex) -> u32 {
        self.edges_reached(area)
    }
}
