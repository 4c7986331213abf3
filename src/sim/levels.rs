//! Level catalog and grid layout
//!
//! Levels are rectangular grids of kind codes (see [`TargetKind::from_code`]).
//! In a grid, code `0` is a placeholder that resolves to a random common kind
//! when the level is built.

use std::path::Path;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{Target, TargetKind};
use crate::consts::NUM_TARGET_KINDS;
use crate::error::LevelError;
use crate::settings::Difficulty;

/// Built-in levels, top row first
const BUILTIN_LEVELS: &[&[&[u8]]] = &[
    &[
        &[7, 0, 0, 0, 4, 0, 0, 0, 0, 7],
        &[0, 0, 0, 0, 0, 3, 0, 0, 8, 0],
    ],
    &[
        &[0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0, 4, 0, 0, 6, 0, 0, 0],
        &[7, 0, 0, 0, 0, 7, 7, 0, 0, 3, 0, 7],
    ],
    &[
        &[0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0],
        &[0, 7, 0, 6, 0, 8, 0, 3, 0, 0, 0, 0, 7, 5],
        &[0, 0, 7, 6, 0, 0, 4, 0, 0, 0, 6, 7, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 7, 8, 0, 0, 0, 0, 3],
    ],
    &[
        &[0, 6, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 6, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0],
        &[8, 0, 0, 4, 0, 5, 0, 0, 0, 0, 5, 0, 6, 0, 0, 0],
        &[0, 0, 0, 0, 0, 7, 0, 3, 6, 0, 7, 0, 0, 0, 0, 0],
        &[5, 0, 0, 0, 0, 0, 7, 7, 7, 7, 0, 0, 0, 4, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 8],
    ],
    &[
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 7, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 6, 0, 0, 0, 0, 0, 5, 7, 0, 0, 4, 0, 0, 0, 0, 6, 0],
        &[0, 0, 0, 0, 6, 0, 0, 8, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 4, 0, 0, 6, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 8, 0, 0],
        &[0, 0, 0, 0, 7, 0, 0, 0, 0, 4, 7, 0, 6, 0, 0, 7, 0, 0, 0, 0],
        &[3, 0, 5, 7, 0, 0, 0, 0, 7, 7, 0, 6, 0, 0, 0, 0, 7, 4, 0, 0],
        &[0, 7, 7, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7, 7, 5],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    ],
    &[
        &[7, 0, 0, 0, 0, 0, 5, 0, 0, 4, 0, 0, 4, 0, 0, 5, 0, 0, 0, 0, 0, 7],
        &[0, 0, 7, 0, 6, 0, 0, 0, 0, 0, 8, 3, 0, 0, 0, 0, 0, 6, 0, 7, 0, 0],
        &[0, 4, 0, 0, 0, 6, 0, 0, 5, 0, 0, 0, 5, 0, 0, 6, 0, 0, 0, 4, 0, 0],
        &[0, 0, 0, 0, 0, 0, 7, 7, 7, 6, 0, 0, 6, 7, 7, 7, 0, 0, 0, 0, 0, 0],
        &[0, 0, 4, 0, 0, 0, 7, 0, 0, 4, 0, 8, 4, 0, 0, 7, 0, 0, 0, 4, 0, 0],
        &[0, 6, 0, 0, 7, 0, 0, 0, 6, 0, 7, 0, 0, 6, 0, 0, 7, 0, 0, 0, 6, 0],
        &[5, 0, 0, 7, 0, 0, 0, 8, 0, 0, 6, 0, 0, 0, 8, 0, 0, 7, 0, 0, 0, 5],
        &[0, 0, 0, 0, 0, 7, 0, 3, 6, 0, 7, 0, 6, 3, 0, 7, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 5, 0, 0, 0, 0, 4, 0, 0, 0, 4, 0, 0, 0, 0, 0, 5, 0, 0, 0],
        &[7, 0, 0, 0, 0, 6, 0, 0, 0, 8, 0, 0, 0, 8, 0, 0, 0, 6, 0, 0, 0, 7],
    ],
];

/// Ordered list of level grids, queried by 1-based index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelCatalog {
    levels: Vec<Vec<Vec<u8>>>,
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LevelCatalog {
    /// The six levels the game ships with
    pub fn builtin() -> Self {
        Self {
            levels: BUILTIN_LEVELS
                .iter()
                .map(|rows| rows.iter().map(|row| row.to_vec()).collect())
                .collect(),
        }
    }

    /// Build a catalog from raw grids, rejecting malformed data
    pub fn new(levels: Vec<Vec<Vec<u8>>>) -> Result<Self, LevelError> {
        let catalog = Self { levels };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let levels: Vec<Vec<Vec<u8>>> = serde_json::from_str(json)?;
        Self::new(levels)
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| LevelError::Parse(format!("{}: {e}", path.display())))?;
        let catalog = Self::from_json(&json)?;
        log::info!(
            "Loaded {} levels from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), LevelError> {
        if self.levels.is_empty() {
            return Err(LevelError::EmptyCatalog);
        }
        for n in 1..=self.len() {
            self.validate_level(n)?;
        }
        Ok(())
    }

    fn validate_level(&self, level: u32) -> Result<(), LevelError> {
        let rows = self.rows(level)?;
        let Some(first) = rows.first() else {
            return Err(LevelError::EmptyLevel { level });
        };
        let expected = first.len();
        for (row, cells) in rows.iter().enumerate() {
            if cells.is_empty() {
                return Err(LevelError::EmptyRow { level, row });
            }
            if cells.len() != expected {
                return Err(LevelError::RaggedRow {
                    level,
                    row,
                    expected,
                    found: cells.len(),
                });
            }
            if let Some((column, &code)) = cells
                .iter()
                .enumerate()
                .find(|(_, c)| **c as usize >= NUM_TARGET_KINDS)
            {
                return Err(LevelError::UnknownKind {
                    level,
                    row,
                    column,
                    code,
                });
            }
        }
        Ok(())
    }

    /// Number of levels
    pub fn len(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Raw rows of a 1-based level
    pub fn rows(&self, level: u32) -> Result<&[Vec<u8>], LevelError> {
        level
            .checked_sub(1)
            .and_then(|i| self.levels.get(i as usize))
            .map(Vec::as_slice)
            .ok_or(LevelError::NoSuchLevel {
                level,
                count: self.len(),
            })
    }

    /// Lay out and populate a level's targets
    pub fn build(
        &self,
        level: u32,
        difficulty: Difficulty,
        field: Vec2,
        ball_radius: f32,
        rng: &mut impl Rng,
    ) -> Result<(LevelLayout, Vec<Target>), LevelError> {
        self.validate_level(level)?;
        let rows = self.rows(level)?;
        let layout = LevelLayout::new(rows.len(), rows[0].len(), field, ball_radius);

        let mut targets = Vec::with_capacity(layout.rows * layout.columns);
        for (row, cells) in rows.iter().enumerate() {
            for (column, &code) in cells.iter().enumerate() {
                let kind = resolve_code(code, difficulty, rng).ok_or(LevelError::UnknownKind {
                    level,
                    row,
                    column,
                    code,
                })?;
                let id = (row * layout.columns + column) as u32;
                targets.push(Target::new(
                    id,
                    kind,
                    layout.center(row, column),
                    layout.target_size * 0.5,
                ));
            }
        }
        Ok((layout, targets))
    }
}

/// Turn a grid code into the kind this difficulty plays
///
/// Code `0` draws from the difficulty's placeholder table. Easy drops
/// indestructible and darkening targets, medium drops darkening, and both
/// swap control inversion for an extra life.
pub fn resolve_code(code: u8, difficulty: Difficulty, rng: &mut impl Rng) -> Option<TargetKind> {
    let code = if code == 0 {
        let table = difficulty.placeholder_codes();
        table[rng.random_range(0..table.len())]
    } else {
        match (difficulty, TargetKind::from_code(code)?) {
            (Difficulty::Easy, TargetKind::Indestructible | TargetKind::Darken) => 0,
            (Difficulty::Medium, TargetKind::Darken) => 0,
            (Difficulty::Easy | Difficulty::Medium, TargetKind::Invert) => {
                TargetKind::ExtraLife.code()
            }
            _ => code,
        }
    };
    TargetKind::from_code(code)
}

/// Per-level grid geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    pub rows: usize,
    pub columns: usize,
    /// Targets are square: `field_width / columns` on a side
    pub target_size: Vec2,
    /// Balls below this y skip target collision checks
    pub lowest_target_y: f32,
}

impl LevelLayout {
    pub fn new(rows: usize, columns: usize, field: Vec2, ball_radius: f32) -> Self {
        let side = field.x / columns.max(1) as f32;
        Self {
            rows,
            columns,
            target_size: Vec2::splat(side),
            lowest_target_y: side * rows as f32 + ball_radius * 2.0,
        }
    }

    /// Layout with no targets (before the first level is built)
    pub fn empty() -> Self {
        Self {
            rows: 0,
            columns: 0,
            target_size: Vec2::ZERO,
            lowest_target_y: 0.0,
        }
    }

    pub fn center(&self, row: usize, column: usize) -> Vec2 {
        self.target_size * 0.5
            + Vec2::new(
                column as f32 * self.target_size.x,
                row as f32 * self.target_size.y,
            )
    }

    /// Grid indices next to `index`: one left, one right, and the three
    /// above and three below. Edges do not wrap.
    pub fn neighbours(&self, index: usize) -> Vec<usize> {
        if self.columns == 0 || index >= self.rows * self.columns {
            return Vec::new();
        }
        let row = (index / self.columns) as isize;
        let col = (index % self.columns) as isize;
        let mut out = Vec::with_capacity(8);
        let offsets = [
            (0, -1),
            (0, 1),
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ];
        for (dr, dc) in offsets {
            let (r, c) = (row + dr, col + dc);
            if r >= 0 && c >= 0 && (r as usize) < self.rows && (c as usize) < self.columns {
                out.push(r as usize * self.columns + c as usize);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const FIELD: Vec2 = Vec2::new(1920.0, 1080.0);

    #[test]
    fn test_builtin_catalog_is_valid() {
        let c = LevelCatalog::builtin();
        assert_eq!(c.len(), 6);
        assert!(c.validate().is_ok());
        let sizes: Vec<(usize, usize)> = (1..=6)
            .map(|n| {
                let rows = c.rows(n).unwrap();
                (rows.len(), rows[0].len())
            })
            .collect();
        assert_eq!(sizes, vec![(2, 10), (3, 12), (4, 14), (6, 16), (8, 20), (10, 22)]);
    }

    #[test]
    fn test_no_such_level() {
        let c = LevelCatalog::builtin();
        assert_eq!(c.rows(0).unwrap_err(), LevelError::NoSuchLevel { level: 0, count: 6 });
        assert_eq!(c.rows(7).unwrap_err(), LevelError::NoSuchLevel { level: 7, count: 6 });
    }

    #[test]
    fn test_malformed_levels_rejected() {
        assert_eq!(LevelCatalog::new(vec![]).unwrap_err(), LevelError::EmptyCatalog);
        assert_eq!(
            LevelCatalog::new(vec![vec![]]).unwrap_err(),
            LevelError::EmptyLevel { level: 1 }
        );
        assert_eq!(
            LevelCatalog::new(vec![vec![vec![]]]).unwrap_err(),
            LevelError::EmptyRow { level: 1, row: 0 }
        );
        assert_eq!(
            LevelCatalog::new(vec![vec![vec![1, 2], vec![1]]]).unwrap_err(),
            LevelError::RaggedRow {
                level: 1,
                row: 1,
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            LevelCatalog::from_json("[[[1, 9]]]").unwrap_err(),
            LevelError::UnknownKind {
                level: 1,
                row: 0,
                column: 1,
                code: 9
            }
        );
        assert!(matches!(
            LevelCatalog::from_json("nope").unwrap_err(),
            LevelError::Parse(_)
        ));
    }

    #[test]
    fn test_difficulty_remaps() {
        let mut rng = Pcg32::seed_from_u64(3);
        let easy = Difficulty::Easy;
        let med = Difficulty::Medium;
        let hard = Difficulty::Hard;
        assert_eq!(resolve_code(7, easy, &mut rng), Some(TargetKind::Neutral));
        assert_eq!(resolve_code(4, easy, &mut rng), Some(TargetKind::Neutral));
        assert_eq!(resolve_code(5, easy, &mut rng), Some(TargetKind::ExtraLife));
        assert_eq!(resolve_code(7, med, &mut rng), Some(TargetKind::Indestructible));
        assert_eq!(resolve_code(4, med, &mut rng), Some(TargetKind::Neutral));
        assert_eq!(resolve_code(5, med, &mut rng), Some(TargetKind::ExtraLife));
        assert_eq!(resolve_code(4, hard, &mut rng), Some(TargetKind::Darken));
        assert_eq!(resolve_code(5, hard, &mut rng), Some(TargetKind::Invert));
        assert_eq!(resolve_code(6, easy, &mut rng), Some(TargetKind::Cascade));
        assert_eq!(resolve_code(12, hard, &mut rng), None);
    }

    #[test]
    fn test_placeholder_draws_common_kinds() {
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..200 {
            let kind = resolve_code(0, Difficulty::Hard, &mut rng).unwrap();
            assert!(matches!(
                kind,
                TargetKind::Neutral | TargetKind::BonusBall | TargetKind::BonusPaddle
            ));
        }
    }

    #[test]
    fn test_build_layout() {
        let c = LevelCatalog::builtin();
        let mut rng = Pcg32::seed_from_u64(5);
        let (layout, targets) = c.build(1, Difficulty::Hard, FIELD, 24.0, &mut rng).unwrap();
        assert_eq!(targets.len(), 20);
        assert_eq!(layout.target_size, Vec2::splat(192.0));
        assert_eq!(layout.lowest_target_y, 192.0 * 2.0 + 48.0);
        assert_eq!(targets[0].kind, TargetKind::Indestructible);
        assert_eq!(targets[0].center, Vec2::new(96.0, 96.0));
        assert_eq!(targets[15].kind, TargetKind::ExtraLife);
        assert_eq!(targets[15].center, Vec2::new(96.0 + 5.0 * 192.0, 96.0 + 192.0));
        assert!(targets.iter().enumerate().all(|(i, t)| t.id == i as u32));
    }

    #[test]
    fn test_neighbours_do_not_wrap() {
        let layout = LevelLayout::new(3, 4, FIELD, 10.0);
        // Middle of the grid: all eight
        let mut n = layout.neighbours(5);
        n.sort();
        assert_eq!(n, vec![0, 1, 2, 4, 6, 8, 9, 10]);
        // Right edge of row 0 must not reach the start of row 1's left side
        let mut n = layout.neighbours(3);
        n.sort();
        assert_eq!(n, vec![2, 6, 7]);
        // Left edge of row 1
        let mut n = layout.neighbours(4);
        n.sort();
        assert_eq!(n, vec![0, 1, 5, 8, 9]);
        assert!(layout.neighbours(99).is_empty());
    }
}
