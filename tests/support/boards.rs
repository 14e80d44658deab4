//! Random but valid Voltorb Flip boards written as training rows.

use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub const HEADER: &str = "Level(1), Voltorb Numbers(20), Board State(25)";

const VOLTORB: u8 = 1;
const UNKNOWN: f32 = -1.0;

/// One generated board as a 71-value row.
pub struct Board {
    pub level: u8,
    pub hints: [u32; 20],
    pub known: [f32; 25],
    pub full: [u8; 25],
}

impl Board {
    pub fn row(&self) -> Vec<f32> {
        let mut row = Vec::with_capacity(71);
        row.push(self.level as f32);
        row.extend(self.hints.iter().map(|&h| h as f32));
        row.extend_from_slice(&self.known);
        row.extend(self.full.iter().map(|&v| v as f32));
        row
    }
}

/// Deterministic board source; the level cycles through 1..=8 by index.
pub struct BoardGenerator {
    rng: StdRng,
    generated: usize,
}

impl BoardGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            generated: 0,
        }
    }

    pub fn generate(&mut self) -> Board {
        let level = (self.generated % 8) as u8 + 1;
        self.generated += 1;

        let voltorbs = 6 + (level as usize).min(5);
        let twos = self.rng.random_range(0..=4usize);
        let threes = self.rng.random_range(0..=3usize);

        let mut cells: Vec<usize> = (0..25).collect();
        cells.shuffle(&mut self.rng);
        let mut full = [0u8; 25];
        let mut placed = cells.iter();
        for (value, count) in [(VOLTORB, voltorbs), (2, twos), (3, threes)] {
            for &cell in placed.by_ref().take(count) {
                full[cell] = value;
            }
        }

        let mut hints = [0u32; 20];
        for (cell, &value) in full.iter().enumerate() {
            let (row, col) = (cell / 5, cell % 5);
            let (points, volts) = match value {
                VOLTORB => (0, 1),
                0 => (1, 0),
                v => (v as u32, 0),
            };
            hints[2 * row] += points;
            hints[2 * row + 1] += volts;
            hints[10 + 2 * col] += points;
            hints[10 + 2 * col + 1] += volts;
        }

        let mut known = full.map(|v| if v == VOLTORB { UNKNOWN } else { v as f32 });
        let blocked = self.rng.random_range(0..25 - voltorbs);
        cells.shuffle(&mut self.rng);
        for &cell in cells.iter().take(blocked) {
            known[cell] = UNKNOWN;
        }

        Board {
            level,
            hints,
            known,
            full,
        }
    }
}

/// Write `count` boards as a tab-separated file with a text header line.
pub fn write_board_file(path: &Path, count: usize, seed: u64) {
    let mut generator = BoardGenerator::new(seed);
    let mut text = format!("{HEADER}\r\n");
    for _ in 0..count {
        let row = generator.generate().row();
        let fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        text.push_str(&fields.join("\t"));
        text.push_str("\r\n");
    }
    std::fs::write(path, text).expect("write board file");
}
