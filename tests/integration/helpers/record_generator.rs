//! Builders for record files used across integration tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;

/// Random records with a small id range and a small alphabet, so that equal
/// texts and shared prefixes are common.
pub fn random_records(count: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let id: u32 = rng.random_range(0..10_000);
            let len = rng.random_range(1..12);
            let text: String = (0..len)
                .map(|_| match rng.random_range(0..10) {
                    0 => ' ',
                    1 => 'É',
                    2..=5 => char::from(b'a' + rng.random_range(0..3u8)),
                    _ => char::from(b'A' + rng.random_range(0..3u8)),
                })
                .collect();
            format!("{id}. {text}")
        })
        .collect()
}

/// Write `lines` to `path`, each followed by `\n`.
pub fn write_lines(path: &Path, lines: &[String]) {
    let mut text = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    fs::write(path, text).expect("Failed to write record file");
}

/// Read `path` back as lines.
pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("Failed to read output file")
        .lines()
        .map(String::from)
        .collect()
}
