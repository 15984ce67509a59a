// src/utils/sampling.rs

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::storage::table::Table;

/// Random subset of rows for a trial run, kept in original row order.
/// Returns the sampled table and the original index of each kept row.
pub fn sample_rows(table: &Table, size: usize, seed: Option<u64>) -> (Table, Vec<usize>) {
    if size >= table.len() {
        info!(
            "🎲 Sample size {} covers the whole roster ({} rows)",
            size,
            table.len()
        );
        return (table.clone(), (0..table.len()).collect());
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut picked = rand::seq::index::sample(&mut rng, table.len(), size).into_vec();
    picked.sort_unstable();

    let mut sampled = Table::new(table.headers.clone());
    for &row in &picked {
        sampled.push_row(table.rows[row].clone());
    }
    info!(
        "🎲 Sampled {} of {} rows{}",
        size,
        table.len(),
        seed.map(|s| format!(" (seed {})", s)).unwrap_or_default()
    );
    (sampled, picked)
}
