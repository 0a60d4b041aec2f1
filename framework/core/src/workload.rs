use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::record::{Price, Record};

/// Product categories. Kept small so that grouping queries return a handful of buckets.
const CATEGORIES: &[&str] = &[
    "Books", "Garden", "Home", "Kitchen", "Music", "Office", "Outdoor", "Sports", "Tools", "Toys",
];

const WORDS: &[&str] = &[
    "amber", "anchor", "arrow", "atlas", "basin", "beacon", "birch", "blade", "bloom", "breeze",
    "bridge", "canvas", "cedar", "cinder", "cloud", "comet", "copper", "coral", "crest", "delta",
    "ember", "falcon", "fern", "field", "flint", "forest", "frost", "glacier", "granite", "harbor",
    "hazel", "horizon", "island", "ivory", "jade", "juniper", "lantern", "lark", "lotus", "maple",
    "meadow", "mesa", "onyx", "orbit", "pebble", "pine", "prairie", "quartz", "raven", "reef",
    "ridge", "river", "sable", "sierra", "slate", "spruce", "summit", "thistle", "timber", "willow",
];

/// Upper bound of generated prices, in cents: 999.99.
const MAX_PRICE_CENTS: u32 = 99_999;

/// Produces synthetic [Record]s.
///
/// Every call draws fresh random content but the shape and field ranges never change:
/// prices are in `0.01..=999.99` with two decimals and ids are nanoids (about 126 random bits),
/// so ids within one call are unique with overwhelming probability.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkloadGenerator;

impl WorkloadGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate exactly `count` records using the thread-local RNG.
    pub fn generate(&self, count: usize) -> Vec<Record> {
        self.generate_with(&mut rand::thread_rng(), count)
    }

    /// Generate exactly `count` records drawing content from `rng`.
    ///
    /// Ids always come from the nanoid generator so that a seeded `rng` cannot produce
    /// colliding ids across calls.
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Record> {
        (0..count).map(|_| Self::record(rng)).collect()
    }

    /// Generate `total` records split into disjoint shards, one per worker.
    ///
    /// See [split_into_shards] for how the records are divided.
    pub fn generate_shards(&self, total: usize, workers: usize) -> Vec<Arc<[Record]>> {
        split_into_shards(self.generate(total), workers)
    }

    fn record<R: Rng + ?Sized>(rng: &mut R) -> Record {
        let cents = rng.gen_range(1..=MAX_PRICE_CENTS);

        Record {
            id: nanoid::nanoid!(),
            name: format!("{} {}", title_case(pick(rng, WORDS)), title_case(pick(rng, WORDS))),
            price: Price::at_least_one_cent(cents),
            category: pick(rng, CATEGORIES).to_string(),
        }
    }
}

/// Split `records` into `workers` disjoint shards of near equal size.
///
/// The first `len % workers` shards hold one extra record. There are never more shards than
/// records, and never fewer than one.
pub fn split_into_shards(records: Vec<Record>, workers: usize) -> Vec<Arc<[Record]>> {
    let shards = workers.clamp(1, records.len().max(1));
    let base = records.len() / shards;
    let extra = records.len() % shards;

    let mut remaining = records.into_iter();
    (0..shards)
        .map(|shard| {
            let size = base + usize::from(shard < extra);
            Arc::from(remaining.by_ref().take(size).collect::<Vec<_>>())
        })
        .collect()
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, words: &[&'a str]) -> &'a str {
    words.choose(rng).copied().unwrap_or("item")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn generates_exact_count_with_valid_prices() {
        let generator = WorkloadGenerator::new();
        let mut rng = StdRng::seed_from_u64(7);

        for count in [0, 1, 17, 500] {
            let records = generator.generate_with(&mut rng, count);
            assert_eq!(count, records.len());

            for record in &records {
                let price = record.price.as_f64();
                assert!(price > 0.0, "price must be positive: {price}");
                assert!(price <= 999.99);
                assert_eq!((price * 100.0).round() / 100.0, price);
            }
        }
    }

    #[test]
    fn ids_are_unique_within_a_call() {
        let records = WorkloadGenerator::new().generate(5_000);
        let ids = records.iter().map(|r| r.id.as_str()).collect::<HashSet<_>>();
        assert_eq!(records.len(), ids.len());
    }

    #[test]
    fn names_and_categories_have_expected_shape() {
        let records = WorkloadGenerator::new().generate(50);
        for record in records {
            assert_eq!(2, record.name.split(' ').count());
            assert!(record.name.chars().next().unwrap().is_uppercase());
            assert!(CATEGORIES.contains(&record.category.as_str()));
        }
    }

    #[test]
    fn shards_split_the_total_without_overlap() {
        let shards = WorkloadGenerator::new().generate_shards(100, 5);
        assert_eq!(5, shards.len());
        assert!(shards.iter().all(|shard| shard.len() == 20));

        let ids = shards
            .iter()
            .flat_map(|shard| shard.iter().map(|r| r.id.clone()))
            .collect::<HashSet<_>>();
        assert_eq!(100, ids.len());
    }

    #[test]
    fn worker_count_does_not_change_the_total() {
        let generator = WorkloadGenerator::new();
        for workers in [1, 3, 5, 7] {
            let total: usize = generator
                .generate_shards(100, workers)
                .iter()
                .map(|shard| shard.len())
                .sum();
            assert_eq!(100, total, "workers = {workers}");
        }
    }

    #[test]
    fn remainder_goes_to_the_first_shards() {
        let sizes = split_into_shards(WorkloadGenerator::new().generate(11), 4)
            .iter()
            .map(|shard| shard.len())
            .collect::<Vec<_>>();
        assert_eq!(vec![3, 3, 3, 2], sizes);
    }

    #[test]
    fn more_workers_than_records_are_clamped() {
        let shards = split_into_shards(WorkloadGenerator::new().generate(3), 8);
        assert_eq!(3, shards.len());
        assert!(shards.iter().all(|shard| shard.len() == 1));

        let empty = split_into_shards(Vec::new(), 4);
        assert_eq!(1, empty.len());
        assert!(empty[0].is_empty());
    }

    #[test]
    fn title_case_capitalises_first_letter() {
        assert_eq!("Maple", title_case("maple"));
        assert_eq!("", title_case(""));
    }
}
