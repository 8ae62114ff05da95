use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

const ROWS: usize = 200;
const DUPLICATES: usize = 6;
const BLANKS: usize = 5;
const OUTLIERS: usize = 3;

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let regions = ["north", "south", "east", "west"];
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;

    let mut rows: Vec<[String; 5]> = (0..ROWS)
        .map(|i| {
            let revenue = rng.gauss(1000.0, 150.0).max(0.0);
            let cost = (revenue * rng.gauss(0.6, 0.05)).max(0.0);
            [
                (i + 1).to_string(),
                (start + Duration::days(i as i64)).format("%Y-%m-%d").to_string(),
                regions[rng.below(regions.len())].to_string(),
                format!("{revenue:.2}"),
                format!("{cost:.2}"),
            ]
        })
        .collect();

    // Revenue spikes well outside the interquartile fence.
    for _ in 0..OUTLIERS {
        let i = rng.below(rows.len());
        rows[i][3] = format!("{:.2}", rng.gauss(25_000.0, 1_000.0));
    }

    // Blank cells in revenue or cost.
    for k in 0..BLANKS {
        let i = rng.below(rows.len());
        rows[i][3 + k % 2] = String::new();
    }

    // Exact copies of existing rows.
    for _ in 0..DUPLICATES {
        let i = rng.below(ROWS);
        let copy = rows[i].clone();
        rows.push(copy);
    }

    let output_path = "sample_sales.csv";
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Failed to create {output_path}"))?;
    writer.write_record(["id", "date", "region", "revenue", "cost"])?;
    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    println!(
        "Wrote {} rows ({DUPLICATES} duplicates, {BLANKS} blanks, {OUTLIERS} outliers) to {output_path}",
        rows.len()
    );
    Ok(())
}
