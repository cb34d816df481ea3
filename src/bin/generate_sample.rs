use std::path::PathBuf;

use anyhow::{Context, Result};

const CITIES: [(&str, f64); 6] = [
    ("New Cairo", 1.4),
    ("Sheikh Zayed", 1.3),
    ("Maadi", 1.2),
    ("Nasr City", 1.0),
    ("Alexandria", 0.9),
    ("6th of October", 0.8),
];

/// Property type, base price per m² (sale), typical area range.
const TYPES: [(&str, f64, (f64, f64)); 5] = [
    ("Apartment", 15_000.0, (70.0, 220.0)),
    ("Duplex", 17_000.0, (180.0, 350.0)),
    ("Villa", 22_000.0, (250.0, 700.0)),
    ("Chalet", 14_000.0, (60.0, 160.0)),
    ("Studio", 13_000.0, (35.0, 70.0)),
];

const FURNISHED: [&str; 3] = ["yes", "no", "unknown"];

const HEADER: [&str; 10] = [
    "ad_id",
    "city",
    "type",
    "rent",
    "furnished",
    "price",
    "area",
    "bedrooms",
    "bathrooms",
    "level",
];

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

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// One synthetic row as CSV fields. Every 40th row carries a defect that
/// the loader has to cope with.
fn generate_row(i: usize, rng: &mut SimpleRng) -> Vec<String> {
    let &(city, city_factor) = rng.pick(&CITIES);
    let &(kind, base_per_m2, (area_lo, area_hi)) = rng.pick(&TYPES);
    let rent = rng.next_f64() < 0.3;
    let furnished = *rng.pick(&FURNISHED);

    let area = rng.range(area_lo, area_hi).round();
    let bedrooms = ((area / 55.0).round() as u32).clamp(1, 7);
    let bathrooms = (bedrooms / 2 + 1).min(5);
    let level = (rng.next_u64() % 15) as i32;

    let per_m2 = base_per_m2 * city_factor * rng.range(0.8, 1.25);
    let price = if rent {
        // Monthly rent, rounded to the nearest 500.
        (area * per_m2 / 180.0 / 500.0).round() * 500.0
    } else {
        (area * per_m2 / 5_000.0).round() * 5_000.0
    };

    let mut row = vec![
        format!("ad{:05}", i + 1),
        city.to_string(),
        kind.to_string(),
        (if rent { "yes" } else { "no" }).to_string(),
        furnished.to_string(),
        price.to_string(),
        area.to_string(),
        bedrooms.to_string(),
        bathrooms.to_string(),
        if level == 0 { "ground".to_string() } else { level.to_string() },
    ];

    match i % 40 {
        7 => row[5].clear(),               // missing price: dropped
        17 => row[6] = "unknown".into(),   // bad area: dropped
        27 => row[7] = "3.5".into(),       // fractional bedrooms: missing
        37 => row[8].clear(),              // missing bathrooms
        _ => {}
    }
    row
}

fn main() -> Result<()> {
    let output_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_listings.csv"));
    let rows = 2_000;

    let mut rng = SimpleRng::new(42);
    let mut writer = csv::Writer::from_path(&output_path)
        .with_context(|| format!("creating {}", output_path.display()))?;

    writer.write_record(HEADER).context("writing header")?;
    for i in 0..rows {
        writer
            .write_record(generate_row(i, &mut rng))
            .with_context(|| format!("writing row {i}"))?;
    }
    writer.flush().context("flushing CSV")?;

    println!("Wrote {rows} listings to {}", output_path.display());
    Ok(())
}
