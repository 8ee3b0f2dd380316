//! Writes a synthetic, semicolon-separated facial-measurement data set in the
//! layout the classifier reads by default:
//!
//! `id;eye_opening;mouth_opening;forehead_wrinkles;emotion`
//!
//! Usage: `generate_sample [OUTPUT] [ROWS]` (defaults: `a.csv`, 120).

use anyhow::{Context, Result};

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

    /// Normally distributed measurement noise around a profile mean (Box-Muller).
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Typical (eye opening, mouth opening, forehead wrinkles) per emotion, in mm
/// and wrinkle count.
const PROFILES: [(&str, [f64; 3]); 5] = [
    ("joy", [9.0, 28.0, 1.0]),
    ("sadness", [6.0, 8.0, 3.0]),
    ("anger", [7.0, 12.0, 6.0]),
    ("surprise", [14.0, 35.0, 4.0]),
    ("fear", [13.0, 22.0, 5.0]),
];

/// Share of rows written without a label.
const UNLABELED_SHARE: f64 = 0.2;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let output_path = args.next().unwrap_or_else(|| "a.csv".to_string());
    let rows: usize = match args.next() {
        Some(n) => n.parse().with_context(|| format!("'{n}' is not a row count"))?,
        None => 120,
    };

    let mut rng = SimpleRng::new(42);
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(&output_path)
        .with_context(|| format!("creating {output_path}"))?;
    writer.write_record(["id", "eye_opening", "mouth_opening", "forehead_wrinkles", "emotion"])?;

    let mut unlabeled = 0;
    for id in 0..rows {
        let (emotion, means) = PROFILES[id % PROFILES.len()];
        let features: Vec<String> = means
            .iter()
            .map(|&m| format!("{:.2}", rng.gauss(m, m * 0.12).max(0.0)))
            .collect();

        let label = if rng.next_f64() < UNLABELED_SHARE {
            unlabeled += 1;
            ""
        } else {
            emotion
        };

        let id = (id + 1).to_string();
        writer.write_record([id.as_str(), features[0].as_str(), features[1].as_str(), features[2].as_str(), label])?;
    }
    writer.flush().context("flushing CSV")?;

    log::info!("Wrote {rows} rows ({unlabeled} unlabeled) to {output_path}");
    println!("Wrote {rows} rows to {output_path}");
    Ok(())
}
