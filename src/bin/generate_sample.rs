//! Writes a synthetic `.rs3` tree under `sample_data/` for trying out the
//! extractor without lab files.

use std::fmt::Write as _;
use std::path::Path;

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

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

#[derive(Clone, Copy)]
enum Treatment {
    Thermal,
    AlternatingField,
}

impl Treatment {
    fn steps(self) -> &'static [u32] {
        match self {
            Treatment::Thermal => &[0, 100, 200, 300, 400, 500, 550, 580, 620, 680],
            Treatment::AlternatingField => &[0, 5, 10, 15, 20, 30, 40, 60, 80, 100],
        }
    }

    fn unit(self) -> &'static str {
        match self {
            Treatment::Thermal => "C",
            Treatment::AlternatingField => "mT",
        }
    }

    fn code(self) -> &'static str {
        match self {
            Treatment::Thermal => "T",
            Treatment::AlternatingField => "AF",
        }
    }
}

fn angle(rng: &mut SimpleRng, mean: f64, spread: f64) -> f64 {
    rng.gauss(mean, spread).rem_euclid(360.0)
}

fn inclination(rng: &mut SimpleRng, mean: f64, spread: f64) -> f64 {
    rng.gauss(mean, spread).clamp(-90.0, 90.0)
}

/// One specimen's file: header, orientation line, demagnetization steps and
/// up to two fitted components. Columns are padded with runs of spaces.
fn specimen_file(
    name: &str,
    treatment: Treatment,
    nrm: f64,
    rng: &mut SimpleRng,
) -> Result<String, std::fmt::Error> {
    let mut text = String::new();
    writeln!(
        text,
        "Name       Sdec    Sinc    Bdec    Binc    Fdec    Finc    P1   P2   P3   P4   Note"
    )?;
    writeln!(
        text,
        "{name:<10} {:<7.0} {:<7.0} {:<7.0} {:<7.0} 0       0       12   0    0    90   ",
        angle(rng, 180.0, 90.0),
        inclination(rng, 0.0, 40.0),
        angle(rng, 200.0, 20.0),
        rng.uniform(0.0, 40.0),
    )?;

    let steps = treatment.steps();
    let dec = angle(rng, 10.0, 8.0);
    let inc = inclination(rng, 45.0, 8.0);
    for (i, step) in steps.iter().enumerate() {
        let remaining = nrm * (1.0 - i as f64 / steps.len() as f64).powf(1.5);
        writeln!(
            text,
            "{:<3} {:<5} {:<10.3E} {:>6.1} {:>5.1} {:>6.1} {:>5.1} {:>6.1} {:>5.1} {:>4.1}",
            treatment.code(),
            step,
            remaining.max(1e-9),
            dec + rng.gauss(0.0, 3.0),
            inc + rng.gauss(0.0, 3.0),
            dec + rng.gauss(0.0, 3.0),
            inc + rng.gauss(0.0, 3.0),
            dec + rng.gauss(0.0, 3.0),
            inc + rng.gauss(0.0, 3.0),
            rng.uniform(0.5, 4.0),
        )?;
    }

    let unit = treatment.unit();
    let mut components = vec![("ChRM", steps[3], steps[steps.len() - 1], 0.8)];
    if rng.next_f64() < 0.5 {
        components.push(("LT", steps[0], steps[3], 0.2));
    }
    for (label, lo, hi, share) in components {
        writeln!(
            text,
            "C   {label:<6} {:<10.3E} {:>6.1} {:>5.1} {:>6.1} {:>5.1} {:>6.1} {:>5.1} {:>4.1}  {lo}{unit}  {hi}{unit}  7  Line",
            nrm * share,
            dec,
            inc,
            dec + rng.gauss(0.0, 1.0),
            inc + rng.gauss(0.0, 1.0),
            dec + rng.gauss(0.0, 1.0),
            inc + rng.gauss(0.0, 1.0),
            rng.uniform(1.0, 8.0),
        )?;
    }
    Ok(text)
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let root = Path::new("sample_data");

    // (folder, sites, treatment, log10 of mean NRM in A/m)
    let folders = [
        ("Pyrenees", ["PY1", "PY2", "PY3"], Treatment::Thermal, -3.0),
        ("Iberian", ["IB1", "IB2", "IB3"], Treatment::AlternatingField, -2.0),
    ];

    let mut written = 0usize;
    for (folder, sites, treatment, log_nrm) in folders {
        for (s, site) in sites.iter().enumerate() {
            // Nest one site per folder to exercise recursive collection.
            let dir = if s == 2 {
                root.join(folder).join("extra")
            } else {
                root.join(folder)
            };
            std::fs::create_dir_all(&dir).expect("Failed to create sample directory");

            for specimen in 1..=6 {
                let name = format!("{site}-{specimen:02}");
                let nrm = 10f64.powf(rng.gauss(log_nrm, 0.4));
                let text = specimen_file(&name, treatment, nrm, &mut rng)
                    .expect("Failed to format sample file");
                std::fs::write(dir.join(format!("{name}.rs3")), text)
                    .expect("Failed to write sample file");
                written += 1;
            }
        }
    }

    println!("Wrote {written} .rs3 files under {}", root.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specimen_file_has_nrm_step_and_components() {
        let mut rng = SimpleRng::new(7);
        let text = specimen_file("PY1-01", Treatment::Thermal, 1.0e-3, &mut rng).unwrap();
        let lines: Vec<Vec<&str>> = text.lines().map(|l| l.split_whitespace().collect()).collect();

        assert_eq!(lines[1][0], "PY1-01");
        assert!(lines[1].len() >= 5);
        assert_eq!(lines[2][..2], ["T", "0"]);

        let components: Vec<&Vec<&str>> = lines.iter().filter(|t| t[0] == "C").collect();
        assert!(!components.is_empty());
        for tokens in components {
            assert!(tokens.len() >= 12, "{tokens:?}");
            assert!(tokens[10].ends_with('C') && tokens[11].ends_with('C'), "{tokens:?}");
        }
    }
}
