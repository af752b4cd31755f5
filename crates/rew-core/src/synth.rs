//! Synthetic baseline and monthly shock inputs.
//!
//! Produces a plausible panel for demos and tests: household attributes drawn
//! once, then monthly shocks whose drought and flood rates follow an annual
//! cycle. All draws come from one ChaCha8 stream, so a seed pins the output.

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Months, NaiveDate};
use rand::distr::{Bernoulli, Distribution};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Gamma, Poisson};
use rew_common::{Error, Result};
use serde::Serialize;
use tracing::info;

/// Baseline attribute names written by the generator.
pub const BASELINE_ATTRIBUTES: [&str; 8] = [
    "land_area_hectares",
    "livestock_units",
    "floodplain_exposure",
    "secondary_house",
    "head_age",
    "head_gender_female",
    "head_education_years",
    "head_disability",
];

/// Shock indicator names written by the generator.
pub const SHOCK_INDICATORS: [&str; 4] = ["drought", "flood", "illness", "crop_disease"];

#[derive(Debug, Clone, PartialEq)]
pub struct SynthOptions {
    pub households: usize,
    pub months: u32,
    pub start: NaiveDate,
    pub seed: u64,
    pub id_col: String,
    pub date_col: String,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            households: 1500,
            months: 18,
            start: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap_or_default(),
            seed: 42,
            id_col: "household_id".to_string(),
            date_col: "report_date".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthSummary {
    pub baseline_path: PathBuf,
    pub monthly_path: PathBuf,
    pub households: usize,
    pub months: u32,
    pub monthly_rows: usize,
    pub seed: u64,
}

/// Drought and flood probabilities for month offset `m` from the start.
pub fn seasonal_rates(m: u32) -> (f64, f64) {
    let phase = 2.0 * PI * (f64::from(m) / 12.0);
    let drought = (0.25 + 0.15 * phase.sin()).clamp(0.0, 1.0);
    let flood = (0.10 + 0.10 * phase.cos()).clamp(0.0, 1.0);
    (drought, flood)
}

fn bernoulli(p: f64) -> Result<Bernoulli> {
    Bernoulli::new(p).map_err(|e| Error::InvalidConfig(format!("bernoulli({p}): {e}")))
}

fn flag(rng: &mut ChaCha8Rng, dist: &Bernoulli) -> u8 {
    u8::from(dist.sample(rng))
}

struct Household {
    land: f64,
    livestock: u64,
    floodplain: u8,
    secondary_house: u8,
    head_age: u32,
    female: u8,
    education: u32,
    disability: u8,
}

fn draw_households(rng: &mut ChaCha8Rng, n: usize) -> Result<Vec<Household>> {
    let land = Gamma::<f64>::new(2.0, 1.2).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    let livestock = Poisson::<f64>::new(2.0).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    let floodplain = bernoulli(0.35)?;
    let secondary = bernoulli(0.15)?;
    let female = bernoulli(0.42)?;
    let disability = bernoulli(0.06)?;
    Ok((0..n)
        .map(|_| Household {
            land: (land.sample(rng) * 100.0).round() / 100.0,
            livestock: livestock.sample(rng) as u64,
            floodplain: flag(rng, &floodplain),
            secondary_house: flag(rng, &secondary),
            head_age: rng.random_range(18..80),
            female: flag(rng, &female),
            education: rng.random_range(0..16),
            disability: flag(rng, &disability),
        })
        .collect())
}

fn csv_err(path: &Path) -> impl Fn(csv::Error) -> Error + '_ {
    move |e| Error::csv(path, e)
}

fn csv_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    csv::Writer::from_path(path).map_err(|e| Error::csv(path, e))
}

/// Write a baseline CSV and a monthly shock CSV.
pub fn generate(options: &SynthOptions, baseline_path: &Path, monthly_path: &Path) -> Result<SynthSummary> {
    if options.households == 0 || options.months == 0 {
        return Err(Error::InvalidConfig(
            "synthetic panel needs at least one household and one month".to_string(),
        ));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let households = draw_households(&mut rng, options.households)?;

    let mut baseline = csv_writer(baseline_path)?;
    let mut header = vec![options.id_col.as_str()];
    header.extend(BASELINE_ATTRIBUTES);
    baseline.write_record(&header).map_err(csv_err(baseline_path))?;
    for (i, h) in households.iter().enumerate() {
        baseline
            .write_record([
                (i + 1).to_string(),
                h.land.to_string(),
                h.livestock.to_string(),
                h.floodplain.to_string(),
                h.secondary_house.to_string(),
                h.head_age.to_string(),
                h.female.to_string(),
                h.education.to_string(),
                h.disability.to_string(),
            ])
            .map_err(csv_err(baseline_path))?;
    }
    baseline.flush()?;

    let illness = bernoulli(0.20)?;
    let crop = bernoulli(0.12)?;
    let mut monthly = csv_writer(monthly_path)?;
    let mut header = vec![options.id_col.as_str(), options.date_col.as_str()];
    header.extend(SHOCK_INDICATORS);
    monthly.write_record(&header).map_err(csv_err(monthly_path))?;
    let mut rows = 0usize;
    for m in 0..options.months {
        let period = options
            .start
            .checked_add_months(Months::new(m))
            .ok_or_else(|| Error::InvalidConfig(format!("month offset {m} overflows the calendar")))?;
        let (drought_p, flood_p) = seasonal_rates(m);
        let (drought, flood) = (bernoulli(drought_p)?, bernoulli(flood_p)?);
        let period = period.format("%Y-%m-%d").to_string();
        for hh in 1..=options.households {
            monthly
                .write_record([
                    hh.to_string(),
                    period.clone(),
                    flag(&mut rng, &drought).to_string(),
                    flag(&mut rng, &flood).to_string(),
                    flag(&mut rng, &illness).to_string(),
                    flag(&mut rng, &crop).to_string(),
                ])
                .map_err(csv_err(monthly_path))?;
            rows += 1;
        }
    }
    monthly.flush()?;

    let summary = SynthSummary {
        baseline_path: baseline_path.to_path_buf(),
        monthly_path: monthly_path.to_path_buf(),
        households: options.households,
        months: options.months,
        monthly_rows: rows,
        seed: options.seed,
    };
    info!(
        households = summary.households,
        months = summary.months,
        rows = summary.monthly_rows,
        seed = summary.seed,
        "synthetic panel written"
    );
    Ok(summary)
}
