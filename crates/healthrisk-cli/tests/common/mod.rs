//! Fixtures shared by the CLI integration tests.
#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Write `n` lifestyle rows (plus a duplicate of the first) whose risk
/// depends on bmi, age, systolic pressure and smoking.
pub fn write_health_csv(path: &Path, n: usize) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut out = String::from(
        "id,age,gender,bmi,daily_steps,sleep_hours,water_intake_l,calories_consumed,\
         smoker,alcohol,resting_hr,systolic_bp,diastolic_bp,cholesterol,family_history,disease_risk\n",
    );
    let mut first_row = String::new();
    for id in 0..n {
        let age = rng.gen_range(18..90);
        let gender = if rng.gen_bool(0.5) { "Male" } else { "Female" };
        let bmi: f64 = rng.gen_range(16.0..45.0);
        let steps = rng.gen_range(500..25000);
        let sleep: f64 = rng.gen_range(3.0..10.0);
        let water: f64 = rng.gen_range(0.5..5.0);
        let calories = rng.gen_range(1200..4800);
        let smoker = u8::from(rng.gen_bool(0.25));
        let alcohol = u8::from(rng.gen_bool(0.3));
        let hr = rng.gen_range(45..115);
        let systolic = rng.gen_range(95..190);
        let diastolic = rng.gen_range(60..125);
        let chol = rng.gen_range(150..300);
        let family = u8::from(rng.gen_bool(0.3));

        let score = 0.12 * (bmi - 28.0) + 0.04 * (age as f64 - 50.0)
            + 0.03 * (systolic as f64 - 135.0)
            + 1.2 * smoker as f64
            + 0.8 * family as f64
            - 1.6
            + rng.gen_range(-1.0..1.0);
        let risk = u8::from(score > 0.0);

        let row = format!(
            "{},{},{:.1},{},{:.1},{:.2},{},{},{},{},{},{},{},{},{}",
            age, gender, bmi, steps, sleep, water, calories, smoker, alcohol, hr, systolic,
            diastolic, chol, family, risk
        );
        if id == 0 {
            first_row = row.clone();
        }
        writeln!(out, "{},{}", id, row).unwrap();
    }
    // Same features under a new id: dropped once `id` is removed.
    writeln!(out, "{},{}", n, first_row).unwrap();
    std::fs::write(path, out).unwrap();
}
