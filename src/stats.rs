//! Small numeric helpers shared by the forecast engine and the seeder

use rand::Rng;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n)
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Draw from N(mean, std) with the Box-Muller transform
pub fn sample_normal(rng: &mut impl Rng, mean: f64, std: f64) -> f64 {
    if std == 0.0 {
        return mean;
    }
    // u1 must stay away from 0 for ln()
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std * z
}

/// Draw from a log-normal whose underlying normal is N(mu, sigma)
pub fn sample_lognormal(rng: &mut impl Rng, mu: f64, sigma: f64) -> f64 {
    sample_normal(rng, mu, sigma).exp()
}

/// Round to `places` decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_population_std() {
        assert_eq!(population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
        assert_eq!(population_std(&[3.0; 10]), 0.0);
        assert_eq!(population_std(&[]), 0.0);
    }

    #[test]
    fn test_zero_std_returns_mean() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sample_normal(&mut rng, 4.5, 0.0), 4.5);
    }

    #[test]
    fn test_normal_moments() {
        let mut rng = StdRng::seed_from_u64(42);
        let draws: Vec<f64> = (0..20_000).map(|_| sample_normal(&mut rng, 1.0, 2.0)).collect();
        assert!((mean(&draws) - 1.0).abs() < 0.1, "mean drifted: {}", mean(&draws));
        assert!((population_std(&draws) - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_lognormal_is_positive() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!((0..1000).all(|_| sample_lognormal(&mut rng, 0.4, 0.55) > 0.0));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(2.005, 0), 2.0);
    }
}
