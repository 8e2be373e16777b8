//! Trial samplers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use alphawalk_core::params::{ParamRange, ParamSet, ParamValue, ParameterSpec};

/// Suggests one concrete assignment per call.
///
/// Implementations may learn from finished trials through `observe`.
pub trait Sampler: Send {
    fn suggest(&mut self, space: &ParameterSpec) -> ParamSet;

    fn observe(&mut self, _params: &ParamSet, _values: &[f64]) {}
}

/// Independent uniform sampling per parameter.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_rng(rng: StdRng) -> Self {
        Self { rng }
    }
}

/// Draw one value for `range`: integers inclusive on both ends, fixed values as-is.
pub fn sample_range(range: &ParamRange, rng: &mut impl Rng) -> ParamValue {
    match range {
        ParamRange::Int { low, high } => ParamValue::Int(rng.gen_range(*low..=*high)),
        ParamRange::Float { low, high } => ParamValue::Float(rng.gen_range(*low..=*high)),
        ParamRange::Fixed { value } => value.clone(),
    }
}

impl Sampler for RandomSampler {
    fn suggest(&mut self, space: &ParameterSpec) -> ParamSet {
        space
            .iter()
            .map(|(name, range)| (name.clone(), sample_range(range, &mut self.rng)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn space() -> ParameterSpec {
        ParameterSpec::new()
            .with("period", ParamRange::Int { low: 5, high: 7 })
            .with("ratio", ParamRange::Float { low: 0.25, high: 0.75 })
            .with("label", ParamRange::Fixed { value: ParamValue::Str("x".into()) })
    }

    #[test]
    fn same_seed_same_suggestions() {
        let mut a = RandomSampler::new(11);
        let mut b = RandomSampler::new(11);
        for _ in 0..20 {
            assert_eq!(a.suggest(&space()), b.suggest(&space()));
        }
    }

    #[test]
    fn integer_bounds_are_both_reachable() {
        let mut s = RandomSampler::new(3);
        let seen: std::collections::BTreeSet<i64> = (0..200)
            .filter_map(|_| s.suggest(&space()).get("period").and_then(ParamValue::as_int))
            .collect();
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![5, 6, 7]);
    }

    #[test]
    fn degenerate_ranges_are_constant() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            sample_range(&ParamRange::Int { low: 4, high: 4 }, &mut rng),
            ParamValue::Int(4)
        );
        assert_eq!(
            sample_range(&ParamRange::Float { low: 1.5, high: 1.5 }, &mut rng),
            ParamValue::Float(1.5)
        );
    }

    proptest! {
        #[test]
        fn suggestions_stay_in_range(seed in any::<u64>()) {
            let mut s = RandomSampler::new(seed);
            let p = s.suggest(&space());
            let period = p.get("period").and_then(ParamValue::as_int).unwrap();
            prop_assert!((5..=7).contains(&period));
            let ratio = p.get("ratio").and_then(ParamValue::as_f64).unwrap();
            prop_assert!((0.25..=0.75).contains(&ratio));
            prop_assert_eq!(p.get("label"), Some(&ParamValue::Str("x".into())));
            prop_assert_eq!(p.len(), 3);
        }
    }
}
