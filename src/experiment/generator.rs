//! Synthetic experiments for demos and fixtures

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Builder;

use super::{Experiment, ExperimentType};

const ALPHA_NUMERICS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate `count` random experiments.
///
/// With a seed the output is reproducible. Names (`Experiment_<i>`) and
/// identifiers are unique; short ids are 4 random characters and may
/// collide.
#[must_use]
pub fn random_experiments(count: usize, seed: Option<u64>) -> Vec<Experiment> {
    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

    (0..count)
        .map(|index| {
            let short_id = random_token(&mut rng, 4);
            let experiment_type = ExperimentType::ALL[rng.gen_range(0..ExperimentType::ALL.len())];
            let uuid = Builder::from_random_bytes(rng.gen()).into_uuid();

            Experiment::builder(experiment_type, format!("{uuid}-{short_id}"))
                .name(format!("Experiment_{index}"))
                .description(format!("Random generated experiment ('{index}')"))
                .short_id(short_id)
                .git_version([("expdash", random_token(&mut rng, 20))])
                .data_set(format!("data_set_{index}"))
                .build()
        })
        .collect()
}

fn random_token(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .map(|_| char::from(ALPHA_NUMERICS[rng.gen_range(0..ALPHA_NUMERICS.len())]))
        .collect()
}
