//! Request body generation.
use rampart_core::{Payload, PayloadSpec};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Produces request bodies from a [`PayloadSpec`].
///
/// Seeded, so a run with the same seed issues the same sequence of bodies per virtual user.
pub struct PayloadGenerator {
    spec: PayloadSpec,
    rng: SmallRng,
}

impl PayloadGenerator {
    pub fn new(spec: &PayloadSpec, seed: u64) -> Self {
        Self {
            spec: spec.clone(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self) -> Option<Payload> {
        match &self.spec {
            PayloadSpec::Empty => None,
            PayloadSpec::Compute {
                items,
                values,
                iterations,
                multiplier,
            } => {
                let len = self.rng.gen_range(items.min..=items.max);
                let items = (0..len)
                    .map(|_| self.rng.gen_range(values.min..=values.max))
                    .collect();
                Some(Payload {
                    items,
                    iterations: *iterations,
                    multiplier: *multiplier,
                })
            }
        }
    }
}
