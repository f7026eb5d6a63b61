//! Checks on solved schedules shared between integration tests.
use float_cmp::approx_eq;
use unit_commitment::optimisation::Solution;
use unit_commitment::units::Money;

/// Tolerance for comparing values returned by the solver
#[allow(dead_code)]
pub const TOLERANCE: f64 = 1e-6;

/// Check that a solved schedule satisfies the fleet's physical requirements.
///
/// Load must be met exactly (less any load reduction), units can only produce or hold reserve
/// when committed, and the reserve requirement must be met in every hour.
#[allow(dead_code)]
pub fn check_schedule(solution: &Solution) {
    let model = solution.model();
    for t in model.horizon().iter() {
        let mut supplied: f64 = model
            .iter_generator_indexes()
            .map(|i| solution.production(i, t).value())
            .sum();
        if solution.has_demand_response() {
            supplied += model
                .iter_aggregator_indexes()
                .map(|d| solution.load_reduction(d, t).value())
                .sum::<f64>();
        }
        assert!(
            approx_eq!(f64, supplied, model.load_at(t).value(), epsilon = TOLERANCE),
            "Load not met in hour {t}"
        );

        let reserve: f64 = model
            .iter_generator_indexes()
            .map(|i| solution.reserve(i, t).value())
            .sum();
        let required = model.parameters.reserve_fraction.value() * model.load_at(t).value();
        assert!(
            reserve >= required - TOLERANCE,
            "Reserve requirement not met in hour {t}"
        );

        for (i, generator) in model.generators.iter().enumerate() {
            let headroom = if solution.state(i, t) {
                generator.max_power.value()
            } else {
                0.0
            };
            let used = solution.production(i, t).value() + solution.reserve(i, t).value();
            assert!(
                used <= headroom + TOLERANCE,
                "Unit {i} over capacity in hour {t}"
            );
        }
    }
}

/// Check that every activation in a solved schedule follows the rules of its offer
#[allow(dead_code)]
pub fn check_activations(solution: &Solution) {
    let model = solution.model();
    let horizon = model.horizon();
    for (id, offer) in model.iter_offers() {
        let mut num_starts = 0;
        for t in horizon.iter() {
            let active = solution.is_active(id, t);
            let was_active = horizon.previous(t).is_some_and(|prev| solution.is_active(id, prev));
            let (starts, stops) = (solution.starts(id, t), solution.stops(id, t));

            assert_eq!(starts, active && !was_active, "Start mismatch for {id} in hour {t}");
            assert_eq!(stops, was_active && !active, "Stop mismatch for {id} in hour {t}");
            assert!(!(starts && stops));

            if starts {
                num_starts += 1;
                for h in horizon.window(t, offer.min_duration) {
                    assert!(solution.is_active(id, h), "{id} stopped early in hour {h}");
                }
            }
        }

        assert!(
            num_starts <= offer.max_activations,
            "{id} activated {num_starts} times"
        );
    }
}

/// Recompute the total cost of a solved schedule from its variable values
#[allow(dead_code)]
pub fn total_cost(solution: &Solution) -> Money {
    let model = solution.model();
    let reserve_price_factor = model.parameters.reserve_price_factor;
    let mut cost = Money(0.0);
    for t in model.horizon().iter() {
        for (i, generator) in model.generators.iter().enumerate() {
            if solution.state(i, t) {
                cost += generator.fixed_cost;
            }
            cost += generator.marginal_cost * solution.production(i, t);
            cost += reserve_price_factor * generator.marginal_cost * solution.reserve(i, t);
            cost += solution.startup_cost(i, t) + solution.shutdown_cost(i, t);
        }

        if solution.has_demand_response() {
            for d in model.iter_aggregator_indexes() {
                cost += solution.dr_cost(d, t);
            }
        }
    }

    cost
}
