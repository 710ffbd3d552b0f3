use aiyagari::arrays::{RewardArray, TransitionArray};
use aiyagari::equilibrium::asset_marginal;
use aiyagari::root::RootMethod;
use aiyagari::simulation::{simulate_panel, PanelOptions};
use aiyagari::{
    AiyagariModel, DpOptions, ErrorKind, FirmParams, Household, HouseholdConfig, ModelOptions,
    Prices, ShockSpec, StationaryOptions, Utility,
};
use approx::assert_relative_eq;

/// A = 1, N = 1, alpha = 0.33, beta = 0.96, delta = 0.05; 200 assets on [~0, 20];
/// income 0.1 or 1.0 with persistence 0.9; bracket [0.005, 0.04].
fn textbook_options() -> ModelOptions {
    let household = HouseholdConfig::default()
        .with_grid(1e-10, 20.0, 200)
        .with_beta(0.96)
        .with_shocks(ShockSpec::Explicit {
            values: vec![0.1, 1.0],
            transition: vec![vec![0.9, 0.1], vec![0.1, 0.9]],
        });
    let firm = FirmParams {
        productivity: 1.0,
        labor: 1.0,
        alpha: 0.33,
        delta: 0.05,
    };
    ModelOptions::default()
        .with_household(household)
        .with_firm(firm)
        .with_bracket(0.005, 0.04)
        .with_tolerance(1e-8)
}

#[test]
fn textbook_calibration_clears_the_capital_market_inside_the_bracket() {
    let options = textbook_options();
    let model = AiyagariModel::from_options(&options).unwrap();
    let equilibrium = model.solve_equilibrium(&options).unwrap();

    assert!(equilibrium.r > 0.005 && equilibrium.r < 0.04);
    assert!(equilibrium.root.width() <= 2.0 * options.equilibrium.root.xtol);

    // On a discrete grid supply is a step function of r, so the market clears
    // up to one jump: either the residual vanishes or it changes sign across a
    // bracket narrower than the tolerance.
    let root = &equilibrium.root;
    assert!(
        root.residual.abs() <= options.equilibrium.root.ftol || root.f_lower * root.f_upper <= 0.0
    );
    assert!(equilibrium.residual.abs() / equilibrium.capital_demand < 1e-3);

    assert_relative_eq!(
        equilibrium.w,
        options.firm.wage(equilibrium.r).unwrap(),
        epsilon = 1e-12
    );
    assert_relative_eq!(equilibrium.steady_state.distribution.sum(), 1.0, epsilon = 1e-10);
}

#[test]
fn bisection_and_brent_locate_the_same_crossing() {
    let mut options = textbook_options();
    options.household = options.household.with_grid(1e-10, 20.0, 80);
    let model = AiyagariModel::from_options(&options).unwrap();

    let brent = model.solve_equilibrium(&options).unwrap();
    let bisection = model
        .solve_equilibrium(&options.clone().with_root_method(RootMethod::Bisection))
        .unwrap();
    assert!((brent.r - bisection.r).abs() < 1e-3);
}

#[test]
fn parallel_curves_match_sequential_evaluations() {
    let mut options = textbook_options();
    options.household = options.household.with_grid(1e-10, 20.0, 60);
    let model = AiyagariModel::from_options(&options).unwrap();

    let rates = [0.005, 0.015, 0.025, 0.035];
    let curve = model.supply_demand_curves(&rates, &options).unwrap();
    for (point, r) in curve.iter().zip(rates) {
        assert_eq!(point.r, r);
        let sequential = model.capital_supply(r, &options).unwrap().capital;
        assert_eq!(point.capital_supply.to_bits(), sequential.to_bits());
    }
    assert!(curve.windows(2).all(|w| w[0].capital_demand > w[1].capital_demand));
    assert!(curve[0].capital_supply < curve[3].capital_supply);
}

#[test]
fn arrays_satisfy_feasibility_and_normalisation_at_full_size() {
    let household = Household::from_config(&textbook_options().household).unwrap();
    let space = household.space();
    let prices = Prices { r: 0.02, w: 1.2 };
    let reward = RewardArray::build(space, &Utility::Log, prices).unwrap();
    let transition = TransitionArray::build(space);

    for state in 0..space.state_count() {
        for action in 0..space.asset_count() {
            let c = prices.w * space.shock_value(state)
                + (1.0 + prices.r) * space.asset_value(state)
                - space.grid().value(action);
            assert_eq!(reward.get(state, action).is_finite(), c > 0.0);

            let mass: f64 = transition.row(state, action).map(|(_, p)| p).sum();
            assert_relative_eq!(mass, 1.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn transition_array_survives_price_changes_untouched() {
    let mut household = Household::from_config(&textbook_options().household).unwrap();
    let before = household.transition().clone();
    household.set_prices(Prices { r: 0.03, w: 1.1 }).unwrap();
    household.set_prices(Prices { r: 0.01, w: 1.4 }).unwrap();

    let after = household.transition();
    for state in (0..household.space().state_count()).step_by(37) {
        for action in (0..household.space().asset_count()).step_by(17) {
            assert_eq!(before.dense_row(state, action), after.dense_row(state, action));
        }
    }
}

#[test]
fn simulated_panel_matches_stationary_capital() {
    let config = HouseholdConfig::default().with_grid(1e-10, 12.0, 60);
    let household = Household::from_config(&config).unwrap();
    let steady = household
        .steady_state(
            Prices { r: 0.02, w: 1.2 },
            &DpOptions::default(),
            &StationaryOptions::default(),
        )
        .unwrap();

    let options = PanelOptions {
        households: 4_000,
        periods: 600,
        seed: 2024,
        initial_asset: 0,
    };
    let panel = simulate_panel(household.space(), &steady.solution.policy, &options).unwrap();
    assert_relative_eq!(panel.mean_assets, steady.capital, max_relative = 0.05);

    let marginal = asset_marginal(household.space(), &steady.distribution).unwrap();
    assert_relative_eq!(marginal.sum(), 1.0, epsilon = 1e-10);
}

#[test]
fn model_loads_from_partial_json() {
    let json = r#"{
        "household": {
            "a_size": 30,
            "a_max": 10.0,
            "utility": { "kind": "crra", "sigma": 2.0 },
            "shocks": { "kind": "rouwenhorst", "states": 3, "rho": 0.9, "sigma": 0.1, "mean": 1.0 }
        },
        "firm": { "alpha": 0.36 },
        "equilibrium": { "r_upper": 0.03, "root": { "method": "bisection" } },
        "dp": { "method": { "kind": "modified_policy_iteration", "k": 25 } }
    }"#;
    let options: ModelOptions = serde_json::from_str(json).unwrap();
    assert_eq!(options.household.a_size, 30);
    assert_eq!(options.household.beta, 0.96);
    assert_eq!(options.household.utility, Utility::Crra { sigma: 2.0 });
    assert_eq!(options.firm.alpha, 0.36);
    assert_eq!(options.firm.delta, 0.05);
    assert_eq!(options.equilibrium.r_lower, 0.005);
    assert_eq!(options.equilibrium.root.method, RootMethod::Bisection);

    let model = AiyagariModel::from_options(&options).unwrap();
    assert_eq!(model.household().space().state_count(), 90);
    let steady = model.capital_supply(0.02, &options).unwrap();
    assert!(steady.capital > 0.0);
}

#[test]
fn invalid_configurations_are_rejected_before_solving() {
    let single_point = ModelOptions::default()
        .with_household(HouseholdConfig::default().with_grid(0.0, 20.0, 1));
    let err = AiyagariModel::from_options(&single_point).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let negative_sigma = ModelOptions::default()
        .with_household(HouseholdConfig::default().with_utility(Utility::Crra { sigma: -1.0 }));
    let err = AiyagariModel::from_options(&negative_sigma).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let firm = FirmParams::default();
    assert_eq!(firm.wage(-0.05).unwrap_err().kind(), ErrorKind::Domain);
    assert_eq!(firm.capital_demand(-0.07).unwrap_err().kind(), ErrorKind::Domain);
}
