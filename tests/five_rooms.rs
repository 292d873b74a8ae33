//! End-to-end runs on the five-room navigation task: a kitchen, a sitting
//! room in the middle, and a balcony, bathroom and bedroom off it.

use polaris::heuristics::{CostModel, HAdd, HMax, Heuristic, H1, H2, H2CostModel};
use polaris::search::{
    BestFirstSearch, IteratedWidthSearch, RestartingWeightedSearch, SerializedSearch,
};
use polaris::{FluentId, StripsProblem, INFTY};

const ROOMS: [&str; 5] = ["Kitchen", "Sitting", "Balcony", "Bath", "Bed"];

fn build(edges: &[(usize, usize)]) -> StripsProblem {
    let mut p = StripsProblem::new("house", "five-rooms");
    let fl: Vec<FluentId> = ROOMS
        .iter()
        .map(|r| p.add_fluent(format!("(at {r})")).unwrap())
        .collect();
    for &(u, v) in edges {
        for (from, to) in [(u, v), (v, u)] {
            p.add_action(
                format!("(move {} {})", ROOMS[from], ROOMS[to]),
                vec![fl[from]],
                vec![fl[to]],
                vec![fl[from]],
                vec![],
                1.0,
            )
            .unwrap();
        }
    }
    p.set_init(&[fl[0]]).unwrap();
    p.set_goal(&[fl[2]]).unwrap();
    p.make_action_tables();
    p
}

fn house() -> StripsProblem {
    build(&[(0, 1), (1, 2), (1, 3), (1, 4)])
}

/// Same house with the balcony door bricked up.
fn house_without_balcony_door() -> StripsProblem {
    build(&[(0, 1), (1, 3), (1, 4)])
}

fn plan_signatures(p: &StripsProblem, plan: &[polaris::ActionId]) -> Vec<String> {
    plan.iter().map(|&a| p.actions()[a].signature().to_string()).collect()
}

#[test]
fn best_first_reaches_the_balcony() {
    let p = house();
    let primary: HAdd = H1::new(&p, CostModel::UseCosts);
    let secondary: HMax = H1::new(&p, CostModel::UseCosts);
    let mut engine = BestFirstSearch::new(&p, primary, secondary);
    engine.start(p.initial_state());
    let sol = engine.find_solution().expect("plan exists");
    assert_eq!(sol.cost, 2.0);
    assert_eq!(
        plan_signatures(&p, &sol.plan),
        vec!["(move Kitchen Sitting)", "(move Sitting Balcony)"]
    );
}

#[test]
fn restarting_weighted_reaches_the_balcony() {
    let p = house();
    let primary: HAdd = H1::new(&p, CostModel::UseCosts);
    let secondary: HMax = H1::new(&p, CostModel::UseCosts);
    let mut engine = RestartingWeightedSearch::new(&p, primary, secondary);
    engine.start(p.initial_state());
    let sol = engine.find_solution().expect("plan exists");
    assert_eq!(sol.cost, 2.0);
    assert_eq!(sol.plan.len(), 2);
}

#[test]
fn iterated_width_reaches_the_balcony() {
    let p = house();
    let mut engine = IteratedWidthSearch::new(&p, 2);
    engine.start(p.initial_state());
    let sol = engine.find_solution().expect("plan exists");
    assert_eq!(sol.cost, 2.0);
}

#[test]
fn serialized_search_reaches_the_balcony() {
    let p = house();
    let mut engine = SerializedSearch::new(&p, 2);
    engine.start(p.initial_state());
    let sol = engine.find_solution().expect("plan exists");
    assert_eq!(sol.cost, 2.0);
}

#[test]
fn every_engine_reports_not_found_without_the_door() {
    let p = house_without_balcony_door();

    let primary: HAdd = H1::new(&p, CostModel::UseCosts);
    let secondary: HMax = H1::new(&p, CostModel::UseCosts);
    let mut bfs = BestFirstSearch::new(&p, primary, secondary);
    bfs.start(p.initial_state());
    assert_eq!(bfs.find_solution(), None);

    let primary: HAdd = H1::new(&p, CostModel::UseCosts);
    let secondary: HMax = H1::new(&p, CostModel::UseCosts);
    let mut rwbfs = RestartingWeightedSearch::new(&p, primary, secondary);
    rwbfs.start(p.initial_state());
    assert_eq!(rwbfs.find_solution(), None);

    let mut iw = IteratedWidthSearch::new(&p, 2);
    iw.start(p.initial_state());
    assert_eq!(iw.find_solution(), None);

    let mut serialized = SerializedSearch::new(&p, 2);
    serialized.start(p.initial_state());
    assert_eq!(serialized.find_solution(), None);

    // and the heuristic already knows
    let mut hmax: HMax = H1::new(&p, CostModel::UseCosts);
    assert_eq!(hmax.eval(&p.initial_state()), INFTY);
}

#[test]
fn hmax_is_admissible_and_h2_dominates() {
    let p = house();
    let init = p.initial_state();

    let mut hmax: HMax = H1::new(&p, CostModel::UseCosts);
    let m = hmax.eval(&init);

    // the optimal plan costs 2, which h_max may not exceed
    let primary: HAdd = H1::new(&p, CostModel::UseCosts);
    let secondary: HMax = H1::new(&p, CostModel::UseCosts);
    let mut engine = BestFirstSearch::new(&p, primary, secondary);
    engine.start(p.initial_state());
    let optimal = engine.find_solution().unwrap().cost;
    assert!(m <= optimal);

    let mut h2 = H2::new(&p, H2CostModel::UseCosts);
    assert!(h2.eval(&init) >= m);
}

#[test]
fn edeletes_mark_mutually_exclusive_locations() {
    let mut p = house();
    H2::compute_edeletes(&mut p);
    let kitchen = p.fluent_id("(at Kitchen)").unwrap();
    let sitting = p.fluent_id("(at Sitting)").unwrap();
    for a in 0..p.num_actions() {
        let action = &p.actions()[polaris::ActionId::from(a)];
        if action.signature() == "(move Kitchen Sitting)" {
            // moving to the sitting room e-deletes being anywhere else
            assert!(action.edeletes(kitchen));
            for other in ["(at Balcony)", "(at Bath)", "(at Bed)"] {
                let f = p.fluent_id(other).unwrap();
                assert!(action.edeletes(f), "expected edelete of {other}");
            }
            assert!(!action.edeletes(sitting));
        }
    }
}
