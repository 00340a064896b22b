use cellworld_core::cell::CellFunctionType;
use cellworld_core::functions::computer::compile;
use cellworld_core::functions::propulsion::PropIn;
use cellworld_core::functions::weapon::WeaponOut;
use cellworld_core::generator::{WorldRecipe, random_world};
use cellworld_core::token::registers;
use cellworld_core::{
    CellFeatureDescription, ClusterDescription, DataDescription, DescriptionError, Simulation,
    SimulationParameters, StepDiagnostic, TokenDescription,
};
use glam::Vec2;
use rand::{SeedableRng, rngs::SmallRng};

fn quiet_params() -> SimulationParameters {
    let mut params = SimulationParameters::with_world_size(100, 100);
    params.radiation_probability = 0.0;
    params
}

/// A chain whose branch numbers count up from 0, so a token on the first
/// cell walks toward the last one.
fn chain(id: u64, len: usize, pos: Vec2) -> ClusterDescription {
    let mut cluster = ClusterDescription::line(id, len, 100.0).with_pos(pos);
    for (i, cell) in cluster.cells.iter_mut().enumerate() {
        cell.token_branch_number = i as u8;
    }
    cluster
}

fn thrust_token(command: PropIn, angle: u8, power: u8) -> TokenDescription {
    TokenDescription::new(20.0)
        .with_register(registers::prop::IN, command as u8)
        .with_register(registers::prop::IN_ANGLE, angle)
        .with_register(registers::prop::IN_POWER, power)
}

fn thruster(id: u64, pos: Vec2, tokens: Vec<TokenDescription>) -> ClusterDescription {
    let mut cluster = chain(id, 3, pos).with_angle(30.0 * id as f32);
    cluster.cells[1].feature = Some(CellFeatureDescription::new(CellFunctionType::Propulsion));
    cluster.cells[0].tokens = tokens;
    cluster
}

/// Two cells; the propulsion cell can pay for a full-power thrust only if
/// it spends energy credited during the same dispatch.
fn starving_thruster(id: u64, pos: Vec2, tokens: Vec<TokenDescription>) -> ClusterDescription {
    let mut cluster = chain(id, 2, pos);
    cluster.cells[1].feature = Some(CellFeatureDescription::new(CellFunctionType::Propulsion));
    cluster.cells[1].energy = 1.001;
    cluster.cells[0].tokens = tokens;
    cluster
}

fn kinematic_bits(data: &DataDescription, id: u64) -> [u32; 6] {
    let c = data.cluster(id).unwrap();
    [
        c.pos.x.to_bits(),
        c.pos.y.to_bits(),
        c.vel.x.to_bits(),
        c.vel.y.to_bits(),
        c.angle.to_bits(),
        c.angular_vel.to_bits(),
    ]
}

#[test]
fn cluster_and_token_order_do_not_change_kinematics() {
    let tokens = vec![
        thrust_token(PropIn::ByAngle, 17, 200),
        thrust_token(PropIn::FromCenter, 0, 90),
        thrust_token(PropIn::RotationClockwise, 0, 33),
    ];
    let mut forward = DataDescription::default();
    let mut backward = DataDescription::default();
    for id in 1..=4 {
        let pos = Vec2::new(20.0 * id as f32, 50.0);
        forward.add_cluster(thruster(id, pos, tokens.clone()));
    }
    for id in (1..=4).rev() {
        let pos = Vec2::new(20.0 * id as f32, 50.0);
        let reversed = tokens.iter().rev().cloned().collect();
        backward.add_cluster(thruster(id, pos, reversed));
    }

    let starving = vec![
        TokenDescription::new(2.9),
        thrust_token(PropIn::FromCenter, 0, 255),
    ];
    let pos = Vec2::new(50.0, 80.0);
    forward.add_cluster(starving_thruster(5, pos, starving.clone()));
    backward.add_cluster(starving_thruster(5, pos, starving.into_iter().rev().collect()));

    let mut a = Simulation::new(quiet_params()).unwrap();
    let mut b = Simulation::new(quiet_params()).unwrap();
    let a = a.step_description(&forward).data;
    let b = b.step_description(&backward).data;
    for id in 1..=4 {
        assert_eq!(kinematic_bits(&a, id), kinematic_bits(&b, id), "cluster {id}");
        assert_ne!(a.cluster(id).unwrap().vel, Vec2::ZERO);
    }
    assert_eq!(kinematic_bits(&a, 5), kinematic_bits(&b, 5));
    assert_eq!(a.cluster(5).unwrap().vel, Vec2::ZERO);
}

#[test]
fn repeated_runs_are_identical() {
    let mut params = SimulationParameters::with_world_size(300, 300);
    params.seed = 11;
    let data = random_world(
        &WorldRecipe::default(),
        &params,
        &mut SmallRng::seed_from_u64(11),
    );
    let run = || {
        let mut sim = Simulation::new(params).unwrap();
        sim.update_data(&data);
        sim.run(20);
        sim.to_description()
    };
    assert_eq!(run(), run());
}

#[test]
fn random_world_keeps_its_energy() {
    let mut params = SimulationParameters::with_world_size(300, 300);
    params.radiation_probability = 0.1;
    let data = random_world(
        &WorldRecipe::default(),
        &params,
        &mut SmallRng::seed_from_u64(2),
    );
    let mut sim = Simulation::new(params).unwrap();
    assert!(sim.update_data(&data).is_empty());
    for report in sim.run(30) {
        assert!(report.is_balanced(), "{:?}", report.energy_diagnostic());
    }
}

#[test]
fn weapon_drains_a_neighbor_and_conserves_energy() {
    let mut attacker = chain(1, 2, Vec2::new(50.0, 50.0));
    attacker.cells[1].feature = Some(CellFeatureDescription::new(CellFunctionType::Weapon));
    attacker.cells[0].add_token(TokenDescription::new(20.0));
    let victim = ClusterDescription::line(2, 2, 100.0).with_pos(Vec2::new(52.0, 50.0));
    let mut data = DataDescription::default();
    data.add_cluster(attacker).add_cluster(victim);

    let mut sim = Simulation::new(quiet_params()).unwrap();
    let outcome = sim.step_description(&data);
    assert!(outcome.report.is_balanced());
    assert!(outcome.report.drained > 0.0);

    let attacker = outcome.data.cluster(1).unwrap();
    let victim = outcome.data.cluster(2).unwrap();
    let token = &attacker.cells[1].tokens[0];
    assert_eq!(
        token.register(registers::OUT),
        WeaponOut::StrikeSuccessful as u8
    );
    assert!(token.energy > 20.0);
    let victim_energy: f32 = victim.cells.iter().map(|c| c.energy).sum();
    assert!(victim_energy < 200.0);
}

#[test]
fn token_walks_the_chain_then_dissolves() {
    let mut cluster = chain(1, 3, Vec2::new(50.0, 50.0));
    cluster.cells[0].add_token(TokenDescription::new(12.0));
    let mut data = DataDescription::default();
    data.add_cluster(cluster);

    let mut sim = Simulation::new(quiet_params()).unwrap();
    sim.update_data(&data);
    let holder = |sim: &Simulation| {
        sim.clusters()[0]
            .cells
            .iter()
            .position(|c| !c.tokens.is_empty())
    };
    sim.step();
    assert_eq!(holder(&sim), Some(1));
    sim.step();
    assert_eq!(holder(&sim), Some(2));
    let report = sim.step();
    assert_eq!(holder(&sim), None);
    assert!(report.is_balanced());
    assert_eq!(sim.clusters()[0].cells[2].energy, 112.0);
}

#[test]
fn fork_spawns_tokens_on_every_branch() {
    let mut cluster = chain(1, 3, Vec2::new(50.0, 50.0));
    cluster.cells[0].token_branch_number = 1;
    cluster.cells[1].token_branch_number = 0;
    cluster.cells[2].token_branch_number = 1;
    cluster.cells[1].add_token(TokenDescription::new(16.0).with_register(40, 7));
    let mut data = DataDescription::default();
    data.add_cluster(cluster);

    let mut sim = Simulation::new(quiet_params()).unwrap();
    let outcome = sim.step_description(&data);
    let cluster = outcome.data.cluster(1).unwrap();
    assert_eq!(cluster.cells[0].tokens.len(), 1);
    assert_eq!(cluster.cells[2].tokens.len(), 1);
    assert_eq!(cluster.cells[0].tokens[0].energy, 8.0);
    assert_eq!(cluster.cells[2].tokens[0].register(40), 7);
    assert!(outcome.report.is_balanced());
}

#[test]
fn computer_programs_steer_the_next_cell() {
    let program = compile(
        &format!(
            "mov [{}], {}\nmov [{}], 255",
            registers::prop::IN,
            PropIn::FromCenter as u8,
            registers::prop::IN_POWER
        ),
        15,
    )
    .unwrap();
    let mut cluster = chain(1, 3, Vec2::new(50.0, 50.0));
    cluster.cells[1].feature =
        Some(CellFeatureDescription::new(CellFunctionType::Computer).with_static_data(program));
    cluster.cells[2].feature = Some(CellFeatureDescription::new(CellFunctionType::Propulsion));
    cluster.cells[0].add_token(TokenDescription::new(20.0));
    let mut data = DataDescription::default();
    data.add_cluster(cluster);

    let mut sim = Simulation::new(quiet_params()).unwrap();
    sim.update_data(&data);
    sim.step();
    assert_eq!(sim.clusters()[0].vel, Vec2::ZERO);
    let report = sim.step();
    assert!(report.is_balanced());
    assert!(report.kinetic_charged > 0.0);
    assert!(sim.clusters()[0].vel.x > 0.0);
}

#[test]
fn broken_clusters_are_rejected_alone() {
    let mut broken = ClusterDescription::line(2, 2, 10.0);
    broken.cells[0].connections.push(999);
    let mut data = DataDescription::default();
    data.add_cluster(ClusterDescription::line(1, 2, 10.0).with_vel(Vec2::new(1.0, 0.0)))
        .add_cluster(broken)
        .add_cluster(ClusterDescription {
            id: 3,
            ..ClusterDescription::default()
        });

    let mut sim = Simulation::new(quiet_params()).unwrap();
    let outcome = sim.step_description(&data);
    assert_eq!(outcome.report.rejected.len(), 2);
    assert!(matches!(
        outcome.report.rejected[0],
        DescriptionError::UnknownConnection { cluster: 2, .. }
    ));
    assert_eq!(
        outcome.report.rejected[1],
        DescriptionError::EmptyCluster { cluster: 3 }
    );
    assert_eq!(outcome.data.clusters.len(), 1);
    assert_eq!(outcome.data.clusters[0].pos, Vec2::new(1.0, 0.0));
}

#[test]
fn unknown_function_is_reported() {
    let mut cluster = chain(1, 2, Vec2::new(50.0, 50.0));
    cluster.cells[1].feature = Some(CellFeatureDescription {
        function_type: 77,
        ..CellFeatureDescription::default()
    });
    cluster.cells[0].add_token(TokenDescription::new(20.0).with_register(3, 9));
    let mut data = DataDescription::default();
    data.add_cluster(cluster);

    let mut sim = Simulation::new(quiet_params()).unwrap();
    let outcome = sim.step_description(&data);
    assert_eq!(
        outcome.report.diagnostics,
        vec![StepDiagnostic::UnrecognizedFunction {
            cluster: 1,
            cell: 1001,
            function_type: 77
        }]
    );
    let token = &outcome.data.clusters[0].cells[1].tokens[0];
    assert_eq!(token.register(registers::OUT), registers::FAILURE);
    assert_eq!(token.register(3), 9);
}

#[test]
fn radiation_is_itemized_and_balanced() {
    let mut params = quiet_params();
    params.radiation_probability = 1.0;
    let mut data = DataDescription::default();
    data.add_cluster(ClusterDescription::line(1, 4, 50.0));

    let mut sim = Simulation::new(params).unwrap();
    let outcome = sim.step_description(&data);
    assert!(outcome.report.balance.radiated > 0.0);
    assert_eq!(outcome.data.particles.len(), 4);
    assert!(outcome.report.is_balanced());
}

#[test]
fn region_query_returns_only_covered_content() {
    let mut data = DataDescription::default();
    data.add_cluster(chain(1, 2, Vec2::new(10.0, 10.0)))
        .add_cluster(chain(2, 2, Vec2::new(60.0, 60.0)));
    let mut sim = Simulation::new(quiet_params()).unwrap();
    sim.update_data(&data);
    let region = sim.query_region(Vec2::new(0.0, 0.0), Vec2::new(30.0, 30.0));
    let ids: Vec<_> = region.clusters.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1]);
}

#[test]
fn huge_sparse_world_steps() {
    let mut params = SimulationParameters::with_world_size(100_000, 100_000);
    params.radiation_probability = 0.0;
    assert!(params.validate().is_ok());
    let mut attacker = chain(1, 2, Vec2::new(99_999.0, 50.0));
    attacker.cells[1].feature = Some(CellFeatureDescription::new(CellFunctionType::Weapon));
    attacker.cells[0].add_token(TokenDescription::new(20.0));
    let victim = ClusterDescription::line(2, 2, 100.0).with_pos(Vec2::new(1.0, 50.0));
    let mut data = DataDescription::default();
    data.add_cluster(attacker).add_cluster(victim);

    let mut sim = Simulation::new(params).unwrap();
    let outcome = sim.step_description(&data);
    assert!(outcome.report.is_balanced());
    assert!(outcome.report.drained > 0.0);
}
