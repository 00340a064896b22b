//! Sensor: locates other clusters in the world snapshot.

use glam::Vec2;

use super::{ProcessingContext, ProcessingResult};
use crate::physics;
use crate::token::{Token, angle_from_data, angle_to_data, registers};
use crate::token::registers::sensor;
use crate::world_view::ClusterSummary;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorIn {
    DoNothing = 0,
    SearchVicinity = 1,
    SearchByAngle = 2,
    SearchFromCenter = 3,
    SearchTowardCenter = 4,
}

impl SensorIn {
    pub fn from_data(data: u8) -> Option<Self> {
        match data {
            0 => Some(Self::DoNothing),
            1 => Some(Self::SearchVicinity),
            2 => Some(Self::SearchByAngle),
            3 => Some(Self::SearchFromCenter),
            4 => Some(Self::SearchTowardCenter),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorOut {
    NothingFound = 0,
    ClusterFound = 1,
}

pub fn process(token: &mut Token, ctx: &ProcessingContext) -> ProcessingResult {
    let Some(command) = SensorIn::from_data(token.get(sensor::IN)) else {
        token.set(registers::OUT, registers::FAILURE);
        return ProcessingResult::default();
    };

    let reference = ctx.reference_direction();
    let search_dir = match command {
        SensorIn::DoNothing => {
            token.set(registers::OUT, SensorOut::NothingFound as u8);
            return ProcessingResult::default();
        }
        SensorIn::SearchVicinity => None,
        SensorIn::SearchByAngle => Some(physics::rotate(
            reference,
            angle_from_data(token.get(sensor::INOUT_ANGLE)),
        )),
        SensorIn::SearchFromCenter => Some(ctx.world_offset().normalize_or_zero()),
        SensorIn::SearchTowardCenter => Some(-ctx.world_offset().normalize_or_zero()),
    };

    let min_mass = usize::from(token.get(sensor::IN_MIN_MASS));
    let max_mass = match token.get(sensor::IN_MAX_MASS) {
        0 => usize::MAX,
        max => usize::from(max),
    };
    let accepts_mass = |c: &ClusterSummary| (min_mass..=max_mass).contains(&c.cell_count);

    let origin = ctx.cell().abs_pos;
    let metric = ctx.world.metric();
    let tolerance = ctx.params.sensor_angular_tolerance.to_radians();
    let found = ctx
        .world
        .clusters()
        .iter()
        .enumerate()
        .filter(|(slot, c)| *slot != ctx.cluster_slot && accepts_mass(c))
        .filter_map(|(_, c)| {
            let d = metric.displacement(origin, c.pos);
            let dist = d.length();
            if dist > ctx.params.sensor_range || dist <= f32::EPSILON {
                return None;
            }
            match search_dir {
                Some(dir) if dir == Vec2::ZERO || dir.angle_to(d).abs() > tolerance => None,
                _ => Some((c, d, dist)),
            }
        })
        .min_by(|a, b| a.2.total_cmp(&b.2));

    match found {
        Some((cluster, d, dist)) => {
            token.set(registers::OUT, SensorOut::ClusterFound as u8);
            token.set(sensor::OUT_MASS, cluster.cell_count.min(255) as u8);
            token.set(sensor::OUT_DISTANCE, dist.round().min(255.0) as u8);
            token.set(
                sensor::INOUT_ANGLE,
                angle_to_data(reference.angle_to(d).to_degrees()),
            );
        }
        None => token.set(registers::OUT, SensorOut::NothingFound as u8),
    }
    ProcessingResult::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_support::{Fixture, line_at};

    fn sense(command: SensorIn, angle: u8, min: u8, max: u8) -> Token {
        let fixture = Fixture::new(&[
            line_at(1, 2, Vec2::new(10.0, 10.0)),
            line_at(2, 3, Vec2::new(10.0, 20.0)),
            line_at(3, 1, Vec2::new(25.0, 10.0)),
        ]);
        let mut token = Token::new(10.0);
        token.set(sensor::IN, command as u8);
        token.set(sensor::INOUT_ANGLE, angle);
        token.set(sensor::IN_MIN_MASS, min);
        token.set(sensor::IN_MAX_MASS, max);
        process(&mut token, &fixture.context(0, 1, Some(0)));
        token
    }

    #[test]
    fn vicinity_finds_nearest_cluster() {
        let token = sense(SensorIn::SearchVicinity, 0, 0, 0);
        assert_eq!(token.get(registers::OUT), SensorOut::ClusterFound as u8);
        assert_eq!(token.get(sensor::OUT_MASS), 3);
        assert_eq!(token.get(sensor::OUT_DISTANCE), 10);
    }

    #[test]
    fn mass_filter_skips_clusters() {
        let token = sense(SensorIn::SearchVicinity, 0, 1, 1);
        assert_eq!(token.get(registers::OUT), SensorOut::ClusterFound as u8);
        assert_eq!(token.get(sensor::OUT_MASS), 1);
        assert_eq!(token.get(sensor::OUT_DISTANCE), 15);
    }

    #[test]
    fn directional_search_respects_cone() {
        // Reference points from cell 1 back to cell 0, i.e. along -x.
        let behind = sense(SensorIn::SearchByAngle, angle_to_data(180.0), 0, 0);
        assert_eq!(behind.get(registers::OUT), SensorOut::ClusterFound as u8);
        assert_eq!(behind.get(sensor::OUT_MASS), 1);
        assert_eq!(behind.get(sensor::INOUT_ANGLE), angle_to_data(180.0));

        let nothing = sense(SensorIn::SearchTowardCenter, 0, 2, 0);
        assert_eq!(nothing.get(registers::OUT), SensorOut::NothingFound as u8);
    }

    #[test]
    fn unknown_command_fails() {
        let token = sense(SensorIn::DoNothing, 0, 0, 0);
        assert_eq!(token.get(registers::OUT), SensorOut::NothingFound as u8);
        let fixture = Fixture::new(&[line_at(1, 2, Vec2::new(10.0, 10.0))]);
        let mut token = Token::new(10.0);
        token.set(sensor::IN, 9);
        process(&mut token, &fixture.context(0, 1, Some(0)));
        assert_eq!(token.get(registers::OUT), registers::FAILURE);
    }
}
