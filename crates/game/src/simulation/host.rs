use std::time::Duration;

use crate::config::MatchConfig;
use crate::level::Level;
use crate::physics::{HazardKind, HazardPhase, Outcome, match_outcome, step_player};
use crate::player::{Input, InputEdge, Player, Role};

use super::tick::FixedTimestep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Idle,
    Running,
    /// Terminal until [`HostSimulation::reset`].
    Ended(Outcome),
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// The tick that was simulated.
    pub tick: u32,
    pub hazards: Vec<(Role, HazardKind)>,
    pub outcome: Option<Outcome>,
}

/// The authoritative world: one level, exactly one pair of players. Only the
/// host owns one of these.
#[derive(Debug)]
pub struct HostSimulation {
    config: MatchConfig,
    level: Level,
    phase: MatchPhase,
    tick: u32,
    players: [Player; 2],
    edges: [InputEdge; 2],
    timestep: FixedTimestep,
}

impl HostSimulation {
    pub fn new(level: Level, config: MatchConfig, names: [&str; 2]) -> Self {
        let size = config.physics.body_size();
        let hit_points = config.hazards.max_hit_points;
        let players = [
            Player::new(Role::P1, names[0], level.spawn_position(Role::P1, size), hit_points),
            Player::new(Role::P2, names[1], level.spawn_position(Role::P2, size), hit_points),
        ];
        let timestep = FixedTimestep::new(config.timing.tick_rate, config.timing.max_catch_up_steps);

        Self {
            config,
            level,
            phase: MatchPhase::Idle,
            tick: 0,
            players,
            edges: [InputEdge::new(); 2],
            timestep,
        }
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn players(&self) -> &[Player; 2] {
        &self.players
    }

    pub fn player(&self, role: Role) -> &Player {
        &self.players[role as usize]
    }

    pub fn step_ms(&self) -> f64 {
        self.timestep.step_ms()
    }

    /// Idle -> Running. Players are put back on the spawn point in place.
    pub fn start(&mut self) {
        if self.phase == MatchPhase::Running {
            return;
        }

        let size = self.config.physics.body_size();
        for player in &mut self.players {
            player.position = self.level.spawn_position(player.role, size);
            player.velocity = glam::Vec2::ZERO;
            player.on_ground = false;
            player.hit_points = self.config.hazards.max_hit_points;
            player.invulnerable_ticks = 0;
        }
        for edge in &mut self.edges {
            edge.reset();
        }
        self.tick = 0;
        self.timestep.reset();
        self.phase = MatchPhase::Running;
        log::info!("match started on seed {:?}", self.level.seed());
    }

    /// Back to Idle from any phase.
    pub fn reset(&mut self) {
        self.phase = MatchPhase::Idle;
        self.timestep.reset();
    }

    /// Feeds `delta` of wall time and runs the resulting fixed steps with
    /// `inputs` (indexed by role). `on_tick` sees the world after each step.
    /// Returns the number of steps run.
    pub fn advance<F>(&mut self, delta: Duration, inputs: [Input; 2], mut on_tick: F) -> u32
    where
        F: FnMut(&HostSimulation, &TickReport, u32),
    {
        if self.phase != MatchPhase::Running {
            return 0;
        }

        self.timestep.accumulate(delta);
        let steps = self.timestep.drain();

        for index in 0..steps {
            let report = self.step(inputs);
            on_tick(self, &report, steps - index - 1);
            if report.outcome.is_some() {
                self.timestep.reset();
                return index + 1;
            }
        }
        steps
    }

    /// Runs exactly one fixed step.
    pub fn step(&mut self, inputs: [Input; 2]) -> TickReport {
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };
        if self.phase != MatchPhase::Running {
            return report;
        }

        for (index, player) in self.players.iter_mut().enumerate() {
            let input = self.edges[index].apply(inputs[index]);
            if let Some(hazard) = step_player(
                player,
                input,
                &self.level,
                self.tick,
                &self.config,
                HazardPhase::Enabled,
            ) {
                report.hazards.push((player.role, hazard));
            }
        }

        let [p1, p2] = &self.players;
        if let Some(outcome) = match_outcome([p1, p2], &self.level, &self.config.physics) {
            log::info!("match ended at tick {}: {:?}", self.tick, outcome);
            self.phase = MatchPhase::Ended(outcome);
            report.outcome = Some(outcome);
        }

        self.tick = self.tick.wrapping_add(1);
        report
    }
}
