use std::collections::VecDeque;
use std::time::Duration;

use crate::config::MatchConfig;
use crate::level::{Level, generate};
use crate::net::{
    Envelope, InputLatch, Message, PlayerState, PoseMessage, StateSnapshot,
};
use crate::physics::Outcome;
use crate::player::{Buttons, Input, Role};
use crate::simulation::{HostSimulation, MatchPhase};

use super::FrameView;

/// The authoritative peer. Owns the simulation and answers pings; the
/// guest's input reaches it only through the latch.
#[derive(Debug)]
pub struct HostSession {
    config: MatchConfig,
    names: [String; 2],
    simulation: Option<HostSimulation>,
    remote_input: InputLatch,
    inbox: VecDeque<Vec<u8>>,
    last_frame_ms: Option<f64>,
    last_snapshot: Option<StateSnapshot>,
    last_snapshot_sent_ms: f64,
    game_over_sent: bool,
    torn_down: bool,
}

impl HostSession {
    pub fn new(config: MatchConfig, names: [&str; 2]) -> Self {
        let remote_input = InputLatch::new(config.timing.input_stale_ms);
        Self {
            config,
            names: names.map(str::to_owned),
            simulation: None,
            remote_input,
            inbox: VecDeque::new(),
            last_frame_ms: None,
            last_snapshot: None,
            last_snapshot_sent_ms: 0.0,
            game_over_sent: false,
            torn_down: false,
        }
    }

    pub fn load_seed(&mut self, seed: &str) {
        if self.simulation.is_some() {
            return;
        }
        let [p1, p2] = &self.names;
        let simulation =
            HostSimulation::new(generate(seed), self.config.clone(), [p1.as_str(), p2.as_str()]);
        self.simulation = Some(simulation);
    }

    pub fn is_loaded(&self) -> bool {
        self.simulation.is_some()
    }

    pub fn simulation(&self) -> Option<&HostSimulation> {
        self.simulation.as_ref()
    }

    pub fn level(&self) -> Option<&Level> {
        self.simulation.as_ref().map(HostSimulation::level)
    }

    pub fn receive(&mut self, bytes: &[u8]) {
        if !self.torn_down {
            self.inbox.push_back(bytes.to_vec());
        }
    }

    pub fn frame(&mut self, now_ms: f64, buttons: Buttons) -> Vec<Message> {
        if self.torn_down {
            return Vec::new();
        }

        let mut outbox = Vec::new();
        self.drain_inbox(now_ms, &mut outbox);

        let Some(simulation) = self.simulation.as_mut() else {
            return outbox;
        };
        if simulation.phase() == MatchPhase::Idle {
            simulation.start();
            self.last_frame_ms = Some(now_ms);
        }

        let delta_ms = (now_ms - self.last_frame_ms.unwrap_or(now_ms)).max(0.0);
        self.last_frame_ms = Some(now_ms);

        let inputs = [Input::new(buttons, 0), self.remote_input.current(now_ms)];
        let step_ms = simulation.step_ms();
        let snapshot_interval = self.config.timing.snapshot_interval_ticks.max(1);
        let send_poses = self.config.timing.send_poses;
        let mut latest_snapshot = None;
        let mut lost = false;

        simulation.advance(
            Duration::from_secs_f64(delta_ms / 1000.0),
            inputs,
            |simulation, report, remaining| {
                // Stamp each step with the host time it represents.
                let host_time_ms = now_ms - f64::from(remaining) * step_ms;
                if send_poses {
                    for player in simulation.players() {
                        outbox.push(Message::Pose(PoseMessage::from_player(host_time_ms, player)));
                    }
                }
                if simulation.tick() % snapshot_interval == 0 || report.outcome.is_some() {
                    let snapshot = capture(simulation, host_time_ms);
                    outbox.push(Message::Snapshot(snapshot.clone()));
                    latest_snapshot = Some(snapshot);
                }
                lost |= report.outcome == Some(Outcome::Loss);
            },
        );

        if let Some(snapshot) = latest_snapshot {
            self.last_snapshot = Some(snapshot);
            self.last_snapshot_sent_ms = now_ms;
        } else if matches!(simulation.phase(), MatchPhase::Ended(_)) {
            // Keep repeating the final state so a lost last snapshot heals.
            if let Some(snapshot) = &self.last_snapshot {
                if now_ms - self.last_snapshot_sent_ms >= self.config.timing.input_keepalive_ms {
                    outbox.push(Message::Snapshot(snapshot.clone()));
                    self.last_snapshot_sent_ms = now_ms;
                }
            }
        }

        if lost && !self.game_over_sent {
            log::info!("broadcasting game over");
            outbox.push(Message::GameOver);
            self.game_over_sent = true;
        }

        outbox
    }

    fn drain_inbox(&mut self, now_ms: f64, outbox: &mut Vec<Message>) {
        while let Some(bytes) = self.inbox.pop_front() {
            let decoded = Envelope::decode(&bytes)
                .and_then(|envelope| Ok((envelope.sender_role()?, envelope.message)));
            let (sender, message) = match decoded {
                Ok(decoded) => decoded,
                Err(err) => {
                    log::warn!("dropping packet: {err}");
                    continue;
                }
            };
            if sender != Role::P2 {
                continue;
            }

            match message {
                Message::Input(message) => {
                    self.remote_input.offer(message.input(), now_ms);
                }
                Message::Ping {
                    client_send_time_ms,
                } => outbox.push(Message::Pong {
                    client_send_time_ms,
                    host_time_ms: now_ms,
                }),
                other => log::trace!("host ignoring {other:?}"),
            }
        }
    }

    pub fn view(&self) -> FrameView {
        let Some(simulation) = &self.simulation else {
            return FrameView::Waiting;
        };
        if simulation.phase() == MatchPhase::Idle {
            return FrameView::Waiting;
        }

        let outcome = match simulation.phase() {
            MatchPhase::Ended(outcome) => Some(outcome),
            _ => None,
        };
        FrameView::Playing {
            players: simulation.players().clone(),
            enemies: FrameView::enemies_at(simulation.level(), simulation.tick()),
            outcome,
        }
    }

    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.inbox.clear();
        self.remote_input.reset();
        log::info!("host session torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

fn capture(simulation: &HostSimulation, host_time_ms: f64) -> StateSnapshot {
    let [p1, p2] = simulation.players();
    StateSnapshot {
        host_time_ms,
        tick: simulation.tick(),
        player1: PlayerState::from(p1),
        player2: PlayerState::from(p2),
        win: simulation.phase() == MatchPhase::Ended(Outcome::Win),
    }
}
