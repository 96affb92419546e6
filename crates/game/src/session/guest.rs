use std::collections::VecDeque;
use std::time::Duration;

use crate::client::{ClientPredictor, ClockEstimator, EntityRecord, PoseBuffer};
use crate::config::MatchConfig;
use crate::level::{Level, generate};
use crate::net::{Envelope, InputMessage, InputPublisher, Message, PoseMessage, StateSnapshot};
use crate::physics::Outcome;
use crate::player::{Buttons, Input, Player, Role};
use crate::simulation::FixedTimestep;

use super::FrameView;

/// The non-authoritative peer: predicts its own player, shows the host's
/// player a little in the past, and follows the host's verdict on the match.
#[derive(Debug)]
pub struct GuestSession {
    config: MatchConfig,
    name: String,
    level: Option<Level>,
    inbox: VecDeque<Vec<u8>>,
    clock: ClockEstimator,
    publisher: InputPublisher,
    timestep: FixedTimestep,
    predictor: Option<ClientPredictor>,
    /// Latest authoritative state of our own player.
    authority: Option<Player>,
    authority_time_ms: f64,
    remote: PoseBuffer,
    remote_player: Option<Player>,
    snapshot: Option<StateSnapshot>,
    last_frame_ms: Option<f64>,
    last_ping_ms: Option<f64>,
    local_tick: u32,
    enemy_tick: u32,
    outcome: Option<Outcome>,
    torn_down: bool,
}

impl GuestSession {
    pub fn new(config: MatchConfig, name: &str) -> Self {
        let timing = &config.timing;
        Self {
            name: name.to_owned(),
            level: None,
            inbox: VecDeque::new(),
            clock: ClockEstimator::new(config.clock.clone()),
            publisher: InputPublisher::new(timing.input_keepalive_ms),
            timestep: FixedTimestep::new(timing.tick_rate, timing.max_catch_up_steps),
            predictor: None,
            authority: None,
            authority_time_ms: f64::NEG_INFINITY,
            remote: PoseBuffer::new(config.interpolation.clone(), timing.step_ms()),
            remote_player: None,
            snapshot: None,
            last_frame_ms: None,
            last_ping_ms: None,
            local_tick: 0,
            enemy_tick: 0,
            outcome: None,
            torn_down: false,
            config,
        }
    }

    pub fn load_seed(&mut self, seed: &str) {
        if self.level.is_some() {
            return;
        }
        let level = generate(seed);
        let spawn = level.spawn_position(Role::P2, self.config.physics.body_size());
        let player = Player::new(Role::P2, self.name.as_str(), spawn, self.config.hazards.max_hit_points);
        self.predictor = Some(ClientPredictor::new(player));
        self.level = Some(level);
    }

    pub fn is_loaded(&self) -> bool {
        self.level.is_some()
    }

    pub fn level(&self) -> Option<&Level> {
        self.level.as_ref()
    }

    pub fn clock(&self) -> &ClockEstimator {
        &self.clock
    }

    pub fn predictor(&self) -> Option<&ClientPredictor> {
        self.predictor.as_ref()
    }

    pub fn latest_snapshot(&self) -> Option<&StateSnapshot> {
        self.snapshot.as_ref()
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

        self.drain_inbox(now_ms);

        let mut outbox = Vec::new();
        if let Some(input) = self.publisher.poll(now_ms, buttons) {
            outbox.push(Message::Input(InputMessage::new(Role::P2, input)));
        }
        let ping_due = self
            .last_ping_ms
            .is_none_or(|last| now_ms - last >= self.config.timing.ping_interval_ms);
        if ping_due {
            outbox.push(Message::Ping {
                client_send_time_ms: now_ms,
            });
            self.last_ping_ms = Some(now_ms);
        }

        self.clock.update_render_delay();

        let delta_ms = (now_ms - self.last_frame_ms.unwrap_or(now_ms)).max(0.0);
        self.last_frame_ms = Some(now_ms);
        if self.snapshot.is_none() {
            return outbox;
        }

        self.predict(delta_ms, Input::new(buttons, self.publisher.last_seq()));
        self.sample_remote(now_ms);
        outbox
    }

    fn predict(&mut self, delta_ms: f64, input: Input) {
        let (Some(level), Some(predictor)) = (&self.level, self.predictor.as_mut()) else {
            return;
        };

        self.timestep.accumulate(Duration::from_secs_f64(delta_ms / 1000.0));
        let steps = self.timestep.drain();
        if self.outcome.is_some() {
            return;
        }

        for _ in 0..steps {
            predictor.predict(input, level, self.local_tick, &self.config);
            self.local_tick = self.local_tick.wrapping_add(1);
            if let Some(authority) = &self.authority {
                predictor.reconcile(authority, &self.config);
            }
        }
    }

    fn sample_remote(&mut self, now_ms: f64) {
        let render_time_ms = self.clock.render_time(now_ms);

        if let (Some(sample), Some(player)) =
            (self.remote.sample(render_time_ms), self.remote_player.as_mut())
        {
            player.position = sample.position;
            player.velocity = sample.velocity;
            player.on_ground = sample.on_ground;
        }

        if let Some(snapshot) = &self.snapshot {
            let ahead = (render_time_ms - snapshot.host_time_ms) / self.timestep.step_ms();
            self.enemy_tick = (i64::from(snapshot.tick) + ahead.floor() as i64).max(0) as u32;
        }
    }

    fn drain_inbox(&mut self, now_ms: f64) {
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
            if sender != Role::P1 {
                continue;
            }

            match message {
                Message::Snapshot(snapshot) => self.apply_snapshot(snapshot, now_ms),
                Message::Pose(pose) => self.apply_pose(&pose),
                Message::Pong {
                    client_send_time_ms,
                    host_time_ms,
                } => {
                    if let Some(rtt) = self.clock.on_pong(client_send_time_ms, host_time_ms, now_ms) {
                        log::trace!("rtt {rtt:.1}ms");
                    }
                }
                Message::GameOver => {
                    if self.outcome.is_none() {
                        log::info!("host reported game over");
                    }
                    self.outcome = Some(Outcome::Loss);
                }
                other => log::trace!("guest ignoring {other:?}"),
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: StateSnapshot, now_ms: f64) {
        if let Some(latest) = &self.snapshot {
            if snapshot.host_time_ms <= latest.host_time_ms {
                log::trace!("discarding stale snapshot for tick {}", snapshot.tick);
                return;
            }
        }
        let (Some(remote), Some(own)) = (snapshot.player1.to_player(), snapshot.player2.to_player())
        else {
            log::warn!("snapshot with unknown player roles");
            return;
        };

        self.clock.observe_host_time(snapshot.host_time_ms, now_ms);
        self.clock.on_snapshot_arrival(now_ms);

        let record = EntityRecord::from_state(snapshot.host_time_ms, &snapshot.player1);
        let respawned = self
            .remote_player
            .as_ref()
            .is_some_and(|previous| remote.hit_points < previous.hit_points);
        if respawned || self.remote.is_empty() {
            self.remote.reset_to(record);
        } else {
            self.remote.push(record);
        }
        self.remote_player = Some(remote);

        if self.snapshot.is_none() {
            if let Some(predictor) = self.predictor.as_mut() {
                predictor.reset(own.clone());
            }
            self.local_tick = snapshot.tick;
            log::info!("first snapshot received at host tick {}", snapshot.tick);
        }
        if snapshot.host_time_ms >= self.authority_time_ms {
            self.authority = Some(own);
            self.authority_time_ms = snapshot.host_time_ms;
        }

        if snapshot.win {
            self.outcome = Some(Outcome::Win);
        } else if snapshot.player1.hit_points == 0 || snapshot.player2.hit_points == 0 {
            self.outcome = Some(Outcome::Loss);
        }
        self.snapshot = Some(snapshot);
    }

    fn apply_pose(&mut self, pose: &PoseMessage) {
        match Role::try_from(pose.entity_id) {
            Ok(Role::P1) => {
                self.remote.push(EntityRecord::from_pose(pose));
            }
            Ok(Role::P2) => {
                if pose.host_time_ms <= self.authority_time_ms {
                    return;
                }
                if let Some(authority) = self.authority.as_mut() {
                    authority.position = pose.position.into();
                    authority.velocity = pose.velocity.into();
                    authority.on_ground = pose.on_ground;
                    self.authority_time_ms = pose.host_time_ms;
                }
            }
            Err(id) => log::warn!("pose for unknown entity {id}"),
        }
    }

    pub fn view(&self) -> FrameView {
        let (Some(level), Some(remote), Some(predictor)) =
            (&self.level, &self.remote_player, &self.predictor)
        else {
            return FrameView::Waiting;
        };

        FrameView::Playing {
            players: [remote.clone(), predictor.player().clone()],
            enemies: FrameView::enemies_at(level, self.enemy_tick),
            outcome: self.outcome,
        }
    }

    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.inbox.clear();
        self.last_ping_ms = None;
        log::info!("guest session torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::net::PlayerState;

    fn loaded() -> GuestSession {
        let mut guest = GuestSession::new(MatchConfig::default(), "guest");
        guest.load_seed("abc123");
        guest
    }

    fn snapshot(host_time_ms: f64, tick: u32, p1: Vec2, p1_hit_points: u8) -> StateSnapshot {
        let level = generate("abc123");
        let size = MatchConfig::default().physics.body_size();
        let mut host_player = Player::new(Role::P1, "host", p1, p1_hit_points);
        host_player.velocity = Vec2::ZERO;
        let guest_player = Player::new(Role::P2, "guest", level.spawn_position(Role::P2, size), 3);
        StateSnapshot {
            host_time_ms,
            tick,
            player1: PlayerState::from(&host_player),
            player2: PlayerState::from(&guest_player),
            win: false,
        }
    }

    fn deliver(guest: &mut GuestSession, message: Message) {
        guest.receive(&Envelope::new(Role::P1, message).encode().unwrap());
    }

    #[test]
    fn first_frame_publishes_input_and_ping() {
        let mut guest = loaded();
        let out = guest.frame(0.0, Buttons::RIGHT);
        assert!(out.iter().any(|m| matches!(m, Message::Input(i) if i.seq == 1)));
        assert!(out.iter().any(|m| matches!(m, Message::Ping { .. })));

        let out = guest.frame(16.0, Buttons::RIGHT);
        assert!(out.is_empty());
    }

    #[test]
    fn waits_until_the_first_snapshot() {
        let mut guest = loaded();
        guest.frame(0.0, Buttons::empty());
        assert_eq!(guest.view(), FrameView::Waiting);

        deliver(&mut guest, Message::Snapshot(snapshot(1000.0, 60, Vec2::new(30.0, 316.0), 3)));
        guest.frame(16.0, Buttons::empty());
        assert!(matches!(guest.view(), FrameView::Playing { outcome: None, .. }));
    }

    #[test]
    fn older_snapshots_are_discarded() {
        let mut guest = loaded();
        deliver(&mut guest, Message::Snapshot(snapshot(1000.0, 60, Vec2::new(30.0, 316.0), 3)));
        deliver(&mut guest, Message::Snapshot(snapshot(950.0, 57, Vec2::new(90.0, 316.0), 3)));
        guest.frame(0.0, Buttons::empty());

        assert_eq!(guest.latest_snapshot().unwrap().tick, 60);
    }

    #[test]
    fn remote_respawn_is_not_smoothed() {
        let mut guest = loaded();
        deliver(&mut guest, Message::Snapshot(snapshot(1000.0, 60, Vec2::new(600.0, 316.0), 3)));
        deliver(&mut guest, Message::Snapshot(snapshot(1050.0, 63, Vec2::new(26.0, 316.0), 2)));
        guest.frame(0.0, Buttons::empty());

        let FrameView::Playing { players, .. } = guest.view() else {
            panic!("expected a playing view");
        };
        assert_eq!(players[0].position, Vec2::new(26.0, 316.0));
        assert_eq!(players[0].hit_points, 2);
    }

    #[test]
    fn respawn_seen_only_in_poses_is_not_smoothed() {
        let mut guest = loaded();
        deliver(&mut guest, Message::Snapshot(snapshot(1000.0, 60, Vec2::new(600.0, 316.0), 3)));
        guest.frame(0.0, Buttons::empty());

        // The snapshot confirming the lost hit point never arrives.
        let pose = |host_time_ms, x| PoseMessage {
            host_time_ms,
            entity_id: Role::P1 as u8,
            position: [x, 316.0],
            velocity: [0.0, 0.0],
            on_ground: true,
        };
        deliver(&mut guest, Message::Pose(pose(1016.0, 600.0)));
        deliver(&mut guest, Message::Pose(pose(1033.0, 26.0)));
        guest.frame(125.0, Buttons::empty());

        let render_time = guest.clock().render_time(125.0);
        assert!(render_time > 1016.0 && render_time < 1033.0, "{render_time}");
        let FrameView::Playing { players, .. } = guest.view() else {
            panic!("expected a playing view");
        };
        assert_eq!(players[0].position.x, 26.0);
    }

    #[test]
    fn game_over_ends_the_match_before_state_shows_it() {
        let mut guest = loaded();
        deliver(&mut guest, Message::Snapshot(snapshot(1000.0, 60, Vec2::new(30.0, 316.0), 3)));
        deliver(&mut guest, Message::GameOver);
        guest.frame(0.0, Buttons::empty());

        assert!(matches!(
            guest.view(),
            FrameView::Playing {
                outcome: Some(Outcome::Loss),
                ..
            }
        ));
    }

    #[test]
    fn teardown_silences_the_session() {
        let mut guest = loaded();
        guest.frame(0.0, Buttons::RIGHT);
        guest.teardown();

        deliver(&mut guest, Message::GameOver);
        assert!(guest.frame(1000.0, Buttons::LEFT).is_empty());
        assert!(guest.is_torn_down());
    }
}
