//! One match as seen from one peer. The two roles run different state
//! machines over the same level, player and physics types.

mod guest;
mod host;

pub use guest::GuestSession;
pub use host::HostSession;

use crate::config::MatchConfig;
use crate::level::{Level, Rect};
use crate::lobby::LobbyDirectory;
use crate::net::{BroadcastChannel, Envelope, Message};
use crate::physics::Outcome;
use crate::player::{Buttons, Player, Role};

/// What the presentation layer should draw this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameView {
    /// No level yet, or no authoritative state has arrived.
    Waiting,
    Playing {
        /// Indexed by role.
        players: [Player; 2],
        enemies: Vec<Rect>,
        outcome: Option<Outcome>,
    },
}

impl FrameView {
    pub(crate) fn enemies_at(level: &Level, tick: u32) -> Vec<Rect> {
        level.patrols().iter().map(|patrol| patrol.bounds_at(tick)).collect()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            FrameView::Waiting => None,
            FrameView::Playing { outcome, .. } => *outcome,
        }
    }
}

#[derive(Debug)]
pub enum Session {
    Host(HostSession),
    Guest(GuestSession),
}

impl Session {
    pub fn host(config: MatchConfig, names: [&str; 2]) -> Self {
        Session::Host(HostSession::new(config, names))
    }

    pub fn guest(config: MatchConfig, name: &str) -> Self {
        Session::Guest(GuestSession::new(config, name))
    }

    pub fn role(&self) -> Role {
        match self {
            Session::Host(_) => Role::P1,
            Session::Guest(_) => Role::P2,
        }
    }

    pub fn load_seed(&mut self, seed: &str) {
        match self {
            Session::Host(host) => host.load_seed(seed),
            Session::Guest(guest) => guest.load_seed(seed),
        }
    }

    /// Looks `code` up and loads its seed. Until the lobby exists the
    /// session stays in [`FrameView::Waiting`]; call again on a later frame.
    pub fn load_lobby<D: LobbyDirectory + ?Sized>(&mut self, directory: &D, code: &str) -> bool {
        if self.is_loaded() {
            return true;
        }
        match directory.lookup(code) {
            Some(meta) => {
                log::info!("lobby {} resolved to seed {:?}", meta.code, meta.seed);
                self.load_seed(&meta.seed);
                true
            }
            None => {
                log::debug!("lobby {code} not found yet");
                false
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        match self {
            Session::Host(host) => host.is_loaded(),
            Session::Guest(guest) => guest.is_loaded(),
        }
    }

    /// Queues a packet for the next frame. Never touches simulation state.
    pub fn receive(&mut self, bytes: &[u8]) {
        match self {
            Session::Host(host) => host.receive(bytes),
            Session::Guest(guest) => guest.receive(bytes),
        }
    }

    /// Drains the inbox, runs timers and fixed steps, and returns what to
    /// broadcast.
    pub fn frame(&mut self, now_ms: f64, buttons: Buttons) -> Vec<Message> {
        match self {
            Session::Host(host) => host.frame(now_ms, buttons),
            Session::Guest(guest) => guest.frame(now_ms, buttons),
        }
    }

    pub fn view(&self) -> FrameView {
        match self {
            Session::Host(host) => host.view(),
            Session::Guest(guest) => guest.view(),
        }
    }

    pub fn teardown(&mut self) {
        match self {
            Session::Host(host) => host.teardown(),
            Session::Guest(guest) => guest.teardown(),
        }
    }

    pub fn is_torn_down(&self) -> bool {
        match self {
            Session::Host(host) => host.is_torn_down(),
            Session::Guest(guest) => guest.is_torn_down(),
        }
    }

    /// One frame against a broadcast channel: everything delivered so far
    /// is queued, the frame runs, and its messages are published on `topic`.
    /// A message that fails to go out is logged and skipped. Returns the
    /// number of messages published.
    pub fn pump<C: BroadcastChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        topic: &str,
        now_ms: f64,
        buttons: Buttons,
    ) -> usize {
        for packet in channel.drain(topic) {
            self.receive(&packet);
        }

        let role = self.role();
        let mut published = 0;
        for message in self.frame(now_ms, buttons) {
            let sent = Envelope::new(role, message)
                .encode()
                .map_err(|err| err.to_string())
                .and_then(|bytes| channel.publish(topic, &bytes).map_err(|err| err.to_string()));
            match sent {
                Ok(()) => published += 1,
                Err(err) => log::warn!("failed to publish on {topic}: {err}"),
            }
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::{LobbyMeta, MemoryDirectory};

    #[test]
    fn unknown_lobby_keeps_waiting() {
        let mut directory = MemoryDirectory::new();
        let mut session = Session::guest(MatchConfig::default(), "guest");

        assert!(!session.load_lobby(&directory, "ABC234"));
        assert_eq!(session.view(), FrameView::Waiting);

        directory.insert(LobbyMeta::new("ABC234", "abc123", 0.0), 60_000.0);
        assert!(session.load_lobby(&directory, "abc234"));
        assert!(session.is_loaded());
    }

    #[test]
    fn roles_follow_the_variant() {
        assert_eq!(Session::host(MatchConfig::default(), ["a", "b"]).role(), Role::P1);
        assert_eq!(Session::guest(MatchConfig::default(), "b").role(), Role::P2);
    }
}
