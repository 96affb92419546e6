use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters a lobby code may contain. Omits look-alikes such as `0`/`O`
/// and `1`/`I`/`L`.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LobbyStatus {
    Waiting,
    Playing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyMeta {
    pub code: String,
    pub seed: String,
    pub status: LobbyStatus,
    pub created_at_ms: f64,
    pub max_players: u8,
}

impl LobbyMeta {
    pub fn new(code: &str, seed: impl Into<String>, created_at_ms: f64) -> Self {
        Self {
            code: normalize_code(code),
            seed: seed.into(),
            status: LobbyStatus::Waiting,
            created_at_ms,
            max_players: 2,
        }
    }
}

/// Read-only view of the lobby store. Matches only ever look lobbies up;
/// creating and expiring them belongs to whoever runs the directory.
pub trait LobbyDirectory {
    fn lookup(&self, code: &str) -> Option<LobbyMeta>;
}

pub fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Clone)]
struct Entry {
    meta: LobbyMeta,
    expires_at_ms: f64,
}

/// In-process directory with per-entry expiry. Time is supplied by the
/// caller so the same instance works under simulated clocks.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: HashMap<String, Entry>,
    now_ms: f64,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, meta: LobbyMeta, ttl_ms: f64) {
        let expires_at_ms = self.now_ms + ttl_ms;
        log::debug!("lobby {} registered, expires at {expires_at_ms}ms", meta.code);
        self.entries.insert(
            meta.code.clone(),
            Entry {
                meta,
                expires_at_ms,
            },
        );
    }

    pub fn set_status(&mut self, code: &str, status: LobbyStatus) -> bool {
        match self.entries.get_mut(&normalize_code(code)) {
            Some(entry) => {
                entry.meta.status = status;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, code: &str) -> Option<LobbyMeta> {
        self.entries.remove(&normalize_code(code)).map(|e| e.meta)
    }

    /// Moves the directory clock forward and evicts expired lobbies.
    pub fn advance_to(&mut self, now_ms: f64) {
        self.now_ms = self.now_ms.max(now_ms);
        let now = self.now_ms;
        self.entries.retain(|code, entry| {
            let keep = entry.expires_at_ms > now;
            if !keep {
                log::debug!("lobby {code} expired");
            }
            keep
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LobbyDirectory for MemoryDirectory {
    fn lookup(&self, code: &str) -> Option<LobbyMeta> {
        self.entries
            .get(&normalize_code(code))
            .filter(|entry| entry.expires_at_ms > self.now_ms)
            .map(|entry| entry.meta.clone())
    }
}
