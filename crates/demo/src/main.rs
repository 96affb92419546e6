mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tandem::lobby::generate_code;
use tandem::{
    BroadcastChannel, Buttons, FrameView, LobbyMeta, LobbyStatus, LoopbackBus, MemoryDirectory,
    Outcome, Role, Session, lobby_topic,
};

use config::DemoConfig;

const LOBBY_TTL_MS: f64 = 10.0 * 60.0 * 1000.0;

#[derive(Parser)]
#[command(name = "tandem-demo")]
#[command(about = "Runs a host and a guest against each other over a simulated channel")]
struct Args {
    #[arg(short, long, default_value = "abc123")]
    seed: String,

    #[arg(short, long, help = "Lobby code (generated when omitted)")]
    lobby: Option<String>,

    #[arg(short, long, default_value_t = 20.0, help = "Seconds to run before giving up")]
    duration: f64,

    #[arg(long, default_value_t = 16, help = "Frame interval in ms")]
    frame_ms: u64,

    #[arg(long, default_value_t = 500.0, help = "Guest joins after this many ms")]
    guest_join_ms: f64,

    #[arg(long, help = "TOML file with [match] and [network] sections")]
    config: Option<PathBuf>,

    #[arg(long, help = "Packet loss percentage (0-100)")]
    loss_percent: Option<f32>,

    #[arg(long, help = "Minimum latency in ms")]
    min_latency: Option<u32>,

    #[arg(long, help = "Maximum latency in ms")]
    max_latency: Option<u32>,

    #[arg(long, help = "Jitter in ms")]
    jitter: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DemoConfig::load(path)?,
        None => DemoConfig::default(),
    };
    apply_overrides(&args, &mut config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args, config))
}

fn apply_overrides(args: &Args, config: &mut DemoConfig) {
    let network = &mut config.network;
    if let Some(loss) = args.loss_percent {
        network.loss_percent = loss.clamp(0.0, 100.0);
        network.enabled = true;
    }
    if let Some(min) = args.min_latency {
        network.min_latency_ms = min;
        network.enabled = true;
    }
    if let Some(max) = args.max_latency {
        network.max_latency_ms = max;
        network.enabled = true;
    }
    if let Some(jitter) = args.jitter {
        network.jitter_ms = jitter;
        network.enabled = true;
    }
    network.max_latency_ms = network.max_latency_ms.max(network.min_latency_ms);
}

/// Both players run right; each jumps on its own rhythm.
fn scripted_buttons(role: Role, frame: u64) -> Buttons {
    let period = match role {
        Role::P1 => 40,
        Role::P2 => 55,
    };
    if frame % period < 6 {
        Buttons::RIGHT | Buttons::JUMP
    } else {
        Buttons::RIGHT
    }
}

async fn run(args: Args, config: DemoConfig) -> Result<()> {
    let code = match &args.lobby {
        Some(code) => tandem::normalize_code(code),
        None => {
            let mut rng = StdRng::seed_from_u64(u64::from(tandem::level::hash_seed(&args.seed)));
            generate_code(&mut rng)
        }
    };
    let topic = lobby_topic(&code);

    let mut directory = MemoryDirectory::new();
    directory.insert(LobbyMeta::new(&code, args.seed.as_str(), 0.0), LOBBY_TTL_MS);
    log::info!("lobby {code} on topic {topic}, network {:?}", config.network);

    let bus = LoopbackBus::new(config.network.clone(), u64::from(tandem::level::hash_seed(&code)));
    let mut host_link = bus.endpoint();
    let mut guest_link = bus.endpoint();
    host_link.subscribe(&topic)?;
    guest_link.subscribe(&topic)?;

    let mut host = Session::host(config.game.clone(), ["host", "guest"]);
    let mut guest = Session::guest(config.game.clone(), "guest");
    host.load_lobby(&directory, &code);

    let start = tokio::time::Instant::now();
    let mut interval = tokio::time::interval(Duration::from_millis(args.frame_ms.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut frame: u64 = 0;
    let mut last_report_ms = 0.0;
    let limit_ms = args.duration * 1000.0;

    let outcome = loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted");
                break None;
            }
        }

        let now_ms = start.elapsed().as_secs_f64() * 1000.0;
        bus.advance_to(now_ms);
        directory.advance_to(now_ms);

        host.pump(&mut host_link, &topic, now_ms, scripted_buttons(Role::P1, frame));
        if now_ms >= args.guest_join_ms {
            if !guest.is_loaded() && guest.load_lobby(&directory, &code) {
                directory.set_status(&code, LobbyStatus::Playing);
            }
            guest.pump(&mut guest_link, &topic, now_ms, scripted_buttons(Role::P2, frame));
        }

        if now_ms - last_report_ms >= 1000.0 {
            last_report_ms = now_ms;
            report(&host, &guest, &bus);
        }

        let decided = host.view().outcome().zip(guest.view().outcome());
        if let Some((host_outcome, _)) = decided {
            break Some(host_outcome);
        }
        if now_ms >= limit_ms {
            log::info!("time limit reached");
            break None;
        }
        frame += 1;
    };

    report(&host, &guest, &bus);
    match outcome {
        Some(Outcome::Win) => log::info!("both players reached the goal"),
        Some(Outcome::Loss) => log::info!("a player ran out of hit points"),
        None => log::info!("no result"),
    }

    host.teardown();
    guest.teardown();
    host_link.close();
    guest_link.close();

    let stats = bus.stats();
    log::info!(
        "sent {} packets ({} bytes), delivered {}, dropped {}, duplicated {}",
        stats.packets_sent,
        stats.bytes_sent,
        stats.packets_delivered,
        stats.packets_dropped,
        stats.packets_duplicated
    );
    Ok(())
}

fn report(host: &Session, guest: &Session, bus: &LoopbackBus) {
    let FrameView::Playing { players: truth, .. } = host.view() else {
        log::info!("host waiting");
        return;
    };
    let line = truth
        .iter()
        .map(|p| format!("{:?} ({:.0},{:.0}) hp {}", p.role, p.position.x, p.position.y, p.hit_points))
        .collect::<Vec<_>>()
        .join(", ");
    log::info!("host: {line}");

    match (guest.view(), guest) {
        (FrameView::Playing { players: seen, .. }, Session::Guest(session)) => {
            let clock = session.clock().estimate();
            let drift = seen[1].position.distance(truth[1].position);
            log::info!(
                "guest: rtt {:?}ms, jitter {:.1}ms, delay {:.0}ms, prediction drift {:.1}px, {} in flight",
                clock.rtt_ms.map(|rtt| rtt.round()),
                clock.jitter_ms,
                clock.render_delay_ms,
                drift,
                bus.in_flight()
            );
        }
        _ => log::info!("guest waiting"),
    }
}
