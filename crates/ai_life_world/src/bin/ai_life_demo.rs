use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ai_life_world::simulator::{
    Agent, ChatWorld, DecisionClient, RunnerLogKind, WorldRunner, PLAYER_SPAWN_TILE,
};
use ai_life_world::{AppConfig, CharacterRecord, Personality, WorldPos};
use rand_core::OsRng;
use tracing_subscriber::EnvFilter;

const DEFAULT_PLAYER_NAME: &str = "Traveler";

#[derive(Debug, Clone, PartialEq)]
struct NpcSpec {
    name: String,
    personality: Personality,
    pos: WorldPos,
}

#[derive(Debug, Clone, PartialEq)]
struct CliOptions {
    name: String,
    personality: Option<Personality>,
    npcs: Vec<NpcSpec>,
    seconds: u64,
    tick_ms: u64,
    auto_dismiss_ms: u64,
    config_path: Option<PathBuf>,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_PLAYER_NAME.to_string(),
            personality: None,
            npcs: Vec::new(),
            seconds: 20,
            tick_ms: 50,
            auto_dismiss_ms: 3_000,
            config_path: None,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let options = match parse_options(args.iter().skip(1).map(|arg| arg.as_str())) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            print_help();
            process::exit(1);
        }
    };

    let config = match &options.config_path {
        Some(path) => AppConfig::from_config_file(path),
        None => AppConfig::from_default_sources(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config: {err}");
            process::exit(1);
        }
    };

    let mut record = match CharacterRecord::generate(&options.name, None, &mut OsRng) {
        Ok(record) => record,
        Err(err) => {
            eprintln!("failed to create character: {err}");
            process::exit(1);
        }
    };
    if let Some(personality) = options.personality {
        record.personality = personality.tag().to_string();
    }

    let mut world = match ChatWorld::enter(config.world.clone(), &record) {
        Ok(world) => world,
        Err(err) => {
            eprintln!("failed to enter world: {err}");
            process::exit(1);
        }
    };
    let npcs = if options.npcs.is_empty() {
        default_npcs()
    } else {
        options.npcs.clone()
    };
    for npc in npcs {
        if let Err(err) = world.spawn(Agent::new(npc.name.clone(), npc.personality, npc.pos)) {
            eprintln!("failed to spawn {}: {err}", npc.name);
            process::exit(1);
        }
    }

    let credential = config.llm.api_key.clone();
    if credential.is_none() {
        tracing::warn!("no API key configured; every decision falls back to stop");
    }
    let client = match DecisionClient::from_config(config.llm.clone()) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("failed to build llm client: {err}");
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(err) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            eprintln!("failed to install ctrl-c handler: {err}");
        }
    }

    println!("player: {} ({})", record.name, record.personality);
    println!("agents: {}", world.agents().count());
    println!("seconds: {}", options.seconds);

    let mut runner = WorldRunner::new(world, client, credential, runtime.handle().clone());
    let total_ticks = options.seconds.saturating_mul(1_000) / options.tick_ms;
    runtime.block_on(async {
        let mut shown_at: Option<u64> = None;
        for _ in 0..total_ticks {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            for entry in runner.tick(options.tick_ms) {
                match entry.kind {
                    RunnerLogKind::DialogueShown { conversation, text } => {
                        println!("[t={}ms] dialogue #{conversation}\n{text}\n", entry.time);
                        shown_at = Some(entry.time);
                    }
                    RunnerLogKind::DecisionApplied { agent, action, .. } => {
                        println!("[t={}ms] {agent}: {action:?}", entry.time);
                    }
                    _ => {}
                }
            }
            let now = runner.world().now_ms();
            if let Some(at) = shown_at {
                if now.saturating_sub(at) >= options.auto_dismiss_ms {
                    if let Some(entry) = runner.pointer_down() {
                        println!("[t={}ms] dialogue dismissed", entry.time);
                    }
                    shown_at = None;
                }
            }
            tokio::time::sleep(Duration::from_millis(options.tick_ms)).await;
        }
    });

    let metrics = runner.metrics().clone();
    println!("ticks: {}", metrics.ticks);
    println!("decisions_issued: {}", metrics.decisions_issued);
    println!("decisions_applied: {}", metrics.decisions_applied);
    println!("decisions_discarded: {}", metrics.decisions_discarded);
    println!("decisions_expired: {}", metrics.decisions_expired);
    println!("fallbacks: {}", metrics.fallbacks);
    println!("conversations_opened: {}", metrics.conversations_opened);
    println!("collisions_ignored: {}", metrics.collisions_ignored);

    drop(runner);
    runtime.shutdown_background();
}

fn default_npcs() -> Vec<NpcSpec> {
    let spawn = WorldPos::from_tile(PLAYER_SPAWN_TILE);
    vec![
        NpcSpec {
            name: "Mika".to_string(),
            personality: Personality::Infp,
            pos: spawn.offset(48.0, 0.0),
        },
        NpcSpec {
            name: "Bram".to_string(),
            personality: Personality::Grumpy,
            pos: spawn.offset(0.0, 64.0),
        },
    ]
}

fn parse_options<'a>(args: impl Iterator<Item = &'a str>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();

    let mut iter = args.peekable();
    while let Some(arg) = iter.next() {
        match arg {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--name" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "--name requires a value".to_string())?;
                if raw.trim().is_empty() {
                    return Err("--name requires a non-empty value".to_string());
                }
                options.name = raw.trim().to_string();
            }
            "--personality" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "--personality requires a tag".to_string())?;
                options.personality = Some(raw.parse::<Personality>().map_err(|err| err.to_string())?);
            }
            "--npc" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "--npc requires NAME:PERSONALITY@X,Y".to_string())?;
                options.npcs.push(parse_npc(raw)?);
            }
            "--seconds" => {
                options.seconds = parse_positive(iter.next(), "--seconds")?;
            }
            "--tick-ms" => {
                options.tick_ms = parse_positive(iter.next(), "--tick-ms")?;
            }
            "--auto-dismiss-ms" => {
                options.auto_dismiss_ms = parse_positive(iter.next(), "--auto-dismiss-ms")?;
            }
            "--config" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "--config requires a path".to_string())?;
                options.config_path = Some(PathBuf::from(raw));
            }
            _ => return Err(format!("unexpected argument: {arg}")),
        }
    }

    Ok(options)
}

fn parse_positive(raw: Option<&str>, flag: &str) -> Result<u64, String> {
    raw.and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .ok_or_else(|| format!("{flag} requires a positive integer"))
}

fn parse_npc(raw: &str) -> Result<NpcSpec, String> {
    let invalid = || format!("invalid --npc value: {raw} (expected NAME:PERSONALITY@X,Y)");
    let (head, coords) = raw.split_once('@').ok_or_else(invalid)?;
    let (name, personality) = head.split_once(':').ok_or_else(invalid)?;
    let (x, y) = coords.split_once(',').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }
    let personality = personality
        .parse::<Personality>()
        .map_err(|err| err.to_string())?;
    let x = x.trim().parse::<f64>().map_err(|_| invalid())?;
    let y = y.trim().parse::<f64>().map_err(|_| invalid())?;
    Ok(NpcSpec {
        name: name.to_string(),
        personality,
        pos: WorldPos::new(x, y),
    })
}

fn print_help() {
    println!("Usage: ai_life_demo [options]");
    println!("Options:");
    println!("  --name <name>                 Player name (default: {DEFAULT_PLAYER_NAME})");
    println!("  --personality <tag>           Player personality, e.g. INTJ or Friendly");
    println!("  --npc <NAME:PERSONALITY@X,Y>  Add an NPC (repeatable)");
    println!("  --seconds <n>                 Run time in seconds (default: 20)");
    println!("  --tick-ms <n>                 Tick length in ms (default: 50)");
    println!("  --auto-dismiss-ms <n>         Dismiss a dialogue after n ms (default: 3000)");
    println!("  --config <path>               Config file (default: ./config.toml, then env)");
}
