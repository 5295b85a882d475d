use actix::prelude::*;
use clap::Parser;

use tegu::api::topo_dto::NetTopoDto;
use tegu::clock::WallClock;
use tegu::config::{self, Config};
use tegu::domain::agent::AgentMgr;
use tegu::domain::agent::messages::SetSinks;
use tegu::domain::fq_mgr::FqMgr;
use tegu::domain::net_mgr::NetMgr;
use tegu::domain::net_mgr::graph::NetGraph;
use tegu::domain::net_mgr::host::StaticHostOracle;
use tegu::domain::res_mgr::ResMgr;
use tegu::domain::res_mgr::messages::LoadCheckpoint;
use tegu::domain::ticker::{AddTicker, TickKind, Ticker};
use tegu::logger;

const PUSH_INTERVAL_SEC: i64 = 2;
const SETQUEUES_INTERVAL_SEC: i64 = 1;
const CHECKPOINT_INTERVAL_SEC: i64 = 180;
const TOPO_REFRESH_INTERVAL_SEC: i64 = 300;

#[derive(Debug, Parser)]
#[command(name = "tegu", about = "SDN reservation controller")]
struct Args {
    /// Configuration file (JSON).
    #[arg(short = 'C', long = "config")]
    config: Option<String>,

    /// Checkpoint file to restore the inventory from.
    #[arg(short = 'c', long = "checkpoint")]
    checkpoint: Option<String>,

    /// Agent listen port override.
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,

    /// Super-cookie override.
    #[arg(short = 's', long = "super-cookie")]
    super_cookie: Option<String>,

    /// Force debug logging.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[actix_rt::main]
async fn main() {
    let args = Args::parse();

    let mut cfg = match Config::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("could not load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(port) = args.port {
        cfg.agent_port = port;
    }
    if args.super_cookie.is_some() {
        cfg.super_cookie = args.super_cookie.clone();
    }

    logger::init(&cfg.log_dir, args.verbose);
    log::info!("tegu starting; agent port {}", cfg.agent_port);

    let (graph, hosts) = match &cfg.topology_file {
        Some(path) => match config::parse_json_file::<NetTopoDto>(path) {
            Ok(topo) => (topo.build_graph(), topo.build_hosts()),
            Err(e) => {
                log::error!("could not load topology from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => {
            log::warn!("no topology file configured; starting with an empty graph");
            (NetGraph::new(), Vec::new())
        }
    };

    let clock = Box::new(WallClock);

    let net = NetMgr::new(clock.clone(), graph, Box::new(StaticHostOracle::new(hosts)), cfg.default_user_cap, cfg.discount).start();
    let agent = AgentMgr::new().start();
    let fq = FqMgr::new(agent.clone(), clock.clone()).start();
    let res = ResMgr::new(clock.clone(), net.clone(), fq.clone(), cfg.super_cookie.clone(), cfg.ckpt_dir.clone(), cfg.ckpt_keep).start();

    agent.do_send(SetSinks { net: net.clone().recipient(), res: res.clone().recipient() });

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", cfg.agent_port)).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("could not bind agent port {}: {}", cfg.agent_port, e);
            std::process::exit(1);
        }
    };
    actix::spawn(tegu::domain::agent::listen(listener, agent.clone()));

    if let Some(file) = &args.checkpoint {
        match res.send(LoadCheckpoint { file: file.clone() }).await {
            Ok(Ok(count)) => log::info!("restored {} pledge(s) from checkpoint", count),
            Ok(Err(e)) => log::error!("checkpoint restore failed: {}", e),
            Err(e) => log::error!("checkpoint restore failed: {}", e),
        }
    }

    let ticker = Ticker::new(clock.clone()).start();
    ticker.do_send(AddTicker { interval_sec: PUSH_INTERVAL_SEC, count: None, dest: res.clone().recipient(), kind: TickKind::Push });
    ticker.do_send(AddTicker { interval_sec: SETQUEUES_INTERVAL_SEC, count: None, dest: res.clone().recipient(), kind: TickKind::SetQueues });
    ticker.do_send(AddTicker { interval_sec: CHECKPOINT_INTERVAL_SEC, count: None, dest: res.clone().recipient(), kind: TickKind::Checkpoint });
    ticker.do_send(AddTicker { interval_sec: TOPO_REFRESH_INTERVAL_SEC, count: None, dest: net.clone().recipient(), kind: TickKind::TopoRefresh });

    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("shutdown requested"),
        Err(e) => log::error!("signal wait failed: {}", e),
    }

    System::current().stop();
}
