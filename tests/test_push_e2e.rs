use std::time::Duration;

use actix::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use tegu::api::mirror_dto::MirrorCreateDto;
use tegu::api::reservation_dto::ReserveRequestDto;
use tegu::api::topo_dto::{ConnDto, HostDto, LinkDto, NetTopoDto, SwitchDto};
use tegu::clock::MockClock;
use tegu::domain::agent::messages::SetSinks;
use tegu::domain::agent::protocol::AgentRequest;
use tegu::domain::agent::{AgentMgr, listen};
use tegu::domain::fq_mgr::FqMgr;
use tegu::domain::ids::PledgeName;
use tegu::domain::net_mgr::NetMgr;
use tegu::domain::pledge::Pledge;
use tegu::domain::res_mgr::ResMgr;
use tegu::domain::res_mgr::messages::{AddPledge, GetPledge};
use tegu::domain::ticker::{Tick, TickKind};

const GBIT: i64 = 1_000_000_000;

fn topo() -> NetTopoDto {
    NetTopoDto {
        switches: vec![
            SwitchDto { id: "s1".to_string(), phost: Some("phys1".to_string()) },
            SwitchDto { id: "s2".to_string(), phost: Some("phys2".to_string()) },
        ],
        links: vec![
            LinkDto { id: None, src: "s1".to_string(), src_port: 10, dst: "s2".to_string(), dst_port: 11, capacity: GBIT },
            LinkDto { id: None, src: "s2".to_string(), src_port: 11, dst: "s1".to_string(), dst_port: 10, capacity: GBIT },
        ],
        hosts: vec![
            HostDto {
                name: "vmA".to_string(),
                ip4: "10.0.0.1".to_string(),
                mac: "fa:16:3e:00:00:01".to_string(),
                ip6: None,
                phost: Some("phys1".to_string()),
                tenant: None,
                gateway: None,
                floating_ip: None,
                openstack_id: None,
                conns: vec![ConnDto { switch: "s1".to_string(), port: 1 }],
            },
            HostDto {
                name: "vmB".to_string(),
                ip4: "10.0.0.2".to_string(),
                mac: "fa:16:3e:00:00:02".to_string(),
                ip6: None,
                phost: Some("phys2".to_string()),
                tenant: None,
                gateway: None,
                floating_ip: None,
                openstack_id: None,
                conns: vec![ConnDto { switch: "s2".to_string(), port: 1 }],
            },
        ],
    }
}

struct Harness {
    clock: MockClock,
    res: Addr<ResMgr>,
    agent_stream: TcpStream,
}

async fn boot() -> Harness {
    let clock = MockClock::new(1000);
    let t = topo();

    let net = NetMgr::new(
        Box::new(clock.clone()),
        t.build_graph(),
        Box::new(tegu::domain::net_mgr::host::StaticHostOracle::new(t.build_hosts())),
        100,
        0,
    )
    .start();

    let agent = AgentMgr::new().start();
    let fq = FqMgr::new(agent.clone(), Box::new(clock.clone())).start();

    let dir = std::env::temp_dir().join(format!("tegu-push-{}", uuid::Uuid::new_v4().simple()));
    let res = ResMgr::new(Box::new(clock.clone()), net.clone(), fq, None, dir.to_string_lossy().to_string(), 10).start();

    agent.do_send(SetSinks { net: net.recipient(), res: res.clone().recipient() });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    actix::spawn(listen(listener, agent));

    let agent_stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

    Harness { clock, res, agent_stream }
}

/// Reads newline-framed agent requests until the predicate has seen enough,
/// or the deadline passes.
async fn read_requests(reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>, mut enough: impl FnMut(&[AgentRequest]) -> bool) -> Vec<AgentRequest> {
    let mut seen: Vec<AgentRequest> = Vec::new();

    loop {
        if enough(&seen) {
            return seen;
        }

        let mut line = String::new();
        match tokio::time::timeout(Duration::from_secs(5), reader.read_line(&mut line)).await {
            Ok(Ok(n)) if n > 0 => {
                if let Ok(req) = serde_json::from_str::<AgentRequest>(line.trim()) {
                    seen.push(req);
                }
            }
            _ => return seen,
        }
    }
}

fn flowmod_count(seen: &[AgentRequest]) -> usize {
    seen.iter().flat_map(|r| &r.actions).filter(|a| a.atype == "flowmod").map(|a| a.fdata.len()).sum()
}

#[actix_rt::test]
async fn push_tick_emits_flowmods_to_a_connected_agent() {
    let h = boot().await;
    let (read_half, _write_half) = h.agent_stream.into_split();
    let mut reader = BufReader::new(read_half);

    // The fresh connection is primed before any reservation work.
    let primed = read_requests(&mut reader, |seen| seen.len() >= 2).await;
    let atypes: Vec<&str> = primed.iter().flat_map(|r| &r.actions).map(|a| a.atype.as_str()).collect();
    assert!(atypes.contains(&"map_mac2phost"), "a new agent must be asked for its MAC map: {:?}", atypes);
    assert!(atypes.contains(&"intermed_queues"), "a new agent must refresh intermediate queues: {:?}", atypes);

    let dto = ReserveRequestDto {
        bandwidth_in: Some(50_000_000),
        bandwidth_out: 100_000_000,
        start_time: Some(1010),
        end_time: 1070,
        h1: "vmA".to_string(),
        h2: "vmB".to_string(),
        p1: None,
        p2: Some(443),
        cookie: Some("alice".to_string()),
        dscp: Some(46),
        name: Some("r1".to_string()),
        external_ip: None,
    };

    h.res.send(AddPledge { pledge: dto.into_pledge(1000).unwrap() }).await.unwrap().unwrap();

    // The pledge commences within the 15s lead, so one tick emits it.
    h.res.send(Tick { kind: TickKind::Push }).await.unwrap();

    let seen = read_requests(&mut reader, |seen| flowmod_count(seen) >= 4).await;
    let fmods: Vec<String> = seen.iter().flat_map(|r| &r.actions).filter(|a| a.atype == "flowmod").flat_map(|a| a.fdata.clone()).collect();

    assert!(fmods.len() >= 4, "a one-hop path must emit at least 2*(1+1) flow-mods, got {}: {:?}", fmods.len(), fmods);
    assert!(fmods.iter().any(|f| f.contains("-s 10.0.0.1 -d 10.0.0.2")), "forward direction present: {:?}", fmods);
    assert!(fmods.iter().any(|f| f.contains("-s 10.0.0.2 -d 10.0.0.1")), "reverse direction present: {:?}", fmods);
    assert!(fmods.iter().all(|f| f.contains("-t 1070")), "every rule carries the pledge expiry: {:?}", fmods);

    // The pledge is marked pushed; a second tick emits nothing new.
    let pledge = h.res.send(GetPledge { name: PledgeName::new("r1"), cookie: "alice".to_string() }).await.unwrap().unwrap();
    assert!(pledge.base().pushed);
}

#[actix_rt::test]
async fn mirror_results_come_back_to_the_pledge() {
    let h = boot().await;
    let (read_half, mut write_half) = h.agent_stream.into_split();
    let mut reader = BufReader::new(read_half);

    // Drain the priming traffic.
    read_requests(&mut reader, |seen| seen.len() >= 2).await;

    let dto = MirrorCreateDto {
        start_time: Some(1000),
        end_time: 4600,
        output: "10.0.0.5".to_string(),
        port: vec!["fa:16:3e:5f:df:60".to_string()],
        vlan: None,
        cookie: Some("alice".to_string()),
        name: Some("mir-test".to_string()),
        options: None,
        phost: Some("phys1".to_string()),
    };

    h.res.send(AddPledge { pledge: dto.into_pledge(1000).unwrap() }).await.unwrap().unwrap();
    h.res.send(Tick { kind: TickKind::Push }).await.unwrap();

    let seen = read_requests(&mut reader, |seen| seen.iter().flat_map(|r| &r.actions).any(|a| a.atype == "mirrorwiz")).await;
    let wiz = seen.iter().flat_map(|r| &r.actions).find(|a| a.atype == "mirrorwiz").expect("mirrorwiz action must arrive");

    assert_eq!(wiz.rid.as_deref(), Some("mir-test"), "the request must carry the pledge id for correlation");
    assert!(wiz.fdata[0].starts_with("add mir-test"), "{:?}", wiz.fdata);

    // The agent answers; the output must land back in the pledge.
    let response = "{\"ctype\":\"response\",\"rtype\":\"mirrorwiz\",\"rdata\":[\"mirror up\"],\"edata\":[],\"state\":0,\"vinfo\":\"\",\"rid\":\"mir-test\"}\n";
    write_half.write_all(response.as_bytes()).await.unwrap();
    write_half.flush().await.unwrap();

    let mut last_output = None;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;

        let pledge = h.res.send(GetPledge { name: PledgeName::new("mir-test"), cookie: "alice".to_string() }).await.unwrap().unwrap();
        if let Pledge::Mirror(m) = &pledge {
            if m.last_output.is_some() {
                last_output = m.last_output.clone();
                break;
            }
        }
    }

    assert_eq!(last_output.as_deref(), Some("mirror up"), "the mirrorwiz result must be stored in the originating pledge");

    let _ = h.clock;
}

#[actix_rt::test]
async fn paused_pledges_emit_with_an_imminent_expiry() {
    let h = boot().await;
    let (read_half, _write_half) = h.agent_stream.into_split();
    let mut reader = BufReader::new(read_half);
    read_requests(&mut reader, |seen| seen.len() >= 2).await;

    let dto = ReserveRequestDto {
        bandwidth_in: Some(50_000_000),
        bandwidth_out: 100_000_000,
        start_time: Some(1010),
        end_time: 1070,
        h1: "vmA".to_string(),
        h2: "vmB".to_string(),
        p1: None,
        p2: None,
        cookie: Some("alice".to_string()),
        dscp: None,
        name: Some("r1".to_string()),
        external_ip: None,
    };
    h.res.send(AddPledge { pledge: dto.into_pledge(1000).unwrap() }).await.unwrap().unwrap();

    h.res.send(tegu::domain::res_mgr::messages::SetPauseState { paused: true }).await.unwrap();
    h.res.send(Tick { kind: TickKind::Push }).await.unwrap();

    let seen = read_requests(&mut reader, |seen| flowmod_count(seen) >= 4).await;
    let fmods: Vec<String> = seen.iter().flat_map(|r| &r.actions).filter(|a| a.atype == "flowmod").flat_map(|a| a.fdata.clone()).collect();

    assert!(!fmods.is_empty(), "a paused pledge still emits, withdrawing itself");
    assert!(
        fmods.iter().all(|f| f.contains("-t 1015")),
        "a paused pledge's emission must carry expiry now+15, effectively pulling it: {:?}",
        fmods
    );
}
