use crate::domain::fq_mgr::flowmod::{ActionOpts, COOKIE_STEER, DEFAULT_BRIDGE, FlowMod, MatchOpts};
use crate::domain::fq_mgr::messages::SteerFmods;

const STEER_PRIORITY: i32 = 100;

/// Builds the flow-mod chain for a steering pledge: one rule per middlebox
/// hop. Hop N matches traffic leaving the previous stage (the source for
/// hop 0) toward the destination and rewrites the destination MAC to the
/// next middlebox. Metadata marks the stage so a rule never re-captures its
/// own output.
pub fn build_steer_fmods(req: &SteerFmods) -> Vec<String> {
    let mut fmods = Vec::with_capacity(req.boxes.len());

    for (stage, mb) in req.boxes.iter().enumerate() {
        let prev_mac = if stage == 0 { &req.src.mac } else { &req.boxes[stage - 1].mac };

        let matches = MatchOpts {
            src: Some(prev_mac.clone()),
            dst: Some(req.dest.ip4.clone()),
            meta: Some(format!("0x{:02x}/0xff", stage)),
            in_port: None,
            tp_src: None,
            tp_dst: req.proto.as_ref().and_then(|p| p.split(':').nth(1).and_then(|n| n.parse().ok())),
            external: None,
        };

        let actions = ActionOpts {
            set_dst_mac: Some(mb.mac.clone()),
            set_meta: Some(format!("0x{:02x}", stage + 1)),
            resub: vec![".0".to_string()],
            normal: true,
            ..Default::default()
        };

        let fm = FlowMod {
            // When the middlebox host is unknown the rule goes everywhere;
            // the dispatcher broadcast handles fan-out.
            host: mb.phost.clone().unwrap_or_else(|| "all".to_string()),
            table: None,
            timeout: req.expiry,
            priority: STEER_PRIORITY,
            matches,
            actions,
            verb: "add",
            cookie: COOKIE_STEER,
            bridge: DEFAULT_BRIDGE.to_string(),
        };

        fmods.push(fm.render());
    }

    fmods
}
