use std::fmt;

/// Well-known 16-bit cookies stamped on the rules so operators can tell the
/// subsystems apart in a flow dump.
pub const COOKIE_MIRROR: u16 = 0xfaad;
pub const COOKIE_QUEUE: u16 = 0xbeef;
pub const COOKIE_STEER: u16 = 0x0e5d;
pub const COOKIE_IRL: u16 = 0xdeaf;

/// Sentinel for an inbound port that is bound late: the supplied MAC is
/// substituted at emission time.
pub const LATE_BINDING_PORT: i32 = -128;

pub const DEFAULT_BRIDGE: &str = "br-int";

/// Resolves a possibly late-bound inbound port to its wire form.
pub fn inbound_port(port: i32, mac: &str) -> String {
    if port == LATE_BINDING_PORT { mac.to_string() } else { port.to_string() }
}

/// Match options rendered with the stable short-flag grammar.
#[derive(Debug, Clone, Default)]
pub struct MatchOpts {
    /// Source address, MAC or IP.
    pub src: Option<String>,
    /// Destination address, MAC or IP.
    pub dst: Option<String>,
    pub meta: Option<String>,
    /// Inbound port or late-bound MAC.
    pub in_port: Option<String>,
    pub tp_src: Option<u16>,
    pub tp_dst: Option<u16>,
    /// External reference: "-S" or "-D" plus the external IP.
    pub external: Option<(ExternalDir, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalDir {
    Source,
    Dest,
}

impl fmt::Display for ExternalDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalDir::Source => write!(f, "-S"),
            ExternalDir::Dest => write!(f, "-D"),
        }
    }
}

impl MatchOpts {
    fn render(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if let Some(v) = &self.src {
            parts.push(format!("-s {}", v));
        }
        if let Some(v) = &self.dst {
            parts.push(format!("-d {}", v));
        }
        if let Some(v) = &self.meta {
            parts.push(format!("-m {}", v));
        }
        if let Some(v) = &self.in_port {
            parts.push(format!("-i {}", v));
        }
        if let Some(v) = self.tp_src {
            parts.push(format!("-p {}", v));
        }
        if let Some(v) = self.tp_dst {
            parts.push(format!("-P {}", v));
        }
        if let Some((dir, ip)) = &self.external {
            parts.push(format!("{} {}", dir, ip));
        }

        parts.join(" ")
    }
}

/// Action options. `set_*` fields rewrite headers; `queue`/`dscp` classify;
/// exactly one of `normal`/`output` terminates the action list.
#[derive(Debug, Clone, Default)]
pub struct ActionOpts {
    pub set_src_mac: Option<String>,
    pub set_dst_mac: Option<String>,
    pub set_meta: Option<String>,
    pub queue: Option<i32>,
    pub dscp: Option<u8>,
    pub resub: Vec<String>,
    pub output: Option<i32>,
    pub normal: bool,
}

impl ActionOpts {
    fn render(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if let Some(v) = &self.set_src_mac {
            parts.push(format!("-s {}", v));
        }
        if let Some(v) = &self.set_dst_mac {
            parts.push(format!("-d {}", v));
        }
        if let Some(v) = &self.set_meta {
            parts.push(format!("-m {}", v));
        }
        if let Some(v) = self.queue {
            parts.push(format!("-q {}", v));
        }
        if let Some(v) = self.dscp {
            parts.push(format!("-T {}", v));
        }
        for table in &self.resub {
            parts.push(format!("-R {}", table));
        }
        if let Some(v) = self.output {
            parts.push(format!("-o {}", v));
        }
        if self.normal {
            parts.push("-N".to_string());
        }

        parts.join(" ")
    }
}

/// One flow-mod invocation as consumed by the agent scripts:
/// `-h <host> [-T <table>] -t <timeout> -p <priority> --match ... --action ... <verb> <cookie> <bridge>`.
///
/// `timeout` carries the absolute expiry; the agent converts it to the hard
/// timeout the switch wants.
#[derive(Debug, Clone)]
pub struct FlowMod {
    pub host: String,
    pub table: Option<i32>,
    pub timeout: i64,
    pub priority: i32,
    pub matches: MatchOpts,
    pub actions: ActionOpts,
    pub verb: &'static str,
    pub cookie: u16,
    pub bridge: String,
}

impl FlowMod {
    pub fn render(&self) -> String {
        let table = match self.table {
            Some(t) => format!(" -T {}", t),
            None => String::new(),
        };

        format!(
            "-h {}{} -t {} -p {} --match {} --action {} {} 0x{:x} {}",
            self.host,
            table,
            self.timeout,
            self.priority,
            self.matches.render(),
            self.actions.render(),
            self.verb,
            self.cookie,
            self.bridge,
        )
    }
}
