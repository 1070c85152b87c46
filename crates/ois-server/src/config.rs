use std::net::IpAddr;
use std::time::Duration;

use ipnet::IpNet;
use tracing::warn;

/// Upper bound on a single invocation of the OS open primitive.
pub const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_PORT: u16 = 51888;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_TOKEN: &str = "changeme123456";
pub const DEFAULT_BROWSER: &str = "Safari";

/// Parallels Desktop host-only and shared network ranges.
pub const DEFAULT_SUBNETS: &[&str] = &["10.211.55.0/24", "10.37.129.0/24"];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Networks whose peers may call `/open`. Checked in order.
    pub allowed_subnets: Vec<IpNet>,
    /// Shared secret expected in `X-OpenInSafari-Token`. Empty disables the check.
    pub token: String,
    /// Log the action instead of launching anything.
    pub dry_run: bool,
    pub verbose: bool,
    /// Application handed to `open -a`.
    pub browser: String,
    pub open_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.into(),
            port: DEFAULT_PORT,
            allowed_subnets: DEFAULT_SUBNETS
                .iter()
                .filter_map(|s| parse_subnet(s))
                .collect(),
            token: DEFAULT_TOKEN.into(),
            dry_run: false,
            verbose: true,
            browser: DEFAULT_BROWSER.into(),
            open_timeout: OPEN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `OIS_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `OIS_*` key.
    ///
    /// Empty values never override a default, and an unparsable `OIS_PORT`
    /// keeps the default port. The two toggles are only on when set to
    /// `true` (case-insensitive).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(port) = non_empty("OIS_PORT") {
            match port.trim().parse() {
                Ok(p) => cfg.port = p,
                Err(_) => warn!(value = %port, "ignoring invalid OIS_PORT"),
            }
        }
        if let Some(bind) = non_empty("OIS_BIND") {
            cfg.bind = bind;
        }
        if let Some(token) = non_empty("OIS_TOKEN") {
            cfg.token = token;
        }
        if let Some(subnets) = non_empty("OIS_ALLOWED_SUBNETS") {
            cfg.allowed_subnets = parse_subnets(&subnets);
        }
        if let Some(browser) = non_empty("OIS_BROWSER") {
            cfg.browser = browser;
        }
        cfg.dry_run = flag(lookup("OIS_DRY_RUN"), false);
        cfg.verbose = flag(lookup("OIS_VERBOSE"), true);
        cfg
    }

    /// Shared secret safe for logs: never more than two leading and two
    /// trailing characters.
    pub fn redacted_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        match chars.len() {
            0 => "<empty>".into(),
            1..=4 => "***".into(),
            n => {
                let head: String = chars[..2].iter().collect();
                let tail: String = chars[n - 2..].iter().collect();
                format!("{head}***{tail}")
            }
        }
    }

    pub fn subnets_display(&self) -> String {
        self.allowed_subnets
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn flag(value: Option<String>, default: bool) -> bool {
    match value {
        Some(v) => v.eq_ignore_ascii_case("true"),
        None => default,
    }
}

/// Parses a comma-separated CIDR list, skipping blanks and invalid entries.
pub fn parse_subnets(list: &str) -> Vec<IpNet> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let net = parse_subnet(s);
            if net.is_none() {
                warn!(subnet = s, "ignoring invalid subnet");
            }
            net
        })
        .collect()
}

/// Non-strict CIDR parse: host bits may be set, a bare address is a /32 (or /128).
pub fn parse_subnet(s: &str) -> Option<IpNet> {
    if let Ok(net) = s.parse::<IpNet>() {
        return Some(net.trunc());
    }
    s.parse::<IpAddr>().ok().map(IpNet::from)
}
