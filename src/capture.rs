use std::sync::OnceLock;

use regex::Regex;

use crate::event::PrimitiveEvent;

/// Matches the syslog-ng template `${UNIXTIME} ${HOST} ${MESSAGE}` carrying a
/// cgroup OOM kill: unix timestamp, hostname, then somewhere in the message a
/// `/docker/` path with at least 12 word characters, followed by the kernel's
/// kill phrase. Only the first 12 id characters are captured.
const OOM_PATTERN: &str =
    r"^(\d+)\s([A-Za-z0-9-]+)\s.*/docker/(\w{12})\w*.*killed as a result of limit of";

fn oom_regex() -> &'static Regex {
    static OOM_REGEX: OnceLock<Regex> = OnceLock::new();
    OOM_REGEX.get_or_init(|| {
        Regex::new(OOM_PATTERN).expect("OOM pattern is a fixed, valid expression")
    })
}

/// Best-effort filter over raw syslog lines. Anything that does not look like
/// an OOM kill, including malformed timestamps, yields `None` and is dropped
/// by the caller without comment; unrelated lines are routine here.
pub fn extract_oom_event(line: &str) -> Option<PrimitiveEvent> {
    let caps = oom_regex().captures(line)?;
    let timestamp = caps[1].parse().ok()?;
    Some(PrimitiveEvent {
        timestamp,
        hostname: caps[2].to_string(),
        container_id_prefix: caps[3].to_string(),
    })
}
