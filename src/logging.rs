//! Structured JSON-lines logging.
//!
//! One JSON object per line: `ts`, `run_id`, `seq`, `lvl`, `component`,
//! `event`, `msg`, the promoted keys `query`/`page`/`section`, and a `data`
//! object with everything else. Lines go to stderr (stdout carries rendered
//! pages) and are appended to `<LOG_DIR>/<run_id>/events.jsonl` when
//! `LOG_DIR` is set.
//!
//! `LOG_LEVEL` sets the minimum level (default `info`); `LOG_DOMAINS` takes a
//! comma-separated list of components or `all`. Both are read once per
//! process.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

const PROMOTED: [&str; 3] = ["query", "page", "section"];
const SECRET_KEYS: [&str; 4] = ["authorization", "Authorization", "x-api-key", "api_key"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "info" => Level::Info,
            "warn" | "warning" => Level::Warn,
            "error" => Level::Error,
            _ => return Err(()),
        })
    }
}

/// Component a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Fetch,
    Cache,
    Page,
    System,
    Profile,
}

impl Domain {
    const ALL: [Domain; 5] = [
        Domain::Fetch,
        Domain::Cache,
        Domain::Page,
        Domain::System,
        Domain::Profile,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Domain::Fetch => "fetch",
            Domain::Cache => "cache",
            Domain::Page => "page",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }
}

struct Filter {
    min: Level,
    /// `None` lets every domain through.
    domains: Option<HashSet<Domain>>,
}

impl Filter {
    fn parse(level: Option<&str>, domains: Option<&str>) -> Self {
        let min = level.and_then(|l| l.parse().ok()).unwrap_or(Level::Info);
        let domains = match domains.map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(list) => Some(
                list.split(',')
                    .filter_map(|d| Domain::ALL.into_iter().find(|x| x.name() == d.trim()))
                    .collect(),
            ),
        };
        Filter { min, domains }
    }

    fn allows(&self, level: Level, domain: Domain) -> bool {
        level >= self.min && self.domains.as_ref().map_or(true, |set| set.contains(&domain))
    }
}

fn filter() -> &'static Filter {
    static FILTER: OnceLock<Filter> = OnceLock::new();
    FILTER.get_or_init(|| {
        Filter::parse(
            std::env::var("LOG_LEVEL").ok().as_deref(),
            std::env::var("LOG_DOMAINS").ok().as_deref(),
        )
    })
}

struct Sink {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
}

fn open_events(base: &Path, run_id: &str) -> std::io::Result<File> {
    let dir = base.join(run_id);
    fs::create_dir_all(&dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("events.jsonl"))
}

fn sink() -> &'static Sink {
    static SINK: OnceLock<Sink> = OnceLock::new();
    SINK.get_or_init(|| {
        let run_id = std::env::var("RUN_ID").unwrap_or_else(|_| {
            format!("r-{}-{}", Utc::now().timestamp_millis(), std::process::id())
        });
        let events = std::env::var_os("LOG_DIR").and_then(|base| {
            match open_events(Path::new(&base), &run_id) {
                Ok(file) => Some(Mutex::new(BufWriter::new(file))),
                Err(err) => {
                    eprintln!("[log] events file disabled: {}", err);
                    None
                }
            }
        });
        Sink { run_id, events }
    })
}

static SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Serialize)]
struct Record<'a> {
    ts: String,
    run_id: &'a str,
    seq: u64,
    lvl: &'static str,
    component: Domain,
    event: &'a str,
    msg: Value,
    #[serde(flatten)]
    promoted: Map<String, Value>,
    data: Map<String, Value>,
}

fn render_record(
    run_id: &str,
    level: Level,
    domain: Domain,
    event: &str,
    mut fields: Map<String, Value>,
) -> String {
    for key in SECRET_KEYS {
        if let Some(v) = fields.get_mut(key) {
            *v = Value::from("[REDACTED]");
        }
    }
    let msg = fields.remove("msg").unwrap_or_else(|| Value::from(""));
    let promoted = PROMOTED
        .iter()
        .filter_map(|k| fields.remove(*k).map(|v| (k.to_string(), v)))
        .collect();
    let record = Record {
        ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        run_id,
        seq: SEQ.fetch_add(1, Ordering::Relaxed),
        lvl: level.tag(),
        component: domain,
        event,
        msg,
        promoted,
        data: fields,
    };
    serde_json::to_string(&record).unwrap_or_default()
}

/// Emit one record if the level and domain pass the filter.
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if !filter().allows(level, domain) {
        return;
    }
    let sink = sink();
    let line = render_record(&sink.run_id, level, domain, event, fields);
    if let Some(Ok(mut w)) = sink.events.as_ref().map(Mutex::lock) {
        let _ = writeln!(w, "{}", line).and_then(|_| w.flush());
    }
    eprintln!("{}", line);
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub fn v_str(s: &str) -> Value {
    Value::from(s)
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

#[derive(Default)]
struct RunCounters {
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
    cache_hits: AtomicU64,
    stale_served: AtomicU64,
    section_failures: AtomicU64,
}

fn counters() -> &'static RunCounters {
    static COUNTERS: OnceLock<RunCounters> = OnceLock::new();
    COUNTERS.get_or_init(RunCounters::default)
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn log_fetch(query: &str, url: &str, rows: usize, digest: &str, elapsed_ms: f64) {
    bump(&counters().fetches);
    log(
        Level::Info,
        Domain::Fetch,
        "fetched",
        obj(&[
            ("query", v_str(query)),
            ("url", v_str(url)),
            ("rows", json!(rows)),
            ("digest", v_str(digest)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

pub fn log_fetch_failed(query: &str, error: &str) {
    bump(&counters().fetch_failures);
    log(
        Level::Warn,
        Domain::Fetch,
        "fetch_failed",
        obj(&[("query", v_str(query)), ("msg", v_str(error))]),
    );
}

/// `outcome` is one of `hit`, `expired`, `stale_served`, `unchanged`.
pub fn log_cache(query: &str, outcome: &str, age_secs: f64) {
    let level = match outcome {
        "hit" => {
            bump(&counters().cache_hits);
            Level::Debug
        }
        "stale_served" => {
            bump(&counters().stale_served);
            Level::Warn
        }
        _ => Level::Debug,
    };
    log(
        level,
        Domain::Cache,
        outcome,
        obj(&[("query", v_str(query)), ("age_secs", v_num(age_secs))]),
    );
}

pub fn log_schema_drift(query: &str, missing: &[String]) {
    log(
        Level::Warn,
        Domain::Fetch,
        "schema_drift",
        obj(&[("query", v_str(query)), ("missing", json!(missing))]),
    );
}

pub fn log_section_error(page: &str, section: &str, kind: &str, error: &str) {
    bump(&counters().section_failures);
    log(
        Level::Warn,
        Domain::Page,
        "section_unavailable",
        obj(&[
            ("page", v_str(page)),
            ("section", v_str(section)),
            ("kind", v_str(kind)),
            ("msg", v_str(error)),
        ]),
    );
}

/// Emit the run's counters and reset them.
pub fn log_run_summary(page: &str, sections: usize) {
    let c = counters();
    let take = |a: &AtomicU64| json!(a.swap(0, Ordering::Relaxed));
    log(
        Level::Info,
        Domain::System,
        "run_summary",
        obj(&[
            ("page", v_str(page)),
            ("sections", json!(sections)),
            ("fetches", take(&c.fetches)),
            ("fetch_failures", take(&c.fetch_failures)),
            ("cache_hits", take(&c.cache_hits)),
            ("stale_served", take(&c.stale_served)),
            ("section_failures", take(&c.section_failures)),
        ]),
    );
}

/// Records `elapsed_ms` for a labelled span when dropped.
///
/// `PROFILE_SAMPLE` in `[0, 1]` keeps roughly that fraction of scopes,
/// picked by a counter so runs are reproducible. Unset means every scope.
pub struct ProfileScope {
    label: &'static str,
    context: Option<Map<String, Value>>,
    started: Instant,
}

fn sample_rate() -> f64 {
    static RATE: OnceLock<f64> = OnceLock::new();
    *RATE.get_or_init(|| {
        std::env::var("PROFILE_SAMPLE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .map_or(1.0, |p| p.clamp(0.0, 1.0))
    })
}

fn sampled(rate: f64, tick: u64) -> bool {
    rate >= 1.0 || (rate > 0.0 && ((tick % 1000) as f64) < rate * 1000.0)
}

impl ProfileScope {
    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        static TICK: AtomicU64 = AtomicU64::new(0);
        let keep = sampled(sample_rate(), TICK.fetch_add(1, Ordering::Relaxed));
        Self {
            label,
            context: keep.then(|| obj(fields)),
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if let Some(mut fields) = self.context.take() {
            fields.insert("label".into(), v_str(self.label));
            fields.insert("elapsed_ms".into(), v_num(self.elapsed_ms()));
            log(Level::Trace, Domain::Profile, "profile", fields);
        }
    }
}
