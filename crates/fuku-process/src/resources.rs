//! Periodic CPU%/RSS sampling for a running child, read from `/proc`.

use std::time::Duration;

use fuku_core::ResourceSample;

/// Ticks from `/proc/<pid>/stat`: `utime + stime`, and the host's clock tick
/// rate, needed to turn two successive samples into a CPU percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTicks {
    total: u64,
}

/// Samples CPU%/RSS for one pid across repeated calls to [`Sampler::sample`].
/// The first sample after construction (or after a process restart) always
/// reports `cpu_percent: 0.0`, since a percentage needs a delta between two
/// readings.
pub struct Sampler {
    pid: u32,
    previous: Option<(CpuTicks, std::time::Instant)>,
    clock_ticks_per_sec: u64,
    page_size_bytes: u64,
}

impl Sampler {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            previous: None,
            clock_ticks_per_sec: clock_ticks_per_sec(),
            page_size_bytes: page_size_bytes(),
        }
    }

    /// Reads `/proc/<pid>/stat` and returns a fresh [`ResourceSample`], or
    /// `None` if the process has already exited (the `/proc` entry is gone).
    pub fn sample(&mut self) -> Option<ResourceSample> {
        let stat = std::fs::read_to_string(format!("/proc/{}/stat", self.pid)).ok()?;
        let fields = parse_stat_fields(&stat)?;
        let ticks = CpuTicks { total: fields.utime + fields.stime };
        let now = std::time::Instant::now();

        let cpu_percent = match self.previous {
            Some((prev_ticks, prev_at)) => {
                let elapsed = now.duration_since(prev_at);
                cpu_percent_from_ticks(prev_ticks, ticks, elapsed, self.clock_ticks_per_sec)
            }
            None => 0.0,
        };
        self.previous = Some((ticks, now));

        Some(ResourceSample {
            cpu_percent,
            resident_bytes: fields.rss_pages * self.page_size_bytes,
        })
    }
}

struct StatFields {
    utime: u64,
    stime: u64,
    rss_pages: u64,
}

/// `/proc/<pid>/stat` is space-separated, but field 2 (`comm`) is the
/// executable name in parens and may itself contain spaces — so we locate
/// the closing `)` and count fields from there rather than naively
/// splitting on whitespace.
fn parse_stat_fields(stat: &str) -> Option<StatFields> {
    let close_paren = stat.rfind(')')?;
    let rest = stat.get(close_paren + 2..)?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // Fields after `comm)` are numbered from 3 in the `proc_pid_stat` man
    // page; `fields[0]` here is field 3 (state), so field N is `fields[N-3]`.
    let utime = fields.get(14 - 3)?.parse().ok()?;
    let stime = fields.get(15 - 3)?.parse().ok()?;
    let rss_pages = fields.get(24 - 3)?.parse().ok()?;
    Some(StatFields { utime, stime, rss_pages })
}

fn cpu_percent_from_ticks(prev: CpuTicks, current: CpuTicks, elapsed: Duration, ticks_per_sec: u64) -> f32 {
    if elapsed.is_zero() || ticks_per_sec == 0 {
        return 0.0;
    }
    let delta_ticks = current.total.saturating_sub(prev.total) as f64;
    let delta_secs = elapsed.as_secs_f64();
    let cpu_seconds = delta_ticks / ticks_per_sec as f64;
    ((cpu_seconds / delta_secs) * 100.0) as f32
}

fn clock_ticks_per_sec() -> u64 {
    // SC_CLK_TCK is 100 on effectively every Linux target fuku runs on;
    // avoid a libc dependency just for sysconf(3).
    100
}

fn page_size_bytes() -> u64 {
    4096
}
