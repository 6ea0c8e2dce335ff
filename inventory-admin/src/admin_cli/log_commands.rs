use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, SystemTime};

use chrono::{NaiveDateTime, Utc};
use clap::Args;
use inventory_api::logging::{LOG_FILES, TIMESTAMP_FORMAT};
use regex::Regex;

static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(.*?)\] (\w+) (\S+) (\S+):(\d+) - (.*)$").expect("valid log line pattern")
});
static USER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"User: ([^(,]+)").expect("valid user pattern"));
static IP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"IP: ([^\s,]+)").expect("valid ip pattern"));

const BYTES_PER_MB: u64 = 1024 * 1024;
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Args, Debug, Clone)]
pub struct CleanupArgs {
    #[arg(long, default_value_t = 30, help = "Delete log files older than N days")]
    pub days: u64,
    #[arg(long = "max-size", default_value_t = 50, help = "Rotate logs larger than this many MB")]
    pub max_size: u64,
    #[arg(long = "backup-count", default_value_t = 5, help = "Number of rotated backups to keep")]
    pub backup_count: u32,
    #[arg(long, help = "Compress rotated backups (.2 and older) with zstd")]
    pub compress: bool,
    #[arg(long = "dry-run", help = "Show what would change without touching any file")]
    pub dry_run: bool,
    #[arg(long = "log-dir", env = "LOG_DIR", default_value = "logs", help = "Log directory")]
    pub log_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    #[arg(
        long = "log-file",
        value_parser = ["general", "errors", "security", "database", "api"],
        help = "Only read this log (general, errors, security, database, api)"
    )]
    pub log_file: Option<String>,
    #[arg(long, help = "Only show this level (DEBUG, INFO, WARN/WARNING, ERROR)")]
    pub level: Option<String>,
    #[arg(long, help = "Only show lines mentioning this user")]
    pub user: Option<String>,
    #[arg(long, help = "Only show lines from this IP address")]
    pub ip: Option<String>,
    #[arg(long, default_value_t = 24, help = "Show logs from the last N hours")]
    pub hours: i64,
    #[arg(long, help = "Show summary statistics instead of log lines")]
    pub summary: bool,
    #[arg(long = "errors-only", help = "Only show ERROR lines")]
    pub errors_only: bool,
    #[arg(long = "top-users", default_value_t = 10, help = "Users listed in the summary")]
    pub top_users: usize,
    #[arg(long = "top-ips", default_value_t = 10, help = "IP addresses listed in the summary")]
    pub top_ips: usize,
    #[arg(long = "log-dir", env = "LOG_DIR", default_value = "logs", help = "Log directory")]
    pub log_dir: PathBuf,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub rotated: usize,
    pub compressed: usize,
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn is_current_log(name: &str) -> bool {
    name.ends_with(".log")
}

fn is_log_or_backup(name: &str) -> bool {
    is_current_log(name) || name.contains(".log.")
}

/// `general.log.3` -> 3; compressed or unnumbered files give `None`.
fn backup_number(name: &str) -> Option<u32> {
    let (_, suffix) = name.rsplit_once(".log.")?;
    suffix.parse().ok()
}

fn log_dir_entries(
    dir: &Path,
    keep: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && keep(&file_name(&path)) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

pub fn handle_cleanup_logs(args: CleanupArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.log_dir.exists() {
        println!("Logs directory not found: {}", args.log_dir.display());
        return Ok(());
    }
    println!("Cleaning up logs in: {}", args.log_dir.display());
    let report = cleanup_logs(&args, SystemTime::now())?;

    println!();
    println!("Cleanup Summary:");
    println!("  Deleted files: {}", report.deleted);
    println!("  Rotated files: {}", report.rotated);
    if args.compress {
        println!("  Compressed files: {}", report.compressed);
    }
    println!("Log cleanup completed successfully!");
    Ok(())
}

/// Deletes old files, rotates oversized logs, then optionally compresses
/// older backups. Failures on single files are reported and skipped.
pub fn cleanup_logs(
    args: &CleanupArgs,
    now: SystemTime,
) -> Result<CleanupReport, Box<dyn std::error::Error>> {
    let mut report = CleanupReport::default();
    let cutoff = now
        .checked_sub(Duration::from_secs(args.days.saturating_mul(SECONDS_PER_DAY)))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    for path in log_dir_entries(&args.log_dir, is_log_or_backup)? {
        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                println!("Error processing {}: {}", path.display(), e);
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }
        if args.dry_run {
            println!("Would delete: {}", file_name(&path));
        } else if let Err(e) = fs::remove_file(&path) {
            println!("Error processing {}: {}", path.display(), e);
            continue;
        } else {
            println!("Deleted: {}", file_name(&path));
        }
        report.deleted += 1;
    }

    let max_bytes = args.max_size.saturating_mul(BYTES_PER_MB);
    for path in log_dir_entries(&args.log_dir, is_current_log)? {
        let size = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(_) => continue,
        };
        if size <= max_bytes {
            continue;
        }
        if args.dry_run {
            let megabytes = size as f64 / BYTES_PER_MB as f64;
            println!("Would rotate: {} ({:.1} MB)", file_name(&path), megabytes);
        } else if let Err(e) = rotate_log_file(&path, args.backup_count) {
            println!("Error rotating {}: {}", path.display(), e);
            continue;
        } else {
            println!("Rotated: {}", file_name(&path));
        }
        report.rotated += 1;
    }

    if args.compress {
        let old_backup = |name: &str| backup_number(name).is_some_and(|n| n >= 2);
        for path in log_dir_entries(&args.log_dir, old_backup)? {
            if args.dry_run {
                println!("Would compress: {}", file_name(&path));
            } else if let Err(e) = compress_file(&path) {
                println!("Error compressing {}: {}", path.display(), e);
                continue;
            } else {
                println!("Compressed: {}", file_name(&path));
            }
            report.compressed += 1;
        }
    }

    Ok(report)
}

/// `x.log.k` becomes `x.log.k+1` (the oldest is dropped), `x.log` becomes
/// `x.log.1`, and an empty `x.log` takes its place.
pub fn rotate_log_file(path: &Path, backup_count: u32) -> std::io::Result<()> {
    let backup = |n: u32| {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    };

    if backup_count == 0 {
        File::create(path)?;
        return Ok(());
    }
    let oldest = backup(backup_count);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..backup_count).rev() {
        let from = backup(n);
        if from.exists() {
            fs::rename(&from, backup(n + 1))?;
        }
    }
    fs::rename(path, backup(1))?;
    File::create(path)?;
    Ok(())
}

fn compress_file(path: &Path) -> std::io::Result<()> {
    let mut target = path.as_os_str().to_owned();
    target.push(".zst");
    let source = File::open(path)?;
    let destination = File::create(PathBuf::from(target))?;
    zstd::stream::copy_encode(source, destination, 0)?;
    fs::remove_file(path)
}

/// One parsed line of an application log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub level: String,
    pub logger: String,
    pub source: String,
    pub line: u32,
    pub message: String,
}

pub fn parse_log_line(line: &str) -> Option<LogEntry> {
    let caps = LINE_PATTERN.captures(line.trim())?;
    Some(LogEntry {
        timestamp: NaiveDateTime::parse_from_str(&caps[1], TIMESTAMP_FORMAT).ok()?,
        level: caps[2].to_string(),
        logger: caps[3].to_string(),
        source: caps[4].to_string(),
        line: caps[5].parse().ok()?,
        message: caps[6].to_string(),
    })
}

fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_uppercase().as_str() {
        "WARNING" => "WARN".to_string(),
        other => other.to_string(),
    }
}

/// Line filters built from the `view-logs` flags.
#[derive(Debug)]
pub struct LogFilter {
    cutoff: NaiveDateTime,
    level: Option<String>,
    user: Option<Regex>,
    ip: Option<Regex>,
    errors_only: bool,
}

impl LogFilter {
    pub fn new(args: &ViewArgs, now: NaiveDateTime) -> Result<Self, Box<dyn std::error::Error>> {
        let user = match &args.user {
            Some(user) => Some(Regex::new(&format!("(?i)User: .*{}.*", regex::escape(user)))?),
            None => None,
        };
        let ip = match &args.ip {
            Some(ip) => Some(Regex::new(&format!("(?i)IP: {}", regex::escape(ip)))?),
            None => None,
        };
        Ok(LogFilter {
            cutoff: now - chrono::Duration::hours(args.hours),
            level: args.level.as_deref().map(normalize_level),
            user,
            ip,
            errors_only: args.errors_only,
        })
    }

    pub fn accepts(&self, entry: &LogEntry) -> bool {
        if entry.timestamp < self.cutoff {
            return false;
        }
        if self.level.as_ref().is_some_and(|level| *level != entry.level) {
            return false;
        }
        if self.user.as_ref().is_some_and(|re| !re.is_match(&entry.message)) {
            return false;
        }
        if self.ip.as_ref().is_some_and(|re| !re.is_match(&entry.message)) {
            return false;
        }
        !(self.errors_only && entry.level != "ERROR")
    }
}

/// Reads every requested log under `dir`, skipping missing files and
/// malformed lines.
pub fn read_logs(
    dir: &Path,
    files: &[String],
    filter: &LogFilter,
) -> Result<Vec<LogEntry>, Box<dyn std::error::Error>> {
    let mut entries = Vec::new();
    for name in files {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        for line in BufReader::new(File::open(&path)?).lines() {
            let Ok(line) = line else { continue };
            if let Some(entry) = parse_log_line(&line) {
                if filter.accepts(&entry) {
                    entries.push(entry);
                }
            }
        }
    }
    Ok(entries)
}

fn error_type(message: &str) -> &'static str {
    if message.contains("Database") {
        "Database Error"
    } else if message.contains("API") {
        "API Error"
    } else if message.contains("View") {
        "View Error"
    } else if message.contains("Middleware") {
        "Middleware Error"
    } else {
        "General Error"
    }
}

/// Most frequent first; ties in name order.
fn ranked(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LogSummary {
    pub levels: Vec<(String, usize)>,
    pub users: Vec<(String, usize)>,
    pub ips: Vec<(String, usize)>,
    pub errors: usize,
    pub error_types: Vec<(String, usize)>,
}

pub fn summarize(entries: &[LogEntry]) -> LogSummary {
    let mut levels = HashMap::new();
    let mut users = HashMap::new();
    let mut ips = HashMap::new();
    let mut error_types = HashMap::new();
    let mut errors = 0;

    for entry in entries {
        *levels.entry(entry.level.clone()).or_insert(0) += 1;
        if let Some(caps) = USER_PATTERN.captures(&entry.message) {
            *users.entry(caps[1].trim().to_string()).or_insert(0) += 1;
        }
        if let Some(caps) = IP_PATTERN.captures(&entry.message) {
            *ips.entry(caps[1].to_string()).or_insert(0) += 1;
        }
        if entry.level == "ERROR" {
            errors += 1;
            *error_types.entry(error_type(&entry.message).to_string()).or_insert(0) += 1;
        }
    }

    LogSummary {
        levels: ranked(levels),
        users: ranked(users),
        ips: ranked(ips),
        errors,
        error_types: ranked(error_types),
    }
}

pub fn handle_view_logs(args: ViewArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.log_dir.exists() {
        return Err(format!("Logs directory not found: {}", args.log_dir.display()).into());
    }
    let files: Vec<String> = match &args.log_file {
        Some(name) => vec![format!("{}.log", name)],
        None => LOG_FILES.iter().map(|f| f.to_string()).collect(),
    };
    let filter = LogFilter::new(&args, Utc::now().naive_utc())?;
    let entries = read_logs(&args.log_dir, &files, &filter)?;

    if entries.is_empty() {
        println!("No logs found matching the criteria.");
        return Ok(());
    }

    if !args.summary {
        println!("\nShowing {} log entries:\n", entries.len());
        for entry in &entries {
            let stamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S");
            println!("[{}] {} - {}", stamp, entry.level, entry.message);
        }
        return Ok(());
    }

    let summary = summarize(&entries);
    println!("\nLog Summary (Last {} hours):\n", args.hours);
    println!("{}", "=".repeat(50));
    println!("\nLog Levels:");
    for (level, count) in &summary.levels {
        println!("  {}: {}", level, count);
    }
    if !summary.users.is_empty() {
        println!("\nTop {} Users:", args.top_users);
        for (user, count) in summary.users.iter().take(args.top_users) {
            println!("  {}: {} actions", user, count);
        }
    }
    if !summary.ips.is_empty() {
        println!("\nTop {} IP Addresses:", args.top_ips);
        for (ip, count) in summary.ips.iter().take(args.top_ips) {
            println!("  {}: {} requests", ip, count);
        }
    }
    if summary.errors > 0 {
        println!("\nError Analysis ({} errors):", summary.errors);
        for (kind, count) in summary.error_types.iter().take(5) {
            println!("  {}: {} occurrences", kind, count);
        }
    }
    Ok(())
}
