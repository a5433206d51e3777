//! Formatted output helpers for CLI commands.
//!
//! Verdicts go to stderr so `--json` reports on stdout stay parseable.

use buildprobe_verify::suite::SuiteReport;
use buildprobe_verify::verifier::Verification;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Prints the one-line verdict of a single verification.
///
/// The full log of a failed verification is carried by the returned error,
/// not printed here.
pub fn print_verification(verification: &Verification) {
    match verification {
        Verification::Passed { index, entry, .. } => {
            eprintln!(
                "  {GREEN}{BOLD}PASS{RESET} build failed as expected {DIM}(entry {index}){RESET}"
            );
            eprintln!("       {}", entry.stream_text().trim_end());
        }
        other => {
            eprintln!("  {RED}{BOLD}FAIL{RESET} {}", other.outcome());
        }
    }
}

/// Prints a suite report as an aligned table followed by failure details.
pub fn print_suite_report(report: &SuiteReport) {
    eprintln!();
    eprintln!(
        "  {BOLD}buildprobe{RESET} {DIM}engine={} fixture={}{RESET}",
        report.engine,
        report.fixture.display()
    );
    eprintln!();

    let width = report
        .scenarios
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0);
    for scenario in &report.scenarios {
        let status = if scenario.passed() {
            format!("{GREEN}PASS{RESET}")
        } else {
            format!("{RED}FAIL{RESET}")
        };
        eprintln!(
            "  {status} {:<width$}  {DIM}{}{RESET}",
            scenario.name,
            format_duration(scenario.duration_ms)
        );
    }

    for scenario in report.scenarios.iter().filter(|s| !s.passed()) {
        eprintln!();
        eprintln!("  {RED}{BOLD}{}{RESET}: {}", scenario.name, scenario.detail);
        if let Some(path) = &scenario.log_path {
            eprintln!("  {DIM}log saved to {}{RESET}", path.display());
        }
    }

    let passed = report.scenarios.len() - report.failed_count();
    eprintln!();
    eprintln!(
        "  {passed}/{} passed in {}",
        report.scenarios.len(),
        format_duration(elapsed_ms(report))
    );
}

fn elapsed_ms(report: &SuiteReport) -> u64 {
    let ms = (report.finished_at - report.started_at).num_milliseconds();
    u64::try_from(ms).unwrap_or(0)
}

/// Formats a millisecond duration (e.g., "850ms", "12.3s", "2m05s").
#[must_use]
pub fn format_duration(ms: u64) -> String {
    const SECOND: u64 = 1000;
    const MINUTE: u64 = 60 * SECOND;

    if ms >= MINUTE {
        format!("{}m{:02}s", ms / MINUTE, (ms % MINUTE) / SECOND)
    } else if ms >= SECOND {
        format!("{}.{}s", ms / SECOND, (ms % SECOND) / 100)
    } else {
        format!("{ms}ms")
    }
}
