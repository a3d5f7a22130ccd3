//! Plain-text rendering of reports.
//!
//! Two sentences are fixed: an unavailable source's section reads
//! [`UNAVAILABLE_SENTENCE`], and a report with no available source at all
//! reads only [`NO_DATA_SENTENCE`].

use crate::analysis::TimeBlock;
use crate::domain::{Arrival, ReportMode, SourceKind};

use super::{Report, SourceSection};

pub const UNAVAILABLE_SENTENCE: &str = "⚠️ Real-time data unavailable.";

pub const NO_DATA_SENTENCE: &str = "⚠️ No real-time data available.";

/// Chat transports reject longer messages.
pub const DEFAULT_MESSAGE_LIMIT: usize = 4000;

/// Arrivals listed per source in the look-ahead report.
const MAX_LISTED: usize = 8;

/// Render `report` for its mode.
pub fn format_report(report: &Report) -> String {
    if report.all_unavailable() {
        return NO_DATA_SENTENCE.to_string();
    }
    let mut out = match report.mode {
        ReportMode::Now => format_now(report),
        ReportMode::Tomorrow => format_tomorrow(report),
    };
    out.push('\n');
    next_tgv(&mut out, report.next_tgv.as_ref());
    out.trim_end().to_string()
}

fn line(out: &mut String, text: impl AsRef<str>) {
    out.push_str(text.as_ref());
    out.push('\n');
}

fn section_title(kind: SourceKind) -> String {
    format!("{} {} ({})", kind.icon(), kind.heading(), kind.location())
}

fn describe(arrival: &Arrival) -> String {
    let delay = match arrival.delay_minutes() {
        Some(m) if m > 0 => format!(" ⏱+{m}m"),
        Some(m) if m < 0 => format!(" ⏱{m}m"),
        _ => String::new(),
    };
    format!(
        "{} — {} from {}{}",
        arrival.timestamp.format("%H:%M"),
        arrival.identifier,
        arrival.origin,
        delay
    )
}

fn peak_line(out: &mut String, section: &SourceSection) {
    if let Some(peak) = &section.peak {
        line(
            out,
            format!(
                "  📈 Peak: {} ({} {})",
                peak.label(),
                peak.count,
                section.kind.noun(peak.count)
            ),
        );
    }
}

fn now_section(out: &mut String, section: &SourceSection, next: Option<&Arrival>) {
    let title = section_title(section.kind);
    if !section.is_available() {
        line(out, &title);
        line(out, format!("  {UNAVAILABLE_SENTENCE}"));
        return;
    }

    let arrivals = section.arrivals();
    if arrivals.is_empty() {
        line(out, &title);
        line(out, format!("  No {} due in this window.", section.kind));
        if let Some(next) = next {
            line(out, format!("  Next: {}", describe(next)));
        }
        return;
    }

    line(out, format!("{title}: {} due", arrivals.len()));
    for arrival in arrivals.iter().take(MAX_LISTED) {
        line(out, format!("  {}", describe(arrival)));
    }
    if arrivals.len() > MAX_LISTED {
        line(out, format!("  … +{} more", arrivals.len() - MAX_LISTED));
    }
    peak_line(out, section);
}

fn format_now(report: &Report) -> String {
    let mut out = String::new();
    let hours = report.window.span().num_hours();
    line(&mut out, format!("📊 Next {hours} Hours"));
    line(
        &mut out,
        format!("🕐 {}", report.generated_at.format("%A %d %b %Y, %H:%M")),
    );
    line(&mut out, format!("📅 {}", report.window_description()));

    for section in report.sections() {
        out.push('\n');
        now_section(&mut out, section, report.next_of(section.kind));
    }

    out.push('\n');
    recommendation(&mut out, report);
    out
}

fn tomorrow_section(out: &mut String, section: &SourceSection) {
    let title = section_title(section.kind);
    if !section.is_available() {
        line(out, format!("{title}: {UNAVAILABLE_SENTENCE}"));
        return;
    }

    let arrivals = section.arrivals();
    match (arrivals.first(), arrivals.last()) {
        (Some(first), Some(last)) => line(
            out,
            format!(
                "{title}: {} arrivals ({}–{})",
                arrivals.len(),
                first.timestamp.format("%H:%M"),
                last.timestamp.format("%H:%M")
            ),
        ),
        _ => line(out, format!("{title}: none scheduled")),
    }
    peak_line(out, section);
}

fn block_line(block: &TimeBlock) -> String {
    if block.count() == 0 {
        return format!("  ▫ {}: —", block.label());
    }
    let parts: Vec<String> = [SourceKind::Flight, SourceKind::Train]
        .into_iter()
        .filter_map(|kind| {
            let n = block.count_of(kind);
            (n > 0).then(|| format!("{n} {}", kind.icon()))
        })
        .collect();
    format!("  ▸ {}: {} ({})", block.label(), block.count(), parts.join(", "))
}

fn format_tomorrow(report: &Report) -> String {
    let mut out = String::new();
    line(&mut out, format!("📅 Tomorrow — {}", report.window_description()));
    line(
        &mut out,
        format!("🕐 Generated {}", report.generated_at.format("%H:%M")),
    );
    out.push('\n');

    for section in report.sections() {
        tomorrow_section(&mut out, section);
    }

    if let Some(blocks) = &report.time_blocks {
        out.push('\n');
        line(&mut out, "📊 By Time Block");
        for block in blocks {
            line(&mut out, block_line(block));
        }
    }

    out.push('\n');
    recommendation(&mut out, report);
    out
}

fn recommendation(out: &mut String, report: &Report) {
    line(out, "🚖 Recommendation");
    line(out, format!("  ▸ {}", report.recommendation));
}

fn next_tgv(out: &mut String, tgv: Option<&Arrival>) {
    match tgv {
        Some(tgv) => line(
            out,
            format!(
                "🚄 Next TGV to Gare Centrale: {} ({}) from {}",
                tgv.timestamp.format("%H:%M"),
                tgv.timestamp.format("%a %d %b"),
                tgv.origin
            ),
        ),
        None => line(out, "🚄 Next TGV: no data available"),
    }
}

/// Split `text` into chunks of at most `limit` bytes, cutting at line
/// breaks where possible.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    // `None` until the current part has its first line, which may be blank.
    let mut parts = Vec::new();
    let mut current: Option<String> = None;
    for line in text.split('\n') {
        if let Some(part) = current.as_mut()
            && part.len() + 1 + line.len() <= limit
        {
            part.push('\n');
            part.push_str(line);
            continue;
        }

        if let Some(part) = current.take()
            && !part.is_empty()
        {
            parts.push(part);
        }
        if line.len() <= limit {
            current = Some(line.to_string());
            continue;
        }

        // A single line longer than the limit: cut on char boundaries.
        let mut rest = line;
        while rest.len() > limit {
            let mut cut = limit;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                // First char alone is wider than the limit.
                cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
            }
            parts.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        current = Some(rest.to_string());
    }
    parts.extend(current.filter(|part| !part.is_empty()));
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_one_part() {
        assert_eq!(split_message("hello", 4000), vec!["hello"]);
    }

    #[test]
    fn splits_on_newlines() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(split_message(text, 9), vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn blank_line_at_a_part_boundary_is_kept() {
        let text = "aaaa\nbbbb\n\ncccc\ndddd";
        let parts = split_message(text, 9);
        assert_eq!(parts, vec!["aaaa\nbbbb", "\ncccc", "dddd"]);
        assert_eq!(parts.join("\n"), text);
    }

    #[test]
    fn long_line_is_cut_on_char_boundaries() {
        let text = "ééééé"; // 10 bytes
        let parts = split_message(text, 3);
        assert!(parts.iter().all(|p| p.len() <= 3));
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn no_part_exceeds_limit() {
        let text = (0..500).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let parts = split_message(&text, 200);
        assert!(parts.len() > 1);
        assert!(parts.iter().all(|p| p.len() <= 200));
        assert_eq!(parts.join("\n"), text);
    }
}
