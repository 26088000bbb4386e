use super::assembler::SecurityReport;

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn counter_card(label: &str, value: u64, class: &str) -> String {
    format!(
        "<div class=\"card {}\"><div class=\"value\">{}</div><div class=\"label\">{}</div></div>",
        class, value, html_escape(label)
    )
}

/// Fixed-structure page. Every interpolated value is escaped.
pub fn render_html_report(report: &SecurityReport) -> String {
    let c = &report.counters;
    let cards = [
        counter_card("Critical", c.critical, "critical"),
        counter_card("High", c.high, "high"),
        counter_card("Medium", c.medium, "medium"),
        counter_card("Secrets", c.secrets, "secrets"),
    ]
    .join("\n");

    let check_rows: String = report
        .checks
        .iter()
        .map(|check| {
            format!(
                "<tr><td>{}</td><td class=\"status-{}\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{} ms</td></tr>\n",
                html_escape(&check.name),
                check.status.label(),
                html_escape(check.status.reason().map_or(check.status.label(), |r| r)),
                check.counters.critical,
                check.counters.high,
                check.counters.medium,
                check.counters.secrets,
                check.duration_ms,
            )
        })
        .collect();

    let secret_rows: String = report
        .secret_matches()
        .map(|m| {
            format!(
                "<li><code>{}</code> in {}:{}</li>\n",
                html_escape(&m.pattern),
                html_escape(&m.file),
                m.line
            )
        })
        .collect();

    let header_rows: String = report
        .missing_headers()
        .map(|h| format!("<li>{}</li>\n", html_escape(h)))
        .collect();

    let verdict = if report.exit_code == 0 { "PASS" } else { "FAIL" };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Security Report</title>
<style>
body {{ font-family: -apple-system, Segoe UI, sans-serif; margin: 2rem; color: #1f2933; }}
.cards {{ display: flex; gap: 1rem; margin: 1rem 0; }}
.card {{ padding: 1rem 1.5rem; border-radius: 6px; background: #f5f7fa; min-width: 7rem; text-align: center; }}
.card .value {{ font-size: 2rem; font-weight: 600; }}
.critical {{ border-top: 4px solid #c0392b; }}
.high {{ border-top: 4px solid #e67e22; }}
.medium {{ border-top: 4px solid #f1c40f; }}
.secrets {{ border-top: 4px solid #8e44ad; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ border-bottom: 1px solid #e4e7eb; padding: 0.4rem 0.6rem; text-align: left; }}
.status-failed {{ color: #c0392b; }}
.status-skipped {{ color: #7b8794; }}
.verdict-PASS {{ color: #27ae60; }}
.verdict-FAIL {{ color: #c0392b; }}
</style>
</head>
<body>
<h1>Security Report</h1>
<p>Generated {generated} &middot; thresholds: critical &le; {max_critical}, high &le; {max_high} &middot; <strong class="verdict-{verdict}">{verdict}</strong></p>
<div class="cards">
{cards}
</div>
<h2>Checks</h2>
<table>
<tr><th>Check</th><th>Status</th><th>Detail</th><th>Critical</th><th>High</th><th>Medium</th><th>Secrets</th><th>Duration</th></tr>
{check_rows}</table>
<h2>Secret patterns matched</h2>
<ul>
{secret_rows}</ul>
<h2>Missing security headers</h2>
<ul>
{header_rows}</ul>
</body>
</html>
"#,
        generated = html_escape(&report.generated_at.to_rfc3339()),
        max_critical = report.policy.max_critical,
        max_high = report.policy.max_high,
        verdict = verdict,
        cards = cards,
        check_rows = check_rows,
        secret_rows = secret_rows,
        header_rows = header_rows,
    )
}
