//! HTML report generation with D3.js charts
//!
//! The chart itself is drawn client-side from the serialized [`ChartSpec`];
//! no layout happens here. [`CHART_SCRIPT`] is shared with the serve UI so
//! both draw identical charts.
//!
//! [`ChartSpec`]: crate::analytics::ChartSpec

use crate::error::Result;
use crate::session::RenderBundle;
use std::io::Write;

pub const STYLE: &str = r#"
    :root {
        --bg: #0d1117;
        --card: #161b22;
        --border: #30363d;
        --text: #e6edf3;
        --dim: #7d8590;
        --accent: #58a6ff;
        --warn: #d29922;
    }
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
        background: var(--bg);
        color: var(--text);
        line-height: 1.5;
    }
    .container { max-width: 1600px; margin: 0 auto; padding: 2rem; }
    .header {
        display: flex;
        align-items: center;
        gap: 1rem;
        margin-bottom: 2rem;
        padding-bottom: 1rem;
        border-bottom: 1px solid var(--border);
    }
    .logo {
        font-size: 2.5rem;
        font-weight: 800;
        background: linear-gradient(135deg, var(--accent), #a371f7);
        -webkit-background-clip: text;
        -webkit-text-fill-color: transparent;
    }
    .subtitle { color: var(--dim); font-size: 1rem; }
    .stats { display: grid; grid-template-columns: repeat(3, 1fr); gap: 1rem; margin-bottom: 2rem; }
    .stat {
        background: var(--card);
        border: 1px solid var(--border);
        border-radius: 12px;
        padding: 1.5rem;
        text-align: center;
    }
    .stat-value { font-size: 2.5rem; font-weight: 700; line-height: 1.1; word-break: break-word; }
    .stat-value.medium { font-size: 1.5rem; }
    .stat-label { color: var(--dim); font-size: 0.875rem; text-transform: uppercase; letter-spacing: 0.05em; margin-top: 0.5rem; }
    .chart-card {
        background: var(--card);
        border: 1px solid var(--border);
        border-radius: 12px;
        padding: 1.5rem;
        margin-bottom: 2rem;
    }
    .chart-title { font-size: 1rem; font-weight: 600; margin-bottom: 1rem; color: var(--dim); }
    .notice { color: var(--warn); padding: 2rem; text-align: center; }
    table { width: 100%; border-collapse: collapse; font-size: 0.875rem; }
    th, td { padding: 0.5rem 0.75rem; border-bottom: 1px solid var(--border); text-align: left; }
    th { color: var(--dim); font-weight: 600; text-transform: uppercase; font-size: 0.75rem; }
    td.num { text-align: right; font-variant-numeric: tabular-nums; }
    .swatch { display: inline-block; width: 10px; height: 10px; border-radius: 2px; margin-right: 0.5rem; }
    .tooltip {
        position: absolute;
        pointer-events: none;
        background: #fff;
        color: #111;
        font-size: 12px;
        padding: 6px 8px;
        border-radius: 4px;
        box-shadow: 0 2px 6px rgba(0,0,0,0.4);
        opacity: 0;
    }
"#;

/// `drawChart(container, chart)` renders a serialized `ChartSpec` into `container`.
pub const CHART_SCRIPT: &str = r#"
function drawChart(container, chart) {
    const root = d3.select(container);
    root.selectAll('*').remove();
    if (!chart || chart.kind === 'nodata') return;

    const width = Math.max(container.clientWidth || 900, 480);
    const height = 600;
    const tip = d3.select('body').selectAll('div.tooltip').data([0]).join('div').attr('class', 'tooltip');
    const show = (event, html) => tip.html(html).style('left', (event.pageX + 12) + 'px').style('top', (event.pageY - 12) + 'px').style('opacity', 1);
    const hide = () => tip.style('opacity', 0);

    const svg = root.append('svg').attr('width', width).attr('height', height);
    svg.append('text').attr('x', width / 2).attr('y', 24).attr('text-anchor', 'middle')
        .attr('fill', '#e6edf3').attr('font-weight', 600).text(chart.title);

    if (chart.kind === 'bar') drawBar(svg, chart, width, height, show, hide);
    else if (chart.kind === 'pie') drawPie(svg, chart, width, height, show, hide);
    else if (chart.kind === 'treemap') drawTreemap(svg, chart, width, height, show, hide);
}

function drawBar(svg, chart, width, height, show, hide) {
    const horizontal = chart.orientation === 'horizontal';
    const m = { top: 50, right: 60, bottom: horizontal ? 50 : 140, left: horizontal ? 200 : 70 };
    const w = width - m.left - m.right, h = height - m.top - m.bottom;
    const g = svg.append('g').attr('transform', `translate(${m.left},${m.top})`);
    const cats = chart.bars.map(b => b.category);
    const maxV = d3.max(chart.bars, b => b.value) || 1;
    const band = d3.scaleBand().domain(cats).range(horizontal ? [0, h] : [0, w]).padding(0.2);
    const lin = d3.scaleLinear().domain([0, maxV * 1.1]).nice().range(horizontal ? [0, w] : [h, 0]);

    if (horizontal) {
        g.append('g').call(d3.axisLeft(band));
        g.append('g').attr('transform', `translate(0,${h})`).call(d3.axisBottom(lin));
    } else {
        g.append('g').attr('transform', `translate(0,${h})`).call(d3.axisBottom(band))
            .selectAll('text').attr('transform', 'rotate(-45)').style('text-anchor', 'end');
        g.append('g').call(d3.axisLeft(lin));
    }
    g.selectAll('.domain, .tick line').attr('stroke', '#30363d');
    g.selectAll('.tick text').attr('fill', '#7d8590');

    g.selectAll('rect').data(chart.bars).join('rect')
        .attr('x', b => horizontal ? 0 : band(b.category))
        .attr('y', b => horizontal ? band(b.category) : lin(b.value))
        .attr('width', b => horizontal ? lin(b.value) : band.bandwidth())
        .attr('height', b => horizontal ? band.bandwidth() : h - lin(b.value))
        .attr('fill', b => b.color)
        .on('mousemove', (e, b) => show(e, `<b>Error:</b> ${b.category}<br><b>Frequency:</b> ${b.value}`))
        .on('mouseleave', hide);

    g.selectAll('text.annotation').data(chart.bars).join('text').attr('class', 'annotation')
        .attr('fill', '#e6edf3').attr('font-size', 11)
        .attr('text-anchor', horizontal ? 'start' : 'middle')
        .attr('x', b => horizontal ? lin(b.value) + 6 : band(b.category) + band.bandwidth() / 2)
        .attr('y', b => horizontal ? band(b.category) + band.bandwidth() / 2 + 4 : lin(b.value) - 6)
        .text(b => b.annotation);

    svg.append('text').attr('x', m.left + w / 2).attr('y', height - 8).attr('text-anchor', 'middle')
        .attr('fill', '#7d8590').text(chart.x_axis_title);
    svg.append('text').attr('transform', `translate(16,${m.top + h / 2}) rotate(-90)`).attr('text-anchor', 'middle')
        .attr('fill', '#7d8590').text(chart.y_axis_title);
}

function drawPie(svg, chart, width, height, show, hide) {
    const radius = Math.min(width, height) / 2 - 110;
    const g = svg.append('g').attr('transform', `translate(${width / 2},${height / 2 + 20})`);
    const arcs = d3.pie().sort(null).value(s => s.value)(chart.slices);
    const arc = d3.arc().innerRadius(0).outerRadius(radius);
    const outer = d3.arc().innerRadius(radius * 1.15).outerRadius(radius * 1.15);

    g.selectAll('path').data(arcs).join('path')
        .attr('d', arc).attr('fill', a => a.data.color).attr('stroke', '#0d1117')
        .on('mousemove', (e, a) => show(e, `<b>Error:</b> ${a.data.label}<br><b>Frequency:</b> ${a.data.value}<br><b>Percentage:</b> ${a.data.percentage.toFixed(1)}%`))
        .on('mouseleave', hide);

    g.selectAll('text').data(arcs).join('text')
        .attr('transform', a => `translate(${outer.centroid(a)})`)
        .attr('text-anchor', a => (a.startAngle + a.endAngle) / 2 < Math.PI ? 'start' : 'end')
        .attr('fill', '#e6edf3').attr('font-size', 11)
        .text(a => a.data.text);
}

function drawTreemap(svg, chart, width, height, show, hide) {
    const top = 40;
    const data = { name: chart.root, children: chart.leaves.map(l => ({ ...l, name: l.label })) };
    const root = d3.hierarchy(data).sum(d => d.value || 0);
    d3.treemap().size([width, height - top]).paddingInner(2)(root);

    const cell = svg.append('g').attr('transform', `translate(0,${top})`)
        .selectAll('g').data(root.leaves()).join('g')
        .attr('transform', d => `translate(${d.x0},${d.y0})`);

    cell.append('rect')
        .attr('width', d => Math.max(0, d.x1 - d.x0)).attr('height', d => Math.max(0, d.y1 - d.y0))
        .attr('fill', d => d.data.color)
        .on('mousemove', (e, d) => show(e, `<b>Error:</b> ${d.data.label}<br><b>Frequency:</b> ${d.data.value}`))
        .on('mouseleave', hide);

    cell.append('text').attr('x', 4).attr('y', 16)
        .attr('fill', d => d.data.intensity > 0.6 ? '#111' : '#fff').attr('font-size', 12)
        .text(d => (d.x1 - d.x0) > 60 ? d.data.label : '');
}
"#;

pub fn write<W: Write>(writer: &mut W, bundle: &RenderBundle) -> Result<()> {
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    write!(
        writer,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Brakescope Error Report</title>
    <script src="https://d3js.org/d3.v7.min.js"></script>
    <style>{style}</style>
</head>
<body>
<div class="container">
    <div class="header">
        <div class="logo">Brakescope</div>
        <div class="subtitle">Brake log error frequencies &middot; generated {generated}</div>
    </div>
"#,
        style = STYLE,
        generated = generated,
    )?;

    write_metrics(writer, bundle)?;

    match bundle.no_data_reason {
        Some(reason) => writeln!(
            writer,
            r#"    <div class="chart-card"><div class="notice">{}</div></div>"#,
            html_escape(reason.message())
        )?,
        None => writeln!(writer, r#"    <div class="chart-card"><div id="chart"></div></div>"#)?,
    }

    write_view_table(writer, bundle)?;

    write!(
        writer,
        r#"</div>
<script>
{script}
const REPORT = {data};
if (REPORT.chart.kind !== 'nodata') drawChart(document.getElementById('chart'), REPORT.chart);
</script>
</body>
</html>
"#,
        script = CHART_SCRIPT,
        data = script_json(bundle)?,
    )?;

    Ok(())
}

fn write_metrics<W: Write>(writer: &mut W, bundle: &RenderBundle) -> Result<()> {
    let Some(metrics) = &bundle.metrics else {
        return Ok(());
    };

    writeln!(
        writer,
        r#"    <div class="stats">
        <div class="stat"><div class="stat-value">{total}</div><div class="stat-label">Total Errors</div></div>
        <div class="stat"><div class="stat-value medium">{mode}</div><div class="stat-label">Most Common Error</div></div>
        <div class="stat"><div class="stat-value">{freq}</div><div class="stat-label">Highest Frequency</div></div>
    </div>"#,
        total = metrics.total_display,
        mode = html_escape(&metrics.mode_description),
        freq = metrics.mode_frequency_display,
    )?;

    Ok(())
}

fn write_view_table<W: Write>(writer: &mut W, bundle: &RenderBundle) -> Result<()> {
    if bundle.working_view.is_empty() {
        return Ok(());
    }

    // Same palette order as the chart, except for the treemap's continuous scale
    let colors: Vec<Option<&str>> = match &bundle.chart {
        crate::analytics::ChartSpec::Bar(c) => c.bars.iter().map(|b| Some(b.color.as_str())).collect(),
        crate::analytics::ChartSpec::Pie(c) => c.slices.iter().map(|s| Some(s.color.as_str())).collect(),
        _ => vec![None; bundle.working_view.len()],
    };
    let total = bundle.metrics.as_ref().map_or(0, |m| m.total_count);

    writeln!(
        writer,
        r#"    <div class="chart-card">
        <div class="chart-title">Selected errors &middot; sorted by {} ({})</div>
        <table>
            <tr><th>Description</th><th>Frequency</th><th>Share</th></tr>"#,
        bundle.sort_key,
        if bundle.sort_ascending { "ascending" } else { "descending" },
    )?;

    for (record, color) in bundle.working_view.iter().zip(colors) {
        let swatch = color
            .map(|c| format!(r#"<span class="swatch" style="background:{}"></span>"#, c))
            .unwrap_or_default();
        writeln!(
            writer,
            r#"            <tr><td>{}{}</td><td class="num">{}</td><td class="num">{}</td></tr>"#,
            swatch,
            html_escape(&record.description),
            crate::analytics::metrics::group_thousands(record.frequency),
            crate::analytics::chart::format_percentage(crate::analytics::chart::percentage(record.frequency, total)),
        )?;
    }

    writeln!(writer, "        </table>\n    </div>")?;
    Ok(())
}

/// Bundle as JSON that is safe to inline in a `<script>` element.
pub fn script_json(bundle: &RenderBundle) -> Result<String> {
    Ok(serde_json::to_string(bundle)?.replace("</", "<\\/"))
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::ChartKind;
    use crate::model::{ErrorFrequencyRecord, SourceTables};
    use crate::session::{AnalyticsSession, Event};

    fn session() -> AnalyticsSession {
        let mut session = AnalyticsSession::new();
        session
            .load(SourceTables::from_frequencies(vec![
                ErrorFrequencyRecord::new("I_BP_LOW", 1200),
                ErrorFrequencyRecord::new("</script>", 3),
            ]))
            .unwrap();
        session
    }

    fn render(bundle: &RenderBundle) -> String {
        let mut out = Vec::new();
        write(&mut out, bundle).unwrap();
        String::from_utf8(out).unwrap()
    }

    // ==========================================================================
    // HTML REPORT TESTS
    // ==========================================================================

    #[test]
    fn test_report_has_metric_cards_and_chart() {
        let mut s = session();
        let html = render(&s.handle(Event::SelectAllMatching));

        assert!(html.contains("Total Errors"));
        assert!(html.contains("1,203"));
        assert!(html.contains("Most Common Error"));
        assert!(html.contains(r#"<div id="chart"></div>"#));
        assert!(html.contains("function drawChart("));
    }

    #[test]
    fn test_no_selection_shows_notice() {
        let html = render(&session().render());

        assert!(html.contains("Please select errors to visualize"));
        assert!(!html.contains("Total Errors"));
        assert!(!html.contains(r#"<div id="chart">"#));
    }

    #[test]
    fn test_descriptions_are_escaped() {
        let mut s = session();
        let html = render(&s.handle(Event::SelectAllMatching));

        assert!(html.contains("&lt;/script&gt;"));
        // The inline JSON must not close the script element early
        assert!(!html.contains("\"</script>\""));
        assert!(html.contains("\"<\\/script>\""));
    }

    #[test]
    fn test_treemap_rows_have_no_swatch() {
        let mut s = session();
        s.handle(Event::SelectAllMatching);
        let html = render(&s.handle(Event::SetChartKind { kind: ChartKind::Treemap }));
        assert!(!html.contains(r#"class="swatch""#));
    }

    #[test]
    fn test_chart_script_handles_every_kind() {
        for kind in ["'bar'", "'pie'", "'treemap'", "'nodata'"] {
            assert!(CHART_SCRIPT.contains(kind), "drawChart should handle {kind}");
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
