//! ==============================================================================
//! render.rs - server-side html for the dashboard tabs
//! ==============================================================================
//!
//! purpose:
//!     turns an aggregator snapshot into the three dashboard tabs:
//!     - principal:  latest temperature/humidity + last 15 readings tables
//!     - devices:    sensor list (toggle pick) + soil state of the selected pot
//!     - statistics: average / median / mode / range per metric
//!
//! placeholders:
//!     sensor unknown or nothing selected -> "no data"
//!     sensor known, series not arrived   -> "loading"
//!
//! ==============================================================================

use crate::aggregator::Aggregator;
use crate::classify::HumidityState;
use crate::domain::{Metric, MetricSeries, SensorRecord};
use crate::i18n::{translations, Language, Translations};
use crate::selection::View;
use crate::timefmt::format_clock;

use chrono_tz::Tz;
use std::fmt::Write;

/// everything one page render needs besides the aggregator
#[derive(Clone, Copy, Debug)]
pub struct PageContext {
    pub view: View,
    pub language: Language,
    pub timezone: Tz,
}

pub fn render_page(aggregator: &Aggregator, ctx: PageContext) -> String {
    let t = translations(ctx.language);
    let body = match ctx.view {
        View::Principal => principal(aggregator, ctx, t),
        View::Devices => devices(aggregator, ctx, t),
        View::Statistics => statistics(aggregator, ctx, t),
    };

    format!(
        r#"<!doctype html>
<html lang="{lang}">
<head>
<meta charset="utf-8">
<title>Macetas - {title}</title>
<style>{style}</style>
</head>
<body>
{sidebar}
<main>
{nav}
{body}
</main>
</body>
</html>"#,
        lang = ctx.language.tag(),
        title = tab_label(ctx.view, t),
        style = STYLE,
        sidebar = sidebar(ctx, t),
        nav = nav_bar(aggregator, ctx, t),
        body = body,
    )
}

const STYLE: &str = "body{font-family:system-ui;margin:0;display:flex;min-height:100vh;background:#f4f7f4;color:#1f2d1f}\
aside{width:12rem;background:#2f7d32;color:#fff;padding:1rem}aside a{display:block;color:#fff;padding:.5rem 0;text-decoration:none}\
aside a.active{font-weight:bold;text-decoration:underline}main{flex:1;padding:1.5rem}\
nav{display:flex;gap:.5rem;align-items:center;margin-bottom:1rem}.card{background:#fff;border-radius:12px;box-shadow:0 1px 3px #0002;padding:1rem;margin-bottom:1rem}\
.grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(14rem,1fr));gap:1rem}.big{font-size:2rem;font-weight:bold}\
table{width:100%;border-collapse:collapse}td,th{text-align:left;padding:.3rem;border-bottom:1px solid #ddd}\
button{border:1px solid #2f7d32;background:#fff;border-radius:8px;padding:.3rem .8rem;cursor:pointer}button.active{background:#2f7d32;color:#fff}\
.state-dry{color:#b45309}.state-optimal{color:#15803d}.state-wet{color:#1d4ed8}.muted{color:#888}";

fn tab_label(view: View, t: &Translations) -> &'static str {
    match view {
        View::Principal => t.principal,
        View::Devices => t.devices,
        View::Statistics => t.statistics,
    }
}

fn sidebar(ctx: PageContext, t: &Translations) -> String {
    let mut html = String::from("<aside>\n<h2>Macetas</h2>\n");
    for view in View::ALL {
        let class = if view == ctx.view { " class=\"active\"" } else { "" };
        let _ = writeln!(
            html,
            r#"<a href="/?tab={}&lang={}"{}>{}</a>"#,
            view.as_str(),
            ctx.language.tag(),
            class,
            tab_label(view, t)
        );
    }
    html.push_str("</aside>");
    html
}

/// sensor picker + language switch
fn nav_bar(aggregator: &Aggregator, ctx: PageContext, t: &Translations) -> String {
    let other = match ctx.language {
        Language::Es => Language::En,
        Language::En => Language::Es,
    };
    let mut html = format!("<nav>\n<span>{}:</span>\n", t.active_devices);

    let active = aggregator.active_selection(ctx.view);
    for id in aggregator.known_sensor_ids() {
        let class = if active == Some(id) { " class=\"active\"" } else { "" };
        let _ = writeln!(
            html,
            r#"<form method="post" action="/select"><input type="hidden" name="view" value="{view}"><input type="hidden" name="sensor" value="{id}"><input type="hidden" name="lang" value="{lang}"><button{class}>{id}</button></form>"#,
            view = ctx.view.as_str(),
            id = html_escape(id),
            lang = ctx.language.tag(),
            class = class,
        );
    }
    let _ = writeln!(
        html,
        r#"<a href="/?tab={}&lang={}" title="{}">{}</a>"#,
        ctx.view.as_str(),
        other.tag(),
        t.change_language,
        other.tag().to_uppercase()
    );
    html.push_str("</nav>");
    html
}

// ==============================================================================
// tabs
// ==============================================================================

fn principal(aggregator: &Aggregator, ctx: PageContext, t: &Translations) -> String {
    let mut html = format!(r#"<div class="card"><h1>{}</h1></div>"#, t.welcome_message);

    let Some((id, record)) = aggregator.active_record(ctx.view) else {
        let _ = write!(html, r#"<div class="card muted">{}</div>"#, t.no_sensor_selected);
        return html;
    };
    let Some(record) = record else {
        let _ = write!(html, r#"<div class="card muted">{}</div>"#, t.no_data);
        return html;
    };

    let _ = write!(html, "<h2>{}</h2>\n<div class=\"grid\">", html_escape(id));
    for metric in Metric::ALL {
        let label = metric_label(metric, t);
        let latest = match record.latest(metric) {
            Some(r) => format!("{:.1}{}", r.value, metric.unit()),
            None => placeholder(record.series(metric), t).to_string(),
        };
        let _ = write!(html, r#"<div class="card"><div>{}</div><div class="big">{}</div></div>"#, label, latest);
    }
    html.push_str("</div>\n<div class=\"grid\">");
    html.push_str(&readings_table(record, Metric::Temperature, t.temperature_readings, ctx, t));
    html.push_str(&readings_table(record, Metric::Humidity, t.humidity_readings, ctx, t));
    html.push_str("</div>");
    html
}

fn devices(aggregator: &Aggregator, ctx: PageContext, t: &Translations) -> String {
    let mut html = format!("<h1>{}</h1>\n", t.devices);
    if aggregator.known_sensor_ids().is_empty() {
        let _ = write!(html, r#"<div class="card muted">{}</div>"#, t.no_data);
        return html;
    }

    let Some((id, record)) = aggregator.active_record(ctx.view) else {
        let _ = write!(html, r#"<div class="card muted">{}</div>"#, t.no_sensor_selected);
        return html;
    };

    let _ = write!(html, "<div class=\"card\"><h2>{}</h2>", html_escape(id));
    match record {
        None => {
            let _ = write!(html, r#"<p class="muted">{}</p>"#, t.no_data);
        }
        Some(record) => {
            for metric in Metric::ALL {
                let value = match record.latest(metric) {
                    Some(r) => format!("{:.1}{}", r.value, metric.unit()),
                    None => placeholder(record.series(metric), t).to_string(),
                };
                let _ = write!(html, "<p>{}: <strong>{}</strong></p>", metric_label(metric, t), value);
            }
            if let Some(humidity) = record.latest(Metric::Humidity) {
                let state = HumidityState::classify(humidity.value);
                let _ = write!(
                    html,
                    r#"<p>{}: <strong class="{}">{}</strong></p>"#,
                    t.soil_state,
                    state.css(),
                    state.label(t)
                );
            }
            if let Some(latest) = record.latest(Metric::Temperature) {
                if let Some(clock) = format_clock(latest.time, ctx.timezone) {
                    let _ = write!(html, r#"<p class="muted">{}: {}</p>"#, t.last_update, clock);
                }
            }
        }
    }
    html.push_str("</div>");
    html
}

fn statistics(aggregator: &Aggregator, ctx: PageContext, t: &Translations) -> String {
    let mut html = format!("<h1>{}</h1>\n", t.statistics);
    let Some((id, record)) = aggregator.active_record(ctx.view) else {
        let _ = write!(html, r#"<div class="card muted">{}</div>"#, t.no_sensor_selected);
        return html;
    };

    let _ = write!(html, "<h2>{}</h2>\n<div class=\"grid\">", html_escape(id));
    for metric in Metric::ALL {
        let _ = write!(html, r#"<div class="card"><h3>{}</h3>"#, metric_label(metric, t));
        match (record, aggregator.stats_for(id, metric)) {
            (_, Some(stats)) => {
                let unit = metric.unit();
                let _ = write!(
                    html,
                    "<table>\
                     <tr><th>{}</th><td>{:.2}{u}</td></tr>\
                     <tr><th>{}</th><td>{:.2}{u}</td></tr>\
                     <tr><th>{}</th><td>{:.2}{u}</td></tr>\
                     <tr><th>{}</th><td>{:.1}{u} – {:.1}{u}</td></tr>\
                     </table>",
                    t.average,
                    stats.average,
                    t.median,
                    stats.median,
                    t.mode,
                    stats.mode,
                    t.range,
                    stats.min,
                    stats.max,
                    u = unit,
                );
            }
            (None, None) => {
                let _ = write!(html, r#"<p class="muted">{}</p>"#, t.no_data);
            }
            (Some(record), None) => {
                let _ = write!(html, r#"<p class="muted">{}</p>"#, placeholder(record.series(metric), t));
            }
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}

// ==============================================================================
// pieces
// ==============================================================================

fn readings_table(
    record: &SensorRecord,
    metric: Metric,
    title: &str,
    ctx: PageContext,
    t: &Translations,
) -> String {
    let mut html = format!(r#"<div class="card"><h3>{}</h3>"#, title);
    match record.series(metric) {
        Some(series) if !series.is_empty() => {
            let _ = write!(html, "<table><tr><th>{}</th><th>{}</th></tr>", t.time, t.value);
            // newest first
            for reading in series.readings().iter().rev() {
                let clock = format_clock(reading.time, ctx.timezone).unwrap_or_else(|| "--:--:--".to_string());
                let _ = write!(
                    html,
                    "<tr><td>{}</td><td>{:.1}{}</td></tr>",
                    clock,
                    reading.value,
                    metric.unit()
                );
            }
            html.push_str("</table>");
        }
        other => {
            let _ = write!(html, r#"<p class="muted">{}</p>"#, placeholder(other, t));
        }
    }
    html.push_str("</div>");
    html
}

/// unset series is still loading; an arrived-but-empty one has no data
fn placeholder(series: Option<&MetricSeries>, t: &Translations) -> &'static str {
    match series {
        None => t.loading,
        Some(_) => t.no_data,
    }
}

fn metric_label(metric: Metric, t: &Translations) -> &'static str {
    match metric {
        Metric::Temperature => t.temperature,
        Metric::Humidity => t.humidity,
    }
}

/// escape html special characters to prevent xss
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
