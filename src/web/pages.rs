//! Server-rendered HTML. Every interpolated value goes through
//! `html_escape`.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::db::User;
use crate::domain::{MachineState, UsageLog};
use crate::services::MachineOverview;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - labtrack</title>
<link rel="stylesheet" href="/static/app.css">
<script src="/static/app.js" defer></script>
</head>
<body>
<div id="toasts" aria-live="polite"></div>
{body}
</body>
</html>
"#,
        title = text(title),
    )
}

fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn format_hours(hours: f64) -> String {
    let mut out = format!("{hours:.2}");
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    out
}

fn notice(kind: &str, message: &str) -> String {
    format!(
        r#"<p class="notice {}">{}</p>"#,
        attr(kind),
        text(message)
    )
}

/// `notice` is a `(type, message)` pair shown above the form.
#[must_use]
pub fn login_page(notice_msg: Option<(&str, &str)>) -> String {
    let banner = notice_msg
        .map(|(kind, message)| notice(kind, message))
        .unwrap_or_default();

    layout(
        "Log in",
        &format!(
            r#"<main class="auth">
<h1>Log in</h1>
{banner}
<form method="post" action="/login">
<label>Email <input type="email" name="email" required autocomplete="username"></label>
<label>Password <input type="password" name="password" required autocomplete="current-password"></label>
<button type="submit">Log in</button>
</form>
<p>No account? <a href="/register">Register</a></p>
</main>"#
        ),
    )
}

#[must_use]
pub fn register_page(error: Option<&str>, min_password_length: usize) -> String {
    let banner = error.map(|e| notice("error", e)).unwrap_or_default();

    layout(
        "Register",
        &format!(
            r#"<main class="auth">
<h1>Create an account</h1>
{banner}
<form method="post" action="/register">
<label>Name <input type="text" name="name" required></label>
<label>Email <input type="email" name="email" required autocomplete="username"></label>
<label>Password <input type="password" name="password" required minlength="{min_password_length}" autocomplete="new-password"></label>
<button type="submit">Register</button>
</form>
<p>Already registered? <a href="/login">Log in</a></p>
</main>"#
        ),
    )
}

#[must_use]
pub fn dashboard_page(
    user: &User,
    machines: &[MachineOverview],
    assignable: &[User],
    logs: &[UsageLog],
) -> String {
    let body = format!(
        r#"<header class="top">
<h1>labtrack</h1>
<span class="who">{name} ({email}) &middot; {role}</span>
<a href="/logout">Log out</a>
</header>
<main>
<section id="machines" data-partial="/partials/machines">
{machines}
</section>
<section id="logs" data-partial="/partials/logs">
{logs}
</section>
</main>"#,
        name = text(&user.name),
        email = text(&user.email),
        role = user.role,
        machines = machines_partial(user, machines, assignable),
        logs = logs_partial(logs),
    );

    layout("Dashboard", &body)
}

/// Machine table plus every control whose options depend on machine state.
#[must_use]
pub fn machines_partial(user: &User, machines: &[MachineOverview], assignable: &[User]) -> String {
    let mut html = String::from(
        "<h2>Machines</h2>\n<table class=\"machines\">\n<thead><tr><th>IP</th><th>Status</th>\
         <th>Occupant</th><th>Project</th><th>Hours</th><th>Since</th><th>Contributors</th>\
         <th></th></tr></thead>\n<tbody>\n",
    );

    if machines.is_empty() {
        html.push_str("<tr><td colspan=\"8\" class=\"empty\">No machines registered</td></tr>\n");
    }
    for machine in machines {
        render_machine_row(&mut html, user, machine);
    }
    html.push_str("</tbody>\n</table>\n");

    if user.role.can_assign() {
        render_assignment_panel(&mut html, machines, assignable);
    }
    if user.role.can_manage_machines() {
        render_inventory_panel(&mut html, machines);
    }
    if user.role.can_promote() {
        html.push_str(
            r#"<div class="panel">
<h3>Promote user</h3>
<form method="post" action="/promote" data-async>
<input type="email" name="email" placeholder="user@example.com" required>
<select name="role"><option value="assigner">assigner</option><option value="manager">manager</option></select>
<button type="submit">Promote</button>
</form>
</div>
"#,
        );
    }

    html
}

fn usage_fields() -> &'static str {
    r#"<input type="text" name="project" placeholder="project" required>
<input type="number" name="duration" placeholder="hours" min="0" step="any" required>"#
}

fn ip_form(action: &str, ip: &str, label: &str) -> String {
    format!(
        r#"<form method="post" action="{action}" data-async><input type="hidden" name="ip" value="{ip}"><button type="submit">{label}</button></form>"#,
        action = attr(action),
        ip = attr(ip),
        label = text(label),
    )
}

fn render_machine_row(html: &mut String, user: &User, machine: &MachineOverview) {
    let ip = attr(&machine.ip);

    match &machine.state {
        MachineState::Free => {
            let _ = write!(
                html,
                r#"<tr class="free"><td>{ip_text}</td><td>free</td><td colspan="5"></td><td>
<form method="post" action="/book" data-async><input type="hidden" name="ip" value="{ip}">
{fields}
<button type="submit">Book</button></form></td></tr>
"#,
                ip_text = text(&machine.ip),
                fields = usage_fields(),
            );
        }
        MachineState::Occupied(occupancy) => {
            let occupant = machine.occupant_name.as_deref().unwrap_or(&occupancy.occupant);
            let status = if occupancy.main_released {
                "shared (occupant left)"
            } else {
                "occupied"
            };

            let mut contributors = String::new();
            for c in &machine.contributors {
                let _ = write!(
                    contributors,
                    "<li>{} &middot; {} &middot; {}h</li>",
                    text(&c.name),
                    text(&c.contribution.project),
                    format_hours(c.contribution.duration_hours),
                );
            }

            let mut actions = String::new();
            if machine.state.is_held_by(&user.email) {
                actions.push_str(&ip_form("/release/main", &machine.ip, "Release"));
            }
            if machine.has_contributor(&user.email) {
                actions.push_str(&ip_form("/release/contrib", &machine.ip, "Leave"));
            } else if user.role.can_self_contribute() && !machine.state.is_held_by(&user.email) {
                let _ = write!(
                    actions,
                    r#"<form method="post" action="/self/contribute" data-async><input type="hidden" name="ip" value="{ip}">
{fields}
<button type="submit">Contribute</button></form>"#,
                    fields = usage_fields(),
                );
            }

            let _ = write!(
                html,
                r#"<tr class="occupied"><td>{ip_text}</td><td>{status}</td><td>{occupant}</td><td>{project}</td><td>{hours}</td><td>{since}</td><td><ul>{contributors}</ul></td><td>{actions}</td></tr>
"#,
                ip_text = text(&machine.ip),
                occupant = text(occupant),
                project = text(&occupancy.project),
                hours = format_hours(occupancy.duration_hours),
                since = format_time(&occupancy.started_at),
            );
        }
    }
}

fn machine_options<'a>(machines: impl Iterator<Item = &'a MachineOverview>) -> String {
    let mut options = String::new();
    for machine in machines {
        let _ = write!(
            options,
            r#"<option value="{}">{}</option>"#,
            attr(&machine.ip),
            text(&machine.ip)
        );
    }
    options
}

fn render_assignment_panel(html: &mut String, machines: &[MachineOverview], assignable: &[User]) {
    let mut users = String::new();
    for user in assignable {
        let _ = write!(
            users,
            r#"<option value="{}">{} ({})</option>"#,
            attr(&user.email),
            text(&user.name),
            text(&user.email)
        );
    }

    let free = machine_options(machines.iter().filter(|m| m.state.is_free()));
    let occupied = machine_options(machines.iter().filter(|m| !m.state.is_free()));
    let fields = usage_fields();

    let _ = write!(
        html,
        r#"<div class="panel">
<h3>Assign a free machine</h3>
<form method="post" action="/assign/free" data-async>
<select name="ip" required>{free}</select>
<select name="email" required>{users}</select>
{fields}
<button type="submit">Assign</button>
</form>
<h3>Add a contributor</h3>
<form method="post" action="/assign/contribute" data-async>
<select name="ip" required>{occupied}</select>
<select name="email" required>{users}</select>
{fields}
<button type="submit">Add contributor</button>
</form>
</div>
"#
    );
}

fn render_inventory_panel(html: &mut String, machines: &[MachineOverview]) {
    let all = machine_options(machines.iter());
    let _ = write!(
        html,
        r#"<div class="panel">
<h3>Machines</h3>
<form method="post" action="/add/system" data-async>
<input type="text" name="ip" placeholder="10.0.0.5" required>
<button type="submit">Add</button>
</form>
<form method="post" action="/remove/system" data-async data-confirm="Remove this machine and everything on it?">
<select name="ip" required>{all}</select>
<button type="submit">Remove</button>
</form>
</div>
"#
    );
}

#[must_use]
pub fn logs_partial(logs: &[UsageLog]) -> String {
    let mut html = String::from(
        "<h2>Today's usage</h2>\n<table class=\"logs\">\n<thead><tr><th>IP</th><th>Who</th>\
         <th>Project</th><th>Hours</th><th>Started</th><th>Ended</th><th>Kind</th></tr></thead>\n<tbody>\n",
    );

    if logs.is_empty() {
        html.push_str("<tr><td colspan=\"7\" class=\"empty\">Nothing logged today</td></tr>\n");
    }
    for log in logs {
        let kind = match &log.main_occupant {
            Some(main) => format!("contribution to {}", text(main)),
            None => "primary".to_string(),
        };
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            text(&log.ip),
            text(&log.identity),
            text(&log.project),
            format_hours(log.duration_hours),
            format_time(&log.started_at),
            format_time(&log.ended_at),
            kind,
        );
    }
    html.push_str("</tbody>\n</table>\n");
    html
}
