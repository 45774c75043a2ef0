use std::fmt::Write as _;
use std::time::Duration;

use crate::dashboard::{Banner, View, loading_message};
use crate::summary::{Direction, Point, SummaryCard};
use crate::types::FilterTab;

const CHART_WIDTH: f64 = 480.0;
const CHART_HEIGHT: f64 = 192.0;

/// Minimal HTML escaping for text and attribute values.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn page(body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>Spending Dashboard</title>\
         <meta name=\"description\" content=\"Track and analyze your spending\">\
         </head><body>{body}</body></html>"
    )
}

/// Sign-in landing page, optionally explaining why the last attempt failed.
pub(super) fn sign_in(auth_path: &str, error: Option<&str>) -> String {
    let mut body = String::from("<main class=\"signin\"><h1>Welcome to finmon</h1><p>Your Spending, Simplified</p>");
    if let Some(code) = error {
        let _ = write!(
            body,
            "<div class=\"error\" role=\"alert\">Sign in failed ({}). Please try again.</div>",
            escape(code)
        );
    }
    let _ = write!(
        body,
        "<section><h2>Sign in to your account</h2>\
         <p>Use your Google account to continue</p>\
         <a class=\"button\" href=\"{}/signin/google\">Sign in with Google</a></section>\
         <p class=\"terms\">By signing in, you agree to our <strong>Terms &amp; Conditions</strong>.</p></main>",
        escape(auth_path)
    );
    page(&body)
}

/// Dashboard page for one [`View`].
pub(super) fn dashboard(view: &View, tab: FilterTab, auth_path: &str) -> String {
    let body = match view {
        View::Loading => format!(
            "<main class=\"loading\"><div class=\"spinner\"></div><p>{}</p></main>",
            escape(loading_message(Duration::ZERO))
        ),
        View::SignIn => return sign_in(auth_path, None),
        View::Reauthenticate => format!(
            "<main class=\"reauth\"><p>No access token available. Please logout and sign in again.</p>\
             <form method=\"post\" action=\"{}/signout\"><button>Logout and Sign in</button></form></main>",
            escape(auth_path)
        ),
        View::Error(banner) => format!(
            "<main>{}{}{}</main>",
            navbar(None, tab, auth_path),
            error_banner(*banner),
            tabs(tab)
        ),
        View::Summary { tab, user, cards } => {
            let mut content = String::new();
            for card in cards {
                content.push_str(&summary_card(card));
            }
            format!(
                "<main>{}<div class=\"summary\">{content}</div>{}</main>",
                navbar(Some(user.as_str()), *tab, auth_path),
                tabs(*tab)
            )
        }
    };
    page(&body)
}

fn navbar(user: Option<&str>, tab: FilterTab, auth_path: &str) -> String {
    format!(
        "<nav><h1>finmon</h1>\
         <form method=\"post\" action=\"/refresh?tab={tab}\"><button title=\"Refresh\">Refresh</button></form>\
         <details class=\"profile\"><summary>Profile</summary><h2>{}</h2>\
         <form method=\"post\" action=\"{}/signout\"><button>Logout</button></form></details></nav>",
        escape(user.unwrap_or("User")),
        escape(auth_path)
    )
}

fn error_banner(banner: Banner) -> String {
    format!(
        "<div class=\"error\" role=\"alert\">{}</div>",
        escape(banner.message())
    )
}

fn tabs(active: FilterTab) -> String {
    let mut out = String::from("<footer class=\"tabs\">");
    for tab in FilterTab::TABS {
        let class = if tab == active { " class=\"active\"" } else { "" };
        let _ = write!(out, "<a href=\"/?tab={tab}\"{class}>{tab}</a>");
    }
    out.push_str("</footer>");
    out
}

fn summary_card(card: &SummaryCard) -> String {
    let trend = match card.change.direction {
        Direction::Up => "up",
        Direction::Down | Direction::None => "down",
    };
    let mut out = format!(
        "<section class=\"card\" data-period=\"{}\"><h2>{}</h2><div class=\"caption\">{}</div>\
         <div class=\"total\">{}</div><div><span class=\"previous\">{}</span> \
         <span class=\"change {trend}\">{} {}</span></div>",
        card.period,
        escape(card.title),
        escape(card.caption),
        escape(&card.total),
        escape(&card.previous),
        card.change.direction.arrow(),
        escape(&card.change.label),
    );
    if let Some(series) = &card.series {
        out.push_str(&chart(series));
    }
    out.push_str("</section>");
    out
}

/// Inline SVG line chart of a spending series.
fn chart(series: &[Point]) -> String {
    let max = series
        .iter()
        .map(|p| p.amount)
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);
    let step = if series.len() > 1 {
        CHART_WIDTH / (series.len() - 1) as f64
    } else {
        0.0
    };
    let points: Vec<String> = series
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let x = i as f64 * step;
            let y = CHART_HEIGHT - (p.amount / max) * CHART_HEIGHT;
            format!("{x:.1},{y:.1}")
        })
        .collect();
    let mut out = format!(
        "<svg class=\"chart\" viewBox=\"0 0 {CHART_WIDTH} {CHART_HEIGHT}\" role=\"img\">\
         <polyline fill=\"none\" stroke=\"#000\" stroke-width=\"2\" points=\"{}\"/>",
        points.join(" ")
    );
    for p in series {
        let _ = write!(
            out,
            "<title>{}: ₹{:.2}</title>",
            escape(&p.date),
            p.amount
        );
    }
    out.push_str("</svg>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::Change;
    use crate::types::Period;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn sign_in_page_links_provider_and_shows_error() {
        let html = sign_in("/api/auth", Some("<access_denied>"));
        assert!(html.contains("href=\"/api/auth/signin/google\""));
        assert!(html.contains("&lt;access_denied&gt;"));
        assert!(!html.contains("<access_denied>"));
    }

    #[test]
    fn each_view_renders_its_own_page() {
        let html = dashboard(&View::Loading, FilterTab::Daily, "/api/auth");
        assert!(html.contains("Fetching the spendings"));

        let html = dashboard(&View::Reauthenticate, FilterTab::Daily, "/api/auth");
        assert!(html.contains("Logout and Sign in"));

        let html = dashboard(&View::Error(Banner::FetchFailed), FilterTab::Weekly, "/api/auth");
        assert!(html.contains("Failed to fetch spending data. Please try again."));
        assert!(html.contains("action=\"/refresh?tab=weekly\""));

        let html = dashboard(&View::SignIn, FilterTab::Daily, "/api/auth");
        assert!(html.contains("Sign in with Google"));
    }

    #[test]
    fn summary_renders_cards_and_chart() {
        let card = SummaryCard {
            period: Period::Weekly,
            title: "Weekly Spending",
            caption: "this week",
            total: "₹150.00".into(),
            previous: "Last Week ₹100.00".into(),
            change: Change {
                label: "50.00%".into(),
                direction: Direction::Up,
            },
            series: Some(vec![
                Point {
                    date: "2024-01-01".into(),
                    amount: 10.0,
                },
                Point {
                    date: "2024-01-02".into(),
                    amount: 20.0,
                },
            ]),
        };
        let view = View::Summary {
            tab: FilterTab::Weekly,
            user: "Asha <3".into(),
            cards: vec![card],
        };
        let html = dashboard(&view, FilterTab::Weekly, "/api/auth");

        assert!(html.contains("Weekly Spending"));
        assert!(html.contains("↑ 50.00%"));
        assert!(html.contains("Asha &lt;3"));
        assert!(html.contains("<polyline"));
        assert!(html.contains("points=\"0.0,96.0 480.0,0.0\""));
        assert!(html.contains("<a href=\"/?tab=weekly\" class=\"active\">weekly</a>"));
    }
}
