//! Styled output and the session status spinner

use std::time::Duration;

use console::style;
use social_linkup::{PostReport, Session, SessionStatus};
use tokio::sync::watch;
use url::Url;

/// Display the welcome greeting
pub fn display_greeting() {
    println!();
    println!("{}", style("╔══════════════════════════════════╗").cyan());
    println!("{}", style("║     Social Linkup                ║").cyan());
    println!("{}", style("╚══════════════════════════════════╝").cyan());
    println!();
}

/// Display the login state of every account
pub fn display_status(session: &Session) {
    let status = session.status();
    if status.accounts.is_empty() {
        display_warning("No platforms configured");
        return;
    }
    for (platform, account) in &status.accounts {
        let state = if account.logged_in {
            style("logged in").green()
        } else {
            style("logged out").dim()
        };
        let mut line = format!("  {:<10} {state}", platform.display_name());
        if !account.logged_in {
            println!("{line}");
            continue;
        }
        if let Some(name) = &account.username {
            line.push_str(&format!(" as {}", style(name).bold()));
        }
        if let Some(left) = session
            .credential(*platform)
            .and_then(|c| c.remaining_validity())
        {
            line.push_str(&format!(" {}", style(format_validity(left)).dim()));
        }
        println!("{line}");
    }
}

fn format_validity(left: Duration) -> String {
    let minutes = left.as_secs() / 60;
    match (minutes / (60 * 24), minutes / 60 % 24, minutes % 60) {
        (0, 0, m) => format!("(expires in {m}m)"),
        (0, h, m) => format!("(expires in {h}h {m}m)"),
        (d, h, _) => format!("(expires in {d}d {h}h)"),
    }
}

/// Display the URL the user must visit
pub fn display_authorization_url(url: &Url) {
    println!();
    println!("{}", style("Open this URL to authorize:").bold());
    println!("  {}", style(url.as_str()).underlined());
    println!();
}

/// Display the outcome of a post
pub fn display_report(report: &PostReport) {
    if report.is_empty() {
        display_warning("Not logged in to any platform, nothing was posted");
        return;
    }
    for result in report.succeeded() {
        match &result.post_id {
            Some(id) => display_success(&format!("{}: posted ({id})", result.platform)),
            None => display_success(&format!("{}: posted", result.platform)),
        }
    }
    for (platform, error) in report.failed() {
        display_error(&format!("{platform}: {error}"));
    }
}

/// Display a success line
pub fn display_success(msg: &str) {
    println!("{} {}", style("✓").green(), msg);
}

/// Display a warning
pub fn display_warning(msg: &str) {
    println!("{} {}", style("!").yellow(), style(msg).yellow());
}

/// Display an error
pub fn display_error(msg: &str) {
    eprintln!("{} {}", style("✗").red(), style(msg).red());
}

/// Mirror the session's loading flag with a spinner until the sender closes
pub async fn follow_loading(mut rx: watch::Receiver<SessionStatus>) {
    let mut spinner: Option<cliclack::ProgressBar> = None;
    while rx.changed().await.is_ok() {
        let status = rx.borrow_and_update().clone();
        match (status.loading, spinner.take()) {
            (true, None) => {
                let bar = cliclack::spinner();
                bar.start(status.loading_message.unwrap_or_default());
                spinner = Some(bar);
            }
            (true, Some(bar)) => {
                if let Some(message) = status.loading_message {
                    bar.set_message(message);
                }
                spinner = Some(bar);
            }
            (false, Some(bar)) => bar.stop(""),
            (false, None) => {}
        }
    }
    if let Some(bar) = spinner {
        bar.stop("");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_validity() {
        assert_eq!(format_validity(Duration::from_secs(59)), "(expires in 0m)");
        assert_eq!(format_validity(Duration::from_secs(7_140)), "(expires in 1h 59m)");
        assert_eq!(
            format_validity(Duration::from_secs(60 * 24 * 3600 + 5 * 3600)),
            "(expires in 60d 5h)"
        );
    }
}
