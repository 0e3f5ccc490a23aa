//! Terminal consent surface
//!
//! Prints the authorization URL, tries to open it in a browser, then asks the
//! user to paste the URL the provider redirected to.

use async_trait::async_trait;
use social_linkup::auth::open_in_browser;
use social_linkup::{ConsentOutcome, ConsentSurface, LinkupError, Result};
use url::Url;

use crate::output;

/// Reads the callback URL from the terminal
#[derive(Debug, Default)]
pub struct TerminalConsent;

#[async_trait]
impl ConsentSurface for TerminalConsent {
    async fn present(&self, url: &Url, callback_scheme: &str) -> Result<ConsentOutcome> {
        output::display_authorization_url(url);
        if let Err(e) = open_in_browser(url) {
            tracing::debug!("Browser launch failed: {e}");
            output::display_warning("Could not open a browser, open the URL above manually");
        }

        let prompt = format!("Paste the {callback_scheme}:// URL (empty to cancel)");
        let answer = tokio::task::spawn_blocking(move || {
            cliclack::input(prompt)
                .placeholder("cancel")
                .required(false)
                .interact::<String>()
        })
        .await
        .map_err(|e| LinkupError::consent(e.to_string()))?
        .map_err(|e| LinkupError::consent(e.to_string()))?;

        parse_answer(&answer, callback_scheme)
    }
}

fn parse_answer(answer: &str, callback_scheme: &str) -> Result<ConsentOutcome> {
    let answer = answer.trim();
    if answer.is_empty() || answer.eq_ignore_ascii_case("cancel") {
        return Ok(ConsentOutcome::Cancelled);
    }

    let callback = Url::parse(answer).map_err(|e| LinkupError::invalid_callback(e.to_string()))?;
    // Url lowercases the scheme it parses.
    if !callback.scheme().eq_ignore_ascii_case(callback_scheme) {
        return Err(LinkupError::invalid_callback(format!(
            "expected a {callback_scheme}:// URL, got {}://",
            callback.scheme()
        )));
    }
    Ok(ConsentOutcome::Callback(callback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_answer_cancels() {
        assert_eq!(parse_answer("  ", "linkup").unwrap(), ConsentOutcome::Cancelled);
        assert_eq!(parse_answer("cancel", "linkup").unwrap(), ConsentOutcome::Cancelled);
    }

    #[test]
    fn test_callback_must_use_scheme() {
        let outcome = parse_answer("linkup://auth/callback?code=a&state=b", "linkup").unwrap();
        assert!(matches!(outcome, ConsentOutcome::Callback(url) if url.scheme() == "linkup"));

        assert!(matches!(
            parse_answer("https://example.com/?code=a", "linkup"),
            Err(LinkupError::InvalidCallback(_))
        ));
    }

    #[test]
    fn test_scheme_match_ignores_case() {
        let outcome = parse_answer(
            "SocialLinkup://auth/callback?code=a&state=b",
            "SocialLinkup",
        )
        .unwrap();
        assert!(matches!(outcome, ConsentOutcome::Callback(_)));
    }
}
