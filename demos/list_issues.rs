//! List issues example.
//!
//! Lists the most recent open issues of a repository, then shows a
//! conditional refresh: the second pass yields nothing unless the
//! collection changed in between.
//!
//! Run with: cargo run --example list_issues -- octocat Hello-World

use hubkit::{Session, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Issue {
    number: u64,
    title: String,
    #[serde(default)]
    comments: u64,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let owner = args.next().unwrap_or_else(|| "octocat".to_string());
    let repo = args.next().unwrap_or_else(|| "Hello-World".to_string());

    let session = Session::new()?;
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        session.set_token_auth(&token);
    }

    let url = session.build_url(&["repos", &owner, &repo, "issues"]);
    let mut issues = session
        .iter::<Issue>(20, &url)
        .with_params([("state", "open")]);

    println!("Open issues in {owner}/{repo}:");
    for issue in issues.by_ref() {
        let issue = issue?;
        println!("  #{:<6} {} ({} comments)", issue.number, issue.title, issue.comments);
    }

    let changed: Vec<Issue> = issues.refresh(true).collect::<Result<_>>()?;
    if changed.is_empty() {
        println!("\nNo changes since the first pass (status {:?})", issues.last_status());
    } else {
        println!("\n{} issue(s) after refresh", changed.len());
    }

    println!(
        "{} requests made, {} left",
        session.request_count(),
        session.ratelimit_remaining()?
    );
    Ok(())
}
