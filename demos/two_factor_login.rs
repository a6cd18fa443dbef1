//! Two-factor login example.
//!
//! Authenticates with username and password. When the account has
//! two-factor authentication enabled, the one-time password is read from
//! standard input the moment the server asks for it.
//!
//! Run with: cargo run --example two_factor_login

use std::io::{self, BufRead, Write};

use hubkit::{Lookup, Result, Session};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct User {
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    public_repos: u64,
}

fn prompt_for_code() -> String {
    print!("Two-factor code: ");
    let _ = io::stdout().flush();

    let mut code = String::new();
    let _ = io::stdin().lock().read_line(&mut code);
    code.trim().to_string()
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Get credentials from environment variables
    let username = std::env::var("GITHUB_USERNAME")
        .expect("GITHUB_USERNAME environment variable required");
    let password = std::env::var("GITHUB_PASSWORD")
        .expect("GITHUB_PASSWORD environment variable required");

    let session = match std::env::var("GITHUB_ENTERPRISE_URL") {
        Ok(url) => Session::enterprise(&url)?,
        Err(_) => Session::new()?,
    };
    session.set_basic_auth(&username, &password);
    session.set_two_factor_callback(prompt_for_code);

    println!("Logging in as {username}...");

    match session.fetch::<User>(&session.build_url(&["user"])) {
        Ok(Lookup::Found(user)) => {
            println!("Successfully authenticated!");
            println!(
                "  {} ({}), {} public repositories",
                user.login,
                user.name.as_deref().unwrap_or("no name"),
                user.public_repos
            );
        }
        Ok(Lookup::Absent) => println!("No user resource at this endpoint"),
        Err(e) if e.is_auth_error() => println!("Login failed: {e}"),
        Err(e) => return Err(e),
    }

    println!("\n{} request(s) made", session.request_count());
    Ok(())
}
