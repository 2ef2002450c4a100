//! Interactive session. The shell process is the "tab": a session signed in
//! without remember-me is kept in memory and gone when the shell exits.

use crate::auth::TerminalNavigator;
use portal_auth::{Credentials, GuardDecision, Route, SessionManager, UserPatch};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
commands:
  login <username> <password> [--remember]
  logout
  status
  setup                  complete first-login setup
  goto <route>           visit a route (redirects apply)
  guard [ROLE ...]       check access to a route restricted to ROLEs
  help
  quit";

pub async fn run(manager: &SessionManager) -> std::io::Result<()> {
    let navigator = TerminalNavigator::at(manager.policy().login_route().clone());
    manager.attach_navigator(navigator.clone());

    let snapshot = manager.rehydrate();
    match snapshot.user() {
        Some(user) => println!("Restored session for {}", user.display_name()),
        None => println!("Not signed in"),
    }
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("hr-portal> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();
        debug!(command = %command, "Shell command");

        match command {
            "login" => {
                let remember = args.contains(&"--remember");
                let positional: Vec<&str> =
                    args.iter().copied().filter(|a| *a != "--remember").collect();
                let [username, password] = positional[..] else {
                    println!("usage: login <username> <password> [--remember]");
                    continue;
                };
                navigator.visit(manager.policy().login_route().clone());
                match manager
                    .login(&Credentials::new(username, password), remember)
                    .await
                {
                    Ok(snapshot) => {
                        if let Some(user) = snapshot.user() {
                            println!("Signed in as {} ({})", user.display_name(), user.role_name());
                        }
                    }
                    Err(e) => println!("{}", e.user_message().unwrap_or("Login failed")),
                }
            }
            "logout" => {
                manager.logout();
                navigator.visit(manager.policy().login_route().clone());
                println!("Signed out");
            }
            "status" => match serde_json::to_string_pretty(&manager.snapshot()) {
                Ok(json) => println!("{}", json),
                Err(e) => println!("could not render status: {}", e),
            },
            "setup" => {
                if manager.snapshot().user().is_none() {
                    println!("Not signed in");
                    continue;
                }
                if let Err(e) = manager.update_user(UserPatch::first_login(false)) {
                    println!("setup failed: {}", e);
                }
            }
            "goto" => {
                let Some(path) = args.first() else {
                    println!("usage: goto <route>");
                    continue;
                };
                let route = Route::from(*path);
                match manager.redirect_for(&route) {
                    Some(target) => {
                        println!("-> {}", target);
                        navigator.visit(target);
                    }
                    None => navigator.visit(route),
                }
            }
            "guard" => match manager.guard(&args) {
                GuardDecision::Allow => println!("allowed"),
                GuardDecision::Pending => println!("pending"),
                GuardDecision::RedirectToLogin(to) | GuardDecision::RedirectTo(to) => {
                    println!("denied -> {}", to)
                }
            },
            "help" => println!("{}", HELP),
            "quit" | "exit" => break,
            other => println!("unknown command: {} (try `help`)", other),
        }
    }

    Ok(())
}
