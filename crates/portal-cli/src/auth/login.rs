//! `hr-portal login`

use portal_auth::{AuthError, Credentials, Route, SessionManager};
use tracing::warn;

pub async fn run(
    manager: &SessionManager,
    username: &str,
    password: &str,
    remember: bool,
) -> Result<(), AuthError> {
    manager.rehydrate();

    let credentials = Credentials::new(username, password);
    let snapshot = match manager.login(&credentials, remember).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            if let Some(message) = e.user_message() {
                eprintln!("{}", message);
            }
            return Err(e);
        }
    };

    let Some(user) = snapshot.user() else {
        return Ok(());
    };
    println!("Signed in as {} ({})", user.display_name(), user.role_name());

    let landing = manager
        .redirect_for(manager.policy().login_route())
        .unwrap_or_else(|| Route::from("/"));
    println!("Next: {}", landing);

    if !remember {
        warn!("Session is not remembered and ends with this process");
        println!("Session not remembered; it ends when this command exits. Use `hr-portal shell` to keep it.");
    }
    Ok(())
}
