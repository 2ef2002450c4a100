//! `hr-portal complete-setup`

use portal_auth::{AuthError, SessionManager, UserPatch};

pub fn run(manager: &SessionManager) -> Result<(), AuthError> {
    let snapshot = manager.rehydrate();
    let Some(user) = snapshot.user() else {
        println!("Not signed in");
        return Ok(());
    };
    if !user.first_login {
        println!("Setup already complete");
        return Ok(());
    }

    manager.update_user(UserPatch::first_login(false))?;
    if let Some(next) = manager.redirect_for(manager.policy().setup_route()) {
        println!("Setup complete. Next: {}", next);
    }
    Ok(())
}
