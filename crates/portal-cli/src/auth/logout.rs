//! `hr-portal logout`

use portal_auth::SessionManager;

pub fn run(manager: &SessionManager) {
    manager.rehydrate();
    manager.logout();
    println!("Signed out");
}
