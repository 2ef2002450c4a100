//! `hr-portal status`

use portal_auth::SessionManager;

pub fn run(manager: &SessionManager) -> Result<(), serde_json::Error> {
    let snapshot = manager.rehydrate();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
