use serde::Serialize;

use crate::admin;
use crate::session::SessionContext;
use crate::store::RecordStore;
use crate::theme::Theme;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub route: &'static str,
}

const fn link(label: &'static str, route: &'static str) -> NavLink {
    NavLink { label, route }
}

/// Everything the navigation bar renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavState {
    pub signed_in: bool,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub theme: Theme,
    pub links: Vec<NavLink>,
    pub account_links: Vec<NavLink>,
}

/// Links for the given session and role. Sign Out is an action, not a
/// route, so it is marked with an empty route.
pub fn nav_links(signed_in: bool, is_admin: bool) -> (Vec<NavLink>, Vec<NavLink>) {
    let mut links = vec![
        link("Home", "/"),
        link("Collection", "/#collection"),
        link("Measure Me", "/measure"),
    ];
    if is_admin {
        links.push(link("Admin", "/admin"));
    }
    let account = if signed_in {
        vec![link("My Profile", "/profile"), link("Sign Out", "")]
    } else {
        vec![link("Login", "/login"), link("Sign Up", "/signup")]
    };
    (links, account)
}

/// Without a record store the admin link is never shown.
pub async fn nav_state(
    session: &SessionContext,
    store: Option<&dyn RecordStore>,
    theme: Theme,
) -> NavState {
    let user = session.user();
    let is_admin = match store {
        Some(store) => admin::is_admin(session, store).await,
        None => false,
    };
    let (links, account_links) = nav_links(user.is_some(), is_admin);
    NavState {
        signed_in: user.is_some(),
        display_name: user.as_ref().map(|u| u.display_name()),
        is_admin,
        theme,
        links,
        account_links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session;
    use crate::store::MemoryStore;
    use crate::supabase::{Session, User};

    fn labels(links: &[NavLink]) -> Vec<&str> {
        links.iter().map(|l| l.label).collect()
    }

    #[test]
    fn test_signed_out_links() {
        let (links, account) = nav_links(false, false);
        assert_eq!(labels(&links), vec!["Home", "Collection", "Measure Me"]);
        assert_eq!(labels(&account), vec!["Login", "Sign Up"]);
    }

    #[test]
    fn test_admin_links() {
        let (links, account) = nav_links(true, true);
        assert_eq!(labels(&links), vec!["Home", "Collection", "Measure Me", "Admin"]);
        assert_eq!(labels(&account), vec!["My Profile", "Sign Out"]);
    }

    #[tokio::test]
    async fn test_state_follows_session() {
        let (writer, ctx) = session::channel();
        let store = MemoryStore::new();
        let state = nav_state(&ctx, Some(&store), Theme::Dark).await;
        assert!(!state.signed_in);
        assert_eq!(state.display_name, None);

        writer.set(Some(Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: None,
            expires_at: None,
            user: User {
                id: "u9".to_string(),
                email: Some("adjoa@ckstyle.com".to_string()),
            },
        }));
        store.set_role("u9", "admin");
        let state = nav_state(&ctx, Some(&store), Theme::Dark).await;
        assert!(state.signed_in && state.is_admin);
        assert_eq!(state.display_name.as_deref(), Some("adjoa"));
        assert_eq!(state.theme, Theme::Dark);
    }
}
