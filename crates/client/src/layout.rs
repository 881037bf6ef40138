//! Visible-container model of the dashboard.

use panel_auth::{Identity, view_requirement};
use panel_core::View;

/// Which container currently fills the main area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Login,
    Register,
    Page(View),
}

/// Visibility of each navigation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavVisibility {
    pub login_link: bool,
    pub register_link: bool,
    pub user_menu: bool,
    pub pages: bool,
    pub users_entry: bool,
    pub admin_entry: bool,
}

impl NavVisibility {
    /// Nav entries are shown only for views the identity may open.
    pub fn is_entry_visible(&self, view: View) -> bool {
        match view {
            View::Emojis => self.pages,
            View::Users => self.pages && self.users_entry,
            View::Administration => self.pages && self.admin_entry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Layout {
    pub section: Option<Section>,
    pub active_nav: Option<View>,
    pub nav: NavVisibility,
    pub user_name: Option<String>,
}

impl Layout {
    fn show_anonymous(&mut self, section: Section) {
        self.section = Some(section);
        self.active_nav = None;
        self.user_name = None;
        self.nav = NavVisibility {
            login_link: true,
            register_link: true,
            ..NavVisibility::default()
        };
    }

    pub fn show_login(&mut self) {
        self.show_anonymous(Section::Login);
    }

    pub fn show_register(&mut self) {
        self.show_anonymous(Section::Register);
    }

    /// Switch to the authenticated chrome. No page is active until `activate`.
    pub fn show_dashboard(&mut self, identity: &Identity) {
        let may_open = |view: View| view_requirement(view).is_satisfied_by(&identity.roles);
        self.section = None;
        self.active_nav = None;
        self.user_name = Some(identity.username.clone());
        self.nav = NavVisibility {
            login_link: false,
            register_link: false,
            user_menu: true,
            pages: true,
            users_entry: may_open(View::Users),
            admin_entry: may_open(View::Administration),
        };
    }

    /// Deactivate every page, then activate `view` and its nav control.
    pub fn activate(&mut self, view: View) {
        self.section = Some(Section::Page(view));
        self.active_nav = Some(view);
    }

    pub fn active_view(&self) -> Option<View> {
        match self.section {
            Some(Section::Page(view)) => Some(view),
            _ => None,
        }
    }
}
