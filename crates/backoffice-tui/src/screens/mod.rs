//! Screen implementations. Each screen is a top-level Component.

pub mod attachments;
pub mod group;
pub mod journal;
pub mod links;
pub mod list;
pub mod login;
pub mod tree;

use crate::component::Component;
use crate::screen::ScreenId;

/// Create the sign-in screen and one screen per tab.
pub fn create_screens(email: Option<String>) -> Vec<(ScreenId, Box<dyn Component>)> {
    let mut screens: Vec<(ScreenId, Box<dyn Component>)> =
        vec![(ScreenId::Login, Box::new(login::LoginScreen::new(email)))];
    for id in ScreenId::tabs() {
        if let ScreenId::Group(group) = id {
            screens.push((id, Box::new(group::GroupScreen::new(group))));
        }
    }
    screens
}
