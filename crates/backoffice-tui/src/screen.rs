//! Screen identifiers: one tab per resource group, plus the sign-in form.

use std::fmt;

use strum::IntoEnumIterator;

use backoffice_core::{Resource, ResourceGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenId {
    /// Sign-in form; not in the tab bar.
    Login,
    Group(ResourceGroup),
}

impl ScreenId {
    /// Tab-bar order.
    pub fn tabs() -> Vec<Self> {
        ResourceGroup::iter().map(Self::Group).collect()
    }

    pub fn first_tab() -> Self {
        Self::Group(ResourceGroup::Hr)
    }

    /// The tab that hosts `resource`.
    pub fn of(resource: Resource) -> Self {
        Self::Group(resource.group())
    }

    /// 1-based number key. The sign-in form has none.
    pub fn number(self) -> Option<u8> {
        let Self::Group(group) = self else {
            return None;
        };
        ResourceGroup::iter()
            .position(|g| g == group)
            .and_then(|i| u8::try_from(i + 1).ok())
    }

    pub fn from_number(n: u8) -> Option<Self> {
        let index = usize::from(n).checked_sub(1)?;
        ResourceGroup::iter().nth(index).map(Self::Group)
    }

    /// Next tab, wrapping around.
    pub fn next(self) -> Self {
        self.step(1)
    }

    pub fn prev(self) -> Self {
        let tabs = Self::tabs();
        self.step(tabs.len().saturating_sub(1))
    }

    fn step(self, by: usize) -> Self {
        let tabs = Self::tabs();
        let Some(idx) = tabs.iter().position(|&s| s == self) else {
            return Self::first_tab();
        };
        tabs.get((idx + by) % tabs.len())
            .copied()
            .unwrap_or_else(Self::first_tab)
    }

    pub fn label(self) -> String {
        match self {
            Self::Login => "Sign in".into(),
            Self::Group(group) => group.to_string(),
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn tabs_follow_resource_groups() {
        assert_eq!(ScreenId::from_number(1), Some(ScreenId::Group(ResourceGroup::Hr)));
        assert_eq!(ScreenId::first_tab().number(), Some(1));
        assert_eq!(ScreenId::Login.number(), None);
        assert_eq!(ScreenId::from_number(0), None);
        assert_eq!(ScreenId::of(Resource::Vendors), ScreenId::Group(ResourceGroup::Parties));
    }

    #[test]
    fn cycling_wraps_both_ways() {
        let last = *ScreenId::tabs().last().unwrap_or(&ScreenId::Login);
        assert_eq!(last.next(), ScreenId::first_tab());
        assert_eq!(ScreenId::first_tab().prev(), last);
        assert_eq!(ScreenId::Login.next(), ScreenId::first_tab());
        assert_eq!(ScreenId::first_tab().label(), "HR");
    }
}
