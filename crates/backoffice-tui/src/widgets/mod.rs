//! Reusable widgets shared by the resource panes.

pub mod form;
pub mod menu;
pub mod pagination;
pub mod text_field;
