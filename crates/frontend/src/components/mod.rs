pub mod header;
pub mod status_panel;
