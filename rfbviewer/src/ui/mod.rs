pub mod desktop;
pub mod statusbar;
