pub mod events;
pub mod history;
pub mod palette;
pub mod params;
pub mod studio;
pub mod styles;
pub mod text;
