pub mod proportional;
pub mod shu;
