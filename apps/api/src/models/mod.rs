pub mod output;
pub mod persona;
pub mod section;
