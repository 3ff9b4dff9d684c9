pub mod align;
pub mod alphabet;
pub mod search;
pub mod structs;
pub mod util;
