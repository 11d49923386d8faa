pub mod compute;
pub mod modules;
pub mod supercell;
