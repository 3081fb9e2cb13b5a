/// reading reaction networks, solver settings and whole integration tasks from JSON files
pub mod load_from_file;
pub mod logging;
