pub mod leads;
pub mod snapshot;
