mod run;
pub(crate) mod summary;

pub(crate) use run::run_fleet;
