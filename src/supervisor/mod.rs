//! Local worker supervision: spawns `fleetload worker` children and tears
//! them down when the fleet shuts down.
mod environment;
mod process;

#[cfg(test)]
mod tests;

pub use environment::LocalEnvironment;
pub use process::WorkerSupervisor;

#[cfg(test)]
pub(crate) use process::read_handshake;
